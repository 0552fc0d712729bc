//! Theme database queries.
//!
//! System themes (NULL owner) are seeded by migration and never written by
//! these functions except through [`insert_theme`] in tests.

use chrono::Utc;
use keepsake_common::{Error, MediaId, Result, ThemeId, UserId};
use rusqlite::Connection;

use crate::models::{NewTheme, Theme};

const COLS: &str = "id, owner_user_id, name, description, primary_color, secondary_color, \
                    bg_color, bg_image_media_id, bg_image_url, css_class, created_at";

fn query_themes(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Theme>> {
    let mut stmt = conn.prepare(sql).map_err(Error::database)?;
    let rows = stmt
        .query_map(params, Theme::from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;
    Ok(rows)
}

/// Insert a theme. `owner` of `None` creates a system theme.
pub fn insert_theme(
    conn: &Connection,
    owner: Option<UserId>,
    theme: &NewTheme,
    background: Option<(MediaId, &str)>,
) -> Result<Theme> {
    let created_at = Utc::now();
    let (bg_id, bg_url) = match background {
        Some((id, url)) => (Some(id), Some(url.to_string())),
        None => (None, None),
    };

    conn.execute(
        "INSERT INTO themes (owner_user_id, name, description, primary_color, secondary_color,
                             bg_color, bg_image_media_id, bg_image_url, css_class, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            owner.map(|o| o.get()),
            &theme.name,
            &theme.description,
            &theme.primary_color,
            &theme.secondary_color,
            &theme.bg_color,
            bg_id.map(|m| m.get()),
            &bg_url,
            &theme.css_class,
            created_at.to_rfc3339(),
        ],
    )
    .map_err(Error::database)?;

    Ok(Theme {
        id: ThemeId::from(conn.last_insert_rowid()),
        owner_user_id: owner,
        name: theme.name.clone(),
        description: theme.description.clone(),
        primary_color: theme.primary_color.clone(),
        secondary_color: theme.secondary_color.clone(),
        bg_color: theme.bg_color.clone(),
        bg_image_media_id: bg_id,
        bg_image_url: bg_url,
        css_class: theme.css_class.clone(),
        created_at,
    })
}

/// Get a theme by ID.
pub fn get_theme(conn: &Connection, id: ThemeId) -> Result<Option<Theme>> {
    let q = format!("SELECT {COLS} FROM themes WHERE id = ?1");
    match conn.query_row(&q, [id.get()], Theme::from_row) {
        Ok(theme) => Ok(Some(theme)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// All system themes ordered by ID.
pub fn list_system_themes(conn: &Connection) -> Result<Vec<Theme>> {
    let q = format!("SELECT {COLS} FROM themes WHERE owner_user_id IS NULL ORDER BY id");
    query_themes(conn, &q, [])
}

/// System themes followed by the user's own themes, each group ordered by ID.
pub fn list_available_themes(conn: &Connection, user: UserId) -> Result<Vec<Theme>> {
    let q = format!(
        "SELECT {COLS} FROM themes
         WHERE owner_user_id IS NULL OR owner_user_id = ?1
         ORDER BY owner_user_id IS NOT NULL, id"
    );
    query_themes(conn, &q, [user.get()])
}

/// Write back every mutable column of `theme`. The owner is never written.
///
/// Returns `false` if the row no longer exists.
pub fn update_theme(conn: &Connection, theme: &Theme) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE themes SET name = ?1, description = ?2, primary_color = ?3,
                    secondary_color = ?4, bg_color = ?5, bg_image_media_id = ?6,
                    bg_image_url = ?7, css_class = ?8
             WHERE id = ?9",
            rusqlite::params![
                &theme.name,
                &theme.description,
                &theme.primary_color,
                &theme.secondary_color,
                &theme.bg_color,
                theme.bg_image_media_id.map(|m| m.get()),
                &theme.bg_image_url,
                &theme.css_class,
                theme.id.get(),
            ],
        )
        .map_err(Error::database)?;
    Ok(n > 0)
}

/// Number of landings using a theme.
pub fn count_landings_using(conn: &Connection, id: ThemeId) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM landings WHERE theme_id = ?1",
        [id.get()],
        |row| row.get(0),
    )
    .map_err(Error::database)
}

/// Delete a theme by ID. Returns `true` if a row was deleted.
pub fn delete_theme(conn: &Connection, id: ThemeId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM themes WHERE id = ?1", [id.get()])
        .map_err(Error::database)?;
    Ok(n > 0)
}
