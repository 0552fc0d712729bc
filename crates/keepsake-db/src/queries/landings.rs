//! Landing database queries.

use chrono::Utc;
use keepsake_common::{Error, LandingId, Result, UserId};
use rusqlite::Connection;

use crate::models::{Landing, NewLanding};

const COLS: &str =
    "id, owner_user_id, theme_id, slug, couple_names, anniversary_date, bio_text, created_at";

/// Insert a new landing.
///
/// The `(owner_user_id, slug)` unique index backs the slug check done by the
/// caller; a race that slips past it surfaces as a database error.
pub fn insert_landing(conn: &Connection, landing: &NewLanding) -> Result<Landing> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO landings (owner_user_id, theme_id, slug, couple_names, anniversary_date, bio_text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            landing.owner_user_id.get(),
            landing.theme_id.get(),
            &landing.slug,
            &landing.couple_names,
            landing.anniversary_date.format("%Y-%m-%d").to_string(),
            &landing.bio_text,
            created_at.to_rfc3339(),
        ],
    )
    .map_err(Error::database)?;

    Ok(Landing {
        id: LandingId::from(conn.last_insert_rowid()),
        owner_user_id: landing.owner_user_id,
        theme_id: landing.theme_id,
        slug: landing.slug.clone(),
        couple_names: landing.couple_names.clone(),
        anniversary_date: landing.anniversary_date,
        bio_text: landing.bio_text.clone(),
        created_at,
    })
}

/// Get a landing by ID.
pub fn get_landing(conn: &Connection, id: LandingId) -> Result<Option<Landing>> {
    let q = format!("SELECT {COLS} FROM landings WHERE id = ?1");
    match conn.query_row(&q, [id.get()], Landing::from_row) {
        Ok(landing) => Ok(Some(landing)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// Get a landing by slug across all owners.
///
/// Slugs are only unique per owner, so the lowest ID wins when several
/// owners share one.
pub fn get_landing_by_slug(conn: &Connection, slug: &str) -> Result<Option<Landing>> {
    let q = format!("SELECT {COLS} FROM landings WHERE slug = ?1 ORDER BY id LIMIT 1");
    match conn.query_row(&q, [slug], Landing::from_row) {
        Ok(landing) => Ok(Some(landing)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// List a user's landings, newest first.
pub fn list_landings_for_owner(conn: &Connection, owner: UserId) -> Result<Vec<Landing>> {
    let q = format!("SELECT {COLS} FROM landings WHERE owner_user_id = ?1 ORDER BY id DESC");
    let mut stmt = conn.prepare(&q).map_err(Error::database)?;
    let rows = stmt
        .query_map([owner.get()], Landing::from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;
    Ok(rows)
}

/// Whether `slug` is already used by one of `owner`'s landings.
///
/// `exclude` skips the landing being updated.
pub fn slug_exists_for_owner(
    conn: &Connection,
    owner: UserId,
    slug: &str,
    exclude: Option<LandingId>,
) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM landings
            WHERE owner_user_id = ?1 AND slug = ?2 AND (?3 IS NULL OR id <> ?3)
         )",
        rusqlite::params![owner.get(), slug, exclude.map(|id| id.get())],
        |row| row.get(0),
    )
    .map_err(Error::database)
}

/// Write back every mutable column of `landing`. The owner is never written.
///
/// Returns `false` if the row no longer exists.
pub fn update_landing(conn: &Connection, landing: &Landing) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE landings SET theme_id = ?1, slug = ?2, couple_names = ?3,
                    anniversary_date = ?4, bio_text = ?5
             WHERE id = ?6",
            rusqlite::params![
                landing.theme_id.get(),
                &landing.slug,
                &landing.couple_names,
                landing.anniversary_date.format("%Y-%m-%d").to_string(),
                &landing.bio_text,
                landing.id.get(),
            ],
        )
        .map_err(Error::database)?;
    Ok(n > 0)
}

/// Delete a landing. Its gallery links go with it via `ON DELETE CASCADE`.
pub fn delete_landing(conn: &Connection, id: LandingId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM landings WHERE id = ?1", [id.get()])
        .map_err(Error::database)?;
    Ok(n > 0)
}
