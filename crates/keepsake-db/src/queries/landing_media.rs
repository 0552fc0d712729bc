//! Landing gallery link queries.
//!
//! Links are ordered by `sort_order`, ties broken by link ID. The
//! `(landing_id, sort_order)` unique index means callers rewriting several
//! positions at once must do so inside a transaction and park rows on
//! temporary values first.

use chrono::Utc;
use keepsake_common::{Error, LandingId, MediaId, Result};
use rusqlite::Connection;

use crate::models::{AttachedMedia, LandingMediaLink};

const COLS: &str = "id, landing_id, media_id, sort_order";

/// Get the link between a landing and a media row, if any.
pub fn get_link(
    conn: &Connection,
    landing: LandingId,
    media: MediaId,
) -> Result<Option<LandingMediaLink>> {
    let q = format!("SELECT {COLS} FROM landing_media WHERE landing_id = ?1 AND media_id = ?2");
    match conn.query_row(&q, [landing.get(), media.get()], LandingMediaLink::from_row) {
        Ok(link) => Ok(Some(link)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// All links of a landing in display order.
pub fn list_links(conn: &Connection, landing: LandingId) -> Result<Vec<LandingMediaLink>> {
    let q = format!(
        "SELECT {COLS} FROM landing_media WHERE landing_id = ?1 ORDER BY sort_order, id"
    );
    let mut stmt = conn.prepare(&q).map_err(Error::database)?;
    let rows = stmt
        .query_map([landing.get()], LandingMediaLink::from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;
    Ok(rows)
}

/// Media attached to a landing, joined with their positions, in display order.
pub fn list_attached_media(conn: &Connection, landing: LandingId) -> Result<Vec<AttachedMedia>> {
    let q = "SELECT m.id, m.owner_user_id, m.filename, m.storage_path, m.mime_type,
                    m.byte_size, m.public_url, m.created_at, lm.sort_order
             FROM landing_media lm
             JOIN media m ON m.id = lm.media_id
             WHERE lm.landing_id = ?1
             ORDER BY lm.sort_order, lm.id";
    let mut stmt = conn.prepare(q).map_err(Error::database)?;
    let rows = stmt
        .query_map([landing.get()], AttachedMedia::from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;
    Ok(rows)
}

/// Number of media attached to a landing.
pub fn count_links(conn: &Connection, landing: LandingId) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM landing_media WHERE landing_id = ?1",
        [landing.get()],
        |row| row.get(0),
    )
    .map_err(Error::database)
}

/// Highest `sort_order` in use, or 0 for an empty gallery.
pub fn max_sort_order(conn: &Connection, landing: LandingId) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(sort_order), 0) FROM landing_media WHERE landing_id = ?1",
        [landing.get()],
        |row| row.get(0),
    )
    .map_err(Error::database)
}

/// The media currently holding `sort_order` on a landing.
pub fn sort_order_holder(
    conn: &Connection,
    landing: LandingId,
    sort_order: i64,
) -> Result<Option<MediaId>> {
    match conn.query_row(
        "SELECT media_id FROM landing_media WHERE landing_id = ?1 AND sort_order = ?2",
        [landing.get(), sort_order],
        |row| row.get::<_, i64>(0),
    ) {
        Ok(id) => Ok(Some(MediaId::from(id))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// Insert a link at `sort_order`.
pub fn insert_link(
    conn: &Connection,
    landing: LandingId,
    media: MediaId,
    sort_order: i64,
) -> Result<LandingMediaLink> {
    conn.execute(
        "INSERT INTO landing_media (landing_id, media_id, sort_order, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            landing.get(),
            media.get(),
            sort_order,
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(Error::database)?;

    Ok(LandingMediaLink {
        id: conn.last_insert_rowid(),
        landing_id: landing,
        media_id: media,
        sort_order,
    })
}

/// Move an existing link to `sort_order`. Returns `false` if no link exists.
pub fn set_sort_order(
    conn: &Connection,
    landing: LandingId,
    media: MediaId,
    sort_order: i64,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE landing_media SET sort_order = ?3 WHERE landing_id = ?1 AND media_id = ?2",
            [landing.get(), media.get(), sort_order],
        )
        .map_err(Error::database)?;
    Ok(n > 0)
}

/// Remove a link. Returns `false` if no link existed.
pub fn delete_link(conn: &Connection, landing: LandingId, media: MediaId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM landing_media WHERE landing_id = ?1 AND media_id = ?2",
            [landing.get(), media.get()],
        )
        .map_err(Error::database)?;
    Ok(n > 0)
}
