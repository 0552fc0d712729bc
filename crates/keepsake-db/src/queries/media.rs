//! Media database queries.
//!
//! Media rows are insert-only: there is no update, and [`delete_media`] is
//! only called once [`reference_counts`] reports no references.

use chrono::Utc;
use keepsake_common::{Error, MediaId, Result, UserId};
use rusqlite::Connection;

use crate::models::{Media, NewMedia, ReferenceCounts};

pub(crate) const COLS: &str =
    "id, owner_user_id, filename, storage_path, mime_type, byte_size, public_url, created_at";

/// Insert a new media record.
pub fn insert_media(conn: &Connection, media: &NewMedia) -> Result<Media> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO media (owner_user_id, filename, storage_path, mime_type, byte_size, public_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            media.owner_user_id.get(),
            &media.filename,
            &media.storage_path,
            &media.mime_type,
            media.byte_size,
            &media.public_url,
            created_at.to_rfc3339(),
        ],
    )
    .map_err(Error::database)?;

    Ok(Media {
        id: MediaId::from(conn.last_insert_rowid()),
        owner_user_id: media.owner_user_id,
        filename: media.filename.clone(),
        storage_path: media.storage_path.clone(),
        mime_type: media.mime_type.clone(),
        byte_size: media.byte_size,
        public_url: media.public_url.clone(),
        created_at,
    })
}

/// Get a media record by ID.
///
/// # Returns
///
/// * `Ok(Some(Media))` - The media if found
/// * `Ok(None)` - If the media does not exist
/// * `Err(Error)` - If a database error occurs
pub fn get_media(conn: &Connection, id: MediaId) -> Result<Option<Media>> {
    let q = format!("SELECT {COLS} FROM media WHERE id = ?1");
    match conn.query_row(&q, [id.get()], Media::from_row) {
        Ok(media) => Ok(Some(media)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// List media owned by a user, newest first.
///
/// When `mime_prefix` is given (e.g. `"image/"`), only matching rows are
/// returned.
pub fn list_media_for_owner(
    conn: &Connection,
    owner: UserId,
    mime_prefix: Option<&str>,
) -> Result<Vec<Media>> {
    let q = format!(
        "SELECT {COLS} FROM media
         WHERE owner_user_id = ?1 AND (?2 IS NULL OR substr(mime_type, 1, length(?2)) = ?2)
         ORDER BY id DESC"
    );
    let mut stmt = conn.prepare(&q).map_err(Error::database)?;
    let rows = stmt
        .query_map(rusqlite::params![owner.get(), mime_prefix], Media::from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;
    Ok(rows)
}

/// Count references to a media row from every owning entity type.
pub fn reference_counts(conn: &Connection, id: MediaId) -> Result<ReferenceCounts> {
    conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM themes WHERE bg_image_media_id = ?1),
            (SELECT COUNT(*) FROM landing_media WHERE media_id = ?1),
            (SELECT COUNT(*) FROM invitation_media WHERE media_id = ?1)",
        [id.get()],
        |row| {
            Ok(ReferenceCounts {
                theme_backgrounds: row.get(0)?,
                landings: row.get(1)?,
                invitations: row.get(2)?,
            })
        },
    )
    .map_err(Error::database)
}

/// Delete a media record by ID.
///
/// # Returns
///
/// * `Ok(true)` - If the row was deleted
/// * `Ok(false)` - If the row did not exist
/// * `Err(Error)` - If a database error occurs, including a foreign key
///   violation when the media is still referenced
pub fn delete_media(conn: &Connection, id: MediaId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM media WHERE id = ?1", [id.get()])
        .map_err(Error::database)?;
    Ok(n > 0)
}
