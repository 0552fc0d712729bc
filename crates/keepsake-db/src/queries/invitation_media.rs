//! Invitation media link queries. Links are an unordered set.

use chrono::Utc;
use keepsake_common::{Error, InvitationId, MediaId, Result};
use rusqlite::Connection;

use crate::models::Media;

/// Link a media row to an invitation. Returns `false` if it was already linked.
pub fn insert_link(conn: &Connection, invitation: InvitationId, media: MediaId) -> Result<bool> {
    let n = conn
        .execute(
            "INSERT OR IGNORE INTO invitation_media (invitation_id, media_id, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![invitation.get(), media.get(), Utc::now().to_rfc3339()],
        )
        .map_err(Error::database)?;
    Ok(n > 0)
}

/// Unlink a media row. Returns `false` if no link existed.
pub fn delete_link(conn: &Connection, invitation: InvitationId, media: MediaId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM invitation_media WHERE invitation_id = ?1 AND media_id = ?2",
            [invitation.get(), media.get()],
        )
        .map_err(Error::database)?;
    Ok(n > 0)
}

/// Media linked to an invitation, in link order.
pub fn list_media(conn: &Connection, invitation: InvitationId) -> Result<Vec<Media>> {
    let q = "SELECT m.id, m.owner_user_id, m.filename, m.storage_path, m.mime_type,
                    m.byte_size, m.public_url, m.created_at
             FROM invitation_media im
             JOIN media m ON m.id = im.media_id
             WHERE im.invitation_id = ?1
             ORDER BY im.id";
    let mut stmt = conn.prepare(q).map_err(Error::database)?;
    let rows = stmt
        .query_map([invitation.get()], Media::from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;
    Ok(rows)
}
