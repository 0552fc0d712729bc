//! Invitation database queries.

use chrono::Utc;
use keepsake_common::{Error, InvitationId, Result, UserId};
use rusqlite::Connection;

use crate::models::{Invitation, NewInvitation};

const COLS: &str =
    "id, owner_user_id, title, slug, yes_message, no_messages, is_published, created_at";

fn encode_messages(messages: &[String]) -> Result<String> {
    serde_json::to_string(messages)
        .map_err(|e| Error::internal(format!("failed to encode no_messages: {e}")))
}

/// Insert a new invitation.
pub fn insert_invitation(conn: &Connection, invitation: &NewInvitation) -> Result<Invitation> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO invitations (owner_user_id, title, slug, yes_message, no_messages, is_published, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            invitation.owner_user_id.get(),
            &invitation.title,
            &invitation.slug,
            &invitation.yes_message,
            encode_messages(&invitation.no_messages)?,
            invitation.is_published,
            created_at.to_rfc3339(),
        ],
    )
    .map_err(Error::database)?;

    Ok(Invitation {
        id: InvitationId::from(conn.last_insert_rowid()),
        owner_user_id: invitation.owner_user_id,
        title: invitation.title.clone(),
        slug: invitation.slug.clone(),
        yes_message: invitation.yes_message.clone(),
        no_messages: invitation.no_messages.clone(),
        is_published: invitation.is_published,
        created_at,
    })
}

/// Get an invitation by ID.
pub fn get_invitation(conn: &Connection, id: InvitationId) -> Result<Option<Invitation>> {
    let q = format!("SELECT {COLS} FROM invitations WHERE id = ?1");
    match conn.query_row(&q, [id.get()], Invitation::from_row) {
        Ok(invitation) => Ok(Some(invitation)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// Get a published invitation by slug across all owners; the lowest ID wins.
pub fn get_published_invitation_by_slug(conn: &Connection, slug: &str) -> Result<Option<Invitation>> {
    let q = format!(
        "SELECT {COLS} FROM invitations WHERE slug = ?1 AND is_published = 1 ORDER BY id LIMIT 1"
    );
    match conn.query_row(&q, [slug], Invitation::from_row) {
        Ok(invitation) => Ok(Some(invitation)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// List a user's invitations, newest first.
pub fn list_invitations_for_owner(conn: &Connection, owner: UserId) -> Result<Vec<Invitation>> {
    let q = format!("SELECT {COLS} FROM invitations WHERE owner_user_id = ?1 ORDER BY id DESC");
    let mut stmt = conn.prepare(&q).map_err(Error::database)?;
    let rows = stmt
        .query_map([owner.get()], Invitation::from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;
    Ok(rows)
}

/// Whether `slug` is already used by one of `owner`'s invitations.
pub fn slug_exists_for_owner(
    conn: &Connection,
    owner: UserId,
    slug: &str,
    exclude: Option<InvitationId>,
) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM invitations
            WHERE owner_user_id = ?1 AND slug = ?2 AND (?3 IS NULL OR id <> ?3)
         )",
        rusqlite::params![owner.get(), slug, exclude.map(|id| id.get())],
        |row| row.get(0),
    )
    .map_err(Error::database)
}

/// Write back every mutable column of `invitation`.
pub fn update_invitation(conn: &Connection, invitation: &Invitation) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE invitations SET title = ?1, slug = ?2, yes_message = ?3,
                    no_messages = ?4, is_published = ?5
             WHERE id = ?6",
            rusqlite::params![
                &invitation.title,
                &invitation.slug,
                &invitation.yes_message,
                encode_messages(&invitation.no_messages)?,
                invitation.is_published,
                invitation.id.get(),
            ],
        )
        .map_err(Error::database)?;
    Ok(n > 0)
}

/// Delete an invitation and, by cascade, its media links.
pub fn delete_invitation(conn: &Connection, id: InvitationId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM invitations WHERE id = ?1", [id.get()])
        .map_err(Error::database)?;
    Ok(n > 0)
}
