//! User account operations.
//!
//! Users exist so that ownership columns are real foreign keys;
//! authentication lives outside this crate.

use chrono::Utc;
use keepsake_common::{Error, Result, UserId};
use rusqlite::Connection;

use crate::models::User;

const COLS: &str = "id, name, created_at";

/// Create a new user.
pub fn create_user(conn: &Connection, name: &str) -> Result<User> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO users (name, created_at) VALUES (?1, ?2)",
        rusqlite::params![name, created_at.to_rfc3339()],
    )
    .map_err(Error::database)?;

    Ok(User {
        id: UserId::from(conn.last_insert_rowid()),
        name: name.to_string(),
        created_at,
    })
}

/// Get a user by ID.
pub fn get_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let q = format!("SELECT {COLS} FROM users WHERE id = ?1");
    match conn.query_row(&q, [id.get()], User::from_row) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// List all users ordered by ID.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let q = format!("SELECT {COLS} FROM users ORDER BY id");
    let mut stmt = conn.prepare(&q).map_err(Error::database)?;
    let rows = stmt
        .query_map([], User::from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;
    Ok(rows)
}
