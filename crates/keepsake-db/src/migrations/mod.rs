//! Database migrations module
//!
//! This module handles SQLite schema migrations for keepsake.
//! Migrations are embedded in the binary and executed in order.

use keepsake_common::{Error, Result};
use rusqlite::Connection;

/// A single migration with its SQL content
struct Migration {
    version: usize,
    name: &'static str,
    sql: &'static str,
}

/// All available migrations
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial",
        sql: include_str!("001_initial.sql"),
    },
    Migration {
        version: 2,
        name: "system_themes",
        sql: include_str!("002_system_themes.sql"),
    },
];

/// Initialize the migrations table if it doesn't exist
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )
    .map_err(Error::database)?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<usize> {
    conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
        row.get::<_, Option<usize>>(0)
    })
    .map(|v| v.unwrap_or(0))
    .map_err(Error::database)
}

/// Run all pending migrations
///
/// Each pending migration runs in its own transaction together with the
/// `schema_migrations` bookkeeping row, so a failed migration leaves the
/// schema at the previous version.
///
/// # Returns
///
/// * `Ok(usize)` - Number of migrations applied
/// * `Err(Error)` - If any migration fails
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(Error::database)?;

    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;

    let pending: Vec<_> = MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
        .collect();

    let mut applied_count = 0;
    for migration in pending {
        let tx = conn.unchecked_transaction().map_err(Error::database)?;

        tx.execute_batch(migration.sql).map_err(|e| {
            Error::database(format!("Migration V{} failed: {e}", migration.version))
        })?;

        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.name],
        )
        .map_err(Error::database)?;

        tx.commit().map_err(Error::database)?;

        applied_count += 1;
        tracing::info!(
            "Applied migration {}: {}",
            migration.version,
            migration.name
        );
    }

    Ok(applied_count)
}

/// Get the current schema version without applying migrations
pub fn current_version(conn: &Connection) -> Result<usize> {
    init_migrations_table(conn)?;
    get_current_version(conn)
}

/// Get the latest available migration version
pub fn latest_version() -> usize {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
