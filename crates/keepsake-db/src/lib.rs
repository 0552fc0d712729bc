//! keepsake-db: database access and persistence layer.
//!
//! SQLite-backed storage with connection pooling, embedded migrations,
//! typed models, and one query module per table.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
