//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, default config,
//! a [`MemoryMediaStore`], and a full [`AppContext`].

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use keepsake::config::Config;
use keepsake::landings::{LandingDetail, LandingInput};
use keepsake::media::Upload;
use keepsake::storage::MemoryMediaStore;
use keepsake::AppContext;
use keepsake_common::{Actor, MediaNamespace, ThemeId};
use keepsake_db::models::Media;
use keepsake_db::pool::{init_memory_pool, DbPool};

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub store: Arc<MemoryMediaStore>,
}

impl TestHarness {
    /// Create a new harness with default configuration and in-memory DB.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration and in-memory DB.
    pub fn with_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let store = Arc::new(MemoryMediaStore::default());
        let ctx = AppContext::new(db.clone(), store.clone(), config);
        Self { ctx, db, store }
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> keepsake_db::pool::PooledConnection {
        keepsake_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Insert a user and return it as an actor.
    pub fn create_user(&self, name: &str) -> Actor {
        let user = keepsake_db::queries::users::create_user(&self.conn(), name)
            .expect("failed to create user");
        Actor::new(user.id)
    }

    /// First seeded system theme.
    pub fn system_theme(&self) -> ThemeId {
        keepsake_db::queries::themes::list_system_themes(&self.conn())
            .expect("failed to list system themes")
            .first()
            .expect("no system themes seeded")
            .id
    }

    /// Create a landing on the first system theme.
    pub fn create_landing(&self, owner: Actor, couple_names: &str) -> LandingDetail {
        self.ctx
            .landings()
            .create(owner, landing_input(self.system_theme(), couple_names))
            .expect("failed to create landing")
    }

    /// Upload a small PNG into the user namespace.
    pub fn upload_png(&self, owner: Actor, filename: &str) -> Media {
        self.ctx
            .media()
            .upload(&Upload::new(filename, png_bytes()), owner.id, MediaNamespace::Users)
            .expect("failed to upload media")
    }
}

pub fn landing_input(theme_id: ThemeId, couple_names: &str) -> LandingInput {
    LandingInput {
        theme_id,
        slug: None,
        couple_names: couple_names.to_string(),
        anniversary_date: NaiveDate::from_ymd_opt(2021, 6, 12).expect("valid date"),
        bio_text: None,
    }
}

/// Bytes that sniff as PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}
