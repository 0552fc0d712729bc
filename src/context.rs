//! Shared application context.
//!
//! [`AppContext`] bundles the database pool, the blob store, and the loaded
//! configuration. The catalogs borrow it; cloning only bumps `Arc`s.

use std::sync::Arc;

use keepsake_common::Result;
use keepsake_db::pool::{get_conn, init_memory_pool, init_pool, DbPool, PooledConnection};

use crate::config::Config;
use crate::invitations::InvitationCatalog;
use crate::landings::LandingCatalog;
use crate::ledger::AssociationLedger;
use crate::media::MediaRegistry;
use crate::storage::{self, MediaStore};
use crate::themes::ThemeCatalog;

/// Application context shared by every catalog.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool.
    pub db: DbPool,
    /// Blob storage backend.
    pub store: Arc<dyn MediaStore>,
    /// Immutable configuration snapshot.
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(db: DbPool, store: Arc<dyn MediaStore>, config: Config) -> Self {
        Self {
            db,
            store,
            config: Arc::new(config),
        }
    }

    /// Open the configured database and blob store.
    pub fn from_config(config: Config) -> Result<Self> {
        let db = init_pool(&config.database_path())?;
        let store = storage::from_config(&config.storage);
        tracing::debug!("Using {} media store", store.name());
        Ok(Self::new(db, store, config))
    }

    /// Context over a fresh in-memory database.
    pub fn in_memory(store: Arc<dyn MediaStore>, config: Config) -> Result<Self> {
        Ok(Self::new(init_memory_pool()?, store, config))
    }

    /// Check out a pooled connection.
    pub fn conn(&self) -> Result<PooledConnection> {
        get_conn(&self.db)
    }

    pub fn media(&self) -> MediaRegistry<'_> {
        MediaRegistry::new(self)
    }

    pub fn ledger(&self) -> AssociationLedger<'_> {
        AssociationLedger::new(self)
    }

    pub fn landings(&self) -> LandingCatalog<'_> {
        LandingCatalog::new(self)
    }

    pub fn themes(&self) -> ThemeCatalog<'_> {
        ThemeCatalog::new(self)
    }

    pub fn invitations(&self) -> InvitationCatalog<'_> {
        InvitationCatalog::new(self)
    }
}
