//! Fixtures for unit tests.

use std::sync::Arc;

use keepsake_common::UserId;
use keepsake_db::queries::users::create_user;

use crate::config::Config;
use crate::context::AppContext;
use crate::storage::MemoryMediaStore;

/// A context over a fresh in-memory database and blob store.
pub(crate) fn context() -> (AppContext, Arc<MemoryMediaStore>) {
    let store = Arc::new(MemoryMediaStore::default());
    let ctx = AppContext::in_memory(store.clone(), Config::default()).unwrap();
    (ctx, store)
}

pub(crate) fn user(ctx: &AppContext, name: &str) -> UserId {
    create_user(&ctx.conn().unwrap(), name).unwrap().id
}

/// Bytes that sniff as PNG.
pub(crate) fn png() -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}

/// Bytes that sniff as JPEG.
pub(crate) fn jpeg() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}
