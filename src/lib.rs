//! Keepsake - media ownership and ordering for landing pages, themes, and
//! invitations.
//!
//! This library crate exposes the catalogs used by the CLI and the
//! integration tests.

pub mod config;
pub mod context;
pub mod invitations;
pub mod landings;
pub mod ledger;
pub mod media;
pub mod slug;
pub mod storage;
pub mod themes;

#[cfg(test)]
mod test_support;

pub use context::AppContext;
