//! Keepsake-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across keepsake:
//!
//! - **Typed IDs**: Integer newtypes for users, media, landings, themes, and invitations
//! - **Core Types**: Image MIME allow-list, storage namespaces, and limits
//! - **Path Utilities**: Extension handling for uploaded filenames
//! - **Error Handling**: The tagged error type and result alias
//!
//! # Examples
//!
//! ```
//! use keepsake_common::{Error, ErrorKind, LandingId, Result};
//!
//! fn lookup(id: LandingId) -> Result<()> {
//!     Err(Error::not_found("landing", id))
//! }
//!
//! let err = lookup(LandingId::from(1)).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use ids::*;
pub use types::*;
