//! Unified error type for keepsake.
//!
//! Every catalog and query funnels its failures into [`Error`]. The transport
//! layer only needs [`Error::kind`] to pick a response, and
//! [`Error::http_status`] gives the conventional status for that kind.

use std::fmt;

use serde::Serialize;

/// Tag identifying the class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    DuplicateSlug,
    LimitExceeded,
    InvalidAssociation,
    UnsupportedMediaType,
    PayloadTooLarge,
    Validation,
    Conflict,
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::DuplicateSlug => "duplicate_slug",
            Self::LimitExceeded => "limit_exceeded",
            Self::InvalidAssociation => "invalid_association",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::InternalError => "internal_error",
        };
        f.write_str(s)
    }
}

/// Unified error type covering all failure modes in keepsake.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "landing", "media").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The actor does not own the entity, or the entity is a system theme.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The slug is already used by another entity of the same owner.
    #[error("Slug already exists for this user: {0}")]
    DuplicateSlug(String),

    /// An attachment limit has been reached.
    #[error("Attachment limit of {limit} reached")]
    LimitExceeded {
        /// The maximum number of attachments.
        limit: usize,
    },

    /// A media id is not attached to the entity being modified.
    #[error("Media {media_id} is not attached to this landing")]
    InvalidAssociation {
        /// The offending media id.
        media_id: i64,
    },

    /// The uploaded file type is not in the allow-list.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The uploaded file exceeds the size limit.
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: u64,
        /// Configured maximum.
        max: u64,
    },

    /// Input failed a check that needs no other state.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The entity is still referenced and cannot be removed.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The blob store rejected an operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::DuplicateSlug(_) => ErrorKind::DuplicateSlug,
            Error::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Error::InvalidAssociation { .. } => ErrorKind::InvalidAssociation,
            Error::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            Error::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Database { .. } | Error::Io { .. } | Error::Storage(_) | Error::Internal(_) => {
                ErrorKind::InternalError
            }
        }
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::DuplicateSlug => 409,
            ErrorKind::LimitExceeded => 422,
            ErrorKind::InvalidAssociation => 422,
            ErrorKind::UnsupportedMediaType => 415,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::Validation => 422,
            ErrorKind::Conflict => 409,
            ErrorKind::InternalError => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Forbidden`].
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Error::Forbidden(msg.into())
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Storage`].
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Convenience constructor for [`Error::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("landing", 42);
        assert_eq!(err.to_string(), "landing not found: 42");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn forbidden_display() {
        let err = Error::forbidden("not your landing");
        assert_eq!(err.to_string(), "Forbidden: not your landing");
        assert_eq!(err.http_status(), 403);
    }

    #[test]
    fn duplicate_slug_display() {
        let err = Error::DuplicateSlug("ana-luis".into());
        assert_eq!(err.to_string(), "Slug already exists for this user: ana-luis");
        assert_eq!(err.kind(), ErrorKind::DuplicateSlug);
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn invalid_association_names_media() {
        let err = Error::InvalidAssociation { media_id: 7 };
        assert!(err.to_string().contains('7'));
        assert_eq!(err.kind(), ErrorKind::InvalidAssociation);
    }

    #[test]
    fn upload_rejections() {
        let err = Error::UnsupportedMediaType("application/pdf".into());
        assert_eq!(err.http_status(), 415);

        let err = Error::PayloadTooLarge {
            size: 11,
            max: 10,
        };
        assert_eq!(err.to_string(), "Payload too large: 11 bytes (max 10)");
        assert_eq!(err.http_status(), 413);
    }

    #[test]
    fn internal_kinds_collapse() {
        assert_eq!(Error::database("locked").kind(), ErrorKind::InternalError);
        assert_eq!(Error::storage("disk full").kind(), ErrorKind::InternalError);
        assert_eq!(Error::internal("bug").kind(), ErrorKind::InternalError);

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::LimitExceeded).unwrap();
        assert_eq!(json, "\"limit_exceeded\"");
        assert_eq!(ErrorKind::LimitExceeded.to_string(), "limit_exceeded");
    }
}
