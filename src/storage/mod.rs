//! Blob storage for uploaded media.
//!
//! The catalogs only see the [`MediaStore`] trait. Stored paths are
//! relative, `/`-separated, and never contain `..` segments.

mod fs;
mod memory;

pub use fs::FsMediaStore;
pub use memory::MemoryMediaStore;

use std::sync::Arc;

use keepsake_common::{Error, Result};

use crate::config::{StorageBackend, StorageConfig};

/// Opaque byte storage keyed by relative path.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
pub trait MediaStore: Send + Sync {
    /// Human-readable name identifying this backend.
    fn name(&self) -> &'static str;

    /// Write `bytes` as `name` under `namespace` and return the stored path.
    fn put(&self, namespace: &str, name: &str, bytes: &[u8]) -> Result<String>;

    /// Public URL for a stored path.
    fn url_for(&self, path: &str) -> String;

    /// Whether a blob exists at `path`.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Remove the blob at `path`. Returns `false` if there was nothing to remove.
    fn delete(&self, path: &str) -> Result<bool>;
}

/// Build the store selected by configuration.
pub fn from_config(config: &StorageConfig) -> Arc<dyn MediaStore> {
    match config.backend {
        StorageBackend::Filesystem => {
            let root = shellexpand::tilde(&config.root.to_string_lossy()).into_owned();
            Arc::new(FsMediaStore::new(root, &config.public_base_url))
        }
        StorageBackend::Memory => Arc::new(MemoryMediaStore::new(&config.public_base_url)),
    }
}

/// Join a namespace and a file name into a stored path, rejecting traversal.
pub(crate) fn join_path(namespace: &str, name: &str) -> Result<String> {
    let namespace = namespace.trim_matches('/');
    check_relative(namespace)?;
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(Error::storage(format!("invalid blob name: {name:?}")));
    }
    if namespace.is_empty() {
        Ok(name.to_string())
    } else {
        Ok(format!("{namespace}/{name}"))
    }
}

/// Reject absolute paths and `..` / `.` segments.
pub(crate) fn check_relative(path: &str) -> Result<()> {
    if path.starts_with('/') || path.contains('\\') {
        return Err(Error::storage(format!("path must be relative: {path:?}")));
    }
    if path
        .split('/')
        .any(|seg| seg == ".." || seg == "." || (seg.is_empty() && !path.is_empty()))
    {
        return Err(Error::storage(format!("invalid path segment in {path:?}")));
    }
    Ok(())
}

/// Join a base URL and a stored path with exactly one `/` between them.
pub(crate) fn public_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_namespace_and_name() {
        assert_eq!(join_path("media/users/1", "a.jpg").unwrap(), "media/users/1/a.jpg");
        assert_eq!(join_path("/media/users/1/", "a.jpg").unwrap(), "media/users/1/a.jpg");
        assert_eq!(join_path("", "a.jpg").unwrap(), "a.jpg");
    }

    #[test]
    fn join_rejects_traversal() {
        assert!(join_path("media/../etc", "a.jpg").is_err());
        assert!(join_path("media", "../a.jpg").is_err());
        assert!(join_path("media", "").is_err());
        assert!(join_path("media//users", "a.jpg").is_err());
    }

    #[test]
    fn url_joining() {
        assert_eq!(public_url("/storage", "media/a.jpg"), "/storage/media/a.jpg");
        assert_eq!(
            public_url("https://cdn.example.com/", "/media/a.jpg"),
            "https://cdn.example.com/media/a.jpg"
        );
    }

    #[test]
    fn memory_backend_from_config() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..Default::default()
        };
        let store = from_config(&config);
        assert_eq!(store.name(), "memory");
    }
}
