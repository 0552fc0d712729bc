//! Filesystem-backed media storage.
//!
//! Blobs live at `{root}/{stored_path}`; directories are created on demand.

use std::path::{Path, PathBuf};

use keepsake_common::Result;

use super::{check_relative, join_path, public_url, MediaStore};

/// Stores blobs on local disk under a base directory.
pub struct FsMediaStore {
    root: PathBuf,
    base_url: String,
}

impl FsMediaStore {
    /// Create a store rooted at `root` that builds URLs from `base_url`.
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.to_string(),
        }
    }

    /// Base directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute filesystem path for a stored path.
    pub fn full_path(&self, path: &str) -> Result<PathBuf> {
        check_relative(path)?;
        Ok(self.root.join(path))
    }
}

impl MediaStore for FsMediaStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn put(&self, namespace: &str, name: &str, bytes: &[u8]) -> Result<String> {
        let stored = join_path(namespace, name)?;
        let file_path = self.root.join(&stored);

        if let Some(dir) = file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&file_path, bytes)?;

        tracing::debug!("Stored {} bytes at {}", bytes.len(), file_path.display());
        Ok(stored)
    }

    fn url_for(&self, path: &str) -> String {
        public_url(&self.base_url, path)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.full_path(path)?.is_file())
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let file_path = self.full_path(path)?;
        match std::fs::remove_file(&file_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
