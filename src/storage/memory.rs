//! In-memory media storage for tests and ephemeral runs.

use std::collections::HashMap;

use keepsake_common::Result;
use parking_lot::RwLock;

use super::{check_relative, join_path, public_url, MediaStore};

/// Keeps blobs in a map guarded by a read-write lock.
pub struct MemoryMediaStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    base_url: String,
}

impl MemoryMediaStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            base_url: base_url.to_string(),
        }
    }

    /// Copy of the blob at `path`, if any.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().get(path).cloned()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl Default for MemoryMediaStore {
    fn default() -> Self {
        Self::new("/storage")
    }
}

impl MediaStore for MemoryMediaStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put(&self, namespace: &str, name: &str, bytes: &[u8]) -> Result<String> {
        let stored = join_path(namespace, name)?;
        self.blobs.write().insert(stored.clone(), bytes.to_vec());
        Ok(stored)
    }

    fn url_for(&self, path: &str) -> String {
        public_url(&self.base_url, path)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        check_relative(path)?;
        Ok(self.blobs.read().contains_key(path))
    }

    fn delete(&self, path: &str) -> Result<bool> {
        check_relative(path)?;
        Ok(self.blobs.write().remove(path).is_some())
    }
}
