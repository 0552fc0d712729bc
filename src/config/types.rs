use keepsake_common::{ImageMime, DEFAULT_MAX_UPLOAD_BYTES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub slugs: SlugConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file path. `~` is expanded.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "keepsake.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Base directory for the filesystem backend.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Prefix joined with a stored path to build its public URL.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}

fn default_public_base_url() -> String {
    "/storage".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// Uploads larger than this are rejected.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_allowed_mime_types() -> Vec<String> {
    ImageMime::default_allow_list()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

impl MediaConfig {
    /// Whether `mime` is on the allow-list (case-insensitive).
    pub fn allows(&self, mime: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlugConfig {
    /// Maximum number of numeric suffixes tried before giving up.
    #[serde(default = "default_max_probe")]
    pub max_probe: u32,
}

fn default_max_probe() -> u32 {
    1000
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            max_probe: default_max_probe(),
        }
    }
}
