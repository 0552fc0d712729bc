mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

use crate::slug;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config.validate()?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./keepsake.toml",
        "~/.config/keepsake/config.toml",
        "/etc/keepsake/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

impl Config {
    /// Check settings that would make every operation fail.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            anyhow::bail!("database.path cannot be empty");
        }

        if self.media.max_upload_bytes == 0 {
            anyhow::bail!("media.max_upload_bytes must be greater than 0");
        }

        if self.media.allowed_mime_types.is_empty() {
            anyhow::bail!("media.allowed_mime_types cannot be empty");
        }

        for mime in &self.media.allowed_mime_types {
            if !mime.contains('/') {
                anyhow::bail!("Invalid MIME type in media.allowed_mime_types: {}", mime);
            }
        }

        if self.slugs.max_probe == 0 || self.slugs.max_probe > slug::MAX_PROBE {
            anyhow::bail!(
                "slugs.max_probe must be between 1 and {}",
                slug::MAX_PROBE
            );
        }

        if self.storage.backend == StorageBackend::Filesystem && !self.storage.root.exists() {
            tracing::warn!(
                "Storage root does not exist yet and will be created: {:?}",
                self.storage.root
            );
        }

        Ok(())
    }

    /// Database path with `~` expanded.
    pub fn database_path(&self) -> String {
        shellexpand::tilde(&self.database.path).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.media.max_upload_bytes, 10_485_760);
        assert_eq!(config.slugs.max_probe, 1000);
        assert_eq!(config.storage.backend, StorageBackend::Filesystem);
        assert!(config.media.allows("image/JPG"));
        assert!(!config.media.allows("application/pdf"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[storage]
backend = "memory"

[media]
max_upload_bytes = 2048
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.public_base_url, "/storage");
        assert_eq!(config.media.max_upload_bytes, 2048);
        assert_eq!(config.media.allowed_mime_types.len(), 5);
        assert_eq!(config.database.path, "keepsake.db");
    }

    #[test]
    fn rejects_zero_upload_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[media]\nmax_upload_bytes = 0").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_malformed_mime() {
        let mut config = Config::default();
        config.media.allowed_mime_types = vec!["png".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn probe_bound_keeps_slugs_short() {
        let mut config = Config::default();
        config.slugs.max_probe = slug::MAX_PROBE;
        config.validate().unwrap();

        config.slugs.max_probe = 1_000_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_path_errors() {
        let missing = Path::new("/nonexistent/keepsake.toml");
        assert!(load_config_or_default(Some(missing)).is_err());
    }
}
