//! Core type definitions shared by the catalogs and the database layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of media attached to a single landing.
pub const MAX_LANDING_MEDIA: usize = 20;

/// Maximum length of a landing or invitation slug.
pub const MAX_SLUG_LEN: usize = 50;

/// Default upload size limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Image MIME types accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageMime {
    /// Canonical MIME string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Preferred file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }

    /// All MIME strings accepted by default, including the `image/jpg` alias.
    pub fn default_allow_list() -> Vec<String> {
        ["image/jpeg", "image/jpg", "image/png", "image/webp", "image/gif"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageMime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // `image/jpg` is non-standard but still sent by some clients.
            "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/webp" => Ok(Self::Webp),
            "image/gif" => Ok(Self::Gif),
            other => Err(format!("Unsupported image type: {}", other)),
        }
    }
}

/// Storage namespace a media blob is written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaNamespace {
    /// Gallery media for landings and invitations.
    Users,
    /// Theme background images.
    Themes,
}

impl MediaNamespace {
    /// Directory prefix for the given owner, e.g. `media/users/4`.
    pub fn prefix(&self, owner: impl fmt::Display) -> String {
        match self {
            Self::Users => format!("media/users/{}", owner),
            Self::Themes => format!("media/themes/{}", owner),
        }
    }
}

impl fmt::Display for MediaNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Users => write!(f, "users"),
            Self::Themes => write!(f, "themes"),
        }
    }
}
