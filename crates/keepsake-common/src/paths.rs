//! Path utilities for upload filenames.
//!
//! Uploaded files keep only their extension; the rest of the stored name is
//! generated.

use std::path::Path;

/// Lowercased extension of a client-supplied filename.
///
/// Returns `None` when the name has no extension or the extension contains
/// anything other than ASCII alphanumerics.
///
/// # Examples
///
/// ```
/// use keepsake_common::paths::file_extension;
///
/// assert_eq!(file_extension("Boda.JPG").as_deref(), Some("jpg"));
/// assert_eq!(file_extension("notes"), None);
/// ```
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}

/// Final component of a client-supplied filename, with any directories
/// stripped.
pub fn display_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename)
        .to_string()
}
