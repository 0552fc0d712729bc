//! URL slugs for landings and invitations.
//!
//! Slugs are lowercase ASCII letters, digits and single hyphens, at most
//! [`MAX_SLUG_LEN`] characters, and unique per owner.

use keepsake_common::{Error, Result, MAX_SLUG_LEN};

/// Length a generated base slug is cut to, leaving room for a `-N` suffix.
pub const BASE_SLUG_LEN: usize = 40;

/// Largest probe bound whose `-N` suffix still fits in [`MAX_SLUG_LEN`].
pub const MAX_PROBE: u32 = 100_000_000;

/// Reduce free text to a slug base.
///
/// # Steps
/// - Transliterate Unicode to ASCII with `deunicode` ("Ñandú" → "Nandu").
/// - Lowercase; every run of other characters becomes one `-`.
/// - Trim hyphens from both ends, cut to [`BASE_SLUG_LEN`], trim again.
///
/// May return an empty string; callers pick a fallback.
pub fn slugify(value: &str) -> String {
    let transliterated = deunicode::deunicode(value);
    let mut out = String::with_capacity(transliterated.len());
    let mut pending_hyphen = false;

    for ch in transliterated.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    out.truncate(BASE_SLUG_LEN);
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Whether `slug` satisfies the charset and length rules.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// [`is_valid_slug`] as a `Validation` error.
pub fn validate_slug(slug: &str) -> Result<()> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "slug must be 1-{MAX_SLUG_LEN} characters of a-z, 0-9 and '-': {slug:?}"
        )))
    }
}

/// Derive a slug from `source` that `taken` reports as free.
///
/// Tries `base`, then `base-1`, `base-2`, ... up to `base-{max_probe}`,
/// with `max_probe` capped at [`MAX_PROBE`]. An empty base falls back to
/// `fallback`.
pub fn generate_unique<F>(source: &str, fallback: &str, max_probe: u32, mut taken: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    let mut base = slugify(source);
    if base.is_empty() {
        base = fallback.to_string();
    }

    if !taken(&base)? {
        return Ok(base);
    }

    let max_probe = max_probe.min(MAX_PROBE);
    for n in 1..=max_probe {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate)? {
            tracing::debug!("Slug {} taken, using {}", base, candidate);
            return Ok(candidate);
        }
    }

    Err(Error::internal(format!(
        "no free slug for {base:?} after {max_probe} attempts"
    )))
}
