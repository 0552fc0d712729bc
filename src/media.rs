//! Media registry: upload, lookup, and guarded deletion of media assets.
//!
//! Uploads write the blob first and then register the row; deletion removes
//! the row first and then the blob. A row never points at a blob that was
//! never written.

use std::path::Path;

use anyhow::Context;
use keepsake_common::paths::{display_name, file_extension};
use keepsake_common::{Actor, Error, ImageMime, MediaId, MediaNamespace, Result, UserId};
use keepsake_db::models::{Media, NewMedia};
use keepsake_db::queries::media as media_q;
use rusqlite::TransactionBehavior;
use serde::Serialize;
use uuid::Uuid;

use crate::context::AppContext;

/// A file handed in by a caller.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied file name; only its final component and extension are kept.
    pub filename: String,
    /// MIME type declared by the client, if any.
    pub declared_mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            declared_mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Read a local file into an upload.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::new(path.to_string_lossy(), bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Image type detected from the content. Declared types and file
    /// extensions are never trusted for this.
    pub fn sniffed_mime(&self) -> Option<&'static str> {
        image::guess_format(&self.bytes)
            .ok()
            .map(|format| format.to_mime_type())
    }

    /// Type the client claims: the declared type, else a guess from the
    /// file extension. Only used to report rejected uploads.
    pub fn claimed_mime(&self) -> String {
        if let Some(declared) = self
            .declared_mime
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
        {
            return declared.to_ascii_lowercase();
        }

        file_extension(&self.filename)
            .and_then(|ext| mime_guess::from_ext(&ext).first())
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

/// Outcome of [`MediaRegistry::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaDeletion {
    /// Row and blob are gone.
    Deleted,
    /// No media with that ID.
    NotFound,
    /// The media belongs to someone else.
    NotOwner,
    /// Still attached to a theme, landing, or invitation.
    InUse,
}

impl MediaDeletion {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Owns media rows and their blobs.
pub struct MediaRegistry<'a> {
    ctx: &'a AppContext,
}

impl<'a> MediaRegistry<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Validate, store, and register an upload for `owner`.
    ///
    /// # Errors
    ///
    /// * `PayloadTooLarge` - larger than `media.max_upload_bytes`
    /// * `UnsupportedMediaType` - content does not sniff as an image, or the
    ///   sniffed type is not on the allow-list
    /// * `Storage` / `Io` / `Database` - the blob or row could not be written
    pub fn upload(&self, upload: &Upload, owner: UserId, namespace: MediaNamespace) -> Result<Media> {
        let limits = &self.ctx.config.media;

        let size = upload.size();
        if size > limits.max_upload_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                max: limits.max_upload_bytes,
            });
        }

        let Some(sniffed) = upload.sniffed_mime() else {
            let claimed = upload.claimed_mime();
            tracing::debug!(
                "Rejected {}: content is not a recognised image (claimed {})",
                upload.filename,
                claimed
            );
            return Err(Error::UnsupportedMediaType(claimed));
        };
        if !limits.allows(sniffed) {
            return Err(Error::UnsupportedMediaType(sniffed.to_string()));
        }
        let image_mime = sniffed
            .parse::<ImageMime>()
            .map_err(|_| Error::UnsupportedMediaType(sniffed.to_string()))?;

        let mime = image_mime.as_str().to_string();
        let name = format!("{}.{}", Uuid::new_v4(), image_mime.extension());

        let storage_path = self
            .ctx
            .store
            .put(&namespace.prefix(owner), &name, &upload.bytes)?;

        let new_media = NewMedia {
            owner_user_id: owner,
            filename: display_name(&upload.filename),
            public_url: self.ctx.store.url_for(&storage_path),
            storage_path,
            mime_type: mime,
            byte_size: upload.bytes.len() as i64,
        };

        let registered = self
            .ctx
            .conn()
            .and_then(|conn| media_q::insert_media(&conn, &new_media));

        match registered {
            Ok(media) => {
                tracing::info!(
                    "Uploaded media {} ({}, {} bytes) for user {}",
                    media.id,
                    media.mime_type,
                    media.byte_size,
                    owner
                );
                Ok(media)
            }
            Err(e) => {
                if let Err(cleanup) = self.ctx.store.delete(&new_media.storage_path) {
                    tracing::warn!(
                        "Orphaned blob {} after failed registration: {}",
                        new_media.storage_path,
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    /// Delete a media row and its blob if `actor` owns it and nothing
    /// references it.
    ///
    /// Soft outcomes are reported through [`MediaDeletion`]; only storage or
    /// database failures return `Err`.
    pub fn delete(&self, media_id: MediaId, actor: Actor) -> Result<MediaDeletion> {
        let media = {
            let mut conn = self.ctx.conn()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(Error::database)?;

            let Some(media) = media_q::get_media(&tx, media_id)? else {
                tracing::debug!("Media {} not found for deletion", media_id);
                return Ok(MediaDeletion::NotFound);
            };

            if !media.is_owned_by(actor.id) {
                tracing::debug!("User {} does not own media {}", actor.id, media_id);
                return Ok(MediaDeletion::NotOwner);
            }

            let refs = media_q::reference_counts(&tx, media_id)?;
            if refs.is_referenced() {
                tracing::debug!("Media {} still in use ({} references)", media_id, refs.total());
                return Ok(MediaDeletion::InUse);
            }

            if !media_q::delete_media(&tx, media_id)? {
                return Ok(MediaDeletion::NotFound);
            }
            tx.commit().map_err(Error::database)?;
            media
        };

        match self.ctx.store.delete(&media.storage_path) {
            Ok(true) => {}
            Ok(false) => tracing::debug!("Blob {} was already missing", media.storage_path),
            Err(e) => tracing::warn!("Failed to delete blob {}: {}", media.storage_path, e),
        }

        tracing::info!("Deleted media {} for user {}", media_id, actor.id);
        Ok(MediaDeletion::Deleted)
    }

    /// Whether any theme background, landing, or invitation references the media.
    pub fn is_in_use(&self, media_id: MediaId) -> Result<bool> {
        let conn = self.ctx.conn()?;
        Ok(media_q::reference_counts(&conn, media_id)?.is_referenced())
    }

    /// Whether the media exists and belongs to `user`.
    pub fn ownership_check(&self, media_id: MediaId, user: UserId) -> Result<bool> {
        let conn = self.ctx.conn()?;
        Ok(media_q::get_media(&conn, media_id)?.is_some_and(|m| m.is_owned_by(user)))
    }

    pub fn get(&self, media_id: MediaId) -> Result<Media> {
        let conn = self.ctx.conn()?;
        media_q::get_media(&conn, media_id)?.ok_or_else(|| Error::not_found("media", media_id))
    }

    /// A user's media, newest first, optionally filtered by MIME prefix.
    pub fn list_for_owner(&self, owner: UserId, mime_prefix: Option<&str>) -> Result<Vec<Media>> {
        let conn = self.ctx.conn()?;
        media_q::list_media_for_owner(&conn, owner, mime_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MediaStore;
    use crate::test_support::{context, png, user};
    use assert_matches::assert_matches;

    #[test]
    fn sniffed_type_wins_over_declared() {
        let upload = Upload::new("photo.jpg", png()).with_mime("image/jpeg");
        assert_eq!(upload.sniffed_mime(), Some("image/png"));
    }

    #[test]
    fn claimed_type_from_declared_then_extension() {
        let declared = Upload::new("blob", b"not an image".to_vec()).with_mime("Image/JPG");
        assert_eq!(declared.sniffed_mime(), None);
        assert_eq!(declared.claimed_mime(), "image/jpg");

        let guessed = Upload::new("notes.txt", b"plain".to_vec());
        assert_eq!(guessed.claimed_mime(), "text/plain");

        let unknown = Upload::new("noext", b"plain".to_vec());
        assert_eq!(unknown.claimed_mime(), "application/octet-stream");
    }

    #[test]
    fn content_that_is_not_an_image_is_rejected() {
        let (ctx, store) = context();
        let owner = user(&ctx, "ana");

        let html = Upload::new("evil.html", b"<script>alert(1)</script>".to_vec())
            .with_mime("image/png");
        assert_matches!(
            ctx.media().upload(&html, owner, MediaNamespace::Users),
            Err(Error::UnsupportedMediaType(claimed)) if claimed == "image/png"
        );

        let text = Upload::new("notes.png", b"just some text".to_vec());
        assert_matches!(
            ctx.media().upload(&text, owner, MediaNamespace::Users),
            Err(Error::UnsupportedMediaType(_))
        );

        let empty = Upload::new("empty.png", Vec::new()).with_mime("image/png");
        assert_matches!(
            ctx.media().upload(&empty, owner, MediaNamespace::Users),
            Err(Error::UnsupportedMediaType(_))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn stored_extension_follows_content() {
        let (ctx, _store) = context();
        let owner = user(&ctx, "ana");

        let media = ctx
            .media()
            .upload(&Upload::new("photo.html", png()), owner, MediaNamespace::Users)
            .unwrap();
        assert_eq!(media.mime_type, "image/png");
        assert!(media.storage_path.ends_with(".png"));
        assert_eq!(media.filename, "photo.html");
    }

    #[test]
    fn upload_stores_blob_and_row() {
        let (ctx, store) = context();
        let owner = user(&ctx, "ana");

        let media = ctx
            .media()
            .upload(&Upload::new("dir/Boda.PNG", png()), owner, MediaNamespace::Users)
            .unwrap();

        assert_eq!(media.filename, "Boda.PNG");
        assert_eq!(media.mime_type, "image/png");
        assert!(media.storage_path.starts_with(&format!("media/users/{owner}/")));
        assert!(media.storage_path.ends_with(".png"));
        assert_eq!(media.public_url, format!("/storage/{}", media.storage_path));
        assert_eq!(store.get(&media.storage_path).unwrap(), png());
    }

    #[test]
    fn extension_falls_back_to_mime() {
        let (ctx, _store) = context();
        let owner = user(&ctx, "ana");

        let media = ctx
            .media()
            .upload(&Upload::new("background", png()), owner, MediaNamespace::Themes)
            .unwrap();
        assert!(media.storage_path.starts_with(&format!("media/themes/{owner}/")));
        assert!(media.storage_path.ends_with(".png"));
    }

    #[test]
    fn rejects_disallowed_type() {
        let (ctx, store) = context();
        let owner = user(&ctx, "ana");

        let err = ctx
            .media()
            .upload(&Upload::new("doc.pdf", b"%PDF-1.4".to_vec()), owner, MediaNamespace::Users)
            .unwrap_err();
        assert_matches!(err, Error::UnsupportedMediaType(_));
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_oversized_upload() {
        let (ctx, store) = context();
        let owner = user(&ctx, "ana");
        let mut bytes = png();
        bytes.resize(ctx.config.media.max_upload_bytes as usize + 1, 0);

        let err = ctx
            .media()
            .upload(&Upload::new("big.png", bytes), owner, MediaNamespace::Users)
            .unwrap_err();
        assert_matches!(err, Error::PayloadTooLarge { .. });
        assert!(store.is_empty());
    }

    #[test]
    fn failed_registration_removes_blob() {
        let (ctx, store) = context();

        // No such user: the owner foreign key rejects the row.
        let err = ctx
            .media()
            .upload(&Upload::new("a.png", png()), UserId::from(999), MediaNamespace::Users)
            .unwrap_err();
        assert_eq!(err.kind(), keepsake_common::ErrorKind::InternalError);
        assert!(store.is_empty());
    }

    #[test]
    fn delete_outcomes() {
        let (ctx, store) = context();
        let ana = user(&ctx, "ana");
        let luis = user(&ctx, "luis");
        let media = ctx
            .media()
            .upload(&Upload::new("a.png", png()), ana, MediaNamespace::Users)
            .unwrap();

        let registry = ctx.media();
        assert_eq!(
            registry.delete(MediaId::from(404), Actor::new(ana)).unwrap(),
            MediaDeletion::NotFound
        );
        assert_eq!(
            registry.delete(media.id, Actor::new(luis)).unwrap(),
            MediaDeletion::NotOwner
        );
        assert!(registry.ownership_check(media.id, ana).unwrap());
        assert!(!registry.ownership_check(media.id, luis).unwrap());

        let outcome = registry.delete(media.id, Actor::new(ana)).unwrap();
        assert!(outcome.is_deleted());
        assert!(store.is_empty());
        assert_matches!(registry.get(media.id), Err(Error::NotFound { .. }));
    }

    #[test]
    fn delete_tolerates_missing_blob() {
        let (ctx, store) = context();
        let ana = user(&ctx, "ana");
        let media = ctx
            .media()
            .upload(&Upload::new("a.png", png()), ana, MediaNamespace::Users)
            .unwrap();
        store.delete(&media.storage_path).unwrap();

        assert_eq!(
            ctx.media().delete(media.id, Actor::new(ana)).unwrap(),
            MediaDeletion::Deleted
        );
    }

    #[test]
    fn list_filters_by_prefix() {
        let (ctx, _store) = context();
        let ana = user(&ctx, "ana");
        ctx.media()
            .upload(&Upload::new("a.png", png()), ana, MediaNamespace::Users)
            .unwrap();

        assert_eq!(ctx.media().list_for_owner(ana, Some("image/")).unwrap().len(), 1);
        assert!(ctx.media().list_for_owner(ana, Some("video/")).unwrap().is_empty());
    }
}
