//! Theme catalog: system themes plus user themes with optional background
//! images.
//!
//! Background images are ordinary media in the `themes` namespace; replacing
//! or dropping one goes through [`MediaRegistry::delete`](crate::media::MediaRegistry::delete)
//! so a background still used elsewhere survives.

use keepsake_common::{Actor, Error, MediaId, MediaNamespace, Result, ThemeId, UserId};
use keepsake_db::models::{Media, NewTheme, Theme, ThemeChanges};
use keepsake_db::queries::{media as media_q, themes};

use crate::context::AppContext;
use crate::media::{MediaDeletion, Upload};

pub struct ThemeCatalog<'a> {
    ctx: &'a AppContext,
}

impl<'a> ThemeCatalog<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Users may only change their own themes; system themes are read-only.
    pub fn can_modify(actor: Actor, theme: &Theme) -> bool {
        !theme.is_system() && theme.owner_user_id == Some(actor.id)
    }

    /// System themes first, then the user's own, each by ID.
    pub fn list_available(&self, user: UserId) -> Result<Vec<Theme>> {
        let conn = self.ctx.conn()?;
        themes::list_available_themes(&conn, user)
    }

    /// A theme `user` may read. Other users' themes are reported as missing.
    pub fn find_accessible(&self, theme_id: ThemeId, user: UserId) -> Result<Theme> {
        let conn = self.ctx.conn()?;
        themes::get_theme(&conn, theme_id)?
            .filter(|t| t.is_visible_to(user))
            .ok_or_else(|| Error::not_found("theme", theme_id))
    }

    /// Create a theme owned by `actor`, uploading `background` first if given.
    pub fn create(&self, actor: Actor, data: NewTheme, background: Option<&Upload>) -> Result<Theme> {
        let bg = self.upload_background(actor, background)?;

        let inserted = self.ctx.conn().and_then(|conn| {
            themes::insert_theme(
                &conn,
                Some(actor.id),
                &data,
                bg.as_ref().map(|m| (m.id, m.public_url.as_str())),
            )
        });

        match inserted {
            Ok(theme) => {
                tracing::info!("Created theme {} for user {}", theme.id, actor.id);
                Ok(theme)
            }
            Err(e) => {
                if let Some(media) = bg {
                    self.discard_background(media.id);
                }
                Err(e)
            }
        }
    }

    /// Update a user theme. A new `background` replaces the old one, which
    /// is deleted unless something else still uses it.
    ///
    /// # Errors
    ///
    /// * `NotFound` - no such theme
    /// * `Forbidden` - system theme, or owned by someone else
    pub fn update(
        &self,
        theme_id: ThemeId,
        changes: ThemeChanges,
        actor: Actor,
        background: Option<&Upload>,
    ) -> Result<Theme> {
        let mut theme = self.load_modifiable(theme_id, actor, "modified")?;

        let bg = self.upload_background(actor, background)?;
        let old_bg = theme.bg_image_media_id;

        changes.apply(&mut theme);
        if let Some(media) = &bg {
            theme.bg_image_media_id = Some(media.id);
            theme.bg_image_url = Some(media.public_url.clone());
        }

        let updated = self
            .ctx
            .conn()
            .and_then(|conn| themes::update_theme(&conn, &theme));
        match updated {
            Ok(true) => {}
            Ok(false) => {
                if let Some(media) = bg {
                    self.discard_background(media.id);
                }
                return Err(Error::not_found("theme", theme_id));
            }
            Err(e) => {
                if let Some(media) = bg {
                    self.discard_background(media.id);
                }
                return Err(e);
            }
        }

        if let (Some(_), Some(old)) = (&bg, old_bg) {
            self.discard_background(old);
        }

        tracing::info!("Updated theme {}", theme.id);
        Ok(theme)
    }

    /// Delete a user theme that no landing uses, then its background.
    ///
    /// # Errors
    ///
    /// * `NotFound` - no such theme
    /// * `Forbidden` - system theme, or owned by someone else
    /// * `Conflict` - landings still use the theme
    pub fn delete(&self, theme_id: ThemeId, actor: Actor) -> Result<()> {
        let theme = self.load_modifiable(theme_id, actor, "deleted")?;

        {
            let conn = self.ctx.conn()?;
            let in_use = themes::count_landings_using(&conn, theme_id)?;
            if in_use > 0 {
                return Err(Error::Conflict(format!(
                    "theme {theme_id} is used by {in_use} landing(s)"
                )));
            }
            themes::delete_theme(&conn, theme_id)?;
        }

        if let Some(bg) = theme.bg_image_media_id {
            self.discard_background(bg);
        }

        tracing::info!("Deleted theme {} for user {}", theme_id, actor.id);
        Ok(())
    }

    fn load_modifiable(&self, theme_id: ThemeId, actor: Actor, verb: &str) -> Result<Theme> {
        let conn = self.ctx.conn()?;
        let theme =
            themes::get_theme(&conn, theme_id)?.ok_or_else(|| Error::not_found("theme", theme_id))?;

        if theme.is_system() {
            return Err(Error::forbidden(format!("system themes cannot be {verb}")));
        }
        if !Self::can_modify(actor, &theme) {
            return Err(Error::forbidden(format!("you cannot modify theme {theme_id}")));
        }
        Ok(theme)
    }

    fn upload_background(&self, actor: Actor, background: Option<&Upload>) -> Result<Option<Media>> {
        background
            .map(|upload| self.ctx.media().upload(upload, actor.id, MediaNamespace::Themes))
            .transpose()
    }

    /// Best-effort removal of a background, acting as the media's own owner.
    fn discard_background(&self, media_id: MediaId) {
        let owner = match self
            .ctx
            .conn()
            .and_then(|conn| media_q::get_media(&conn, media_id))
        {
            Ok(Some(media)) => media.owner_user_id,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Failed to load background {}: {}", media_id, e);
                return;
            }
        };

        match self.ctx.media().delete(media_id, Actor::new(owner)) {
            Ok(MediaDeletion::Deleted) => tracing::debug!("Removed background {}", media_id),
            Ok(outcome) => tracing::debug!("Kept background {} ({:?})", media_id, outcome),
            Err(e) => tracing::warn!("Failed to delete background {}: {}", media_id, e),
        }
    }
}
