//! Landing catalog: creation, update, deletion, and public projection of
//! landing pages.

use chrono::NaiveDate;
use keepsake_common::{Actor, Error, LandingId, MediaId, Result, ThemeId, UserId};
use keepsake_db::models::{AttachedMedia, Landing, Media, NewLanding, Theme};
use keepsake_db::queries::{landing_media, landings, themes};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::ledger::load_modifiable_landing as load_owned;
use crate::slug;

const FALLBACK_SLUG: &str = "landing";

/// Fields for a new landing.
#[derive(Debug, Clone, Deserialize)]
pub struct LandingInput {
    pub theme_id: ThemeId,
    /// Generated from `couple_names` when absent or empty.
    #[serde(default)]
    pub slug: Option<String>,
    pub couple_names: String,
    pub anniversary_date: NaiveDate,
    #[serde(default)]
    pub bio_text: Option<String>,
}

/// Partial landing update. Absent fields are left alone; an empty
/// `bio_text` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LandingChanges {
    pub theme_id: Option<ThemeId>,
    pub slug: Option<String>,
    pub couple_names: Option<String>,
    pub anniversary_date: Option<NaiveDate>,
    pub bio_text: Option<String>,
}

/// A landing with its theme and gallery resolved, as seen by its owner.
#[derive(Debug, Clone, Serialize)]
pub struct LandingDetail {
    #[serde(flatten)]
    pub landing: Landing,
    pub theme: Theme,
    pub media: Vec<AttachedMedia>,
}

/// Theme fields exposed on public pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicTheme {
    pub id: ThemeId,
    pub name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub bg_color: String,
    pub bg_image_url: Option<String>,
    pub css_class: String,
}

impl From<&Theme> for PublicTheme {
    fn from(theme: &Theme) -> Self {
        Self {
            id: theme.id,
            name: theme.name.clone(),
            primary_color: theme.primary_color.clone(),
            secondary_color: theme.secondary_color.clone(),
            bg_color: theme.bg_color.clone(),
            bg_image_url: theme.bg_image_url.clone(),
            css_class: theme.css_class.clone(),
        }
    }
}

/// Media fields exposed on public pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicMedia {
    pub id: MediaId,
    pub filename: String,
    pub url: String,
    pub mime_type: String,
}

impl From<&Media> for PublicMedia {
    fn from(media: &Media) -> Self {
        Self {
            id: media.id,
            filename: media.filename.clone(),
            url: media.public_url.clone(),
            mime_type: media.mime_type.clone(),
        }
    }
}

/// Unauthenticated view of a landing. Carries no owner or storage details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicLanding {
    pub id: LandingId,
    pub theme: PublicTheme,
    pub slug: String,
    pub couple_names: String,
    pub anniversary_date: NaiveDate,
    pub bio_text: Option<String>,
    pub media: Vec<PublicMedia>,
}

pub struct LandingCatalog<'a> {
    ctx: &'a AppContext,
}

impl<'a> LandingCatalog<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Create a landing owned by `owner`.
    ///
    /// # Errors
    ///
    /// * `Validation` - supplied slug breaks the charset or length rule
    /// * `DuplicateSlug` - owner already has a landing with that slug
    /// * `NotFound` / `Forbidden` - theme missing or owned by someone else
    pub fn create(&self, owner: Actor, input: LandingInput) -> Result<LandingDetail> {
        let mut conn = self.ctx.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::database)?;

        let theme = resolve_theme(&tx, input.theme_id, owner.id)?;

        let slug = match input.slug.filter(|s| !s.is_empty()) {
            Some(slug) => {
                slug::validate_slug(&slug)?;
                if landings::slug_exists_for_owner(&tx, owner.id, &slug, None)? {
                    return Err(Error::DuplicateSlug(slug));
                }
                slug
            }
            None => self.unique_slug(&tx, &input.couple_names, owner.id)?,
        };

        let landing = landings::insert_landing(
            &tx,
            &NewLanding {
                owner_user_id: owner.id,
                theme_id: theme.id,
                slug,
                couple_names: input.couple_names,
                anniversary_date: input.anniversary_date,
                bio_text: input.bio_text.filter(|b| !b.is_empty()),
            },
        )?;
        tx.commit().map_err(Error::database)?;

        tracing::info!(
            "Created landing {} ({}) for user {}",
            landing.id,
            landing.slug,
            owner.id
        );
        detail(&conn, landing, theme)
    }

    /// Apply `changes` to a landing owned by `actor`.
    pub fn update(
        &self,
        landing_id: LandingId,
        changes: LandingChanges,
        actor: Actor,
    ) -> Result<LandingDetail> {
        let mut conn = self.ctx.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::database)?;

        let mut landing = load_owned(&tx, landing_id, actor)?;

        if let Some(slug) = changes.slug.filter(|s| *s != landing.slug) {
            slug::validate_slug(&slug)?;
            if landings::slug_exists_for_owner(&tx, landing.owner_user_id, &slug, Some(landing.id))? {
                return Err(Error::DuplicateSlug(slug));
            }
            landing.slug = slug;
        }

        let theme = match changes.theme_id {
            Some(theme_id) if theme_id != landing.theme_id => {
                let theme = resolve_theme(&tx, theme_id, landing.owner_user_id)?;
                landing.theme_id = theme.id;
                theme
            }
            _ => themes::get_theme(&tx, landing.theme_id)?
                .ok_or_else(|| Error::not_found("theme", landing.theme_id))?,
        };

        if let Some(names) = changes.couple_names {
            landing.couple_names = names;
        }
        if let Some(date) = changes.anniversary_date {
            landing.anniversary_date = date;
        }
        if let Some(bio) = changes.bio_text {
            landing.bio_text = Some(bio).filter(|b| !b.is_empty());
        }

        landings::update_landing(&tx, &landing)?;
        tx.commit().map_err(Error::database)?;

        tracing::info!("Updated landing {}", landing.id);
        detail(&conn, landing, theme)
    }

    /// Delete a landing and its gallery links. Media rows are kept.
    pub fn delete(&self, landing_id: LandingId, actor: Actor) -> Result<()> {
        let conn = self.ctx.conn()?;
        load_owned(&conn, landing_id, actor)?;
        landings::delete_landing(&conn, landing_id)?;
        tracing::info!("Deleted landing {}", landing_id);
        Ok(())
    }

    /// Public view by numeric ID or slug. When several owners share a slug
    /// the oldest landing wins.
    pub fn get_public(&self, id_or_slug: &str) -> Result<PublicLanding> {
        let conn = self.ctx.conn()?;
        let found = match id_or_slug.parse::<i64>() {
            Ok(id) => landings::get_landing(&conn, LandingId::from(id))?,
            Err(_) => landings::get_landing_by_slug(&conn, id_or_slug)?,
        };
        let landing = found.ok_or_else(|| Error::not_found("landing", id_or_slug))?;

        let theme = themes::get_theme(&conn, landing.theme_id)?
            .ok_or_else(|| Error::not_found("theme", landing.theme_id))?;
        let media = landing_media::list_attached_media(&conn, landing.id)?;

        Ok(PublicLanding {
            id: landing.id,
            theme: PublicTheme::from(&theme),
            slug: landing.slug,
            couple_names: landing.couple_names,
            anniversary_date: landing.anniversary_date,
            bio_text: landing.bio_text,
            media: media.iter().map(|m| PublicMedia::from(&m.media)).collect(),
        })
    }

    /// Landing owned by `actor`, with theme and gallery.
    pub fn get_for_owner(&self, landing_id: LandingId, actor: Actor) -> Result<LandingDetail> {
        let conn = self.ctx.conn()?;
        let landing = load_owned(&conn, landing_id, actor)?;
        let theme = themes::get_theme(&conn, landing.theme_id)?
            .ok_or_else(|| Error::not_found("theme", landing.theme_id))?;
        detail(&conn, landing, theme)
    }

    /// All of a user's landings, newest first.
    pub fn list_for_owner(&self, owner: UserId) -> Result<Vec<LandingDetail>> {
        let conn = self.ctx.conn()?;
        landings::list_landings_for_owner(&conn, owner)?
            .into_iter()
            .map(|landing| {
                let theme = themes::get_theme(&conn, landing.theme_id)?
                    .ok_or_else(|| Error::not_found("theme", landing.theme_id))?;
                detail(&conn, landing, theme)
            })
            .collect()
    }

    /// Slug derived from `couple_names` that is free for `owner`.
    pub fn generate_slug(&self, couple_names: &str, owner: UserId) -> Result<String> {
        let conn = self.ctx.conn()?;
        self.unique_slug(&conn, couple_names, owner)
    }

    fn unique_slug(&self, conn: &Connection, source: &str, owner: UserId) -> Result<String> {
        slug::generate_unique(source, FALLBACK_SLUG, self.ctx.config.slugs.max_probe, |s| {
            landings::slug_exists_for_owner(conn, owner, s, None)
        })
    }
}

/// A theme the owner may build a landing on: a system theme or their own.
fn resolve_theme(conn: &Connection, theme_id: ThemeId, owner: UserId) -> Result<Theme> {
    let theme =
        themes::get_theme(conn, theme_id)?.ok_or_else(|| Error::not_found("theme", theme_id))?;
    if !theme.is_visible_to(owner) {
        return Err(Error::forbidden(format!("theme {theme_id} belongs to another user")));
    }
    Ok(theme)
}

fn detail(conn: &Connection, landing: Landing, theme: Theme) -> Result<LandingDetail> {
    let media = landing_media::list_attached_media(conn, landing.id)?;
    Ok(LandingDetail {
        landing,
        theme,
        media,
    })
}
