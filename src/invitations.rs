//! Invitation catalog.
//!
//! Invitations follow the landing rules for slugs and ownership. Their media
//! links are managed by the [`AssociationLedger`](crate::ledger::AssociationLedger).

use keepsake_common::{Actor, Error, InvitationId, Result, UserId};
use keepsake_db::models::{Invitation, Media, NewInvitation};
use keepsake_db::queries::{invitation_media, invitations};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::landings::PublicMedia;
use crate::slug;

const FALLBACK_SLUG: &str = "invitation";

pub const DEFAULT_YES_MESSAGE: &str = "Sí";

pub const DEFAULT_NO_MESSAGES: [&str; 4] = ["No", "Tal vez", "No te arrepentirás", "Piénsalo mejor"];

fn default_no_messages() -> Vec<String> {
    DEFAULT_NO_MESSAGES.iter().map(|s| s.to_string()).collect()
}

/// Fields for a new invitation. Missing messages get the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvitationInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub yes_message: Option<String>,
    #[serde(default)]
    pub no_messages: Option<Vec<String>>,
    #[serde(default)]
    pub is_published: bool,
}

/// Partial invitation update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvitationChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub yes_message: Option<String>,
    pub no_messages: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

/// An invitation with its media, as seen by its owner.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationDetail {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub media: Vec<Media>,
}

/// Unauthenticated view of a published invitation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicInvitation {
    pub id: InvitationId,
    pub title: String,
    pub slug: String,
    pub yes_message: String,
    pub no_messages: Vec<String>,
    pub media: Vec<PublicMedia>,
}

pub struct InvitationCatalog<'a> {
    ctx: &'a AppContext,
}

impl<'a> InvitationCatalog<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    pub fn can_modify(invitation: &Invitation, actor: Actor) -> bool {
        invitation.owner_user_id == actor.id
    }

    /// Create an invitation owned by `owner`.
    ///
    /// # Errors
    ///
    /// * `Validation` - supplied slug breaks the charset or length rule
    /// * `DuplicateSlug` - owner already has an invitation with that slug
    pub fn create(&self, owner: Actor, input: InvitationInput) -> Result<InvitationDetail> {
        let mut conn = self.ctx.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::database)?;

        let slug = match input.slug.filter(|s| !s.is_empty()) {
            Some(slug) => {
                slug::validate_slug(&slug)?;
                if invitations::slug_exists_for_owner(&tx, owner.id, &slug, None)? {
                    return Err(Error::DuplicateSlug(slug));
                }
                slug
            }
            None => slug::generate_unique(
                &input.title,
                FALLBACK_SLUG,
                self.ctx.config.slugs.max_probe,
                |s| invitations::slug_exists_for_owner(&tx, owner.id, s, None),
            )?,
        };

        let invitation = invitations::insert_invitation(
            &tx,
            &NewInvitation {
                owner_user_id: owner.id,
                title: input.title,
                slug,
                yes_message: input
                    .yes_message
                    .unwrap_or_else(|| DEFAULT_YES_MESSAGE.to_string()),
                no_messages: input
                    .no_messages
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(default_no_messages),
                is_published: input.is_published,
            },
        )?;
        tx.commit().map_err(Error::database)?;

        tracing::info!(
            "Created invitation {} ({}) for user {}",
            invitation.id,
            invitation.slug,
            owner.id
        );
        Ok(InvitationDetail {
            invitation,
            media: Vec::new(),
        })
    }

    /// Apply `changes` to an invitation owned by `actor`.
    pub fn update(
        &self,
        invitation_id: InvitationId,
        changes: InvitationChanges,
        actor: Actor,
    ) -> Result<InvitationDetail> {
        let mut conn = self.ctx.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::database)?;

        let mut invitation = load_owned(&tx, invitation_id, actor)?;

        if let Some(slug) = changes.slug.filter(|s| *s != invitation.slug) {
            slug::validate_slug(&slug)?;
            if invitations::slug_exists_for_owner(
                &tx,
                invitation.owner_user_id,
                &slug,
                Some(invitation.id),
            )? {
                return Err(Error::DuplicateSlug(slug));
            }
            invitation.slug = slug;
        }
        if let Some(title) = changes.title {
            invitation.title = title;
        }
        if let Some(yes) = changes.yes_message {
            invitation.yes_message = yes;
        }
        if let Some(no) = changes.no_messages {
            invitation.no_messages = no;
        }
        if let Some(published) = changes.is_published {
            invitation.is_published = published;
        }

        invitations::update_invitation(&tx, &invitation)?;
        tx.commit().map_err(Error::database)?;

        tracing::info!("Updated invitation {}", invitation.id);
        let media = invitation_media::list_media(&conn, invitation.id)?;
        Ok(InvitationDetail { invitation, media })
    }

    /// Delete an invitation and its media links. Media rows are kept.
    pub fn delete(&self, invitation_id: InvitationId, actor: Actor) -> Result<()> {
        let conn = self.ctx.conn()?;
        load_owned(&conn, invitation_id, actor)?;
        invitations::delete_invitation(&conn, invitation_id)?;
        tracing::info!("Deleted invitation {}", invitation_id);
        Ok(())
    }

    pub fn get_for_owner(&self, invitation_id: InvitationId, actor: Actor) -> Result<InvitationDetail> {
        let conn = self.ctx.conn()?;
        let invitation = load_owned(&conn, invitation_id, actor)?;
        let media = invitation_media::list_media(&conn, invitation.id)?;
        Ok(InvitationDetail { invitation, media })
    }

    /// All of a user's invitations, newest first.
    pub fn list_for_owner(&self, owner: UserId) -> Result<Vec<InvitationDetail>> {
        let conn = self.ctx.conn()?;
        invitations::list_invitations_for_owner(&conn, owner)?
            .into_iter()
            .map(|invitation| {
                let media = invitation_media::list_media(&conn, invitation.id)?;
                Ok(InvitationDetail { invitation, media })
            })
            .collect()
    }

    /// Public view of a published invitation. Drafts are reported as missing.
    pub fn get_public_by_slug(&self, slug: &str) -> Result<PublicInvitation> {
        let conn = self.ctx.conn()?;
        let invitation = invitations::get_published_invitation_by_slug(&conn, slug)?
            .ok_or_else(|| Error::not_found("invitation", slug))?;
        let media = invitation_media::list_media(&conn, invitation.id)?;

        Ok(PublicInvitation {
            id: invitation.id,
            title: invitation.title,
            slug: invitation.slug,
            yes_message: invitation.yes_message,
            no_messages: invitation.no_messages,
            media: media.iter().map(PublicMedia::from).collect(),
        })
    }
}

fn load_owned(conn: &Connection, invitation_id: InvitationId, actor: Actor) -> Result<Invitation> {
    let invitation = invitations::get_invitation(conn, invitation_id)?
        .ok_or_else(|| Error::not_found("invitation", invitation_id))?;
    if !InvitationCatalog::can_modify(&invitation, actor) {
        return Err(Error::forbidden("you do not own this invitation"));
    }
    Ok(invitation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Upload;
    use crate::test_support::{context, png, user};
    use assert_matches::assert_matches;
    use keepsake_common::MediaNamespace;

    fn input(title: &str) -> InvitationInput {
        InvitationInput {
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_applies_defaults() {
        let (ctx, _) = context();
        let ana = Actor::new(user(&ctx, "ana"));

        let created = ctx.invitations().create(ana, input("¿Quieres ser mi novia?")).unwrap();
        let inv = created.invitation;
        assert_eq!(inv.slug, "quieres-ser-mi-novia");
        assert_eq!(inv.yes_message, DEFAULT_YES_MESSAGE);
        assert_eq!(inv.no_messages, default_no_messages());
        assert!(!inv.is_published);

        let empty = InvitationInput {
            no_messages: Some(Vec::new()),
            ..input("Otra")
        };
        let created = ctx.invitations().create(ana, empty).unwrap();
        assert_eq!(created.invitation.no_messages.len(), 4);
    }

    #[test]
    fn slug_rules() {
        let (ctx, _) = context();
        let ana = Actor::new(user(&ctx, "ana"));

        let first = ctx.invitations().create(ana, input("Hola")).unwrap();
        let second = ctx.invitations().create(ana, input("Hola")).unwrap();
        assert_eq!(first.invitation.slug, "hola");
        assert_eq!(second.invitation.slug, "hola-1");

        let dup = InvitationInput {
            slug: Some("hola".into()),
            ..input("x")
        };
        assert_matches!(ctx.invitations().create(ana, dup), Err(Error::DuplicateSlug(_)));

        let fallback = ctx.invitations().create(ana, input("¡¡!!")).unwrap();
        assert_eq!(fallback.invitation.slug, "invitation");
    }

    #[test]
    fn drafts_are_not_public() {
        let (ctx, _) = context();
        let ana = Actor::new(user(&ctx, "ana"));
        let created = ctx.invitations().create(ana, input("Hola")).unwrap();
        let id = created.invitation.id;

        assert_matches!(
            ctx.invitations().get_public_by_slug("hola"),
            Err(Error::NotFound { .. })
        );

        let publish = InvitationChanges {
            is_published: Some(true),
            ..Default::default()
        };
        ctx.invitations().update(id, publish, ana).unwrap();
        let public = ctx.invitations().get_public_by_slug("hola").unwrap();
        assert_eq!(public.id, id);
    }

    #[test]
    fn owner_only_and_media_survive_delete() {
        let (ctx, _) = context();
        let ana = Actor::new(user(&ctx, "ana"));
        let luis = Actor::new(user(&ctx, "luis"));
        let id = ctx.invitations().create(ana, input("Hola")).unwrap().invitation.id;
        let media = ctx
            .media()
            .upload(&Upload::new("a.png", png()), ana.id, MediaNamespace::Users)
            .unwrap();
        ctx.ledger().attach_invitation(id, media.id, ana).unwrap();

        assert_eq!(ctx.invitations().get_for_owner(id, ana).unwrap().media.len(), 1);
        assert_matches!(ctx.invitations().get_for_owner(id, luis), Err(Error::Forbidden(_)));
        assert_matches!(ctx.invitations().delete(id, luis), Err(Error::Forbidden(_)));
        assert_matches!(
            ctx.invitations()
                .update(id, InvitationChanges::default(), luis),
            Err(Error::Forbidden(_))
        );

        ctx.invitations().delete(id, ana).unwrap();
        assert!(ctx.media().get(media.id).is_ok());
        assert!(!ctx.media().is_in_use(media.id).unwrap());
        assert!(ctx.invitations().list_for_owner(ana.id).unwrap().is_empty());
    }
}
