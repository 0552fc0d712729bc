//! Association ledger: links between media and the entities that use them.
//!
//! Landing links are ordered by `sort_order`, invitation links are an
//! unordered set, and theme backgrounds are a single column on the theme.
//! Every landing mutation runs inside one `BEGIN IMMEDIATE` transaction so
//! the attachment limit and the unique positions hold under concurrency.

use std::collections::{HashMap, HashSet};

use keepsake_common::{
    Actor, Error, InvitationId, LandingId, MediaId, Result, MAX_LANDING_MEDIA,
};
use keepsake_db::models::{AttachedMedia, Landing, LandingMediaLink, Media, ReferenceCounts};
use keepsake_db::queries::{
    invitation_media, invitations, landing_media, landings, media as media_q,
};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;

/// Target position for one media in a [`AssociationLedger::reorder`] batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortPosition {
    pub media_id: MediaId,
    pub sort_order: i64,
}

impl SortPosition {
    pub fn new(media_id: MediaId, sort_order: i64) -> Self {
        Self {
            media_id,
            sort_order,
        }
    }
}

pub struct AssociationLedger<'a> {
    ctx: &'a AppContext,
}

impl<'a> AssociationLedger<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Only the landing's owner may change its gallery.
    pub fn can_modify(landing: &Landing, actor: Actor) -> bool {
        landing.owner_user_id == actor.id
    }

    /// Attach `media_id` to a landing, or move it if it is already attached.
    ///
    /// Without `order` the media goes after the current last item.
    ///
    /// # Errors
    ///
    /// * `NotFound` - landing or media does not exist
    /// * `Forbidden` - actor does not own the landing, or media has another owner
    /// * `LimitExceeded` - the landing already has the maximum number of media
    /// * `Validation` - `order` is below 1 or held by another media
    pub fn attach(
        &self,
        landing_id: LandingId,
        media_id: MediaId,
        actor: Actor,
        order: Option<i64>,
    ) -> Result<LandingMediaLink> {
        let mut conn = self.ctx.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::database)?;

        let landing = load_modifiable_landing(&tx, landing_id, actor)?;

        let media = media_q::get_media(&tx, media_id)?
            .ok_or_else(|| Error::not_found("media", media_id))?;
        if !media.is_owned_by(landing.owner_user_id) {
            return Err(Error::forbidden(format!(
                "media {media_id} does not belong to the landing owner"
            )));
        }

        if let Some(order) = order {
            check_position(order)?;
            if let Some(holder) = landing_media::sort_order_holder(&tx, landing_id, order)? {
                if holder != media_id {
                    return Err(Error::validation(format!(
                        "sort order {order} is already used by media {holder}"
                    )));
                }
            }
        }

        let existing = landing_media::get_link(&tx, landing_id, media_id)?;
        let max = landing_media::max_sort_order(&tx, landing_id)?;

        let link = match existing {
            Some(link) => {
                let target = match order {
                    Some(order) => order,
                    None if link.sort_order == max => link.sort_order,
                    None => max + 1,
                };
                if target != link.sort_order {
                    landing_media::set_sort_order(&tx, landing_id, media_id, target)?;
                }
                LandingMediaLink {
                    sort_order: target,
                    ..link
                }
            }
            None => {
                let count = landing_media::count_links(&tx, landing_id)?;
                if count >= MAX_LANDING_MEDIA as i64 {
                    return Err(Error::LimitExceeded {
                        limit: MAX_LANDING_MEDIA,
                    });
                }
                landing_media::insert_link(&tx, landing_id, media_id, order.unwrap_or(max + 1))?
            }
        };

        tx.commit().map_err(Error::database)?;

        tracing::info!(
            "Attached media {} to landing {} at position {}",
            media_id,
            landing_id,
            link.sort_order
        );
        Ok(link)
    }

    /// Remove a media from a landing gallery. The media row is untouched.
    ///
    /// Returns `false` if the media was not attached.
    pub fn detach(&self, landing_id: LandingId, media_id: MediaId, actor: Actor) -> Result<bool> {
        let conn = self.ctx.conn()?;
        load_modifiable_landing(&conn, landing_id, actor)?;

        let removed = landing_media::delete_link(&conn, landing_id, media_id)?;
        if removed {
            tracing::info!("Detached media {} from landing {}", media_id, landing_id);
        } else {
            tracing::debug!("Media {} was not attached to landing {}", media_id, landing_id);
        }
        Ok(removed)
    }

    /// Assign new positions to attached media, all or nothing.
    ///
    /// Media not named in `positions` keep theirs; the batch may not collide
    /// with them.
    ///
    /// # Errors
    ///
    /// * `InvalidAssociation` - a media in the batch is not attached
    /// * `Validation` - a position is below 1, repeated, or held by an
    ///   unlisted media
    pub fn reorder(
        &self,
        landing_id: LandingId,
        positions: &[SortPosition],
        actor: Actor,
    ) -> Result<Vec<LandingMediaLink>> {
        let mut conn = self.ctx.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::database)?;

        load_modifiable_landing(&tx, landing_id, actor)?;

        let current: HashMap<MediaId, i64> = landing_media::list_links(&tx, landing_id)?
            .into_iter()
            .map(|link| (link.media_id, link.sort_order))
            .collect();

        let mut batch_media = HashSet::new();
        let mut batch_orders = HashSet::new();
        for pos in positions {
            if !current.contains_key(&pos.media_id) {
                return Err(Error::InvalidAssociation {
                    media_id: pos.media_id.get(),
                });
            }
            check_position(pos.sort_order)?;
            if !batch_media.insert(pos.media_id) {
                return Err(Error::validation(format!(
                    "media {} appears more than once",
                    pos.media_id
                )));
            }
            if !batch_orders.insert(pos.sort_order) {
                return Err(Error::validation(format!(
                    "sort order {} appears more than once",
                    pos.sort_order
                )));
            }
        }

        for (media_id, order) in &current {
            if !batch_media.contains(media_id) && batch_orders.contains(order) {
                return Err(Error::validation(format!(
                    "sort order {order} is already used by media {media_id}"
                )));
            }
        }

        // Park the batch on negative positions so swaps never collide.
        for (i, pos) in positions.iter().enumerate() {
            landing_media::set_sort_order(&tx, landing_id, pos.media_id, -(i as i64) - 1)?;
        }
        for pos in positions {
            landing_media::set_sort_order(&tx, landing_id, pos.media_id, pos.sort_order)?;
        }

        let links = landing_media::list_links(&tx, landing_id)?;
        tx.commit().map_err(Error::database)?;

        tracing::info!("Reordered {} media on landing {}", positions.len(), landing_id);
        Ok(links)
    }

    /// Media attached to a landing in display order.
    pub fn landing_media(&self, landing_id: LandingId) -> Result<Vec<AttachedMedia>> {
        let conn = self.ctx.conn()?;
        landing_media::list_attached_media(&conn, landing_id)
    }

    /// Link a media to an invitation. Linking twice is a no-op.
    ///
    /// Returns `false` if the link already existed.
    pub fn attach_invitation(
        &self,
        invitation_id: InvitationId,
        media_id: MediaId,
        actor: Actor,
    ) -> Result<bool> {
        let conn = self.ctx.conn()?;
        let invitation = invitations::get_invitation(&conn, invitation_id)?
            .ok_or_else(|| Error::not_found("invitation", invitation_id))?;
        if invitation.owner_user_id != actor.id {
            return Err(Error::forbidden("you do not own this invitation"));
        }

        let media = media_q::get_media(&conn, media_id)?
            .ok_or_else(|| Error::not_found("media", media_id))?;
        if !media.is_owned_by(invitation.owner_user_id) {
            return Err(Error::forbidden(format!(
                "media {media_id} does not belong to the invitation owner"
            )));
        }

        let added = invitation_media::insert_link(&conn, invitation_id, media_id)?;
        if added {
            tracing::info!("Attached media {} to invitation {}", media_id, invitation_id);
        }
        Ok(added)
    }

    /// Unlink a media from an invitation. Returns `false` if it was not linked.
    pub fn detach_invitation(
        &self,
        invitation_id: InvitationId,
        media_id: MediaId,
        actor: Actor,
    ) -> Result<bool> {
        let conn = self.ctx.conn()?;
        let invitation = invitations::get_invitation(&conn, invitation_id)?
            .ok_or_else(|| Error::not_found("invitation", invitation_id))?;
        if invitation.owner_user_id != actor.id {
            return Err(Error::forbidden("you do not own this invitation"));
        }

        let removed = invitation_media::delete_link(&conn, invitation_id, media_id)?;
        if removed {
            tracing::info!("Detached media {} from invitation {}", media_id, invitation_id);
        }
        Ok(removed)
    }

    pub fn invitation_media(&self, invitation_id: InvitationId) -> Result<Vec<Media>> {
        let conn = self.ctx.conn()?;
        invitation_media::list_media(&conn, invitation_id)
    }

    /// References to a media from theme backgrounds, landings, and invitations.
    pub fn reference_count(&self, media_id: MediaId) -> Result<ReferenceCounts> {
        let conn = self.ctx.conn()?;
        media_q::reference_counts(&conn, media_id)
    }
}

/// Load a landing, failing unless `actor` may modify it.
pub(crate) fn load_modifiable_landing(conn: &Connection, landing_id: LandingId, actor: Actor) -> Result<Landing> {
    let landing = landings::get_landing(conn, landing_id)?
        .ok_or_else(|| Error::not_found("landing", landing_id))?;
    if !AssociationLedger::can_modify(&landing, actor) {
        return Err(Error::forbidden("you do not own this landing"));
    }
    Ok(landing)
}

fn check_position(order: i64) -> Result<()> {
    if order < 1 {
        return Err(Error::validation(format!(
            "sort order must be at least 1, got {order}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Upload;
    use crate::test_support::{context, png, user};
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use keepsake_common::{MediaNamespace, UserId};
    use keepsake_db::models::NewLanding;
    use keepsake_db::queries::themes::list_system_themes;

    fn landing(ctx: &AppContext, owner: UserId, slug: &str) -> LandingId {
        let conn = ctx.conn().unwrap();
        let theme = list_system_themes(&conn).unwrap().remove(0);
        landings::insert_landing(
            &conn,
            &NewLanding {
                owner_user_id: owner,
                theme_id: theme.id,
                slug: slug.into(),
                couple_names: "Ana & Luis".into(),
                anniversary_date: NaiveDate::from_ymd_opt(2021, 2, 14).unwrap(),
                bio_text: None,
            },
        )
        .unwrap()
        .id
    }

    fn photo(ctx: &AppContext, owner: UserId) -> MediaId {
        ctx.media()
            .upload(&Upload::new("p.png", png()), owner, MediaNamespace::Users)
            .unwrap()
            .id
    }

    fn order_of(ctx: &AppContext, landing_id: LandingId) -> Vec<(MediaId, i64)> {
        ctx.ledger()
            .landing_media(landing_id)
            .unwrap()
            .into_iter()
            .map(|m| (m.media.id, m.sort_order))
            .collect()
    }

    #[test]
    fn attach_appends_in_order() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let l = landing(&ctx, ana, "boda");
        let a = photo(&ctx, ana);
        let b = photo(&ctx, ana);

        let actor = Actor::new(ana);
        assert_eq!(ctx.ledger().attach(l, a, actor, None).unwrap().sort_order, 1);
        assert_eq!(ctx.ledger().attach(l, b, actor, None).unwrap().sort_order, 2);
        assert_eq!(order_of(&ctx, l), vec![(a, 1), (b, 2)]);
    }

    #[test]
    fn reattach_moves_instead_of_duplicating() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let l = landing(&ctx, ana, "boda");
        let a = photo(&ctx, ana);
        let b = photo(&ctx, ana);
        let actor = Actor::new(ana);

        ctx.ledger().attach(l, a, actor, None).unwrap();
        ctx.ledger().attach(l, b, actor, None).unwrap();
        ctx.ledger().attach(l, a, actor, None).unwrap();
        assert_eq!(order_of(&ctx, l), vec![(b, 2), (a, 3)]);

        ctx.ledger().attach(l, a, actor, Some(7)).unwrap();
        assert_eq!(order_of(&ctx, l), vec![(b, 2), (a, 7)]);
    }

    #[test]
    fn explicit_order_is_validated() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let l = landing(&ctx, ana, "boda");
        let a = photo(&ctx, ana);
        let b = photo(&ctx, ana);
        let actor = Actor::new(ana);

        assert_matches!(
            ctx.ledger().attach(l, a, actor, Some(0)),
            Err(Error::Validation(_))
        );
        ctx.ledger().attach(l, a, actor, Some(3)).unwrap();
        assert_matches!(
            ctx.ledger().attach(l, b, actor, Some(3)),
            Err(Error::Validation(_))
        );
    }

    #[test]
    fn attach_checks_ownership() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let luis = user(&ctx, "luis");
        let l = landing(&ctx, ana, "boda");
        let anas = photo(&ctx, ana);
        let luiss = photo(&ctx, luis);

        assert_matches!(
            ctx.ledger().attach(l, anas, Actor::new(luis), None),
            Err(Error::Forbidden(_))
        );
        assert_matches!(
            ctx.ledger().attach(l, luiss, Actor::new(ana), None),
            Err(Error::Forbidden(_))
        );
        assert_matches!(
            ctx.ledger().attach(LandingId::from(999), anas, Actor::new(ana), None),
            Err(Error::NotFound { .. })
        );
        assert_matches!(
            ctx.ledger().attach(l, MediaId::from(999), Actor::new(ana), None),
            Err(Error::NotFound { .. })
        );
    }

    #[test]
    fn limit_is_enforced() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let l = landing(&ctx, ana, "boda");
        let actor = Actor::new(ana);

        for _ in 0..MAX_LANDING_MEDIA {
            let m = photo(&ctx, ana);
            ctx.ledger().attach(l, m, actor, None).unwrap();
        }
        let extra = photo(&ctx, ana);
        assert_matches!(
            ctx.ledger().attach(l, extra, actor, None),
            Err(Error::LimitExceeded { limit: 20 })
        );

        // Moving an already attached media is still allowed at the limit.
        let first = order_of(&ctx, l)[0].0;
        ctx.ledger().attach(l, first, actor, Some(100)).unwrap();
    }

    #[test]
    fn reorder_swaps() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let l = landing(&ctx, ana, "boda");
        let a = photo(&ctx, ana);
        let b = photo(&ctx, ana);
        let actor = Actor::new(ana);
        ctx.ledger().attach(l, a, actor, None).unwrap();
        ctx.ledger().attach(l, b, actor, None).unwrap();

        let links = ctx
            .ledger()
            .reorder(l, &[SortPosition::new(a, 2), SortPosition::new(b, 1)], actor)
            .unwrap();
        assert_eq!(links[0].media_id, b);
        assert_eq!(order_of(&ctx, l), vec![(b, 1), (a, 2)]);
    }

    #[test]
    fn reorder_rejects_unattached_and_keeps_order() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let l = landing(&ctx, ana, "boda");
        let a = photo(&ctx, ana);
        let stray = photo(&ctx, ana);
        let actor = Actor::new(ana);
        ctx.ledger().attach(l, a, actor, None).unwrap();

        let err = ctx
            .ledger()
            .reorder(l, &[SortPosition::new(a, 5), SortPosition::new(stray, 1)], actor)
            .unwrap_err();
        assert_matches!(err, Error::InvalidAssociation { media_id } if media_id == stray.get());
        assert_eq!(order_of(&ctx, l), vec![(a, 1)]);
    }

    #[test]
    fn reorder_rejects_collisions() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let l = landing(&ctx, ana, "boda");
        let a = photo(&ctx, ana);
        let b = photo(&ctx, ana);
        let actor = Actor::new(ana);
        ctx.ledger().attach(l, a, actor, None).unwrap();
        ctx.ledger().attach(l, b, actor, None).unwrap();

        assert_matches!(
            ctx.ledger().reorder(l, &[SortPosition::new(a, 2)], actor),
            Err(Error::Validation(_))
        );
        assert_matches!(
            ctx.ledger()
                .reorder(l, &[SortPosition::new(a, 4), SortPosition::new(b, 4)], actor),
            Err(Error::Validation(_))
        );
        assert_matches!(
            ctx.ledger().reorder(l, &[SortPosition::new(a, -1)], actor),
            Err(Error::Validation(_))
        );
        assert_eq!(order_of(&ctx, l), vec![(a, 1), (b, 2)]);
    }

    #[test]
    fn reorder_requires_owner() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let luis = user(&ctx, "luis");
        let l = landing(&ctx, ana, "boda");

        assert_matches!(
            ctx.ledger().reorder(l, &[], Actor::new(luis)),
            Err(Error::Forbidden(_))
        );
    }

    #[test]
    fn detach_keeps_media_row() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let l = landing(&ctx, ana, "boda");
        let a = photo(&ctx, ana);
        let actor = Actor::new(ana);
        ctx.ledger().attach(l, a, actor, None).unwrap();

        assert!(ctx.ledger().detach(l, a, actor).unwrap());
        assert!(!ctx.ledger().detach(l, a, actor).unwrap());
        assert!(ctx.media().get(a).is_ok());
        assert!(!ctx.media().is_in_use(a).unwrap());
    }

    #[test]
    fn invitation_links() {
        let (ctx, _) = context();
        let ana = user(&ctx, "ana");
        let luis = user(&ctx, "luis");
        let inv = {
            let conn = ctx.conn().unwrap();
            invitations::insert_invitation(
                &conn,
                &keepsake_db::models::NewInvitation {
                    owner_user_id: ana,
                    title: "Will you?".into(),
                    slug: "will-you".into(),
                    yes_message: "Sí".into(),
                    no_messages: vec!["No".into()],
                    is_published: false,
                },
            )
            .unwrap()
            .id
        };
        let a = photo(&ctx, ana);
        let actor = Actor::new(ana);

        assert!(ctx.ledger().attach_invitation(inv, a, actor).unwrap());
        assert!(!ctx.ledger().attach_invitation(inv, a, actor).unwrap());
        assert_eq!(ctx.ledger().reference_count(a).unwrap().invitations, 1);
        assert_matches!(
            ctx.ledger().attach_invitation(inv, a, Actor::new(luis)),
            Err(Error::Forbidden(_))
        );

        assert!(ctx.ledger().detach_invitation(inv, a, actor).unwrap());
        assert!(ctx.ledger().invitation_media(inv).unwrap().is_empty());
    }
}
