//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. Column order must match the `COLS` constant of the
//! corresponding query module.

use chrono::{DateTime, NaiveDate, Utc};
use keepsake_common::{InvitationId, LandingId, MediaId, ThemeId, UserId};
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Read an integer rowid column into a typed ID.
fn parse_id<T: From<i64>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    Ok(T::from(row.get::<_, i64>(idx)?))
}

fn parse_opt_id<T: From<i64>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>> {
    Ok(row.get::<_, Option<i64>>(idx)?.map(T::from))
}

/// Parse an RFC 3339 text column.
fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a `YYYY-MM-DD` text column.
fn parse_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            created_at: parse_timestamp(row, 2)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// An uploaded media asset owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: MediaId,
    pub owner_user_id: UserId,
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub public_url: String,
    pub created_at: DateTime<Utc>,
}

impl Media {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            owner_user_id: parse_id(row, 1)?,
            filename: row.get(2)?,
            storage_path: row.get(3)?,
            mime_type: row.get(4)?,
            byte_size: row.get(5)?,
            public_url: row.get(6)?,
            created_at: parse_timestamp(row, 7)?,
        })
    }

    /// Whether this media belongs to `user`.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_user_id == user
    }
}

/// Fields for registering a freshly stored media blob.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub owner_user_id: UserId,
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub public_url: String,
}

/// Number of references to a media row, per owning entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceCounts {
    pub theme_backgrounds: i64,
    pub landings: i64,
    pub invitations: i64,
}

impl ReferenceCounts {
    pub fn total(&self) -> i64 {
        self.theme_backgrounds + self.landings + self.invitations
    }

    pub fn is_referenced(&self) -> bool {
        self.total() > 0
    }
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

/// A visual theme. Themes without an owner are system themes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub owner_user_id: Option<UserId>,
    pub name: String,
    pub description: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub bg_color: String,
    pub bg_image_media_id: Option<MediaId>,
    pub bg_image_url: Option<String>,
    pub css_class: String,
    pub created_at: DateTime<Utc>,
}

impl Theme {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            owner_user_id: parse_opt_id(row, 1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            primary_color: row.get(4)?,
            secondary_color: row.get(5)?,
            bg_color: row.get(6)?,
            bg_image_media_id: parse_opt_id(row, 7)?,
            bg_image_url: row.get(8)?,
            css_class: row.get(9)?,
            created_at: parse_timestamp(row, 10)?,
        })
    }

    /// System themes have no owner.
    pub fn is_system(&self) -> bool {
        self.owner_user_id.is_none()
    }

    /// Whether `user` may read this theme (system or own).
    pub fn is_visible_to(&self, user: UserId) -> bool {
        match self.owner_user_id {
            None => true,
            Some(owner) => owner == user,
        }
    }
}

/// Fields for a new user theme. The owner is supplied separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTheme {
    pub name: String,
    pub description: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub bg_color: String,
    pub css_class: String,
}

/// Partial theme update. There is deliberately no owner field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub bg_color: Option<String>,
    pub css_class: Option<String>,
}

impl ThemeChanges {
    /// Apply the supplied fields onto `theme`.
    pub fn apply(self, theme: &mut Theme) {
        if let Some(v) = self.name {
            theme.name = v;
        }
        if let Some(v) = self.description {
            theme.description = Some(v);
        }
        if let Some(v) = self.primary_color {
            theme.primary_color = v;
        }
        if let Some(v) = self.secondary_color {
            theme.secondary_color = v;
        }
        if let Some(v) = self.bg_color {
            theme.bg_color = v;
        }
        if let Some(v) = self.css_class {
            theme.css_class = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Landing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landing {
    pub id: LandingId,
    pub owner_user_id: UserId,
    pub theme_id: ThemeId,
    pub slug: String,
    pub couple_names: String,
    pub anniversary_date: NaiveDate,
    pub bio_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Landing {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            owner_user_id: parse_id(row, 1)?,
            theme_id: parse_id(row, 2)?,
            slug: row.get(3)?,
            couple_names: row.get(4)?,
            anniversary_date: parse_date(row, 5)?,
            bio_text: row.get(6)?,
            created_at: parse_timestamp(row, 7)?,
        })
    }
}

/// Row data for inserting a landing. The slug is already resolved.
#[derive(Debug, Clone)]
pub struct NewLanding {
    pub owner_user_id: UserId,
    pub theme_id: ThemeId,
    pub slug: String,
    pub couple_names: String,
    pub anniversary_date: NaiveDate,
    pub bio_text: Option<String>,
}

/// A link between a landing and a media row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LandingMediaLink {
    pub id: i64,
    pub landing_id: LandingId,
    pub media_id: MediaId,
    pub sort_order: i64,
}

impl LandingMediaLink {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            landing_id: parse_id(row, 1)?,
            media_id: parse_id(row, 2)?,
            sort_order: row.get(3)?,
        })
    }
}

/// A media row together with its position in a landing gallery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachedMedia {
    pub sort_order: i64,
    #[serde(flatten)]
    pub media: Media,
}

impl AttachedMedia {
    /// Expects the media columns first, then `sort_order`.
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            media: Media::from_row(row)?,
            sort_order: row.get(8)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Invitation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub owner_user_id: UserId,
    pub title: String,
    pub slug: String,
    pub yes_message: String,
    pub no_messages: Vec<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let no_messages_json: String = row.get(5)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            owner_user_id: parse_id(row, 1)?,
            title: row.get(2)?,
            slug: row.get(3)?,
            yes_message: row.get(4)?,
            no_messages: serde_json::from_str(&no_messages_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
            })?,
            is_published: row.get(6)?,
            created_at: parse_timestamp(row, 7)?,
        })
    }
}

/// Row data for inserting an invitation. Defaults are already applied.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub owner_user_id: UserId,
    pub title: String,
    pub slug: String,
    pub yes_message: String,
    pub no_messages: Vec<String>,
    pub is_published: bool,
}
