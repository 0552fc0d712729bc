//! Typed ID wrappers providing compile-time safety for entity identifiers.
//!
//! Each ID type is a newtype over the `i64` rowid SQLite assigns, preventing
//! accidental misuse (e.g., passing a `MediaId` where a `LandingId` is
//! expected).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generate a newtype ID wrapper over `i64`.
///
/// The macro produces a struct with:
/// - `get()` returning the raw integer
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`, `Serialize`, `Deserialize`
/// - `Display` and `FromStr` delegating to the inner integer
/// - `From<i64>` and `Into<i64>` conversions
macro_rules! typed_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(i64);

            impl $name {
                /// Return the raw rowid.
                #[must_use]
                pub fn get(&self) -> i64 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = std::num::ParseIntError;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    s.parse::<i64>().map(Self)
                }
            }

            impl From<i64> for $name {
                fn from(id: i64) -> Self {
                    Self(id)
                }
            }

            impl From<$name> for i64 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )+
    };
}

typed_id! {
    /// Unique identifier for a user account.
    UserId,
    /// Unique identifier for an uploaded media asset.
    MediaId,
    /// Unique identifier for a landing page.
    LandingId,
    /// Unique identifier for a visual theme.
    ThemeId,
    /// Unique identifier for an invitation.
    InvitationId,
}

/// The authenticated caller of a mutating operation.
///
/// Authentication happens elsewhere; the core only compares ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
}

impl Actor {
    pub fn new(id: UserId) -> Self {
        Self { id }
    }
}

impl From<UserId> for Actor {
    fn from(id: UserId) -> Self {
        Self { id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let id = LandingId::from(17);
        assert_eq!(id.to_string(), "17");
        assert_eq!("17".parse::<LandingId>().unwrap(), id);
        assert!("ana-luis".parse::<LandingId>().is_err());
    }

    #[test]
    fn raw_conversions() {
        let id = MediaId::from(3);
        assert_eq!(id.get(), 3);
        assert_eq!(i64::from(id), 3);
    }

    #[test]
    fn serde_transparent() {
        let id = ThemeId::from(5);
        assert_eq!(serde_json::to_string(&id).unwrap(), "5");
        let back: ThemeId = serde_json::from_str("5").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn actor_from_user() {
        let actor = Actor::from(UserId::from(9));
        assert_eq!(actor.id.get(), 9);
    }
}
