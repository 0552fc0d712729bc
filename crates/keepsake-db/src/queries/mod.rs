//! Database query modules.

pub mod invitation_media;
pub mod invitations;
pub mod landing_media;
pub mod landings;
pub mod media;
pub mod themes;
pub mod users;
