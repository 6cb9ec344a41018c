//! CampusLive domain types shared by the client pipeline.
//!
//! Pure data: events, banners, navigation targets and notification preferences.
//! No I/O and no runtime dependencies.

pub mod banner;
pub mod domain_event;
pub mod error;
pub mod ids;
pub mod navigation;
pub mod preference;

pub use banner::{BannerItem, DismissReason};
pub use domain_event::{DomainEvent, EventCategory};
pub use error::DomainError;
pub use ids::{BannerId, NotificationRequestId};
pub use navigation::NavigationTarget;
pub use preference::{NotificationPreference, SoundKey};
