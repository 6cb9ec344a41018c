//! Application services
//!
//! - `banner_queue`: transient in-app banners with auto-dismiss
//! - `sound_assets`: preloaded sounds, one voice at a time
//! - `notification_dispatcher`: foreground/background/drop routing per event
//! - `notification_settings`: notification toggle and sound picker

pub mod banner_queue;
pub mod notification_dispatcher;
pub mod notification_settings;
pub mod sound_assets;

pub use banner_queue::{BannerEvent, BannerQueue, DEFAULT_BANNER_DURATION};
pub use notification_dispatcher::{
    handle_notification_opened, DispatchOutcome, DispatcherHandle, DropReason,
    NotificationDispatcher,
};
pub use notification_settings::{NotificationSettings, SettingsError};
pub use sound_assets::{SoundAssetStore, SoundCatalog, SoundStoreGuard, BUILTIN_SOUNDS};
