//! Preference Store Port - the two persisted notification settings

use campuslive_domain::{NotificationPreference, SoundKey};

/// Read/write access to [`NotificationPreference`].
///
/// Reads are cheap and synchronous; the dispatcher calls them once per event.
pub trait PreferenceStorePort: Send + Sync {
    fn notifications_enabled(&self) -> bool;

    fn set_notifications_enabled(&self, enabled: bool);

    fn selected_sound_key(&self) -> SoundKey;

    fn set_selected_sound_key(&self, key: &SoundKey);

    fn preference(&self) -> NotificationPreference {
        NotificationPreference {
            notifications_enabled: self.notifications_enabled(),
            selected_sound_key: self.selected_sound_key(),
        }
    }
}
