//! User-facing notification settings: the on/off switch and the sound picker.

use std::sync::Arc;

use campuslive_domain::{NotificationPreference, SoundKey};

use crate::application::services::sound_assets::SoundAssetStore;
use crate::ports::outbound::{PermissionPort, PreferenceStorePort};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Notification permission was not granted")]
    PermissionDenied,
    #[error("Unknown sound '{0}'")]
    UnknownSound(SoundKey),
}

pub struct NotificationSettings {
    preferences: Arc<dyn PreferenceStorePort>,
    permission: Arc<dyn PermissionPort>,
    sounds: Arc<SoundAssetStore>,
}

impl NotificationSettings {
    pub fn new(
        preferences: Arc<dyn PreferenceStorePort>,
        permission: Arc<dyn PermissionPort>,
        sounds: Arc<SoundAssetStore>,
    ) -> Self {
        Self {
            preferences,
            permission,
            sounds,
        }
    }

    pub fn preference(&self) -> NotificationPreference {
        self.preferences.preference()
    }

    /// Turning notifications on asks for permission first; without it the
    /// setting is stored as off.
    pub async fn set_notifications_enabled(&self, enabled: bool) -> Result<(), SettingsError> {
        if !enabled {
            self.preferences.set_notifications_enabled(false);
            tracing::info!("Notifications disabled");
            return Ok(());
        }

        let mut status = self.permission.status().await;
        if !status.is_granted() {
            status = self.permission.request().await;
        }
        if !status.is_granted() {
            self.preferences.set_notifications_enabled(false);
            tracing::warn!(?status, "Notifications stay disabled: permission not granted");
            return Err(SettingsError::PermissionDenied);
        }

        self.preferences.set_notifications_enabled(true);
        tracing::info!("Notifications enabled");
        Ok(())
    }

    /// Persist `key` as the notification sound and preview it.
    pub async fn select_sound(&self, key: SoundKey) -> Result<(), SettingsError> {
        if !self.sounds.catalog().contains(&key) {
            return Err(SettingsError::UnknownSound(key));
        }
        self.preferences.set_selected_sound_key(&key);
        tracing::info!(key = %key, "Notification sound selected");
        self.sounds.switch_sound(&key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::sound_assets::SoundCatalog;
    use crate::infrastructure::platform::StoragePreferenceStore;
    use crate::infrastructure::testing::{MemoryStorage, RecordingAudioBackend, StaticPermission};
    use crate::ports::outbound::PermissionStatus;

    struct Fixture {
        settings: NotificationSettings,
        preferences: Arc<StoragePreferenceStore>,
        permission: Arc<StaticPermission>,
        audio: Arc<RecordingAudioBackend>,
    }

    async fn fixture(permission: StaticPermission) -> Fixture {
        let audio = Arc::new(RecordingAudioBackend::new());
        let sounds = Arc::new(SoundAssetStore::new(
            SoundCatalog::from_dir("sounds"),
            audio.clone(),
        ));
        sounds.preload_all().await;
        let preferences = Arc::new(StoragePreferenceStore::new(Arc::new(MemoryStorage::new())));
        let permission = Arc::new(permission);
        Fixture {
            settings: NotificationSettings::new(preferences.clone(), permission.clone(), sounds),
            preferences,
            permission,
            audio,
        }
    }

    fn key(name: &str) -> SoundKey {
        SoundKey::new(name).expect("valid key")
    }

    #[tokio::test]
    async fn enabling_with_granted_permission_does_not_prompt() {
        let fx = fixture(StaticPermission::granted()).await;
        fx.preferences.set_notifications_enabled(false);

        assert_eq!(fx.settings.set_notifications_enabled(true).await, Ok(()));

        assert!(fx.settings.preference().notifications_enabled);
        assert_eq!(fx.permission.request_count(), 0);
    }

    #[tokio::test]
    async fn enabling_prompts_when_undetermined() {
        let fx = fixture(StaticPermission::new(
            PermissionStatus::Undetermined,
            PermissionStatus::Granted,
        ))
        .await;

        assert_eq!(fx.settings.set_notifications_enabled(true).await, Ok(()));

        assert_eq!(fx.permission.request_count(), 1);
        assert!(fx.preferences.notifications_enabled());
    }

    #[tokio::test]
    async fn enabling_without_permission_stays_disabled() {
        let fx = fixture(StaticPermission::denied()).await;

        assert_eq!(
            fx.settings.set_notifications_enabled(true).await,
            Err(SettingsError::PermissionDenied)
        );
        assert!(!fx.preferences.notifications_enabled());
    }

    #[tokio::test]
    async fn disabling_always_persists() {
        let fx = fixture(StaticPermission::denied()).await;

        assert_eq!(fx.settings.set_notifications_enabled(false).await, Ok(()));
        assert!(!fx.preferences.notifications_enabled());
    }

    #[tokio::test]
    async fn selecting_a_sound_persists_and_previews_it() {
        let fx = fixture(StaticPermission::granted()).await;

        assert_eq!(fx.settings.select_sound(key("bubble")).await, Ok(()));

        assert_eq!(fx.settings.preference().selected_sound_key, key("bubble"));
        assert_eq!(fx.audio.playing(), vec![key("bubble")]);
    }

    #[tokio::test]
    async fn unknown_sound_is_rejected_without_side_effects() {
        let fx = fixture(StaticPermission::granted()).await;

        assert_eq!(
            fx.settings.select_sound(key("trumpet")).await,
            Err(SettingsError::UnknownSound(key("trumpet")))
        );
        assert_eq!(fx.preferences.selected_sound_key(), SoundKey::default_key());
        assert!(fx.audio.plays().is_empty());
    }
}
