//! Notification preferences persisted through a [`StorageProvider`].

use std::sync::Arc;

use campuslive_domain::SoundKey;

use crate::ports::outbound::{storage_keys, PreferenceStorePort, StorageProvider};

/// Reads fall back to defaults (enabled, `"default"` sound) when a value is
/// missing or unreadable.
#[derive(Clone)]
pub struct StoragePreferenceStore {
    storage: Arc<dyn StorageProvider>,
}

impl StoragePreferenceStore {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }
}

impl PreferenceStorePort for StoragePreferenceStore {
    fn notifications_enabled(&self) -> bool {
        match self.storage.load(storage_keys::NOTIFICATIONS_ENABLED) {
            None => true,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid stored notifications flag, using default");
                true
            }),
        }
    }

    fn set_notifications_enabled(&self, enabled: bool) {
        self.storage
            .save(storage_keys::NOTIFICATIONS_ENABLED, &enabled.to_string());
    }

    fn selected_sound_key(&self) -> SoundKey {
        match self.storage.load(storage_keys::SELECTED_SOUND_KEY) {
            None => SoundKey::default_key(),
            Some(raw) => SoundKey::new(raw.as_str()).unwrap_or_else(|e| {
                tracing::warn!(value = %raw, error = %e, "Invalid stored sound key, using default");
                SoundKey::default_key()
            }),
        }
    }

    fn set_selected_sound_key(&self, key: &SoundKey) {
        self.storage
            .save(storage_keys::SELECTED_SOUND_KEY, key.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::testing::MemoryStorage;
    use campuslive_domain::NotificationPreference;

    fn store() -> (StoragePreferenceStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (StoragePreferenceStore::new(storage.clone()), storage)
    }

    #[test]
    fn empty_storage_yields_defaults() {
        let (store, _) = store();
        assert_eq!(store.preference(), NotificationPreference::default());
    }

    #[test]
    fn writes_use_the_stable_keys() {
        let (store, storage) = store();
        store.set_notifications_enabled(false);
        store.set_selected_sound_key(&SoundKey::new("chime").expect("valid key"));

        assert_eq!(
            storage.raw(storage_keys::NOTIFICATIONS_ENABLED).as_deref(),
            Some("false")
        );
        assert_eq!(
            storage.raw(storage_keys::SELECTED_SOUND_KEY).as_deref(),
            Some("chime")
        );
        assert!(!store.notifications_enabled());
        assert_eq!(store.selected_sound_key().as_str(), "chime");
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let (store, storage) = store();
        storage.save(storage_keys::NOTIFICATIONS_ENABLED, "sometimes");
        storage.save(storage_keys::SELECTED_SOUND_KEY, "   ");

        assert!(store.notifications_enabled());
        assert_eq!(store.selected_sound_key(), SoundKey::default_key());
    }
}
