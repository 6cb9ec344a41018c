//! Sound Asset Store - preloaded notification sounds with single-voice playback.
//!
//! Clips are loaded once up front so foreground events never wait on I/O. The
//! store is the only owner of the playing flags, and every operation that starts
//! playback stops whatever else is playing first: at most one asset is audible.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use campuslive_domain::SoundKey;
use futures_util::future::join_all;
use tokio::sync::Mutex;

use crate::ports::outbound::{AudioHandle, AudioPort};

/// Sounds shipped with the app, loaded from `<dir>/<key>.wav`.
pub const BUILTIN_SOUNDS: [&str; 5] = ["default", "chime", "bubble", "bell", "marimba"];

/// Fixed mapping of sound keys to clip files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundCatalog {
    entries: Vec<(SoundKey, PathBuf)>,
}

impl SoundCatalog {
    /// Later duplicates of a key are ignored.
    pub fn new(entries: impl IntoIterator<Item = (SoundKey, PathBuf)>) -> Self {
        let mut unique: Vec<(SoundKey, PathBuf)> = Vec::new();
        for (key, path) in entries {
            if !unique.iter().any(|(existing, _)| *existing == key) {
                unique.push((key, path));
            }
        }
        Self { entries: unique }
    }

    /// The built-in catalog rooted at `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(BUILTIN_SOUNDS.iter().filter_map(|name| {
            SoundKey::new(*name)
                .ok()
                .map(|key| (key, dir.join(format!("{}.wav", name))))
        }))
    }

    pub fn contains(&self, key: &SoundKey) -> bool {
        self.path(key).is_some()
    }

    pub fn path(&self, key: &SoundKey) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, path)| path.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct LoadedAsset {
    handle: AudioHandle,
    is_playing: bool,
}

#[derive(Default)]
struct StoreState {
    assets: HashMap<SoundKey, LoadedAsset>,
}

pub struct SoundAssetStore {
    catalog: SoundCatalog,
    backend: Arc<dyn AudioPort>,
    state: Mutex<StoreState>,
    torn_down: AtomicBool,
}

impl SoundAssetStore {
    pub fn new(catalog: SoundCatalog, backend: Arc<dyn AudioPort>) -> Self {
        Self {
            catalog,
            backend,
            state: Mutex::new(StoreState::default()),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Load every catalog entry concurrently. Returns how many are loaded.
    ///
    /// A clip that fails to load is logged and left out; the others are
    /// unaffected.
    pub async fn preload_all(&self) -> usize {
        if self.is_torn_down() {
            return 0;
        }

        let pending: Vec<(SoundKey, PathBuf)> = {
            let state = self.state.lock().await;
            self.catalog
                .entries
                .iter()
                .filter(|(key, _)| !state.assets.contains_key(key))
                .cloned()
                .collect()
        };

        let results = join_all(pending.iter().map(|(key, path)| async move {
            (key, self.backend.load(key, path).await)
        }))
        .await;

        let mut state = self.state.lock().await;
        for (key, result) in results {
            match result {
                // Torn down meanwhile, or an overlapping preload got there first.
                Ok(handle) if self.is_torn_down() || state.assets.contains_key(key) => {
                    if let Err(e) = self.backend.unload(handle).await {
                        tracing::warn!(key = %key, error = %e, "Failed to unload duplicate sound");
                    }
                }
                Ok(handle) => {
                    state.assets.insert(
                        key.clone(),
                        LoadedAsset {
                            handle,
                            is_playing: false,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Sound failed to load");
                }
            }
        }
        tracing::info!(loaded = state.assets.len(), catalog = self.catalog.len(), "Sounds preloaded");
        state.assets.len()
    }

    /// Restart `key` from position zero.
    ///
    /// A key that is not loaded is a silent no-op. Anything else playing is
    /// stopped first. Returns whether playback started.
    pub async fn play(&self, key: &SoundKey) -> bool {
        let mut state = self.state.lock().await;
        if !state.assets.contains_key(key) {
            tracing::debug!(key = %key, "Sound not loaded, skipping playback");
            return false;
        }
        self.stop_others(&mut state, Some(key)).await;
        self.start(&mut state, key).await
    }

    /// Stop every playing asset, then play `key`.
    pub async fn switch_sound(&self, key: &SoundKey) -> bool {
        let mut state = self.state.lock().await;
        self.stop_others(&mut state, None).await;
        if !state.assets.contains_key(key) {
            tracing::debug!(key = %key, "Switched to a sound that is not loaded");
            return false;
        }
        self.start(&mut state, key).await
    }

    /// Unload every asset. Only the first call does anything.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.lock().await;
        let count = state.assets.len();
        for (key, asset) in state.assets.drain() {
            if asset.is_playing {
                if let Err(e) = self.backend.stop(asset.handle).await {
                    tracing::warn!(key = %key, error = %e, "Failed to stop sound during teardown");
                }
            }
            if let Err(e) = self.backend.unload(asset.handle).await {
                tracing::warn!(key = %key, error = %e, "Failed to unload sound");
            }
        }
        tracing::info!(unloaded = count, "Sound assets torn down");
    }

    pub async fn loaded_keys(&self) -> Vec<SoundKey> {
        let state = self.state.lock().await;
        let mut keys: Vec<SoundKey> = state.assets.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn playing_keys(&self) -> Vec<SoundKey> {
        let state = self.state.lock().await;
        let mut keys: Vec<SoundKey> = state
            .assets
            .iter()
            .filter(|(_, asset)| asset.is_playing)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    async fn stop_others(&self, state: &mut StoreState, keep: Option<&SoundKey>) {
        for (key, asset) in state.assets.iter_mut() {
            if !asset.is_playing || Some(key) == keep {
                continue;
            }
            if let Err(e) = self.backend.stop(asset.handle).await {
                tracing::warn!(key = %key, error = %e, "Failed to stop sound");
            }
            // Even a failed stop must not leave two voices flagged.
            asset.is_playing = false;
        }
    }

    async fn start(&self, state: &mut StoreState, key: &SoundKey) -> bool {
        let Some(asset) = state.assets.get_mut(key) else {
            return false;
        };
        match self.backend.play_from_start(asset.handle).await {
            Ok(()) => {
                asset.is_playing = true;
                tracing::debug!(key = %key, "Sound playing");
                true
            }
            Err(e) => {
                asset.is_playing = false;
                tracing::warn!(key = %key, error = %e, "Sound playback failed");
                false
            }
        }
    }
}

/// Scoped owner of a [`SoundAssetStore`]: tears it down when dropped.
///
/// Prefer [`SoundStoreGuard::release`] from async code; the drop path spawns
/// the teardown onto the current runtime.
pub struct SoundStoreGuard {
    store: Arc<SoundAssetStore>,
}

impl SoundStoreGuard {
    pub fn new(store: Arc<SoundAssetStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SoundAssetStore> {
        &self.store
    }

    pub async fn release(self) {
        self.store.teardown().await;
    }
}

impl Drop for SoundStoreGuard {
    fn drop(&mut self) {
        if self.store.is_torn_down() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let store = Arc::clone(&self.store);
                runtime.spawn(async move { store.teardown().await });
            }
            Err(_) => {
                tracing::warn!("Sound store dropped outside a runtime; assets not unloaded");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::testing::RecordingAudioBackend;
    use crate::ports::outbound::{AudioError, MockAudioPort};

    fn key(name: &str) -> SoundKey {
        SoundKey::new(name).expect("valid key")
    }

    async fn loaded_store() -> (Arc<SoundAssetStore>, Arc<RecordingAudioBackend>) {
        let backend = Arc::new(RecordingAudioBackend::new());
        let store = Arc::new(SoundAssetStore::new(
            SoundCatalog::from_dir("sounds"),
            backend.clone(),
        ));
        assert_eq!(store.preload_all().await, BUILTIN_SOUNDS.len());
        (store, backend)
    }

    #[test]
    fn builtin_catalog_maps_keys_to_wav_files() {
        let catalog = SoundCatalog::from_dir("/opt/sounds");
        assert_eq!(catalog.len(), 5);
        assert_eq!(
            catalog.path(&key("marimba")),
            Some(Path::new("/opt/sounds/marimba.wav"))
        );
        assert!(!catalog.contains(&key("trumpet")));
    }

    #[tokio::test]
    async fn failed_clip_does_not_block_the_rest() {
        let backend = Arc::new(RecordingAudioBackend::new());
        backend.fail_load("bubble");
        let store = SoundAssetStore::new(SoundCatalog::from_dir("sounds"), backend.clone());

        assert_eq!(store.preload_all().await, 4);
        assert!(!store.loaded_keys().await.contains(&key("bubble")));
        assert!(!store.play(&key("bubble")).await);
        assert!(store.play(&key("bell")).await);
    }

    /// Yields once per load so concurrent preloads interleave.
    struct YieldingBackend(Arc<RecordingAudioBackend>);

    #[async_trait::async_trait]
    impl AudioPort for YieldingBackend {
        async fn load(&self, key: &SoundKey, source: &Path) -> Result<AudioHandle, AudioError> {
            tokio::task::yield_now().await;
            self.0.load(key, source).await
        }

        async fn play_from_start(&self, handle: AudioHandle) -> Result<(), AudioError> {
            self.0.play_from_start(handle).await
        }

        async fn stop(&self, handle: AudioHandle) -> Result<(), AudioError> {
            self.0.stop(handle).await
        }

        async fn unload(&self, handle: AudioHandle) -> Result<(), AudioError> {
            self.0.unload(handle).await
        }
    }

    #[tokio::test]
    async fn overlapping_preloads_keep_one_handle_per_key() {
        let backend = Arc::new(RecordingAudioBackend::new());
        let store = SoundAssetStore::new(
            SoundCatalog::from_dir("sounds"),
            Arc::new(YieldingBackend(backend.clone())),
        );

        let (first, second) = tokio::join!(store.preload_all(), store.preload_all());

        assert_eq!(first, BUILTIN_SOUNDS.len());
        assert_eq!(second, BUILTIN_SOUNDS.len());
        assert_eq!(backend.loaded().len(), BUILTIN_SOUNDS.len());

        store.teardown().await;
        assert!(backend.loaded().is_empty());
    }

    #[tokio::test]
    async fn play_restarts_the_same_clip() {
        let (store, backend) = loaded_store().await;

        assert!(store.play(&key("chime")).await);
        assert!(store.play(&key("chime")).await);

        assert_eq!(backend.plays(), vec![key("chime"), key("chime")]);
        assert_eq!(store.playing_keys().await, vec![key("chime")]);
    }

    #[tokio::test]
    async fn at_most_one_sound_plays_after_switch() {
        let (store, backend) = loaded_store().await;

        store.play(&key("default")).await;
        store.play(&key("bell")).await;
        assert!(store.switch_sound(&key("marimba")).await);

        assert_eq!(store.playing_keys().await, vec![key("marimba")]);
        assert_eq!(backend.playing(), vec![key("marimba")]);
    }

    #[tokio::test]
    async fn switch_to_unloaded_key_leaves_silence() {
        let (store, backend) = loaded_store().await;
        store.play(&key("chime")).await;

        assert!(!store.switch_sound(&key("trumpet")).await);

        assert!(store.playing_keys().await.is_empty());
        assert!(backend.playing().is_empty());
    }

    #[tokio::test]
    async fn playback_failure_clears_the_flag() {
        let mut backend = MockAudioPort::new();
        backend
            .expect_load()
            .returning(|_, _| Ok(AudioHandle(7)));
        backend
            .expect_play_from_start()
            .returning(|_| Err(AudioError::Playback("device busy".into())));
        let store = SoundAssetStore::new(
            SoundCatalog::new([(key("default"), PathBuf::from("default.wav"))]),
            Arc::new(backend),
        );
        store.preload_all().await;

        assert!(!store.play(&key("default")).await);
        assert!(store.playing_keys().await.is_empty());
    }

    #[tokio::test]
    async fn teardown_unloads_everything_exactly_once() {
        let (store, backend) = loaded_store().await;
        store.play(&key("bell")).await;

        store.teardown().await;
        store.teardown().await;

        assert_eq!(backend.unload_count(), BUILTIN_SOUNDS.len());
        assert!(backend.loaded().is_empty());
        assert!(!store.play(&key("bell")).await);
        assert_eq!(store.preload_all().await, 0);
    }

    #[tokio::test]
    async fn dropped_guard_tears_down() {
        let (store, backend) = loaded_store().await;
        let guard = SoundStoreGuard::new(Arc::clone(&store));

        drop(guard);
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(store.is_torn_down());
        assert_eq!(backend.unload_count(), BUILTIN_SOUNDS.len());
    }

    #[tokio::test]
    async fn released_guard_does_not_tear_down_twice() {
        let (store, backend) = loaded_store().await;
        SoundStoreGuard::new(Arc::clone(&store)).release().await;

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(backend.unload_count(), BUILTIN_SOUNDS.len());
    }
}
