use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use campuslive_domain::SoundKey;

use crate::ports::outbound::{AudioError, AudioHandle, AudioPort};

struct Clip {
    key: SoundKey,
    bytes: Arc<[u8]>,
    playing: bool,
}

/// Clips held in memory; "playback" is tracked and logged.
#[derive(Default)]
pub struct FileAudioBackend {
    next_handle: AtomicU64,
    clips: Mutex<HashMap<u64, Clip>>,
}

impl FileAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently marked as playing.
    pub fn playing(&self) -> Vec<SoundKey> {
        self.lock()
            .values()
            .filter(|clip| clip.playing)
            .map(|clip| clip.key.clone())
            .collect()
    }

    pub fn loaded_count(&self) -> usize {
        self.lock().len()
    }

    #[cfg_attr(not(feature = "audio-rodio"), allow(dead_code))]
    pub(crate) fn bytes(&self, handle: AudioHandle) -> Result<Arc<[u8]>, AudioError> {
        self.lock()
            .get(&handle.0)
            .map(|clip| Arc::clone(&clip.bytes))
            .ok_or(AudioError::UnknownHandle(handle))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Clip>> {
        self.clips.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_playing(&self, handle: AudioHandle, playing: bool) -> Result<SoundKey, AudioError> {
        let mut clips = self.lock();
        let clip = clips
            .get_mut(&handle.0)
            .ok_or(AudioError::UnknownHandle(handle))?;
        clip.playing = playing;
        Ok(clip.key.clone())
    }
}

#[async_trait]
impl AudioPort for FileAudioBackend {
    async fn load(&self, key: &SoundKey, source: &Path) -> Result<AudioHandle, AudioError> {
        let bytes = tokio::fs::read(source).await.map_err(|e| AudioError::Load {
            key: key.clone(),
            reason: format!("{}: {}", source.display(), e),
        })?;
        if bytes.is_empty() {
            return Err(AudioError::Load {
                key: key.clone(),
                reason: format!("{}: empty clip", source.display()),
            });
        }

        let handle = AudioHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        tracing::debug!(key = %key, bytes = bytes.len(), "Sound loaded");
        self.lock().insert(
            handle.0,
            Clip {
                key: key.clone(),
                bytes: bytes.into(),
                playing: false,
            },
        );
        Ok(handle)
    }

    async fn play_from_start(&self, handle: AudioHandle) -> Result<(), AudioError> {
        let key = self.set_playing(handle, true)?;
        tracing::debug!(key = %key, "Sound playing from start");
        Ok(())
    }

    async fn stop(&self, handle: AudioHandle) -> Result<(), AudioError> {
        self.set_playing(handle, false)?;
        Ok(())
    }

    async fn unload(&self, handle: AudioHandle) -> Result<(), AudioError> {
        self.lock()
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(AudioError::UnknownHandle(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> SoundKey {
        SoundKey::new(name).expect("valid key")
    }

    #[tokio::test]
    async fn loads_plays_and_unloads_a_clip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chime.wav");
        std::fs::write(&path, b"RIFF....WAVE").expect("write clip");
        let backend = FileAudioBackend::new();

        let handle = backend.load(&key("chime"), &path).await.expect("loaded");
        backend.play_from_start(handle).await.expect("played");
        assert_eq!(backend.playing(), vec![key("chime")]);

        backend.stop(handle).await.expect("stopped");
        assert!(backend.playing().is_empty());

        backend.unload(handle).await.expect("unloaded");
        assert_eq!(backend.loaded_count(), 0);
        assert_eq!(
            backend.play_from_start(handle).await,
            Err(AudioError::UnknownHandle(handle))
        );
    }

    #[tokio::test]
    async fn missing_or_empty_files_fail_to_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let empty = dir.path().join("bell.wav");
        std::fs::write(&empty, b"").expect("write clip");
        let backend = FileAudioBackend::new();

        let missing = backend
            .load(&key("bubble"), &dir.path().join("bubble.wav"))
            .await;
        assert!(matches!(missing, Err(AudioError::Load { .. })));
        assert!(matches!(
            backend.load(&key("bell"), &empty).await,
            Err(AudioError::Load { .. })
        ));
        assert_eq!(backend.loaded_count(), 0);
    }
}
