//! Audio Port - native clip loading and playback

use std::path::Path;

use async_trait::async_trait;
use campuslive_domain::SoundKey;

/// Opaque handle to a loaded clip, owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("Failed to load sound '{key}': {reason}")]
    Load { key: SoundKey, reason: String },
    #[error("Playback failed: {0}")]
    Playback(String),
    #[error("Unknown audio handle {0:?}")]
    UnknownHandle(AudioHandle),
    #[error("Audio output unavailable")]
    Unavailable,
}

/// Port for the platform audio engine.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AudioPort: Send + Sync {
    /// Load (decode/prepare) a clip so it can be played without further I/O.
    async fn load(&self, key: &SoundKey, source: &Path) -> Result<AudioHandle, AudioError>;

    /// Rewind to position zero and start playing.
    async fn play_from_start(&self, handle: AudioHandle) -> Result<(), AudioError>;

    async fn stop(&self, handle: AudioHandle) -> Result<(), AudioError>;

    /// Release the native resources behind `handle`.
    async fn unload(&self, handle: AudioHandle) -> Result<(), AudioError>;
}
