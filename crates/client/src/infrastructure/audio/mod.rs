//! Audio adapters
//!
//! `FileAudioBackend` reads clips into memory and tracks playback without an
//! output device. With the `audio-rodio` feature, `RodioAudioBackend` plays the
//! same clips on the default speaker.

mod file_backend;
#[cfg(feature = "audio-rodio")]
mod rodio_backend;

pub use file_backend::FileAudioBackend;
#[cfg(feature = "audio-rodio")]
pub use rodio_backend::RodioAudioBackend;
