//! In-memory fakes for the outbound ports.
//!
//! Shared by the unit tests of every layer and exported under the `testing`
//! feature for downstream integration tests.

mod fixtures;
mod scripted_transport;

pub use fixtures::{
    event, message_event, MemoryStorage, RecordingAudioBackend, RecordingNavigator,
    RecordingScheduler, StaticPermission,
};
pub use scripted_transport::ScriptedTransport;
