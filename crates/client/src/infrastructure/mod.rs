//! Infrastructure layer - adapters for the outbound ports.

pub mod audio;
pub mod messaging;
pub mod platform;
pub mod websocket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
