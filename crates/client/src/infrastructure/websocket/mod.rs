//! WebSocket transport for the real-time event stream.
//!
//! - `protocol`: JSON frame decoding into domain events
//! - `client`: tokio-tungstenite based `TransportPort` implementation

mod client;
mod protocol;

pub use client::WebSocketTransport;
pub use protocol::{parse_frame, FrameError, ParsedFrame};
