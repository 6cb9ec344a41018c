//! CampusLive client - real-time event delivery and notification pipeline.
//!
//! Layers, outermost last:
//! - `ports`: contracts for the transport, OS notifications, permission, audio,
//!   storage and navigation
//! - `infrastructure`: the connection manager plus desktop and WebSocket adapters
//! - `application`: dispatcher, banner queue, sound store, settings and the
//!   session that wires them together

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;

pub use application::{AppSession, SessionConfig, SessionDeps};
pub use config::ClientConfig;
