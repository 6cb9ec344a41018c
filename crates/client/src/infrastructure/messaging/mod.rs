//! Connection lifecycle and inbound event routing.
//!
//! - `ConnectionManager`: owns the single event-stream connection and its state machine
//! - `SubscriptionRegistry`: per-category handlers fed by the manager
//! - `ConnectionStateObserver`: read-only view of the state for UI indicators

pub mod backoff;
pub mod connection;
pub mod connection_manager;
pub mod subscriptions;

pub use backoff::{BackoffState, ReconnectPolicy};
pub use connection::{ConnectionState, ConnectionStateObserver};
pub use connection_manager::ConnectionManager;
pub use subscriptions::{SubscriptionId, SubscriptionRegistry};
