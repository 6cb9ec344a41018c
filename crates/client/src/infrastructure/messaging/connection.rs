//! Connection state and its observers.

use std::fmt;

use tokio::sync::watch;

/// Connection state of the session's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not connected (initial state, after logout or explicit disconnect)
    Disconnected,
    /// First handshake in progress
    Connecting,
    /// Handshake succeeded, events are flowing
    Connected,
    /// Connection lost or handshake failed, retrying with backoff
    Reconnecting,
    /// Retry budget exhausted; stays here until `connect()` is called again
    Errored,
}

impl ConnectionState {
    /// True while the manager owns a live or pending connection attempt.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Observable connection state for UI binding.
///
/// This provides a way to observe connection state changes without
/// owning the ConnectionManager. Multiple observers can share the same
/// underlying state. Rapid transitions may be coalesced; use
/// `ConnectionManager::transitions()` when every step matters.
#[derive(Clone)]
pub struct ConnectionStateObserver {
    rx: watch::Receiver<ConnectionState>,
}

impl ConnectionStateObserver {
    pub fn new(rx: watch::Receiver<ConnectionState>) -> Self {
        Self { rx }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.rx.borrow()
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Wait for the next change. Returns `None` once the manager is gone.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Wait until the state equals `target`. Returns false if the manager is gone first.
    pub async fn wait_for(&mut self, target: ConnectionState) -> bool {
        self.rx.wait_for(|state| *state == target).await.is_ok()
    }
}
