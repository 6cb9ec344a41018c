//! Transport Port - the ordered event stream behind the Connection Manager
//!
//! A transport turns credentials into a live stream of inbound signals. It does
//! not retry on its own: reconnection policy belongs to the Connection Manager.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use campuslive_domain::DomainEvent;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Bearer credential of the authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Errors raised while opening or holding a transport connection.
///
/// All variants are retryable; the Connection Manager bounds the retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Handshake failed: {0}")]
    Handshake(String),
    #[error("Handshake timed out after {0:?}")]
    Timeout(Duration),
}

/// Signals delivered by an open transport, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// A decoded domain event
    Event(DomainEvent),
    /// The connection went away (server close, socket error)
    Closed { reason: String },
}

/// A live connection: the inbound signal queue plus ownership of the socket.
///
/// Dropping the stream cancels the transport's I/O task, which closes the socket.
pub struct TransportStream {
    events: mpsc::Receiver<TransportSignal>,
    _close_on_drop: DropGuard,
}

impl TransportStream {
    pub fn new(events: mpsc::Receiver<TransportSignal>, shutdown: CancellationToken) -> Self {
        Self {
            events,
            _close_on_drop: shutdown.drop_guard(),
        }
    }

    /// Next inbound signal. `None` means the transport task ended without a reason.
    pub async fn next(&mut self) -> Option<TransportSignal> {
        self.events.recv().await
    }
}

/// Port for opening the persistent event-stream connection.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Perform the handshake with the given credentials.
    async fn open(&self, token: &AuthToken) -> Result<TransportStream, TransportError>;
}
