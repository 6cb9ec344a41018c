//! Connection Manager - the session's single event-stream connection.
//!
//! The manager is driven by authentication: `login` stores credentials and
//! connects, `logout` clears them and disconnects. In between, a background task
//! owns the transport stream, feeds inbound events to the subscription registry
//! and retries lost connections with bounded exponential backoff.
//!
//! Every state write from the background task is tagged with the generation it
//! was started under. `disconnect()` bumps the generation, so a late write from a
//! cancelled task is discarded and `Disconnected` always wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use campuslive_domain::{DomainEvent, EventCategory};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::messaging::backoff::{BackoffState, ReconnectPolicy};
use crate::infrastructure::messaging::connection::{ConnectionState, ConnectionStateObserver};
use crate::infrastructure::messaging::subscriptions::{SubscriptionId, SubscriptionRegistry};
use crate::ports::outbound::{AuthToken, TransportError, TransportPort, TransportSignal, TransportStream};

const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// Owns one persistent connection per session.
///
/// Cheap to clone; all clones control the same connection. The background task
/// only holds a weak reference, so dropping the last clone aborts it.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    transport: Arc<dyn TransportPort>,
    policy: ReconnectPolicy,
    subscriptions: SubscriptionRegistry,
    state_tx: watch::Sender<ConnectionState>,
    transitions: broadcast::Sender<ConnectionState>,
    control: Mutex<Control>,
}

#[derive(Default)]
struct Control {
    credentials: Option<AuthToken>,
    generation: u64,
    run: Option<RunHandle>,
}

/// The background connection task. Dropping it cancels the task.
struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl ConnectionManager {
    pub fn new(transport: Arc<dyn TransportPort>, policy: ReconnectPolicy) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                transport,
                policy,
                subscriptions: SubscriptionRegistry::new(),
                state_tx,
                transitions,
                control: Mutex::new(Control::default()),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    pub fn observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver::new(self.shared.state_tx.subscribe())
    }

    /// Every transition, in order (for indicators and diagnostics).
    pub fn transitions(&self) -> broadcast::Receiver<ConnectionState> {
        self.shared.transitions.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.lock_control().credentials.is_some()
    }

    /// Session became authenticated: remember the credentials and connect.
    ///
    /// Logging in with different credentials while connected restarts the
    /// connection under the new identity.
    pub fn login(&self, token: AuthToken) {
        let mut control = self.shared.lock_control();
        let changed = control.credentials.as_ref() != Some(&token);
        control.credentials = Some(token.clone());

        if changed && control.run.is_some() {
            tracing::info!("Credentials changed, restarting connection");
            self.shared.stop_locked(&mut control);
            self.shared.set_state(ConnectionState::Disconnected);
        }
        self.connect_locked(&mut control, token);
    }

    /// Session ended: forget the credentials and tear the connection down.
    pub fn logout(&self) {
        let mut control = self.shared.lock_control();
        control.credentials = None;
        self.shared.stop_locked(&mut control);
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Start connecting. No-op while a connection is live or being attempted,
    /// and refused while the session is unauthenticated.
    ///
    /// From `Errored` this resets the retry budget and starts over.
    pub fn connect(&self) {
        let mut control = self.shared.lock_control();
        let Some(token) = control.credentials.clone() else {
            tracing::warn!("Connect ignored: session is not authenticated");
            return;
        };
        self.connect_locked(&mut control, token);
    }

    /// Tear down the transport and cancel any pending reconnect. Idempotent.
    pub fn disconnect(&self) {
        let mut control = self.shared.lock_control();
        self.shared.stop_locked(&mut control);
        self.shared.set_state(ConnectionState::Disconnected);
    }

    pub fn subscribe(
        &self,
        category: EventCategory,
        handler: impl Fn(DomainEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.shared.subscriptions.subscribe(category, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscriptions.unsubscribe(id)
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.shared.subscriptions
    }

    fn connect_locked(&self, control: &mut Control, token: AuthToken) {
        let current = self.state();
        if current.is_active() {
            tracing::debug!(state = %current, "Connect ignored: already active");
            return;
        }

        control.generation += 1;
        let generation = control.generation;
        let cancel = CancellationToken::new();
        self.shared.set_state(ConnectionState::Connecting);

        let worker = ConnectionWorker {
            shared: Arc::downgrade(&self.shared),
            transport: Arc::clone(&self.shared.transport),
            subscriptions: self.shared.subscriptions.clone(),
            policy: self.shared.policy.clone(),
            generation,
        };
        let task = tokio::spawn(worker.run(token, cancel.clone()));
        control.run = Some(RunHandle { cancel, task });
    }
}

impl Shared {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_locked(&self, control: &mut Control) {
        control.generation += 1;
        if control.run.take().is_some() {
            tracing::info!("Connection task cancelled");
        }
    }

    fn set_state(&self, new_state: ConnectionState) {
        let previous = self.state_tx.send_replace(new_state);
        if previous != new_state {
            tracing::info!(from = %previous, to = %new_state, "Connection state changed");
            let _ = self.transitions.send(new_state);
        }
    }

    /// Apply a transition requested by the worker of `generation`.
    ///
    /// Returns false when that worker has been superseded and must stop.
    fn transition(&self, generation: u64, new_state: ConnectionState) -> bool {
        let control = self.lock_control();
        if control.generation != generation {
            return false;
        }
        if new_state == ConnectionState::Connected && control.credentials.is_none() {
            return false;
        }
        self.set_state(new_state);
        true
    }
}

/// Background side of one `connect()` call.
struct ConnectionWorker {
    shared: Weak<Shared>,
    transport: Arc<dyn TransportPort>,
    subscriptions: SubscriptionRegistry,
    policy: ReconnectPolicy,
    generation: u64,
}

impl ConnectionWorker {
    fn transition(&self, new_state: ConnectionState) -> bool {
        self.shared
            .upgrade()
            .map(|shared| shared.transition(self.generation, new_state))
            .unwrap_or(false)
    }

    async fn run(self, token: AuthToken, cancel: CancellationToken) {
        let mut backoff = BackoffState::new(&self.policy);

        loop {
            let attempt = tokio::select! {
                _ = cancel.cancelled() => return,
                result = self.handshake(&token) => result,
            };

            match attempt {
                Ok(mut stream) => {
                    if !self.transition(ConnectionState::Connected) {
                        return;
                    }
                    backoff.reset();

                    let reason = tokio::select! {
                        _ = cancel.cancelled() => return,
                        reason = self.pump(&mut stream) => reason,
                    };
                    tracing::warn!(%reason, "Connection lost");
                }
                Err(e) => {
                    tracing::warn!(attempt = backoff.attempts(), error = %e, "Handshake failed");
                }
            }

            let Some(delay) = backoff.next_delay_and_advance() else {
                tracing::error!(
                    attempts = backoff.attempts(),
                    "Max reconnection attempts reached, giving up"
                );
                self.transition(ConnectionState::Errored);
                return;
            };
            if !self.transition(ConnectionState::Reconnecting) {
                return;
            }
            tracing::info!(
                attempt = backoff.attempts(),
                max_attempts = backoff.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                "Scheduling reconnection attempt"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reconnection cancelled - intentional disconnect");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn handshake(&self, token: &AuthToken) -> Result<TransportStream, TransportError> {
        let timeout = self.policy.handshake_timeout;
        tokio::time::timeout(timeout, self.transport.open(token))
            .await
            .unwrap_or(Err(TransportError::Timeout(timeout)))
    }

    /// Forward inbound events until the stream ends; returns why it ended.
    async fn pump(&self, stream: &mut TransportStream) -> String {
        loop {
            match stream.next().await {
                Some(TransportSignal::Event(event)) => {
                    tracing::debug!(category = %event.category, "Inbound event");
                    self.subscriptions.dispatch(event);
                }
                Some(TransportSignal::Closed { reason }) => return reason,
                None => return "transport stream ended".to_string(),
            }
        }
    }
}
