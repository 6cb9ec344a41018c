//! A transport whose handshakes follow a script.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ports::outbound::{
    AuthToken, TransportError, TransportPort, TransportSignal, TransportStream,
};

const SCRIPTED_BUFFER: usize = 32;

enum Step {
    Accept(mpsc::Receiver<TransportSignal>),
    Fail(TransportError),
    Hang,
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    opens: usize,
    tokens: Vec<AuthToken>,
    sockets: Vec<CancellationToken>,
}

/// Each `open` consumes the next scripted step. With nothing scripted the
/// handshake is refused.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the next handshake; the returned sender feeds that connection.
    /// Dropping the sender ends the stream like a lost socket.
    pub fn accept_next(&self) -> mpsc::Sender<TransportSignal> {
        let (tx, rx) = mpsc::channel(SCRIPTED_BUFFER);
        self.lock().steps.push_back(Step::Accept(rx));
        tx
    }

    pub fn fail_next(&self, error: TransportError) {
        self.lock().steps.push_back(Step::Fail(error));
    }

    /// The next handshake never completes.
    pub fn hang_next(&self) {
        self.lock().steps.push_back(Step::Hang);
    }

    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    pub fn tokens_seen(&self) -> Vec<AuthToken> {
        self.lock().tokens.clone()
    }

    /// Accepted connections whose stream has since been dropped.
    pub fn closed_count(&self) -> usize {
        self.lock()
            .sockets
            .iter()
            .filter(|socket| socket.is_cancelled())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TransportPort for ScriptedTransport {
    async fn open(&self, token: &AuthToken) -> Result<TransportStream, TransportError> {
        let step = {
            let mut script = self.lock();
            script.opens += 1;
            script.tokens.push(token.clone());
            script.steps.pop_front()
        };

        match step {
            Some(Step::Accept(rx)) => {
                let socket = CancellationToken::new();
                self.lock().sockets.push(socket.clone());
                Ok(TransportStream::new(rx, socket))
            }
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError::Handshake("no scripted connection".into())),
        }
    }
}
