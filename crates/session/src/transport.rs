//! Outbound transport and the single-writer outbox

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, warn};

use crate::error::{SessionError, TransportError};
use crate::protocol::{reply, ErrorReply, Msg};

/// Something outbound messages can be written to (a WebSocket, a channel).
///
/// Implementations need not be safe for concurrent writes; the [`Outbox`]
/// serializes all access.
pub trait MessageSink: Send + 'static {
    /// Write one message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the message could not be delivered.
    fn write(&mut self, msg: Msg) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl MessageSink for mpsc::Sender<Msg> {
    async fn write(&mut self, msg: Msg) -> Result<(), TransportError> {
        self.send(msg).await.map_err(|_| TransportError::Closed)
    }
}

/// Shared, serialized writer over a [`MessageSink`].
///
/// Replies and pushes from different workers go through clones of the same
/// outbox, so at most one write is in flight at any time. Consecutive write
/// failures are counted; reaching the limit turns into a fatal
/// [`SessionError::Transport`].
pub struct Outbox<S> {
    sink: Arc<Mutex<S>>,
    failures: Arc<AtomicU32>,
    max_failures: u32,
}

impl<S> Clone for Outbox<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            failures: Arc::clone(&self.failures),
            max_failures: self.max_failures,
        }
    }
}

impl<S: MessageSink> Outbox<S> {
    pub fn new(sink: S, max_failures: u32) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            failures: Arc::new(AtomicU32::new(0)),
            max_failures: max_failures.max(1),
        }
    }

    /// Write a message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] once `max_failures` writes in a
    /// row have failed. Earlier failures are logged and swallowed.
    pub async fn send(&self, msg: Msg) -> Result<(), SessionError> {
        let kind = msg.kind.clone();
        let result = {
            let mut sink = self.sink.lock().await;
            sink.write(msg).await
        };

        match result {
            Ok(()) => {
                self.failures.store(0, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.max_failures {
                    error!("Dropping session after {} failed writes: {}", failures, err);
                    Err(SessionError::Transport(err))
                } else {
                    warn!("Failed to write '{}' ({} in a row): {}", kind, failures, err);
                    Ok(())
                }
            }
        }
    }

    /// Encode `body` as JSON content and send it under `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Serialization`] if `body` cannot be encoded,
    /// otherwise whatever [`send`](Self::send) returns.
    pub async fn reply<T: Serialize + ?Sized>(&self, kind: &'static str, body: &T) -> Result<(), SessionError> {
        let content =
            serde_json::to_string(body).map_err(|source| SessionError::Serialization { what: kind, source })?;
        self.send(Msg::new(kind, content)).await
    }

    /// Report `err`, caused by a `command` message, to the client.
    pub async fn error(&self, command: &str, err: &SessionError) -> Result<(), SessionError> {
        let body = ErrorReply {
            kind: err.kind().to_string(),
            command: command.to_string(),
            message: err.to_string(),
        };
        self.reply(reply::ERROR, &body).await
    }
}
