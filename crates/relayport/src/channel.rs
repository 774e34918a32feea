//! The normalized per-topic handle returned by `subscribe`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use relayport_common::RelayError;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::adapters::Envelope;
use crate::message::NormalizedMessage;
use crate::transport::SocketSender;

/// Diagnostics reported alongside, never through, the message handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// An inbound frame could not be decoded and was dropped.
    DecodeFailed { reason: String },
    /// The relay closed the connection.
    Closed,
    /// The transport failed after the channel opened.
    TransportError { reason: String },
}

type MessageHandler = Arc<dyn Fn(NormalizedMessage) + Send + Sync>;

/// Single handler slot. Last assignment wins.
#[derive(Clone, Default)]
pub(crate) struct HandlerSlot(Arc<Mutex<Option<MessageHandler>>>);

impl HandlerSlot {
    pub(crate) fn set(&self, handler: MessageHandler) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Invoke the current handler. Returns `false` when none is set.
    ///
    /// The lock is released before the call so a handler may replace
    /// itself.
    pub(crate) fn deliver(&self, message: NormalizedMessage) -> bool {
        let handler = self.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match handler {
            Some(handler) => {
                handler(message);
                true
            }
            None => false,
        }
    }
}

/// A subscribed topic on one relay backend.
///
/// Only exists once the connection (and any handshake) has completed.
/// Dropping the channel stops its background tasks and releases the
/// transport.
pub struct Channel {
    backend_name: String,
    topic: String,
    envelope: Envelope,
    sender: SocketSender,
    handler: HandlerSlot,
    diagnostics: broadcast::Sender<ChannelEvent>,
    /// Set by the dispatch task once the transport reports close or error.
    closed: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Channel {
    pub(crate) fn new(
        backend_name: String,
        topic: String,
        envelope: Envelope,
        sender: SocketSender,
        handler: HandlerSlot,
        diagnostics: broadcast::Sender<ChannelEvent>,
        closed: Arc<AtomicBool>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            backend_name,
            topic,
            envelope,
            sender,
            handler,
            diagnostics,
            closed,
            tasks,
        }
    }

    /// Name of the backend this channel runs on.
    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Install the message handler, replacing any previous one.
    ///
    /// Messages that arrive while no handler is set are dropped.
    pub fn set_message_handler<F>(&self, handler: F)
    where
        F: Fn(NormalizedMessage) + Send + Sync + 'static,
    {
        debug!(backend = %self.backend_name, topic = %self.topic, "Message handler set");
        self.handler.set(Arc::new(handler));
    }

    /// Wrap `payload` in the backend envelope and write it.
    ///
    /// Fire-and-forget: no acknowledgement, no retry. Fails with
    /// [`RelayError::Closed`] once the relay has closed the connection.
    pub fn send<T>(&self, payload: &T) -> Result<(), RelayError>
    where
        T: Serialize + ?Sized,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(RelayError::Closed);
        }
        let value = serde_json::to_value(payload)?;
        let frame = self.envelope.wrap(&value)?;
        self.sender.send(frame)
    }

    /// Subscribe to decode failures and transport state changes.
    pub fn diagnostics(&self) -> broadcast::Receiver<ChannelEvent> {
        self.diagnostics.subscribe()
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("backend_name", &self.backend_name)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
