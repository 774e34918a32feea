//! Transport seam: a duplex, event-emitting socket.
//!
//! A [`SocketProvider`] hands back a [`Socket`] immediately, the way a
//! browser `WebSocket` constructor does, and reports progress through
//! [`SocketEvent`]s. Providers drive the far end through a
//! [`SocketPeer`] obtained from [`socket_pair`].

mod websocket;

pub use websocket::TungsteniteProvider;

use chrono::{DateTime, Utc};
use relayport_common::RelayError;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A text frame received from the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub data: String,
    /// ASCII-serialized origin of the socket URL.
    pub origin: String,
    pub received_at: DateTime<Utc>,
}

/// Progress reported by a socket, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Open,
    Message(InboundFrame),
    Closed,
    Error(String),
}

/// Opens sockets. Passed explicitly to relays and adapters.
pub trait SocketProvider: Send + Sync + 'static {
    /// Start connecting to `url`. Must not block; completion is
    /// reported as [`SocketEvent::Open`] on the returned socket.
    fn open(&self, url: &str) -> Socket;
}

// ---------------------------------------------------------------------------
// Near end
// ---------------------------------------------------------------------------

/// Outbound half of a socket. Sending never suspends.
#[derive(Debug, Clone)]
pub struct SocketSender(mpsc::UnboundedSender<String>);

impl SocketSender {
    pub fn send(&self, text: impl Into<String>) -> Result<(), RelayError> {
        self.0.send(text.into()).map_err(|_| RelayError::Closed)
    }
}

/// The caller's end of a socket.
#[derive(Debug)]
pub struct Socket {
    sender: SocketSender,
    events: mpsc::UnboundedReceiver<SocketEvent>,
}

impl Socket {
    pub fn sender(&self) -> SocketSender {
        self.sender.clone()
    }

    /// Wait for the next event. `None` once the far end is gone.
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        self.events.recv().await
    }

    pub(crate) fn into_parts(self) -> (SocketSender, mpsc::UnboundedReceiver<SocketEvent>) {
        (self.sender, self.events)
    }
}

// ---------------------------------------------------------------------------
// Far end
// ---------------------------------------------------------------------------

/// Emits events into a [`Socket`]. Every method returns `false` once the
/// socket has been dropped.
#[derive(Debug, Clone)]
pub struct PeerEmitter {
    origin: String,
    events: mpsc::UnboundedSender<SocketEvent>,
}

impl PeerEmitter {
    pub fn open(&self) -> bool {
        self.events.send(SocketEvent::Open).is_ok()
    }

    /// Deliver a text frame stamped with the current time.
    pub fn deliver(&self, data: impl Into<String>) -> bool {
        self.deliver_frame(InboundFrame {
            data: data.into(),
            origin: self.origin.clone(),
            received_at: Utc::now(),
        })
    }

    pub fn deliver_frame(&self, frame: InboundFrame) -> bool {
        self.events.send(SocketEvent::Message(frame)).is_ok()
    }

    pub fn close(&self) -> bool {
        self.events.send(SocketEvent::Closed).is_ok()
    }

    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.events.send(SocketEvent::Error(reason.into())).is_ok()
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// The provider's end of a socket.
#[derive(Debug)]
pub struct SocketPeer {
    url: String,
    emitter: PeerEmitter,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl SocketPeer {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn origin(&self) -> &str {
        self.emitter.origin()
    }

    pub fn open(&self) -> bool {
        self.emitter.open()
    }

    pub fn deliver(&self, data: impl Into<String>) -> bool {
        self.emitter.deliver(data)
    }

    pub fn close(&self) -> bool {
        self.emitter.close()
    }

    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.emitter.fail(reason)
    }

    /// Next frame written by the caller. `None` once every sender is gone.
    pub async fn next_outbound(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    pub fn try_next_outbound(&mut self) -> Option<String> {
        self.outbound.try_recv().ok()
    }

    /// Split into the event emitter and the outbound frame receiver.
    pub fn split(self) -> (PeerEmitter, mpsc::UnboundedReceiver<String>) {
        (self.emitter, self.outbound)
    }
}

/// Create a connected socket / peer pair for `url`.
pub fn socket_pair(url: &str) -> (Socket, SocketPeer) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let socket = Socket {
        sender: SocketSender(outbound_tx),
        events: events_rx,
    };
    let peer = SocketPeer {
        url: url.to_string(),
        emitter: PeerEmitter {
            origin: origin_of(url),
            events: events_tx,
        },
        outbound: outbound_rx,
    };
    (socket, peer)
}

/// Web origin of a socket URL, `"null"` when it has none.
pub(crate) fn origin_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => "null".to_string(),
    }
}
