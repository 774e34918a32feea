//! Shared channel lifecycle: open, handshake, dispatch, keepalive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use relayport_common::{redact_secret, RelayError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::adapters::{HandshakeStep, Inbound, RelayProtocol};
use crate::channel::{Channel, ChannelEvent, HandlerSlot};
use crate::options::RelayOptions;
use crate::transport::{SocketEvent, SocketProvider, SocketSender};

/// Socket provider plus options, shared by the adapters of one relay.
#[derive(Clone)]
pub struct Connector {
    provider: Arc<dyn SocketProvider>,
    options: RelayOptions,
}

impl Connector {
    pub fn new(provider: Arc<dyn SocketProvider>, options: RelayOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    pub(crate) async fn open<P: RelayProtocol>(
        &self,
        protocol: P,
        topic: &str,
    ) -> Result<Channel, RelayError> {
        open_channel(self.provider.as_ref(), &self.options, protocol, topic).await
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Open
// ---------------------------------------------------------------------------

async fn open_channel<P: RelayProtocol>(
    provider: &dyn SocketProvider,
    options: &RelayOptions,
    mut protocol: P,
    topic: &str,
) -> Result<Channel, RelayError> {
    let url = protocol.url();
    let log_url = redact_secret(&url, protocol.secret());
    let backend_name = protocol.backend_name();
    info!(backend = %backend_name, url = %log_url, topic = %topic, "Opening relay channel");

    let (sender, mut events) = provider.open(&url).into_parts();

    let opening = establish(&mut protocol, &sender, &mut events);
    match options.open_timeout {
        Some(limit) => tokio::time::timeout(limit, opening)
            .await
            .map_err(|_| {
                warn!(backend = %backend_name, url = %log_url, "Relay did not open in time");
                RelayError::OpenTimeout {
                    url: log_url.clone(),
                    after: limit,
                }
            })??,
        None => opening.await?,
    }

    let envelope = protocol.envelope();
    let keepalive = protocol.keepalive();
    let handler = HandlerSlot::default();
    let (diagnostics, _) = broadcast::channel(64);
    let closed = Arc::new(AtomicBool::new(false));

    let mut tasks = Vec::with_capacity(2);
    let mut keepalive_task = None;
    if let Some(period) = keepalive {
        info!(backend = %backend_name, period_secs = period.as_secs(), "Keepalive enabled");
        let task = tokio::spawn(keepalive_loop(sender.clone(), period, closed.clone()));
        keepalive_task = Some(task.abort_handle());
        tasks.push(task);
    }
    tasks.push(tokio::spawn(dispatch(
        protocol,
        events,
        handler.clone(),
        diagnostics.clone(),
        Teardown {
            closed: closed.clone(),
            keepalive: keepalive_task,
        },
    )));

    info!(backend = %backend_name, topic = %topic, "Channel opened");
    Ok(Channel::new(
        backend_name,
        topic.to_string(),
        envelope,
        sender,
        handler,
        diagnostics,
        closed,
        tasks,
    ))
}

/// Wait for the socket to open, then run the backend handshake.
async fn establish<P: RelayProtocol>(
    protocol: &mut P,
    sender: &SocketSender,
    events: &mut mpsc::UnboundedReceiver<SocketEvent>,
) -> Result<(), RelayError> {
    loop {
        match events.recv().await {
            Some(SocketEvent::Open) => break,
            Some(SocketEvent::Message(_)) => debug!("Ignoring frame received before open"),
            Some(SocketEvent::Error(reason)) => return Err(RelayError::Connect(reason)),
            Some(SocketEvent::Closed) | None => {
                return Err(RelayError::Connect("transport closed before open".into()))
            }
        }
    }

    for frame in protocol.greeting()? {
        sender.send(frame)?;
    }
    if !protocol.awaits_handshake() {
        return Ok(());
    }

    loop {
        match events.recv().await {
            Some(SocketEvent::Message(frame)) => match protocol.handshake(&frame)? {
                HandshakeStep::Ready => return Ok(()),
                HandshakeStep::Pending(replies) => {
                    for reply in replies {
                        sender.send(reply)?;
                    }
                }
            },
            Some(SocketEvent::Open) => {}
            Some(SocketEvent::Error(reason)) => return Err(RelayError::Connect(reason)),
            Some(SocketEvent::Closed) | None => {
                return Err(RelayError::Connect("transport closed during handshake".into()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// What to shut down once the transport is gone.
struct Teardown {
    closed: Arc<AtomicBool>,
    keepalive: Option<AbortHandle>,
}

impl Teardown {
    fn run(self) {
        self.closed.store(true, Ordering::Release);
        if let Some(keepalive) = self.keepalive {
            keepalive.abort();
        }
    }
}

/// Translate socket events into handler calls, in delivery order.
async fn dispatch<P: RelayProtocol>(
    mut protocol: P,
    mut events: mpsc::UnboundedReceiver<SocketEvent>,
    handler: HandlerSlot,
    diagnostics: broadcast::Sender<ChannelEvent>,
    teardown: Teardown,
) {
    let backend = protocol.backend_name();
    while let Some(event) = events.recv().await {
        match event {
            SocketEvent::Message(frame) => match protocol.decode(&frame) {
                Ok(Inbound::Deliver(message)) => {
                    if !handler.deliver(message) {
                        debug!(backend = %backend, "No message handler set, dropping message");
                    }
                }
                Ok(Inbound::Echo) => trace!(backend = %backend, "Dropped self-echo"),
                Ok(Inbound::Control) => trace!(backend = %backend, "Control frame"),
                Err(e) => {
                    warn!(backend = %backend, error = %e, "Dropping undecodable frame");
                    let _ = diagnostics.send(ChannelEvent::DecodeFailed {
                        reason: e.to_string(),
                    });
                }
            },
            SocketEvent::Open => {}
            SocketEvent::Closed => {
                info!(backend = %backend, "Relay closed channel");
                teardown.run();
                let _ = diagnostics.send(ChannelEvent::Closed);
                return;
            }
            SocketEvent::Error(reason) => {
                warn!(backend = %backend, error = %reason, "Transport error");
                teardown.run();
                let _ = diagnostics.send(ChannelEvent::TransportError { reason });
                return;
            }
        }
    }
    debug!(backend = %backend, "Socket dropped its event stream");
    teardown.run();
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Write an empty frame every `period` while the connection is open.
async fn keepalive_loop(sender: SocketSender, period: Duration, closed: Arc<AtomicBool>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if closed.load(Ordering::Acquire) || sender.send(String::new()).is_err() {
            debug!("Keepalive stopped, transport gone");
            break;
        }
        trace!("Keepalive frame sent");
    }
}
