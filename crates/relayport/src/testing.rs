//! In-memory transport and helpers for unit tests.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::adapters::WssAdapter;
use crate::channel::Channel;
use crate::lifecycle::Connector;
use crate::message::NormalizedMessage;
use crate::options::RelayOptions;
use crate::transport::{socket_pair, Socket, SocketPeer, SocketProvider};

/// Hands every opened socket's far end to the test.
pub(crate) struct MockProvider {
    peers: mpsc::UnboundedSender<SocketPeer>,
}

impl SocketProvider for MockProvider {
    fn open(&self, url: &str) -> Socket {
        let (socket, peer) = socket_pair(url);
        let _ = self.peers.send(peer);
        socket
    }
}

pub(crate) fn mock_provider() -> (Arc<MockProvider>, mpsc::UnboundedReceiver<SocketPeer>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(MockProvider { peers: tx }), rx)
}

pub(crate) fn connector_with(provider: Arc<MockProvider>, options: RelayOptions) -> Connector {
    Connector::new(provider, options)
}

/// Let spawned tasks run until they block.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// A handler that forwards every message into a receiver.
pub(crate) fn collector() -> (
    impl Fn(NormalizedMessage) + Send + Sync + 'static,
    mpsc::UnboundedReceiver<NormalizedMessage>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        move |message: NormalizedMessage| {
            let _ = tx.send(message);
        },
        rx,
    )
}

/// An open `{"body":..}` channel on `ws://localhost:3000`, topic `room`.
pub(crate) async fn body_channel() -> (Channel, SocketPeer) {
    let (provider, mut peers) = mock_provider();
    let options = RelayOptions {
        open_timeout: None,
        ..Default::default()
    };
    let adapter = WssAdapter::new("ws://localhost:3000", "tok", connector_with(provider, options))
        .expect("valid host");
    let pending = tokio::spawn(async move { adapter.subscribe("room").await });

    let peer = peers.recv().await.expect("socket opened");
    peer.open();
    let channel = pending.await.expect("subscribe task").expect("channel opens");
    (channel, peer)
}
