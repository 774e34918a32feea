//! One publish/subscribe `Channel` over several hosted WebSocket relays.
//!
//! Each backend has its own address scheme, handshake, envelope and
//! self-echo rules. The adapters in [`adapters`] translate those onto a
//! single [`Channel`] contract, and [`Relay`] picks the adapter from a
//! service identifier:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relayport::{Relay, TungsteniteProvider};
//!
//! # async fn demo() -> relayport_common::Result<()> {
//! let relay = Relay::new("demo.piesocket", "api-key", Arc::new(TungsteniteProvider::new()))?;
//! let channel = relay.subscribe("lobby").await?;
//! channel.set_message_handler(|message| println!("{}", message.data));
//! channel.send(&serde_json::json!({ "x": 1 }))?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
mod channel;
mod lifecycle;
mod message;
mod options;
mod relay;
pub mod transport;

#[cfg(test)]
mod testing;

pub use adapters::{AchexAdapter, DecodeError, PieSocketAdapter, ScaledroneAdapter, WssAdapter};
pub use channel::{Channel, ChannelEvent};
pub use lifecycle::Connector;
pub use message::NormalizedMessage;
pub use options::{KeepalivePolicy, RelayOptions};
pub use relay::{Backend, HostBindings, Relay, ServiceId};
pub use transport::{
    socket_pair, InboundFrame, PeerEmitter, Socket, SocketEvent, SocketPeer, SocketProvider,
    SocketSender, TungsteniteProvider,
};
