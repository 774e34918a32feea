//! Achex: token in the path, auth handshake, session-id echo filter.
//!
//! Every client authenticates with the topic as its user name, so a
//! message addressed `to` that name reaches every subscriber of the
//! topic, including the sender. The relay tags frames with the sender's
//! session id (`sID`), which is compared to the `SID` from the auth ack.

use relayport_common::{ConfigError, RelayError};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{parse_object, require_token, DecodeError, Envelope, HandshakeStep, Inbound, RelayProtocol};
use crate::channel::Channel;
use crate::lifecycle::Connector;
use crate::message::NormalizedMessage;
use crate::transport::InboundFrame;

const ACHEX_URL: &str = "wss://cloud.achex.ca";
const ACHEX_PASSWORD: &str = "passs";

/// Adapter for the Achex relay.
#[derive(Debug, Clone)]
pub struct AchexAdapter {
    token: String,
    connector: Connector,
}

impl AchexAdapter {
    pub fn new(token: &str, connector: Connector) -> Result<Self, ConfigError> {
        require_token(token)?;
        Ok(Self {
            token: token.to_string(),
            connector,
        })
    }

    /// Connect, authenticate as `topic`, and wait for the auth ack.
    pub async fn subscribe(&self, topic: &str) -> Result<Channel, RelayError> {
        let topic = self.connector.options().resolve_topic(topic)?;
        let protocol = AchexProtocol {
            token: self.token.clone(),
            topic: topic.to_string(),
            session_id: None,
        };
        self.connector.open(protocol, topic).await
    }
}

// ---------------------------------------------------------------------------
// Wire Frames
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AuthFrame<'a> {
    auth: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AddressedFrame<'a> {
    to: &'a str,
    msg: &'a Value,
}

pub(super) fn addressed_frame(to: &str, payload: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(&AddressedFrame { to, msg: payload })
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

struct AchexProtocol {
    token: String,
    topic: String,
    session_id: Option<Value>,
}

impl RelayProtocol for AchexProtocol {
    fn backend_name(&self) -> String {
        "achex".into()
    }

    fn url(&self) -> String {
        format!("{ACHEX_URL}/{}", self.token)
    }

    fn secret(&self) -> &str {
        &self.token
    }

    fn envelope(&self) -> Envelope {
        Envelope::Addressed {
            to: self.topic.clone(),
        }
    }

    fn greeting(&self) -> Result<Vec<String>, serde_json::Error> {
        let auth = serde_json::to_string(&AuthFrame {
            auth: &self.topic,
            password: ACHEX_PASSWORD,
        })?;
        Ok(vec![auth])
    }

    fn awaits_handshake(&self) -> bool {
        true
    }

    fn handshake(&mut self, frame: &InboundFrame) -> Result<HandshakeStep, RelayError> {
        let mut json = match parse_object(frame) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable frame during Achex auth");
                return Ok(HandshakeStep::Pending(Vec::new()));
            }
        };
        match json.get("auth").and_then(Value::as_str) {
            Some("OK") => match json.remove("SID") {
                Some(sid) if !sid.is_null() => {
                    debug!("Achex session established");
                    self.session_id = Some(sid);
                    Ok(HandshakeStep::Ready)
                }
                _ => Err(RelayError::Handshake("auth OK without SID".into())),
            },
            Some(other) => Err(RelayError::Handshake(format!("auth {other}"))),
            None => {
                debug!("Ignoring non-auth frame before Achex auth ack");
                Ok(HandshakeStep::Pending(Vec::new()))
            }
        }
    }

    fn decode(&mut self, frame: &InboundFrame) -> Result<Inbound, DecodeError> {
        let mut json = parse_object(frame)?;

        if json.contains_key("auth") {
            if json.get("auth").and_then(Value::as_str) == Some("OK") {
                if let Some(sid) = json.remove("SID").filter(|sid| !sid.is_null()) {
                    self.session_id = Some(sid);
                }
            }
            return Ok(Inbound::Control);
        }

        if let (Some(sender), Some(own)) = (json.get("sID"), self.session_id.as_ref()) {
            if same_session(sender, own) {
                return Ok(Inbound::Echo);
            }
        }

        let data = json.remove("msg").unwrap_or(Value::Null);
        Ok(Inbound::Deliver(NormalizedMessage::from_frame(frame, data)))
    }
}

/// Session ids match when their textual forms do, so `7` and `"7"` are
/// the same session.
fn same_session(a: &Value, b: &Value) -> bool {
    fn text(value: &Value) -> std::borrow::Cow<'_, str> {
        match value {
            Value::String(s) => s.as_str().into(),
            other => other.to_string().into(),
        }
    }
    text(a) == text(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RelayOptions;
    use crate::testing::{collector, connector_with, mock_provider, settle};
    use serde_json::json;

    #[test]
    fn blank_token_is_rejected() {
        let (provider, _peers) = mock_provider();
        let err = AchexAdapter::new("", connector_with(provider, RelayOptions::default()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn addressed_envelope_is_exact() {
        assert_eq!(
            addressed_frame("room1", &json!("hello")).unwrap(),
            r#"{"to":"room1","msg":"hello"}"#
        );
    }

    async fn open_achex() -> (Channel, crate::transport::SocketPeer) {
        let (provider, mut peers) = mock_provider();
        let adapter =
            AchexAdapter::new("tok", connector_with(provider, RelayOptions::default())).unwrap();
        let pending = tokio::spawn(async move { adapter.subscribe("room1").await });

        let mut peer = peers.recv().await.unwrap();
        assert_eq!(peer.url(), "wss://cloud.achex.ca/tok");
        peer.open();
        assert_eq!(
            peer.next_outbound().await.as_deref(),
            Some(r#"{"auth":"room1","password":"passs"}"#)
        );

        settle().await;
        assert!(!pending.is_finished(), "resolved before auth ack");

        peer.deliver(r#"{"auth":"OK","SID":"s1"}"#);
        let channel = pending.await.unwrap().unwrap();
        (channel, peer)
    }

    #[tokio::test]
    async fn subscribe_waits_for_auth_ack() {
        let (channel, _peer) = open_achex().await;
        assert_eq!(channel.backend_name(), "achex");
    }

    #[tokio::test]
    async fn send_addresses_topic() {
        let (channel, mut peer) = open_achex().await;
        channel.send("hello").unwrap();
        assert_eq!(
            peer.next_outbound().await.as_deref(),
            Some(r#"{"to":"room1","msg":"hello"}"#)
        );
    }

    #[tokio::test]
    async fn own_session_is_filtered() {
        let (channel, peer) = open_achex().await;
        let (handler, mut rx) = collector();
        channel.set_message_handler(handler);

        peer.deliver(r#"{"sID":"s1","msg":"mine"}"#);
        peer.deliver(r#"{"sID":"s2","msg":"theirs"}"#);

        let message = rx.recv().await.unwrap();
        assert_eq!(message.data, json!("theirs"));
        assert_eq!(message.origin, "wss://cloud.achex.ca");
        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn session_ids_compare_by_text() {
        assert!(same_session(&json!(7), &json!("7")));
        assert!(same_session(&json!("s1"), &json!("s1")));
        assert!(!same_session(&json!("s1"), &json!("s2")));
    }

    #[tokio::test]
    async fn numeric_session_id_filters_string_echo() {
        let (provider, mut peers) = mock_provider();
        let adapter =
            AchexAdapter::new("tok", connector_with(provider, RelayOptions::default())).unwrap();
        let pending = tokio::spawn(async move { adapter.subscribe("room1").await });

        let peer = peers.recv().await.unwrap();
        peer.open();
        peer.deliver(r#"{"auth":"OK","SID":42}"#);
        let channel = pending.await.unwrap().unwrap();

        let (handler, mut rx) = collector();
        channel.set_message_handler(handler);
        peer.deliver(r#"{"sID":"42","msg":"mine"}"#);
        peer.deliver(r#"{"sID":43,"msg":"theirs"}"#);

        assert_eq!(rx.recv().await.unwrap().data, json!("theirs"));
        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn late_auth_frames_update_session_and_are_not_delivered() {
        let (channel, peer) = open_achex().await;
        let (handler, mut rx) = collector();
        channel.set_message_handler(handler);

        peer.deliver(r#"{"auth":"OK","SID":"s9"}"#);
        peer.deliver(r#"{"sID":"s9","msg":"mine"}"#);
        peer.deliver(r#"{"sID":"s1","msg":"old session"}"#);

        assert_eq!(rx.recv().await.unwrap().data, json!("old session"));
    }

    #[tokio::test]
    async fn rejected_auth_fails_subscribe() {
        let (provider, mut peers) = mock_provider();
        let adapter =
            AchexAdapter::new("tok", connector_with(provider, RelayOptions::default())).unwrap();
        let pending = tokio::spawn(async move { adapter.subscribe("room1").await });

        let peer = peers.recv().await.unwrap();
        peer.open();
        peer.deliver(r#"{"auth":"FAIL"}"#);

        match pending.await.unwrap() {
            Err(RelayError::Handshake(reason)) => assert_eq!(reason, "auth FAIL"),
            other => panic!("expected handshake error, got {other:?}"),
        }
    }
}
