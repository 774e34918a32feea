//! Backend adapters: one protocol translator per relay service.
//!
//! Every adapter validates its credentials up front and exposes a single
//! `subscribe(topic)`. The per-backend rules (address, handshake,
//! envelope, self-echo, keepalive) live behind [`RelayProtocol`], which
//! the shared lifecycle drives.

mod achex;
mod piesocket;
mod scaledrone;
mod wss;

pub use achex::AchexAdapter;
pub use piesocket::PieSocketAdapter;
pub use scaledrone::ScaledroneAdapter;
pub use wss::WssAdapter;

use std::time::Duration;

use relayport_common::RelayError;
use serde::Serialize;
use serde_json::Value;

use crate::message::NormalizedMessage;
use crate::transport::InboundFrame;

// ---------------------------------------------------------------------------
// Protocol Contract
// ---------------------------------------------------------------------------

/// Why an inbound frame was dropped.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("unexpected frame shape: {0}")]
    UnexpectedShape(String),
}

/// What to do with a decoded inbound frame.
#[derive(Debug)]
pub(crate) enum Inbound {
    Deliver(NormalizedMessage),
    /// Our own message reflected back by the relay.
    Echo,
    /// Protocol traffic that is not a message.
    Control,
}

/// Result of feeding one frame to a pending handshake.
#[derive(Debug, PartialEq)]
pub(crate) enum HandshakeStep {
    /// Keep waiting; write these frames first.
    Pending(Vec<String>),
    Ready,
}

/// Backend-specific half of a channel.
pub(crate) trait RelayProtocol: Send + 'static {
    fn backend_name(&self) -> String;

    fn url(&self) -> String;

    /// Credential to keep out of logs.
    fn secret(&self) -> &str;

    fn envelope(&self) -> Envelope;

    /// Frames written as soon as the socket opens.
    fn greeting(&self) -> Result<Vec<String>, serde_json::Error> {
        Ok(Vec::new())
    }

    fn awaits_handshake(&self) -> bool {
        false
    }

    fn handshake(&mut self, _frame: &InboundFrame) -> Result<HandshakeStep, RelayError> {
        Ok(HandshakeStep::Ready)
    }

    fn decode(&mut self, frame: &InboundFrame) -> Result<Inbound, DecodeError>;

    fn keepalive(&self) -> Option<Duration> {
        None
    }
}

// ---------------------------------------------------------------------------
// Outbound Envelopes
// ---------------------------------------------------------------------------

/// Outbound wire format, fixed when the channel opens.
#[derive(Debug, Clone)]
pub(crate) enum Envelope {
    /// Achex `{"to":..,"msg":..}`.
    Addressed { to: String },
    /// PieSocket and the generic relay: `{"body":..}`.
    Body,
    /// Scaledrone `{"type":"publish","room":..,"message":..}`.
    RoomPublish { room: String },
}

impl Envelope {
    pub(crate) fn wrap(&self, payload: &Value) -> Result<String, serde_json::Error> {
        match self {
            Envelope::Addressed { to } => achex::addressed_frame(to, payload),
            Envelope::Body => serde_json::to_string(&BodyFrame { body: payload }),
            Envelope::RoomPublish { room } => scaledrone::publish_frame(room, payload),
        }
    }
}

#[derive(Serialize)]
struct BodyFrame<'a> {
    body: &'a Value,
}

// ---------------------------------------------------------------------------
// Shared Decoding
// ---------------------------------------------------------------------------

/// Parse a frame that must be a JSON object.
pub(crate) fn parse_object(
    frame: &InboundFrame,
) -> Result<serde_json::Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(&frame.data)? {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::UnexpectedShape(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Decode a `{"body":..}` frame. A missing body decodes as `null`.
pub(crate) fn decode_body(frame: &InboundFrame) -> Result<Inbound, DecodeError> {
    let mut json = parse_object(frame)?;
    let body = json.remove("body").unwrap_or(Value::Null);
    Ok(Inbound::Deliver(NormalizedMessage::from_frame(frame, body)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reject empty credentials before any connection attempt.
pub(crate) fn require_token(token: &str) -> Result<(), relayport_common::ConfigError> {
    if token.trim().is_empty() {
        return Err(relayport_common::ConfigError::MissingToken);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn frame(data: &str) -> InboundFrame {
        InboundFrame {
            data: data.to_string(),
            origin: "wss://demo.piesocket.com".into(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn body_envelope_wraps_payload() {
        let wire = Envelope::Body.wrap(&json!({ "x": 1 })).unwrap();
        assert_eq!(wire, r#"{"body":{"x":1}}"#);
    }

    #[test]
    fn body_frame_decodes_to_data() {
        match decode_body(&frame(r#"{"body":{"x":1}}"#)).unwrap() {
            Inbound::Deliver(message) => {
                assert_eq!(message.data, json!({ "x": 1 }));
                assert_eq!(message.origin, "wss://demo.piesocket.com");
            }
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[test]
    fn missing_body_decodes_as_null() {
        match decode_body(&frame(r#"{"other":true}"#)).unwrap() {
            Inbound::Deliver(message) => assert_eq!(message.data, Value::Null),
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[test]
    fn non_json_is_invalid() {
        assert!(matches!(
            decode_body(&frame("hello")),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn non_object_is_unexpected_shape() {
        let err = decode_body(&frame("[1,2]")).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedShape(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn blank_token_is_rejected() {
        assert!(require_token("  ").is_err());
        assert!(require_token("abc").is_ok());
    }
}
