//! Scaledrone: JSON-framed handshake and room subscription.
//!
//! The channel id (token) is presented in a `handshake` frame, the relay
//! answers with our `client_id`, and a `subscribe` frame joins the room.
//! Requests carry a `callback` number that the reply echoes back.

use chrono::{DateTime, Utc};
use relayport_common::{ConfigError, RelayError};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{parse_object, require_token, DecodeError, Envelope, HandshakeStep, Inbound, RelayProtocol};
use crate::channel::Channel;
use crate::lifecycle::Connector;
use crate::message::NormalizedMessage;
use crate::transport::InboundFrame;

const SCALEDRONE_URL: &str = "wss://api.scaledrone.com/v3/websocket";

const HANDSHAKE_CALLBACK: u64 = 0;
const SUBSCRIBE_CALLBACK: u64 = 1;

/// Adapter for Scaledrone rooms.
#[derive(Debug, Clone)]
pub struct ScaledroneAdapter {
    token: String,
    connector: Connector,
}

impl ScaledroneAdapter {
    pub fn new(token: &str, connector: Connector) -> Result<Self, ConfigError> {
        require_token(token)?;
        Ok(Self {
            token: token.to_string(),
            connector,
        })
    }

    /// Connect, join `topic` as a room, and wait for the subscribe ack.
    pub async fn subscribe(&self, topic: &str) -> Result<Channel, RelayError> {
        let topic = self.connector.options().resolve_topic(topic)?;
        let protocol = ScaledroneProtocol {
            token: self.token.clone(),
            room: topic.to_string(),
            client_id: None,
        };
        self.connector.open(protocol, topic).await
    }
}

// ---------------------------------------------------------------------------
// Wire Frames
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Request<'a> {
    Handshake { channel: &'a str, callback: u64 },
    Subscribe { room: &'a str, callback: u64 },
    Publish { room: &'a str, message: &'a Value },
}

pub(super) fn publish_frame(room: &str, payload: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Request::Publish {
        room,
        message: payload,
    })
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

struct ScaledroneProtocol {
    token: String,
    room: String,
    client_id: Option<String>,
}

impl RelayProtocol for ScaledroneProtocol {
    fn backend_name(&self) -> String {
        "scaledrone".into()
    }

    fn url(&self) -> String {
        SCALEDRONE_URL.to_string()
    }

    fn secret(&self) -> &str {
        &self.token
    }

    fn envelope(&self) -> Envelope {
        Envelope::RoomPublish {
            room: self.room.clone(),
        }
    }

    fn greeting(&self) -> Result<Vec<String>, serde_json::Error> {
        let handshake = serde_json::to_string(&Request::Handshake {
            channel: &self.token,
            callback: HANDSHAKE_CALLBACK,
        })?;
        Ok(vec![handshake])
    }

    fn awaits_handshake(&self) -> bool {
        true
    }

    fn handshake(&mut self, frame: &InboundFrame) -> Result<HandshakeStep, RelayError> {
        let json = match parse_object(frame) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable frame during Scaledrone handshake");
                return Ok(HandshakeStep::Pending(Vec::new()));
            }
        };
        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            let reason = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(RelayError::Handshake(reason));
        }

        match json.get("callback").and_then(Value::as_u64) {
            Some(HANDSHAKE_CALLBACK) => {
                let client_id = json
                    .get("client_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RelayError::Handshake("handshake reply without client_id".into()))?;
                debug!(client_id = %client_id, "Scaledrone handshake accepted");
                self.client_id = Some(client_id.to_string());
                let subscribe = serde_json::to_string(&Request::Subscribe {
                    room: &self.room,
                    callback: SUBSCRIBE_CALLBACK,
                })?;
                Ok(HandshakeStep::Pending(vec![subscribe]))
            }
            Some(SUBSCRIBE_CALLBACK) if self.client_id.is_some() => {
                debug!(room = %self.room, "Scaledrone room joined");
                Ok(HandshakeStep::Ready)
            }
            _ => {
                debug!("Ignoring unrelated frame during Scaledrone handshake");
                Ok(HandshakeStep::Pending(Vec::new()))
            }
        }
    }

    fn decode(&mut self, frame: &InboundFrame) -> Result<Inbound, DecodeError> {
        let mut json = parse_object(frame)?;

        let is_publish = json.get("type").and_then(Value::as_str) == Some("publish");
        let in_room = json.get("room").and_then(Value::as_str) == Some(self.room.as_str());
        if !is_publish || !in_room {
            return Ok(Inbound::Control);
        }

        if let (Some(sender), Some(own)) = (
            json.get("client_id").and_then(Value::as_str),
            self.client_id.as_deref(),
        ) {
            if sender == own {
                return Ok(Inbound::Echo);
            }
        }

        let data = json.remove("message").unwrap_or(Value::Null);
        let mut message = NormalizedMessage::from_frame(frame, data);
        if let Some(sent_at) = json.get("timestamp").and_then(timestamp_of) {
            message.time_stamp = sent_at;
        }
        Ok(Inbound::Deliver(message))
    }
}

/// Unix seconds to a UTC time. Out-of-range values are ignored.
fn timestamp_of(value: &Value) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.as_i64()?, 0)
}
