use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::transport::InboundFrame;

/// A message delivered to a channel's handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMessage {
    /// Payload with the backend envelope removed.
    pub data: serde_json::Value,
    /// Origin of the underlying transport connection.
    pub origin: String,
    pub time_stamp: DateTime<Utc>,
}

impl NormalizedMessage {
    /// Build a message carrying the frame's origin and receive time.
    pub(crate) fn from_frame(frame: &InboundFrame, data: serde_json::Value) -> Self {
        Self {
            data,
            origin: frame.origin.clone(),
            time_stamp: frame.received_at,
        }
    }
}
