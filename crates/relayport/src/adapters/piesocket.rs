//! PieSocket: cluster and API key in the URL, `{"body":..}` envelope.

use relayport_common::{ConfigError, RelayError};

use super::{decode_body, require_token, DecodeError, Envelope, Inbound, RelayProtocol};
use crate::channel::Channel;
use crate::lifecycle::Connector;
use crate::transport::InboundFrame;

const DEFAULT_CLUSTER: &str = "demo";

/// Adapter for PieSocket channels.
#[derive(Debug, Clone)]
pub struct PieSocketAdapter {
    cluster: String,
    token: String,
    connector: Connector,
}

impl PieSocketAdapter {
    /// `cluster` defaults to `demo` and is matched case-insensitively.
    pub fn new(
        cluster: Option<&str>,
        token: &str,
        connector: Connector,
    ) -> Result<Self, ConfigError> {
        require_token(token)?;
        let cluster = cluster
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CLUSTER)
            .to_ascii_lowercase();
        Ok(Self {
            cluster,
            token: token.to_string(),
            connector,
        })
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub async fn subscribe(&self, topic: &str) -> Result<Channel, RelayError> {
        let topic = self.connector.options().resolve_topic(topic)?;
        let protocol = PieSocketProtocol {
            url: channel_url(&self.cluster, &self.token, topic),
            token: self.token.clone(),
        };
        self.connector.open(protocol, topic).await
    }
}

fn channel_url(cluster: &str, token: &str, topic: &str) -> String {
    format!("wss://{cluster}.piesocket.com/v3/{topic}?apiKey={token}")
}

struct PieSocketProtocol {
    url: String,
    token: String,
}

impl RelayProtocol for PieSocketProtocol {
    fn backend_name(&self) -> String {
        "piesocket".into()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn secret(&self) -> &str {
        &self.token
    }

    fn envelope(&self) -> Envelope {
        Envelope::Body
    }

    fn decode(&mut self, frame: &InboundFrame) -> Result<Inbound, DecodeError> {
        decode_body(frame)
    }
}
