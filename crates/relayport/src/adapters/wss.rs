//! Generic WSS relay: `<host>/<token>/<topic>`, `{"body":..}` envelope,
//! empty-frame keepalive on idle-prone hosts.

use std::time::Duration;

use relayport_common::{ConfigError, RelayError};

use super::{decode_body, require_token, DecodeError, Envelope, Inbound, RelayProtocol};
use crate::channel::Channel;
use crate::lifecycle::Connector;
use crate::transport::InboundFrame;

/// Adapter for a self-hosted relay addressed by URL.
#[derive(Debug, Clone)]
pub struct WssAdapter {
    host: String,
    token: String,
    connector: Connector,
}

impl WssAdapter {
    /// `host` must be a `ws://` or `wss://` base URL, scheme in any case.
    /// The scheme is stored lowercase and a trailing `/` is dropped.
    pub fn new(host: &str, token: &str, connector: Connector) -> Result<Self, ConfigError> {
        let host = normalize_host(host).ok_or_else(|| ConfigError::InvalidHost(host.to_string()))?;
        require_token(token)?;
        Ok(Self {
            host,
            token: token.to_string(),
            connector,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub async fn subscribe(&self, topic: &str) -> Result<Channel, RelayError> {
        let topic = self.connector.options().resolve_topic(topic)?;
        let protocol = WssProtocol {
            url: format!("{}/{}/{}", self.host, self.token, topic),
            host: self.host.clone(),
            token: self.token.clone(),
            keepalive: self.connector.options().keepalive.interval_for(&self.host),
        };
        self.connector.open(protocol, topic).await
    }
}

fn normalize_host(host: &str) -> Option<String> {
    let (scheme, rest) = host.split_once("://")?;
    let scheme = scheme.to_ascii_lowercase();
    if scheme != "ws" && scheme != "wss" {
        return None;
    }
    Some(format!("{scheme}://{}", rest.trim_end_matches('/')))
}

struct WssProtocol {
    url: String,
    host: String,
    token: String,
    keepalive: Option<Duration>,
}

impl RelayProtocol for WssProtocol {
    fn backend_name(&self) -> String {
        self.host.clone()
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
        // Another client's keepalive.
        if frame.data.is_empty() {
            return Ok(Inbound::Control);
        }
        decode_body(frame)
    }

    fn keepalive(&self) -> Option<Duration> {
        self.keepalive
    }
}
