//! Relay service, connection, keepalive and host-binding configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which relay service to use and how to authenticate with it.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySection {
    /// Service identifier: `achex`, `piesocket`, `<cluster>.piesocket`,
    /// `scaledrone`, a `wss://` URL, or a name from `[hosts]`.
    pub service: String,
    /// Service token (API key, channel id, or relay token).
    pub token: String,
    /// Topic used when none is given. Empty means a topic is required.
    pub default_topic: String,
}

impl std::fmt::Debug for RelaySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySection")
            .field("service", &self.service)
            .field("token", &"[REDACTED]")
            .field("default_topic", &self.default_topic)
            .finish()
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            service: "achex".into(),
            token: String::new(),
            default_topic: String::new(),
        }
    }
}

/// Transport connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Seconds to wait for open + handshake. 0 waits forever.
    pub open_timeout_secs: u32,
    /// `Origin` header sent with the WebSocket upgrade. Empty sends none.
    pub origin: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            open_timeout_secs: 15,
            origin: String::new(),
        }
    }
}

/// Keepalive emulation for hosts that drop idle connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    pub interval_secs: u32,
    /// Host substrings that mark an idle-timeout-prone deployment.
    pub idle_hosts: Vec<String>,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval_secs: 45,
            idle_hosts: vec!["herokuapp.com".into()],
        }
    }
}

/// Named relay hosts usable as service identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HostsConfig(pub BTreeMap<String, String>);

impl Default for HostsConfig {
    fn default() -> Self {
        let mut hosts = BTreeMap::new();
        hosts.insert(
            "chirimentest".into(),
            "wss://chirimen-web-socket-relay.herokuapp.com".into(),
        );
        hosts.insert("chirimentestlocal".into(), "ws://localhost:3000".into());
        Self(hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_section_debug_redacts_token() {
        let section = RelaySection {
            token: "s3cret".into(),
            ..Default::default()
        };
        let debug = format!("{section:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_hosts_cover_both_presets() {
        let hosts = HostsConfig::default();
        assert_eq!(
            hosts.0.get("chirimentest").map(String::as_str),
            Some("wss://chirimen-web-socket-relay.herokuapp.com")
        );
        assert_eq!(
            hosts.0.get("chirimentestlocal").map(String::as_str),
            Some("ws://localhost:3000")
        );
    }

    #[test]
    fn hosts_deserialize_as_plain_table() {
        let hosts: HostsConfig = toml::from_str("lab = \"wss://lab.example.org\"").unwrap();
        assert_eq!(hosts.0.len(), 1);
        assert_eq!(hosts.0["lab"], "wss://lab.example.org");
    }
}
