//! Per-relay tuning shared by every adapter.

use std::time::Duration;

use relayport_common::ConfigError;

/// Options applied to every channel a relay opens.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// How long `subscribe` waits for open and handshake. `None` waits
    /// forever.
    pub open_timeout: Option<Duration>,
    /// Topic used when `subscribe` is given an empty one. `None` makes
    /// the topic mandatory.
    pub default_topic: Option<String>,
    pub keepalive: KeepalivePolicy,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            open_timeout: Some(Duration::from_secs(15)),
            default_topic: None,
            keepalive: KeepalivePolicy::default(),
        }
    }
}

impl RelayOptions {
    pub(crate) fn resolve_topic<'a>(&'a self, topic: &'a str) -> Result<&'a str, ConfigError> {
        if !topic.is_empty() {
            return Ok(topic);
        }
        match self.default_topic.as_deref() {
            Some(fallback) if !fallback.is_empty() => Ok(fallback),
            _ => Err(ConfigError::MissingTopic),
        }
    }
}

/// Empty-frame keepalive for hosts that close idle connections.
#[derive(Debug, Clone)]
pub struct KeepalivePolicy {
    pub interval: Duration,
    /// Substrings identifying idle-timeout-prone hosts.
    pub idle_hosts: Vec<String>,
}

impl Default for KeepalivePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(45),
            idle_hosts: vec!["herokuapp.com".into()],
        }
    }
}

impl KeepalivePolicy {
    /// The keepalive period for `host`, if it needs one.
    pub fn interval_for(&self, host: &str) -> Option<Duration> {
        self.idle_hosts
            .iter()
            .any(|marker| !marker.is_empty() && host.contains(marker.as_str()))
            .then_some(self.interval)
    }
}
