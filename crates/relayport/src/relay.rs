//! Service identifier → backend adapter.

use std::collections::BTreeMap;
use std::sync::Arc;

use relayport_common::{ConfigError, RelayError};
use tracing::debug;

use crate::adapters::{AchexAdapter, PieSocketAdapter, ScaledroneAdapter, WssAdapter};
use crate::channel::Channel;
use crate::lifecycle::Connector;
use crate::options::RelayOptions;
use crate::transport::SocketProvider;

// ---------------------------------------------------------------------------
// Host Bindings
// ---------------------------------------------------------------------------

/// Names that stand for a generic relay host, e.g. `chirimentest`.
///
/// Names are matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBindings(BTreeMap<String, String>);

impl HostBindings {
    /// No bindings at all.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, name: &str, host: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), host.into());
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

impl Default for HostBindings {
    fn default() -> Self {
        let mut bindings = Self::new();
        bindings.insert("chirimentest", "wss://chirimen-web-socket-relay.herokuapp.com");
        bindings.insert("chirimentestlocal", "ws://localhost:3000");
        bindings
    }
}

impl From<BTreeMap<String, String>> for HostBindings {
    fn from(map: BTreeMap<String, String>) -> Self {
        let mut bindings = Self::new();
        for (name, host) in map {
            bindings.insert(&name, host);
        }
        bindings
    }
}

// ---------------------------------------------------------------------------
// Service Identifiers
// ---------------------------------------------------------------------------

/// A parsed service identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceId {
    Achex,
    PieSocket { cluster: Option<String> },
    Scaledrone,
    Wss { host: String },
}

impl ServiceId {
    /// Parse `identifier`:
    ///
    /// - `ws://…` / `wss://…` is a generic relay host;
    /// - a bound name resolves to its host;
    /// - `<sub>.piesocket` selects a PieSocket cluster;
    /// - `achex`, `piesocket` and `scaledrone` select that backend.
    pub fn parse(identifier: &str, bindings: &HostBindings) -> Result<Self, ConfigError> {
        let identifier = identifier.trim();
        let lower = identifier.to_ascii_lowercase();

        if lower.starts_with("wss://") || lower.starts_with("ws://") {
            return Ok(ServiceId::Wss {
                host: identifier.to_string(),
            });
        }
        if let Some(host) = bindings.resolve(&lower) {
            return Ok(ServiceId::Wss {
                host: host.to_string(),
            });
        }

        let (sub, name) = match lower.rfind('.') {
            Some(dot) if dot > 0 => (Some(&lower[..dot]), &lower[dot + 1..]),
            _ => (None, lower.as_str()),
        };

        match (name, sub) {
            ("piesocket", cluster) => Ok(ServiceId::PieSocket {
                cluster: cluster.map(str::to_string),
            }),
            (service @ ("achex" | "scaledrone"), Some(sub)) => {
                Err(ConfigError::UnexpectedSubParameter {
                    service: service.to_string(),
                    sub: sub.to_string(),
                })
            }
            ("achex", None) => Ok(ServiceId::Achex),
            ("scaledrone", None) => Ok(ServiceId::Scaledrone),
            _ => Err(ConfigError::UnknownService(identifier.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// The adapter a relay dispatches to.
#[derive(Debug, Clone)]
pub enum Backend {
    Achex(AchexAdapter),
    PieSocket(PieSocketAdapter),
    Scaledrone(ScaledroneAdapter),
    Wss(WssAdapter),
}

impl Backend {
    fn build(service: ServiceId, token: &str, connector: Connector) -> Result<Self, ConfigError> {
        Ok(match service {
            ServiceId::Achex => Backend::Achex(AchexAdapter::new(token, connector)?),
            ServiceId::PieSocket { cluster } => {
                Backend::PieSocket(PieSocketAdapter::new(cluster.as_deref(), token, connector)?)
            }
            ServiceId::Scaledrone => Backend::Scaledrone(ScaledroneAdapter::new(token, connector)?),
            ServiceId::Wss { host } => Backend::Wss(WssAdapter::new(&host, token, connector)?),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Backend::Achex(_) => "achex",
            Backend::PieSocket(_) => "piesocket",
            Backend::Scaledrone(_) => "scaledrone",
            Backend::Wss(adapter) => adapter.host(),
        }
    }

    pub async fn subscribe(&self, topic: &str) -> Result<Channel, RelayError> {
        match self {
            Backend::Achex(adapter) => adapter.subscribe(topic).await,
            Backend::PieSocket(adapter) => adapter.subscribe(topic).await,
            Backend::Scaledrone(adapter) => adapter.subscribe(topic).await,
            Backend::Wss(adapter) => adapter.subscribe(topic).await,
        }
    }
}

/// Entry point: pick a backend by name, then `subscribe` to topics on it.
#[derive(Debug, Clone)]
pub struct Relay {
    backend: Backend,
}

impl Relay {
    /// Default host bindings and options.
    pub fn new(
        service: &str,
        token: &str,
        provider: Arc<dyn SocketProvider>,
    ) -> Result<Self, ConfigError> {
        Self::configured(
            service,
            token,
            provider,
            &HostBindings::default(),
            RelayOptions::default(),
        )
    }

    pub fn configured(
        service: &str,
        token: &str,
        provider: Arc<dyn SocketProvider>,
        bindings: &HostBindings,
        options: RelayOptions,
    ) -> Result<Self, ConfigError> {
        let id = ServiceId::parse(service, bindings)?;
        debug!(service = %service, resolved = ?id, "Resolved relay service");
        let backend = Backend::build(id, token, Connector::new(provider, options))?;
        Ok(Self { backend })
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Open a channel for `topic`. Resolves once the backend is ready.
    pub async fn subscribe(&self, topic: &str) -> Result<Channel, RelayError> {
        self.backend.subscribe(topic).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_provider;

    fn parse(identifier: &str) -> Result<ServiceId, ConfigError> {
        ServiceId::parse(identifier, &HostBindings::default())
    }

    #[test]
    fn identifier_table() {
        assert_eq!(parse("achex").unwrap(), ServiceId::Achex);
        assert_eq!(parse("Scaledrone").unwrap(), ServiceId::Scaledrone);
        assert_eq!(
            parse("piesocket").unwrap(),
            ServiceId::PieSocket { cluster: None }
        );
        assert_eq!(
            parse("Demo.PieSocket").unwrap(),
            ServiceId::PieSocket {
                cluster: Some("demo".into())
            }
        );
        assert_eq!(
            parse("s1.eu.piesocket").unwrap(),
            ServiceId::PieSocket {
                cluster: Some("s1.eu".into())
            }
        );
        assert_eq!(
            parse("wss://relay.example.org").unwrap(),
            ServiceId::Wss {
                host: "wss://relay.example.org".into()
            }
        );
        assert_eq!(
            parse("chirimentest").unwrap(),
            ServiceId::Wss {
                host: "wss://chirimen-web-socket-relay.herokuapp.com".into()
            }
        );
        assert_eq!(
            parse("ChirimenTestLocal").unwrap(),
            ServiceId::Wss {
                host: "ws://localhost:3000".into()
            }
        );
    }

    #[test]
    fn sub_parameter_only_for_piesocket() {
        match parse("x.achex").unwrap_err() {
            ConfigError::UnexpectedSubParameter { service, sub } => {
                assert_eq!(service, "achex");
                assert_eq!(sub, "x");
            }
            other => panic!("expected sub-parameter error, got {other:?}"),
        }
        assert!(matches!(
            parse("x.scaledrone"),
            Err(ConfigError::UnexpectedSubParameter { .. })
        ));
    }

    #[test]
    fn unknown_services_are_rejected() {
        for identifier in ["pusher", "", ".piesocket", "demo.pusher"] {
            assert!(
                matches!(parse(identifier), Err(ConfigError::UnknownService(_))),
                "{identifier:?} should be unknown"
            );
        }
    }

    #[test]
    fn custom_bindings_replace_presets() {
        let mut bindings = HostBindings::new();
        bindings.insert("Lab", "wss://lab.example.org");

        assert_eq!(
            ServiceId::parse("lab", &bindings).unwrap(),
            ServiceId::Wss {
                host: "wss://lab.example.org".into()
            }
        );
        assert!(ServiceId::parse("chirimentest", &bindings).is_err());
    }

    #[test]
    fn relay_picks_backend() {
        let (provider, _peers) = mock_provider();
        let relay = Relay::new("demo.piesocket", "abc", provider.clone()).unwrap();
        assert!(matches!(relay.backend(), Backend::PieSocket(_)));
        assert_eq!(relay.backend().name(), "piesocket");

        let relay = Relay::new("chirimentestlocal", "tok", provider).unwrap();
        assert_eq!(relay.backend().name(), "ws://localhost:3000");
    }

    #[test]
    fn uppercase_scheme_builds_relay_backend() {
        let (provider, _peers) = mock_provider();
        let relay = Relay::new("WSS://relay.example.org", "tok", provider).unwrap();
        assert!(matches!(relay.backend(), Backend::Wss(_)));
        assert_eq!(relay.backend().name(), "wss://relay.example.org");
    }

    #[test]
    fn token_is_mandatory_for_every_backend() {
        let (provider, _peers) = mock_provider();
        for service in ["achex", "piesocket", "demo.piesocket", "scaledrone", "chirimentest"] {
            assert!(
                matches!(
                    Relay::new(service, "", provider.clone()),
                    Err(ConfigError::MissingToken)
                ),
                "{service} accepted an empty token"
            );
        }
    }

    #[test]
    fn bound_host_must_be_websocket_url() {
        let (provider, _peers) = mock_provider();
        let mut bindings = HostBindings::new();
        bindings.insert("broken", "http://example.org");
        let err = Relay::configured("broken", "tok", provider, &bindings, RelayOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHost(_)));
    }

    #[tokio::test]
    async fn default_topic_used_for_empty_topic() {
        let (provider, mut peers) = mock_provider();
        let options = RelayOptions {
            open_timeout: None,
            default_topic: Some("chirimenSocket".into()),
            ..Default::default()
        };
        let relay = Relay::configured(
            "chirimentestlocal",
            "tok",
            provider,
            &HostBindings::default(),
            options,
        )
        .unwrap();

        let pending = tokio::spawn(async move { relay.subscribe("").await });
        let peer = peers.recv().await.unwrap();
        assert_eq!(peer.url(), "ws://localhost:3000/tok/chirimenSocket");
        peer.open();

        let channel = pending.await.unwrap().unwrap();
        assert_eq!(channel.topic(), "chirimenSocket");
    }
}
