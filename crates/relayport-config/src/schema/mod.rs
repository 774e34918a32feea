//! Configuration schema types for relayport.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod relay;
mod system;

pub use relay::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for relayport.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayportConfig {
    pub relay: RelaySection,
    pub connection: ConnectionConfig,
    pub keepalive: KeepaliveConfig,
    pub hosts: HostsConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_correct_relay() {
        let config = RelayportConfig::default();
        assert_eq!(config.relay.service, "achex");
        assert!(config.relay.token.is_empty());
        assert!(config.relay.default_topic.is_empty());
    }

    #[test]
    fn default_config_has_correct_connection() {
        let config = RelayportConfig::default();
        assert_eq!(config.connection.open_timeout_secs, 15);
        assert!(config.connection.origin.is_empty());
    }

    #[test]
    fn default_config_has_correct_keepalive() {
        let config = RelayportConfig::default();
        assert_eq!(config.keepalive.interval_secs, 45);
        assert_eq!(config.keepalive.idle_hosts, vec!["herokuapp.com".to_string()]);
    }

    #[test]
    fn default_config_has_correct_logging() {
        let config = RelayportConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.level.as_filter(), "info");
    }

    #[test]
    fn partial_toml_deserializes_with_defaults() {
        let toml_str = r#"
[relay]
service = "demo.piesocket"
token = "abc"

[logging]
level = "DEBUG"
"#;
        let config: RelayportConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.relay.service, "demo.piesocket");
        assert_eq!(config.relay.token, "abc");
        assert_eq!(config.logging.level, LogLevel::Debug);
        // Defaults preserved
        assert_eq!(config.connection.open_timeout_secs, 15);
        assert_eq!(config.keepalive.interval_secs, 45);
        assert!(config.hosts.0.contains_key("chirimentest"));
    }

    #[test]
    fn explicit_hosts_table_replaces_presets() {
        let toml_str = r#"
[hosts]
lab = "wss://relay.lab.example.org"
"#;
        let config: RelayportConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.hosts.0.len(), 1);
        assert!(!config.hosts.0.contains_key("chirimentest"));
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = RelayportConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: RelayportConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.hosts, config.hosts);
        assert_eq!(back.logging.level, config.logging.level);
    }
}
