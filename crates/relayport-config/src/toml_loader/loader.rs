//! Reading `RelayportConfig` from disk.

use std::io::ErrorKind;
use std::path::Path;

use relayport_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::RelayportConfig;
use crate::validation;

/// Parse the TOML file at `path`. Absent keys keep their defaults.
///
/// Out-of-range values are only warned about here; `load_config` is the
/// entry point that rejects them.
pub fn load_from_path(path: &Path) -> Result<RelayportConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("cannot read {}: {e}", path.display())),
    })?;

    let config: RelayportConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "Relay config has invalid values");
    }

    info!(path = %path.display(), service = %config.relay.service, "Relay config loaded");
    Ok(config)
}

/// Load from [`default_config_path`], seeding the template when the file
/// does not exist yet.
pub fn load_default() -> Result<RelayportConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(&path)?;
            Ok(RelayportConfig::default())
        }
        other => other,
    }
}
