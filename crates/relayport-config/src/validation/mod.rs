//! Full configuration validation.
//!
//! Each area has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod hosts;


use crate::schema::RelayportConfig;
use relayport_common::ConfigError;

use helpers::validate_range;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RelayportConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_range(
        &mut errors,
        "connection.open_timeout_secs",
        config.connection.open_timeout_secs,
        0..=300,
    );
    validate_range(
        &mut errors,
        "keepalive.interval_secs",
        config.keepalive.interval_secs,
        5..=55,
    );
    if config.keepalive.idle_hosts.iter().any(|h| h.trim().is_empty()) {
        errors.push("keepalive.idle_hosts contains an empty entry".into());
    }

    hosts::validate_hosts(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
