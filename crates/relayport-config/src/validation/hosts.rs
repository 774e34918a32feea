//! Validation for `[hosts]` bindings and the relay identifier.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::RelayportConfig;

/// A relay host: ws or wss scheme (any case) followed by a non-empty
/// authority.
static HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:wss?)://[^/\s]+(/\S*)?$").unwrap()
});

pub(crate) fn is_relay_host(value: &str) -> bool {
    HOST_RE.is_match(value)
}

/// Validate host bindings and a URL-shaped `relay.service`.
pub(crate) fn validate_hosts(errors: &mut Vec<String>, config: &RelayportConfig) {
    for (name, host) in &config.hosts.0 {
        if name.is_empty() || name.contains('.') {
            errors.push(format!("hosts.{name}: binding names must be non-empty and contain no '.'"));
        }
        if !is_relay_host(host) {
            errors.push(format!("hosts.{name} = {host:?} is not a ws:// or wss:// URL"));
        }
    }

    let service = config.relay.service.trim();
    if service.is_empty() {
        errors.push("relay.service must not be empty".into());
    } else if service.contains("://") && !is_relay_host(service) {
        errors.push(format!("relay.service = {service:?} is not a ws:// or wss:// URL"));
    }
}
