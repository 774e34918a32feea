use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),

    #[error("service token is mandatory")]
    MissingToken,

    #[error("topic name is mandatory")]
    MissingTopic,

    #[error("unknown relay service: {0}")]
    UnknownService(String),

    #[error("relay service '{service}' does not take a sub-parameter (got '{sub}')")]
    UnexpectedSubParameter { service: String, sub: String },

    #[error("invalid relay host: {0}")]
    InvalidHost(String),
}

/// Failures surfaced by `subscribe` and `Channel::send`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out after {after:?} waiting for {url} to open")]
    OpenTimeout { url: String, after: Duration },

    #[error("handshake rejected: {0}")]
    Handshake(String),

    #[error("transport closed")]
    Closed,

    #[error("payload encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::MissingToken;
        assert_eq!(err.to_string(), "service token is mandatory");

        let err = ConfigError::UnexpectedSubParameter {
            service: "achex".into(),
            sub: "eu".into(),
        };
        assert_eq!(
            err.to_string(),
            "relay service 'achex' does not take a sub-parameter (got 'eu')"
        );
    }

    #[test]
    fn relay_error_from_config() {
        let relay_err: RelayError = ConfigError::MissingTopic.into();
        assert!(matches!(relay_err, RelayError::Config(ConfigError::MissingTopic)));
        assert_eq!(relay_err.to_string(), "topic name is mandatory");
    }

    #[test]
    fn relay_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let relay_err: RelayError = serde_err.into();
        assert!(matches!(relay_err, RelayError::Encode(_)));
    }

    #[test]
    fn relay_error_other_variants() {
        let err = RelayError::Connect("connection refused".into());
        assert_eq!(err.to_string(), "connection failed: connection refused");

        let err = RelayError::OpenTimeout {
            url: "wss://cloud.achex.ca/[REDACTED]".into(),
            after: Duration::from_secs(15),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 15s waiting for wss://cloud.achex.ca/[REDACTED] to open"
        );

        let err = RelayError::Handshake("auth FAIL".into());
        assert_eq!(err.to_string(), "handshake rejected: auth FAIL");

        assert_eq!(RelayError::Closed.to_string(), "transport closed");
    }
}
