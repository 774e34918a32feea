pub mod errors;
pub mod redact;

pub use errors::{ConfigError, RelayError};
pub use redact::redact_secret;

pub type Result<T> = std::result::Result<T, RelayError>;
