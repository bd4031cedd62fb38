//! Error types for the SMS channel

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmsError {
    /// Missing or invalid SMS configuration
    #[error("Missing configuration: {0}")]
    ConfigError(String),

    /// The SMS provider rejected or failed a request
    #[error("SMS provider error: {0}")]
    ProviderError(String),
}
