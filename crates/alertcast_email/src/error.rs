//! Error types for the email channel

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    /// Missing or invalid email configuration
    #[error("Missing configuration: {0}")]
    ConfigError(String),

    /// A sender or recipient address could not be parsed
    #[error("Invalid address {address}: {message}")]
    AddressError { address: String, message: String },

    /// The MIME message could not be assembled
    #[error("Failed to build email: {0}")]
    BuildError(String),

    /// An attachment in the alert payload is malformed
    #[error("Invalid attachment: {0}")]
    AttachmentError(String),

    /// The SMTP server rejected the message or could not be reached
    #[error("SMTP send failed: {0}")]
    TransportError(String),
}
