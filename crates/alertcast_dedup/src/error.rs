//! Error types for the deduplication engine

use thiserror::Error;

/// Errors that can occur while configuring or running deduplication
#[derive(Debug, Error)]
pub enum DedupError {
    /// Missing or invalid dedup configuration; fatal at startup
    #[error("Dedup configuration error: {0}")]
    ConfigError(String),

    /// The configured key store name has no registered implementation
    #[error("Unknown key store implementation: {0}")]
    UnknownStore(String),

    /// Key derivation was attempted before the extractor factory was initialized
    #[error("Key extractor factory used before initialization")]
    ExtractorNotInitialized,

    /// The key store failed to serve a request
    #[error("Key store error: {0}")]
    StoreError(String),
}
