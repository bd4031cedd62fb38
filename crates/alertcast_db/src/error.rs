//! Error types for the registration store

use thiserror::Error;

/// Errors that can occur when working with the registration store
#[derive(Debug, Error)]
pub enum DbError {
    /// Error from SQLx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Error with the database configuration
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    /// Error with database URL parsing
    #[error("Database URL error: {0}")]
    UrlError(String),

    /// Error with database pool creation
    #[error("Database pool error: {0}")]
    PoolError(String),

    /// Error with database query
    #[error("Database query error: {0}")]
    QueryError(String),

    /// A document with the same unique key is already stored
    #[error("Duplicate document key: {0}")]
    DuplicateKey(String),

    /// A stored document could not be encoded or decoded
    #[error("Document serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
