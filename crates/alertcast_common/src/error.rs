// --- File: crates/alertcast_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type for startup wiring and orchestration.
///
/// Each crate keeps its own error enum; the backend converts them into this
/// type while wiring the application together.
#[derive(Error, Debug)]
pub enum AlertcastError {
    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred during a registration store operation
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, AlertcastError>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Adds context to an error with a lazy context provider.
    fn with_context<C, F>(self, f: F) -> Result<T, AlertcastError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, AlertcastError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| AlertcastError::InternalError(format!("{}: {}", context, error)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, AlertcastError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| AlertcastError::InternalError(format!("{}: {}", f(), error)))
    }
}

// Common error conversions
impl From<serde_json::Error> for AlertcastError {
    fn from(err: serde_json::Error) -> Self {
        AlertcastError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for AlertcastError {
    fn from(err: std::io::Error) -> Self {
        AlertcastError::InternalError(err.to_string())
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> AlertcastError {
    AlertcastError::ConfigError(message.to_string())
}

pub fn internal_error<T: fmt::Display>(message: T) -> AlertcastError {
    AlertcastError::InternalError(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_source_error() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "alerts.json",
        ));
        let err = result.context("reading alert batch").unwrap_err();
        assert_eq!(err.to_string(), "Internal error: reading alert batch: alerts.json");
    }
}
