//! Error types for the push channel

use alertcast_db::DbError;
use thiserror::Error;

/// Errors that can occur when interacting with Firebase Cloud Messaging
#[derive(Error, Debug)]
pub enum FirebaseError {
    /// Error during authentication with Firebase
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error during HTTP request to Firebase API
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Missing required configuration
    #[error("Missing configuration: {0}")]
    ConfigError(String),

    /// The registration store failed
    #[error("Registration store error: {0}")]
    RegistryError(#[from] DbError),
}
