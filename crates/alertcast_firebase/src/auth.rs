//! Authentication for Firebase Cloud Messaging
//!
//! Access tokens are minted from a service account key file with the
//! `firebase.messaging` scope. A fresh authenticator is built for every
//! request, so nothing is cached between publishes.

use alertcast_common::BoxFuture;
use alertcast_config::FirebaseConfig;
use std::path::{Path, PathBuf};
use yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator};

use crate::error::FirebaseError;

pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Source of bearer tokens for the FCM API.
pub trait AccessTokenProvider: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, String, FirebaseError>;
}

/// Mints tokens from a Google service account key file.
#[derive(Debug, Clone)]
pub struct ServiceAccountTokenProvider {
    key_path: PathBuf,
}

impl ServiceAccountTokenProvider {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
        }
    }

    pub fn from_config(config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        let key_path = config.key_path.as_deref().ok_or_else(|| {
            FirebaseError::ConfigError("Missing key_path in FirebaseConfig".to_string())
        })?;
        Ok(Self::new(key_path))
    }
}

impl AccessTokenProvider for ServiceAccountTokenProvider {
    fn access_token(&self) -> BoxFuture<'_, String, FirebaseError> {
        Box::pin(get_firebase_auth_token(&self.key_path))
    }
}

/// Obtains an OAuth2 access token for Firebase Cloud Messaging
///
/// # Errors
///
/// This function will return an error if:
/// * The service account key file cannot be read
/// * Authentication with Google's OAuth2 service fails
/// * No token is returned from the authentication service
pub async fn get_firebase_auth_token(key_path: &Path) -> Result<String, FirebaseError> {
    let sa_key = read_service_account_key(key_path).await.map_err(|e| {
        FirebaseError::AuthError(format!(
            "Failed to read service account key {}: {}",
            key_path.display(),
            e
        ))
    })?;

    let auth = ServiceAccountAuthenticator::builder(sa_key)
        .build()
        .await
        .map_err(|e| FirebaseError::AuthError(e.to_string()))?;

    let auth_token = auth
        .token(&[FCM_SCOPE])
        .await
        .map_err(|e| FirebaseError::AuthError(e.to_string()))?;

    auth_token
        .token()
        .map(str::to_string)
        .ok_or_else(|| FirebaseError::AuthError("No token available".to_string()))
}
