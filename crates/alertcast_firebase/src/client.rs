//! Firebase Cloud Messaging HTTP v1 transport
//!
//! [`FirebaseClient`] posts one message per request to `messages:send` and
//! hands back the raw status and body. Interpreting the response (success,
//! stale token, other failure) is left to
//! [`classify_response`](crate::payload::classify_response), so non-2xx
//! responses are not errors at this level.

use alertcast_common::http::create_client_with_timeouts;
use alertcast_common::BoxFuture;
use alertcast_config::FirebaseConfig;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

use crate::error::FirebaseError;
use crate::payload::FcmMessage;

/// Raw HTTP outcome of one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmHttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one FCM message with a bearer token.
pub trait FcmTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        bearer_token: &'a str,
        message: &'a FcmMessage,
    ) -> BoxFuture<'a, FcmHttpResponse, FirebaseError>;
}

/// reqwest-based transport with connect and read timeouts.
#[derive(Debug, Clone)]
pub struct FirebaseClient {
    client: Client,
    send_url: String,
}

impl FirebaseClient {
    /// Creates a client for the project named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::ConfigError`] when `project_id` is missing.
    pub fn new(config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        let project_id = config
            .project_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                FirebaseError::ConfigError("Missing project_id in FirebaseConfig".to_string())
            })?;

        let client = create_client_with_timeouts(
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.read_timeout_ms),
        )?;

        Ok(Self {
            client,
            send_url: send_url(&config.api_endpoint, project_id),
        })
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }
}

/// `{endpoint}/{project_id}/messages:send`
pub fn send_url(api_endpoint: &str, project_id: &str) -> String {
    format!(
        "{}/{}/messages:send",
        api_endpoint.trim_end_matches('/'),
        project_id
    )
}

impl FcmTransport for FirebaseClient {
    fn send<'a>(
        &'a self,
        bearer_token: &'a str,
        message: &'a FcmMessage,
    ) -> BoxFuture<'a, FcmHttpResponse, FirebaseError> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.send_url)
                .header(header::AUTHORIZATION, format!("Bearer {}", bearer_token))
                .json(message)
                .send()
                .await?;

            let status = response.status().as_u16();
            let body = response.text().await?;
            debug!(status, "FCM responded");
            Ok(FcmHttpResponse { status, body })
        })
    }
}
