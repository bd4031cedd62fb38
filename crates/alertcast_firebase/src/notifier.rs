//! Push delivery channel with device token lifecycle.
//!
//! Registered-user alerts are delivered to every registration the user has
//! in the registration store, grouped by platform. Alerts for non-registered
//! users carry a single token and platform in their push channel config.
//!
//! Tokens rejected by FCM as unregistered or invalid are pruned from the
//! store when they came from it.

use alertcast_common::channel::PROTOCOL_PUSH;
use alertcast_common::models::DEVICE_REGISTRATION_ENTITY;
use alertcast_common::{
    Alert, AppPlatform, ChannelConfig, ChannelMetrics, ChannelNotifier, ChannelResponse,
    DeviceRegistration, ResponseFuture,
};
use alertcast_config::FirebaseConfig;
use alertcast_db::{Document, RegistrationStore};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::{AccessTokenProvider, ServiceAccountTokenProvider};
use crate::client::{FcmTransport, FirebaseClient};
use crate::error::FirebaseError;
use crate::payload::{classify_response, FcmMessage, SendOutcome};

const SERVICE_PROVIDER: &str = "firebase";

/// Payload fields carrying the token of an unregistration event, in lookup order.
const RAW_TOKEN_FIELDS: [&str; 2] = ["token", "registrationToken"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    token: String,
    from_registry: bool,
}

type TargetGroups = BTreeMap<AppPlatform, Vec<Target>>;

pub struct PushNotifier {
    tokens: Arc<dyn AccessTokenProvider>,
    transport: Arc<dyn FcmTransport>,
    registry: Arc<dyn RegistrationStore>,
    metrics: Arc<dyn ChannelMetrics>,
}

impl PushNotifier {
    pub fn new(
        tokens: Arc<dyn AccessTokenProvider>,
        transport: Arc<dyn FcmTransport>,
        registry: Arc<dyn RegistrationStore>,
        metrics: Arc<dyn ChannelMetrics>,
    ) -> Self {
        Self {
            tokens,
            transport,
            registry,
            metrics,
        }
    }

    /// Wires the service-account token provider and the HTTP transport.
    pub fn from_config(
        config: &FirebaseConfig,
        registry: Arc<dyn RegistrationStore>,
        metrics: Arc<dyn ChannelMetrics>,
    ) -> Result<Self, FirebaseError> {
        let tokens = ServiceAccountTokenProvider::from_config(config)?;
        let transport = FirebaseClient::new(config)?;
        info!(send_url = transport.send_url(), "Push channel configured");
        Ok(Self::new(
            Arc::new(tokens),
            Arc::new(transport),
            registry,
            metrics,
        ))
    }

    async fn resolve_targets(&self, alert: &Alert) -> Result<TargetGroups, FirebaseError> {
        let mut groups = TargetGroups::new();

        if alert.is_registered_user() {
            let Some(user_id) = alert.user_id() else {
                return Ok(groups);
            };
            let filter = user_filter(user_id);
            let documents = self
                .registry
                .get_fields_by_fields(
                    &filter,
                    DEVICE_REGISTRATION_ENTITY,
                    &[
                        DeviceRegistration::TOKEN_FIELD,
                        DeviceRegistration::APP_PLATFORM_FIELD,
                    ],
                )
                .await?;
            for document in &documents {
                match DeviceRegistration::from_document(document, user_id) {
                    Some(registration) => push_target(
                        &mut groups,
                        registration.app_platform,
                        registration.token,
                        true,
                    ),
                    None => warn!(user_id, "Skipping malformed device registration"),
                }
            }
        } else if let Some(push) = &alert.channel_config.push {
            if let (Some(token), Some(platform)) = (push.token.as_deref(), push.app_platform) {
                if !token.is_empty() {
                    push_target(&mut groups, platform, token.to_string(), false);
                }
            }
        }

        Ok(groups)
    }

    /// Deletes the registration for `token`. Failures are logged.
    async fn prune(&self, platform: AppPlatform, token: &str) {
        match self
            .registry
            .delete_single_document(&token_key(token), DEVICE_REGISTRATION_ENTITY)
            .await
        {
            Ok(true) => {
                info!(token, platform = %platform, "Pruned stale device registration");
                self.metrics.record_registration_pruned(platform);
            }
            Ok(false) => debug!(token, "Stale token had no registration"),
            Err(e) => error!(token, "Failed to prune stale registration: {}", e),
        }
    }

    async fn publish(&self, alert: &Alert) -> ChannelResponse {
        let user_id = alert.user_id();

        let groups = match self.resolve_targets(alert).await {
            Ok(groups) => groups,
            Err(e) => {
                error!(device_id = %alert.device_id, "Push destination lookup failed: {}", e);
                return ChannelResponse::failure(PROTOCOL_PUSH, user_id)
                    .with_message(alert.message.body.clone())
                    .with_provider_response(e.to_string());
            }
        };

        let destinations: Vec<&str> = groups
            .values()
            .flatten()
            .map(|target| target.token.as_str())
            .collect();
        if destinations.is_empty() {
            debug!(device_id = %alert.device_id, "No push destination");
            return ChannelResponse::missing_destination(PROTOCOL_PUSH, user_id);
        }

        let bearer = match self.tokens.access_token().await {
            Ok(bearer) => bearer,
            Err(e) => {
                error!("Failed to obtain FCM access token: {}", e);
                return ChannelResponse::failure(PROTOCOL_PUSH, user_id)
                    .with_destination(&destinations)
                    .with_message(alert.message.body.clone())
                    .with_provider_response(e.to_string());
            }
        };

        let mut delivered = false;
        let mut provider_responses = Vec::new();
        for (platform, targets) in &groups {
            let mut group_delivered = false;
            for target in targets {
                let message = FcmMessage::for_platform(*platform, &target.token, alert);
                let outcome = match self.transport.send(&bearer, &message).await {
                    Ok(http) => classify_response(http.status, &http.body),
                    Err(e) => SendOutcome::Failed(e.to_string()),
                };

                match outcome {
                    SendOutcome::Delivered(name) => {
                        debug!(token = %target.token, platform = %platform, "Push delivered");
                        group_delivered = true;
                        provider_responses.push(name);
                    }
                    SendOutcome::StaleToken(reason) => {
                        warn!(token = %target.token, platform = %platform, "Stale push token: {}", reason);
                        if target.from_registry {
                            self.prune(*platform, &target.token).await;
                        }
                        provider_responses.push(reason);
                    }
                    SendOutcome::Failed(reason) => {
                        error!(token = %target.token, platform = %platform, "Push send failed: {}", reason);
                        provider_responses.push(reason);
                    }
                }
            }
            debug!(platform = %platform, delivered = group_delivered, "Push group done");
            delivered |= group_delivered;
        }

        let response = if delivered {
            ChannelResponse::success(PROTOCOL_PUSH, user_id)
        } else {
            ChannelResponse::failure(PROTOCOL_PUSH, user_id)
        };
        response
            .with_destination(&destinations)
            .with_message(alert.message.body.clone())
            .with_provider_response(provider_responses.join("; "))
    }

    async fn setup(&self, user_id: &str, config: &ChannelConfig) -> Option<ChannelResponse> {
        let push = config.push.as_ref()?;
        let Some(token) = push.token.as_deref().filter(|t| !t.is_empty()) else {
            return Some(ChannelResponse::missing_destination(PROTOCOL_PUSH, Some(user_id)));
        };
        // an enable request must be complete before the old registration goes
        let platform = match (push.enabled, push.app_platform) {
            (true, None) => {
                warn!(user_id, token, "Push registration without app platform");
                return Some(ChannelResponse::missing_destination(PROTOCOL_PUSH, Some(user_id)));
            }
            (_, platform) => platform,
        };
        let response = ChannelResponse::failure(PROTOCOL_PUSH, Some(user_id)).with_destination(&[token]);

        if let Err(e) = self
            .registry
            .delete_single_document(&token_key(token), DEVICE_REGISTRATION_ENTITY)
            .await
        {
            error!(user_id, token, "Failed to remove previous registration: {}", e);
            return Some(response.with_provider_response(e.to_string()));
        }

        if let Some(platform) = platform.filter(|_| push.enabled) {
            let registration = DeviceRegistration::new(token, user_id, platform);
            if let Err(e) = self
                .registry
                .insert_single_document(registration.to_document(), DEVICE_REGISTRATION_ENTITY)
                .await
            {
                error!(user_id, token, "Failed to store registration: {}", e);
                return Some(response.with_provider_response(e.to_string()));
            }
            info!(user_id, platform = %platform, "Registered push device");
        } else {
            info!(user_id, token, "Unregistered push device");
        }

        Some(ChannelResponse::success(PROTOCOL_PUSH, Some(user_id)).with_destination(&[token]))
    }

    async fn destroy(&self, user_id: &str, raw_event: &Value) -> Option<ChannelResponse> {
        let Some(token) = raw_token(raw_event) else {
            warn!(user_id, "Unregistration event without a token");
            return None;
        };

        match self
            .registry
            .delete_single_document(&token_key(token), DEVICE_REGISTRATION_ENTITY)
            .await
        {
            Ok(true) => {
                info!(user_id, token, "Removed push registration");
                Some(ChannelResponse::success(PROTOCOL_PUSH, Some(user_id)).with_destination(&[token]))
            }
            Ok(false) => {
                debug!(user_id, token, "No push registration to remove");
                Some(ChannelResponse::missing_destination(PROTOCOL_PUSH, Some(user_id)))
            }
            Err(e) => {
                error!(user_id, token, "Failed to remove push registration: {}", e);
                Some(
                    ChannelResponse::failure(PROTOCOL_PUSH, Some(user_id))
                        .with_destination(&[token])
                        .with_provider_response(e.to_string()),
                )
            }
        }
    }
}

impl ChannelNotifier for PushNotifier {
    fn protocol(&self) -> &str {
        PROTOCOL_PUSH
    }

    fn service_provider_name(&self) -> &str {
        SERVICE_PROVIDER
    }

    fn do_publish<'a>(&'a self, alert: &'a Alert) -> ResponseFuture<'a, ChannelResponse> {
        Box::pin(async move {
            let response = self.publish(alert).await;
            self.metrics.record_delivery(PROTOCOL_PUSH, response.status);
            response
        })
    }

    fn setup_channel<'a>(
        &'a self,
        user_id: &'a str,
        config: &'a ChannelConfig,
    ) -> ResponseFuture<'a, Option<ChannelResponse>> {
        Box::pin(self.setup(user_id, config))
    }

    fn destroy_channel<'a>(
        &'a self,
        user_id: &'a str,
        raw_event: &'a Value,
    ) -> ResponseFuture<'a, Option<ChannelResponse>> {
        Box::pin(self.destroy(user_id, raw_event))
    }
}

fn push_target(groups: &mut TargetGroups, platform: AppPlatform, token: String, from_registry: bool) {
    let targets = groups.entry(platform).or_default();
    // duplicate registrations are sent and pruned once
    if !targets.iter().any(|t| t.token == token) {
        targets.push(Target {
            token,
            from_registry,
        });
    }
}

fn user_filter(user_id: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(
        DeviceRegistration::USER_ID_FIELD.to_string(),
        Value::String(user_id.to_string()),
    );
    filter
}

fn token_key(token: &str) -> Document {
    let mut key = Document::new();
    key.insert(
        DeviceRegistration::TOKEN_FIELD.to_string(),
        Value::String(token.to_string()),
    );
    key
}

fn raw_token(raw_event: &Value) -> Option<&str> {
    RAW_TOKEN_FIELDS
        .iter()
        .find_map(|field| {
            raw_event
                .get(*field)
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
        })
}
