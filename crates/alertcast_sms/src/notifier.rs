//! SMS delivery channel.
//!
//! One provider request per phone number, sent in order. The default SMS
//! type attribute is set once before the first send. The backend builds a
//! single notifier per process, so once per notifier is once per process.

use alertcast_common::channel::PROTOCOL_SMS;
use alertcast_common::{
    Alert, ChannelConfig, ChannelMetrics, ChannelNotifier, ChannelResponse, ResponseFuture,
};
use alertcast_config::SmsConfig;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::credentials::sns_client;
use crate::error::SmsError;
use crate::gateway::{SmsGateway, SnsGateway};

const SERVICE_PROVIDER: &str = "aws-sns";

/// Alert attribute overriding the configured sender id.
pub const SENDER_ID_ATTRIBUTE: &str = "senderId";

pub struct SmsNotifier {
    gateway: Arc<dyn SmsGateway>,
    sms_type: String,
    default_sender_id: Option<String>,
    /// Guards the account-level SMS type attribute. `AppState` owns the only
    /// notifier, which makes this guard process-wide in practice.
    sms_type_set: OnceCell<()>,
    metrics: Arc<dyn ChannelMetrics>,
}

impl SmsNotifier {
    pub fn new(
        gateway: Arc<dyn SmsGateway>,
        config: &SmsConfig,
        metrics: Arc<dyn ChannelMetrics>,
    ) -> Self {
        Self {
            gateway,
            sms_type: config.sms_type.clone(),
            default_sender_id: config.default_sender_id.clone(),
            sms_type_set: OnceCell::new(),
            metrics,
        }
    }

    /// Builds the SNS gateway, assuming the configured role if any.
    pub async fn from_config(
        config: &SmsConfig,
        metrics: Arc<dyn ChannelMetrics>,
    ) -> Result<Self, SmsError> {
        let client = sns_client(config).await?;
        info!(region = %config.region, "SMS channel configured");
        Ok(Self::new(Arc::new(SnsGateway::new(client)), config, metrics))
    }

    /// Sets the SMS type once; a failed attempt is retried on the next call.
    async fn ensure_sms_type(&self) {
        let result = self
            .sms_type_set
            .get_or_try_init(|| self.gateway.set_sms_type(&self.sms_type))
            .await;
        if let Err(e) = result {
            warn!(sms_type = %self.sms_type, "Could not set default SMS type: {}", e);
        }
    }

    fn sender_id<'a>(&'a self, alert: &'a Alert) -> Option<&'a str> {
        alert
            .attributes
            .get(SENDER_ID_ATTRIBUTE)
            .and_then(Value::as_str)
            .or(self.default_sender_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    async fn publish(&self, alert: &Alert) -> ChannelResponse {
        let user_id = alert.user_id();
        let numbers: Vec<&str> = alert
            .channel_config
            .sms
            .as_ref()
            .map(|sms| {
                sms.phone_numbers
                    .iter()
                    .map(|n| n.trim())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if numbers.is_empty() {
            debug!(device_id = %alert.device_id, "No SMS destination");
            return ChannelResponse::missing_destination(PROTOCOL_SMS, user_id);
        }

        self.ensure_sms_type().await;

        let text = alert.message.body.as_str();
        let sender_id = self.sender_id(alert);
        let mut outcomes = Vec::with_capacity(numbers.len());
        for number in &numbers {
            match self.gateway.send_sms(number, text, sender_id).await {
                Ok(message_id) => {
                    debug!(phone_number = number, message_id = %message_id, "SMS sent");
                    outcomes.push(format!("{number}: {message_id}"));
                }
                Err(e) => {
                    error!(phone_number = number, "SMS send failed: {}", e);
                    outcomes.push(format!("{number}: failed: {e}"));
                }
            }
        }

        // Reaching the end of the loop counts as success; per-number
        // outcomes are only reported in the provider response.
        ChannelResponse::success(PROTOCOL_SMS, user_id)
            .with_destination(&numbers)
            .with_message(text)
            .with_provider_response(outcomes.join("; "))
    }
}

impl ChannelNotifier for SmsNotifier {
    fn protocol(&self) -> &str {
        PROTOCOL_SMS
    }

    fn service_provider_name(&self) -> &str {
        SERVICE_PROVIDER
    }

    fn do_publish<'a>(&'a self, alert: &'a Alert) -> ResponseFuture<'a, ChannelResponse> {
        Box::pin(async move {
            let response = self.publish(alert).await;
            self.metrics.record_delivery(PROTOCOL_SMS, response.status);
            response
        })
    }

    // Phone numbers travel with each alert; nothing to provision.
    fn setup_channel<'a>(
        &'a self,
        _user_id: &'a str,
        _config: &'a ChannelConfig,
    ) -> ResponseFuture<'a, Option<ChannelResponse>> {
        Box::pin(async { None })
    }

    fn destroy_channel<'a>(
        &'a self,
        _user_id: &'a str,
        _raw_event: &'a Value,
    ) -> ResponseFuture<'a, Option<ChannelResponse>> {
        Box::pin(async { None })
    }
}
