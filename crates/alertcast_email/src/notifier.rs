//! Email delivery channel.
//!
//! The body is assembled once per alert and sent as one message per
//! recipient. The first error stops the loop; recipients already sent to
//! are not compensated.

use alertcast_common::channel::PROTOCOL_EMAIL;
use alertcast_common::{
    Alert, ChannelConfig, ChannelMetrics, ChannelNotifier, ChannelResponse, ResponseFuture,
};
use alertcast_config::EmailConfig;
use lettre::message::Mailbox;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::EmailError;
use crate::mime::{build_body, build_message, collect_attachments, collect_inline_images, parse_mailbox};
use crate::transport::{EmailTransport, SmtpTransport};

const SERVICE_PROVIDER: &str = "smtp";

pub struct EmailNotifier {
    transport: Arc<dyn EmailTransport>,
    from: Mailbox,
    default_locale: String,
    metrics: Arc<dyn ChannelMetrics>,
}

impl EmailNotifier {
    pub fn new(
        transport: Arc<dyn EmailTransport>,
        config: &EmailConfig,
        metrics: Arc<dyn ChannelMetrics>,
    ) -> Result<Self, EmailError> {
        Ok(Self {
            transport,
            from: parse_mailbox(&config.from_address)?,
            default_locale: config.default_locale.clone(),
            metrics,
        })
    }

    /// Builds the SMTP transport described by `config`.
    pub fn from_config(
        config: &EmailConfig,
        metrics: Arc<dyn ChannelMetrics>,
    ) -> Result<Self, EmailError> {
        let transport = SmtpTransport::new(config)?;
        info!(smtp_host = %config.smtp_host, smtp_port = config.smtp_port, "Email channel configured");
        Self::new(Arc::new(transport), config, metrics)
    }

    fn locale<'a>(&'a self, alert: &'a Alert) -> &'a str {
        alert
            .user_profile
            .as_ref()
            .and_then(|profile| profile.locale.as_deref())
            .filter(|locale| !locale.is_empty())
            .unwrap_or(&self.default_locale)
    }

    /// Sends to each recipient in order and returns the server replies.
    async fn send_all(&self, alert: &Alert, recipients: &[&str]) -> Result<Vec<String>, EmailError> {
        let content = &alert.message;
        let subject = content.subject.as_deref().unwrap_or(&content.title);
        let attachments = collect_attachments(alert, self.locale(alert))?;
        let inline_images = collect_inline_images(alert)?;
        let body = build_body(content, &attachments, &inline_images)?;

        let mut replies = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let message = build_message(&self.from, parse_mailbox(recipient)?, subject, body.clone())?;
            let reply = self.transport.send(message).await?;
            debug!(recipient, reply = %reply, "Email sent");
            replies.push(reply);
        }
        Ok(replies)
    }

    async fn publish(&self, alert: &Alert) -> ChannelResponse {
        let user_id = alert.user_id();
        let recipients: Vec<&str> = alert
            .channel_config
            .email
            .as_ref()
            .map(|email| {
                email
                    .addresses
                    .iter()
                    .map(|a| a.trim())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if recipients.is_empty() {
            debug!(device_id = %alert.device_id, "No email destination");
            return ChannelResponse::missing_destination(PROTOCOL_EMAIL, user_id);
        }

        match self.send_all(alert, &recipients).await {
            Ok(replies) => ChannelResponse::success(PROTOCOL_EMAIL, user_id)
                .with_destination(&recipients)
                .with_message(alert.message.body.as_str())
                .with_provider_response(replies.join("; ")),
            Err(e) => {
                error!(device_id = %alert.device_id, event_type = %alert.event_type, "Email delivery failed: {}", e);
                ChannelResponse::failure(PROTOCOL_EMAIL, user_id)
                    .with_destination(&recipients)
                    .with_message(alert.message.body.as_str())
                    .with_provider_response(e.to_string())
            }
        }
    }
}

impl ChannelNotifier for EmailNotifier {
    fn protocol(&self) -> &str {
        PROTOCOL_EMAIL
    }

    fn service_provider_name(&self) -> &str {
        SERVICE_PROVIDER
    }

    fn do_publish<'a>(&'a self, alert: &'a Alert) -> ResponseFuture<'a, ChannelResponse> {
        Box::pin(async move {
            let response = self.publish(alert).await;
            self.metrics.record_delivery(PROTOCOL_EMAIL, response.status);
            response
        })
    }

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
