//! SMS provider seam and its Amazon SNS implementation.

use alertcast_common::BoxFuture;
use aws_sdk_sns::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_sns::types::MessageAttributeValue;
use tracing::debug;

use crate::error::SmsError;

const SMS_TYPE_ATTRIBUTE: &str = "DefaultSMSType";
const SENDER_ID_ATTRIBUTE: &str = "AWS.SNS.SMS.SenderID";

/// Sends text messages to phone numbers.
pub trait SmsGateway: Send + Sync {
    /// Sets the account-wide default SMS type, e.g. `Transactional`.
    fn set_sms_type<'a>(&'a self, sms_type: &'a str) -> BoxFuture<'a, (), SmsError>;

    /// Sends one message and returns the provider message id.
    fn send_sms<'a>(
        &'a self,
        phone_number: &'a str,
        message: &'a str,
        sender_id: Option<&'a str>,
    ) -> BoxFuture<'a, String, SmsError>;
}

#[derive(Debug, Clone)]
pub struct SnsGateway {
    client: aws_sdk_sns::Client,
}

impl SnsGateway {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        Self { client }
    }
}

fn provider_error<E>(action: &str, error: E) -> SmsError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    SmsError::ProviderError(format!(
        "{} failed ({}): {}",
        action,
        error.code().unwrap_or("unknown"),
        DisplayErrorContext(&error)
    ))
}

impl SmsGateway for SnsGateway {
    fn set_sms_type<'a>(&'a self, sms_type: &'a str) -> BoxFuture<'a, (), SmsError> {
        Box::pin(async move {
            self.client
                .set_sms_attributes()
                .attributes(SMS_TYPE_ATTRIBUTE, sms_type)
                .send()
                .await
                .map_err(|e| provider_error("SetSMSAttributes", e))?;
            debug!(sms_type, "Default SMS type set");
            Ok(())
        })
    }

    fn send_sms<'a>(
        &'a self,
        phone_number: &'a str,
        message: &'a str,
        sender_id: Option<&'a str>,
    ) -> BoxFuture<'a, String, SmsError> {
        Box::pin(async move {
            let mut request = self
                .client
                .publish()
                .phone_number(phone_number)
                .message(message);

            if let Some(sender_id) = sender_id {
                let attribute = MessageAttributeValue::builder()
                    .data_type("String")
                    .string_value(sender_id)
                    .build()
                    .map_err(|e| SmsError::ConfigError(e.to_string()))?;
                request = request.message_attributes(SENDER_ID_ATTRIBUTE, attribute);
            }

            let output = request
                .send()
                .await
                .map_err(|e| provider_error("Publish", e))?;
            Ok(output.message_id().unwrap_or_default().to_string())
        })
    }
}
