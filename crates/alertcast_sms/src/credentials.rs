//! AWS credentials for the SMS gateway.
//!
//! The default provider chain is used as-is, or, when a role ARN is
//! configured, wrapped in an STS assume-role provider. The SDK identity
//! cache re-assumes the role before the session credentials expire, so a
//! long-running process never publishes with stale keys.

use alertcast_config::SmsConfig;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use std::time::Duration;
use tracing::info;

use crate::error::SmsError;

/// Loads the shared SDK configuration for the configured region.
pub async fn load_sdk_config(config: &SmsConfig) -> Result<SdkConfig, SmsError> {
    if config.region.trim().is_empty() {
        return Err(SmsError::ConfigError("sms.region is empty".to_string()));
    }
    Ok(aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await)
}

/// Returns an assume-role provider when `role_arn` is set, `None` otherwise.
///
/// Nothing is sent to STS here; the first SNS request resolves the session.
pub async fn role_credentials_provider(
    sdk_config: &SdkConfig,
    config: &SmsConfig,
) -> Option<SharedCredentialsProvider> {
    let role_arn = config.role_arn.as_deref().filter(|arn| !arn.is_empty())?;

    let provider = AssumeRoleProvider::builder(role_arn)
        .session_name(config.session_name.clone())
        .session_length(Duration::from_secs(
            u64::try_from(config.session_duration_secs).unwrap_or_default(),
        ))
        .configure(sdk_config)
        .build()
        .await;

    info!(role_arn, session = %config.session_name, "SMS channel assumes role");
    Some(SharedCredentialsProvider::new(provider))
}

/// Builds the SNS client, layering the assume-role provider when configured.
pub async fn sns_client(config: &SmsConfig) -> Result<aws_sdk_sns::Client, SmsError> {
    let sdk_config = load_sdk_config(config).await?;

    let Some(provider) = role_credentials_provider(&sdk_config, config).await else {
        return Ok(aws_sdk_sns::Client::new(&sdk_config));
    };

    let sns_config = aws_sdk_sns::config::Builder::from(&sdk_config)
        .credentials_provider(provider)
        .build();
    Ok(aws_sdk_sns::Client::from_conf(sns_config))
}
