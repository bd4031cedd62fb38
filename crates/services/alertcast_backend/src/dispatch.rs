//! Batch dispatch: deduplicate, then fan out to the enabled channels.
//!
//! Alerts are published in batch order and, per alert, in notifier order.
//! Channel failures are carried in the returned responses; only key store
//! failures abort a batch.

use alertcast_common::{
    internal_error, Alert, AlertcastError, ChannelConfig, ChannelResponse, Context,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::app_state::AppState;

/// Filters `alerts` and publishes every kept alert to each notifier whose
/// channel is enabled in the alert's channel configuration.
pub async fn dispatch_batch(
    state: &AppState,
    alerts: Vec<Alert>,
) -> Result<Vec<ChannelResponse>, AlertcastError> {
    let received = alerts.len();
    let kept = state
        .deduplicator
        .filter_duplicate_alert(alerts)
        .await
        .map_err(|e| internal_error(format!("deduplication failed: {e}")))?;
    info!(received, kept = kept.len(), "Batch filtered");

    let mut responses = Vec::new();
    for alert in &kept {
        for notifier in &state.notifiers {
            if !alert.channel_config.is_enabled(notifier.protocol()) {
                continue;
            }
            let response = notifier.do_publish(alert).await;
            debug!(
                device_id = %alert.device_id,
                protocol = notifier.protocol(),
                status = %response.status,
                "Alert published"
            );
            responses.push(response);
        }
    }
    Ok(responses)
}

/// Runs `setup_channel` on every notifier and collects the responses of
/// those that manage external resources.
pub async fn setup_channels(
    state: &AppState,
    user_id: &str,
    config: &ChannelConfig,
) -> Vec<ChannelResponse> {
    let mut responses = Vec::new();
    for notifier in &state.notifiers {
        if let Some(response) = notifier.setup_channel(user_id, config).await {
            responses.push(response);
        }
    }
    responses
}

/// Runs `destroy_channel` on every notifier for a raw unregistration event.
pub async fn destroy_channels(
    state: &AppState,
    user_id: &str,
    raw_event: &Value,
) -> Vec<ChannelResponse> {
    let mut responses = Vec::new();
    for notifier in &state.notifiers {
        if let Some(response) = notifier.destroy_channel(user_id, raw_event).await {
            responses.push(response);
        }
    }
    responses
}

/// Writes the current counters to `path` in the OpenMetrics text format.
pub async fn write_metrics(state: &AppState, path: &str) -> Result<(), AlertcastError> {
    let encoded = state
        .metrics
        .encode()
        .map_err(|e| internal_error(format!("encoding metrics failed: {e}")))?;
    tokio::fs::write(path, encoded)
        .await
        .with_context(|| format!("writing metrics to {path}"))?;
    debug!(path, "Metrics written");
    Ok(())
}
