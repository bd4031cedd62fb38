// Metrics for the delivery pipeline.
//
// `ChannelMetrics` methods default to no-ops so test doubles and partial
// sinks only implement what they record. `PrometheusMetrics` is the sink the
// backend wires in; it keeps labelled counters and renders them in the
// OpenMetrics text format.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use tracing::debug;

use crate::models::{AppPlatform, DeliveryStatus};

pub trait ChannelMetrics: Send + Sync {
    /// Record the outcome of one `do_publish` call.
    fn record_delivery(&self, _protocol: &str, _status: DeliveryStatus) {}

    /// Record a push registration removed after the provider rejected its token.
    fn record_registration_pruned(&self, _platform: AppPlatform) {}

    /// Record an alert dropped by deduplication.
    fn record_alert_suppressed(&self, _reason: &str) {}
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DeliveryLabels {
    pub protocol: String,
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PlatformLabels {
    pub platform: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReasonLabels {
    pub reason: String,
}

/// Prometheus counters for deliveries, pruned registrations and suppressed alerts.
///
/// Counters are atomics, so recording only needs `&self`. Share it behind an
/// `Arc`.
pub struct PrometheusMetrics {
    registry: Registry,
    pub deliveries_total: Family<DeliveryLabels, Counter>,
    pub registrations_pruned_total: Family<PlatformLabels, Counter>,
    pub alerts_suppressed_total: Family<ReasonLabels, Counter>,
}

impl PrometheusMetrics {
    /// Creates the counters under the `alertcast` prefix.
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("alertcast");

        let deliveries_total = Family::<DeliveryLabels, Counter>::default();
        registry.register(
            "deliveries",
            "Channel publish calls by protocol and delivery status",
            deliveries_total.clone(),
        );

        let registrations_pruned_total = Family::<PlatformLabels, Counter>::default();
        registry.register(
            "registrations_pruned",
            "Push registrations removed after the provider rejected the token",
            registrations_pruned_total.clone(),
        );

        let alerts_suppressed_total = Family::<ReasonLabels, Counter>::default();
        registry.register(
            "alerts_suppressed",
            "Alerts dropped by deduplication, by suppression rule",
            alerts_suppressed_total.clone(),
        );

        Self {
            registry,
            deliveries_total,
            registrations_pruned_total,
            alerts_suppressed_total,
        }
    }

    /// Encodes every counter in the OpenMetrics text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }

    /// Current count for one protocol and status.
    pub fn deliveries(&self, protocol: &str, status: DeliveryStatus) -> u64 {
        self.deliveries_total
            .get_or_create(&DeliveryLabels {
                protocol: protocol.to_string(),
                status: status.as_str().to_string(),
            })
            .get()
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

impl ChannelMetrics for PrometheusMetrics {
    fn record_delivery(&self, protocol: &str, status: DeliveryStatus) {
        debug!(protocol, status = %status, "metric: delivery");
        self.deliveries_total
            .get_or_create(&DeliveryLabels {
                protocol: protocol.to_string(),
                status: status.as_str().to_string(),
            })
            .inc();
    }

    fn record_registration_pruned(&self, platform: AppPlatform) {
        debug!(platform = %platform, "metric: registration pruned");
        self.registrations_pruned_total
            .get_or_create(&PlatformLabels {
                platform: platform.as_str().to_string(),
            })
            .inc();
    }

    fn record_alert_suppressed(&self, reason: &str) {
        debug!(reason, "metric: alert suppressed");
        self.alerts_suppressed_total
            .get_or_create(&ReasonLabels {
                reason: reason.to_string(),
            })
            .inc();
    }
}
