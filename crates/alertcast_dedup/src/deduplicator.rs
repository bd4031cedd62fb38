//! Sliding-window duplicate suppression over alert batches.

use alertcast_common::{Alert, ChannelMetrics};
use alertcast_config::DedupConfig;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::DedupError;
use crate::existence_cache::{BloomFilterStore, ExistenceCache};
use crate::key_extractor::{KeyExtractor, KeyExtractorFactory, DEDUP_KEY_PREFIX};
use crate::key_store::{create_key_store, KeyStore};

const STORE_PURPOSE: &str = "dedup";

// One key store per process, shared by every Deduplicator.
static SHARED_STORE: OnceCell<Arc<BloomFilterStore>> = OnceCell::new();

fn shared_store(config: &DedupConfig) -> Result<Arc<BloomFilterStore>, DedupError> {
    SHARED_STORE
        .get_or_try_init(|| {
            let store_class = config
                .store_class
                .as_deref()
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| {
                    DedupError::ConfigError(
                        "dedup.store_class is required when deduplication is enabled".to_string(),
                    )
                })?;
            let store = create_key_store(store_class, config, STORE_PURPOSE)?;
            info!(store_class, "Created shared dedup key store");
            Ok(Arc::new(wrap_store(store, config)))
        })
        .cloned()
}

fn wrap_store(store: Arc<dyn KeyStore>, config: &DedupConfig) -> BloomFilterStore {
    BloomFilterStore::new(
        store,
        DEDUP_KEY_PREFIX,
        config.bloom_filter_insertion_count,
        config.bloom_filter_false_positive_rate,
    )
    .with_rotation(Duration::from_secs(config.store_ttl_seconds))
}

/// Why an alert was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suppression {
    SameBucket,
    OneHop,
    TwoHop,
}

impl Suppression {
    fn as_str(self) -> &'static str {
        match self {
            Suppression::SameBucket => "same-bucket",
            Suppression::OneHop => "one-hop",
            Suppression::TwoHop => "two-hop",
        }
    }
}

/// Filters alert batches down to their non-duplicates.
///
/// When disabled, [`filter_duplicate_alert`](Self::filter_duplicate_alert)
/// returns its input unchanged and no key store is created.
pub struct Deduplicator {
    enabled: bool,
    // full configured window; buckets use half of it
    window_ms: i64,
    extractors: KeyExtractorFactory,
    store: Option<Arc<BloomFilterStore>>,
    metrics: Option<Arc<dyn ChannelMetrics>>,
}

impl Deduplicator {
    /// Builds a deduplicator on the process-wide key store.
    ///
    /// The first enabled construction creates the store named by
    /// `config.store_class`; later ones reuse it. A missing or unknown store
    /// name is a configuration error.
    pub fn new(config: &DedupConfig) -> Result<Self, DedupError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let store = shared_store(config)?;
        Ok(Self::build(config, store))
    }

    /// Builds a deduplicator on an explicitly provided key store.
    pub fn with_store(config: &DedupConfig, store: Arc<dyn KeyStore>) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self::build(config, Arc::new(wrap_store(store, config)))
    }

    /// Attaches a metrics sink that counts suppressed alerts.
    pub fn with_metrics(mut self, metrics: Arc<dyn ChannelMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn disabled() -> Self {
        Self {
            enabled: false,
            window_ms: 0,
            extractors: KeyExtractorFactory::new(),
            store: None,
            metrics: None,
        }
    }

    fn build(config: &DedupConfig, store: Arc<BloomFilterStore>) -> Self {
        store
            .inner()
            .set_ttl(Duration::from_secs(config.store_ttl_seconds));
        let extractors = KeyExtractorFactory::new();
        extractors.init(config.interval_ms);
        debug!(
            interval_ms = config.interval_ms,
            ttl_seconds = config.store_ttl_seconds,
            "Deduplicator initialized"
        );
        Self {
            enabled: true,
            window_ms: i64::try_from(config.interval_ms).unwrap_or(i64::MAX),
            extractors,
            store: Some(store),
            metrics: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the existence cache has finished any warm-start load.
    ///
    /// Always `true` when deduplication is disabled.
    pub fn cache_restored(&self) -> bool {
        self.store
            .as_ref()
            .map_or(true, |store| store.cache_restored())
    }

    /// The bloom-filter store in front of the key store, if enabled.
    pub fn store(&self) -> Option<&Arc<BloomFilterStore>> {
        self.store.as_ref()
    }

    /// Returns the alerts of `alerts` that are not duplicates, in input order.
    ///
    /// Kept alerts are recorded under their current key so later alerts in
    /// the same batch, or in later batches, see them. Key store failures
    /// abort the pass.
    pub async fn filter_duplicate_alert(&self, alerts: Vec<Alert>) -> Result<Vec<Alert>, DedupError> {
        let store = match (&self.store, self.enabled) {
            (Some(store), true) => store,
            _ => return Ok(alerts),
        };

        let mut kept = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let extractor = self.extractors.extractor_for(&alert.event_type)?;
            match self.check(store, extractor, &alert).await? {
                Some(reason) => {
                    debug!(
                        device_id = %alert.device_id,
                        event_type = %alert.event_type,
                        timestamp = alert.timestamp,
                        reason = reason.as_str(),
                        "Dropping duplicate alert"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_alert_suppressed(reason.as_str());
                    }
                }
                None => {
                    store
                        .record(&extractor.current_key(&alert), alert.timestamp)
                        .await?;
                    kept.push(alert);
                }
            }
        }
        Ok(kept)
    }

    async fn check(
        &self,
        store: &BloomFilterStore,
        extractor: &dyn KeyExtractor,
        alert: &Alert,
    ) -> Result<Option<Suppression>, DedupError> {
        if store.exists(&extractor.current_key(alert)).await? {
            return Ok(Some(Suppression::SameBucket));
        }
        if store.exists(&extractor.previous_key(alert, 1)).await? {
            return Ok(Some(Suppression::OneHop));
        }
        if let Some(previous_ts) = store.get(&extractor.previous_key(alert, 2)).await? {
            if alert.timestamp.saturating_sub(previous_ts) <= self.window_ms {
                return Ok(Some(Suppression::TwoHop));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for Deduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deduplicator")
            .field("enabled", &self.enabled)
            .field("window_ms", &self.window_ms)
            .field("extractors", &self.extractors)
            .field("cache_restored", &self.cache_restored())
            .finish()
    }
}
