//! Dedup key derivation.
//!
//! A dedup key identifies an alert's (device, event type, qualifier, time
//! bucket) class:
//!
//! ```text
//! DEDUP_<deviceId>_<eventType>_<timeBucket>[_<qualifier>]
//! ```
//!
//! The configured interval is halved once when the extractors are built.
//! Half-width buckets plus a two-hop look-back cover a full sliding window of
//! the configured width while keeping unrelated alerts from colliding.

use alertcast_common::Alert;
use once_cell::sync::OnceCell;

use crate::error::DedupError;

/// Prefix shared by every dedup key.
pub const DEDUP_KEY_PREFIX: &str = "DEDUP_";

/// Event type handled by the geofence strategy.
pub const GEOFENCE_EVENT_TYPE: &str = "GEOFENCE";

/// Attribute names carrying a geofence id, in lookup order.
pub const GEOFENCE_ID_ATTRIBUTES: [&str; 2] = ["geofenceId", "geoFenceId"];

/// Halves a configured interval, rounding up. `0` stays `0`.
///
/// Intervals beyond the `i64` range clamp to `i64::MAX`.
pub fn halve_interval(interval_ms: u64) -> i64 {
    i64::try_from(interval_ms.div_ceil(2)).unwrap_or(i64::MAX)
}

/// Strategy deriving the current and predecessor dedup keys of an alert.
pub trait KeyExtractor: Send + Sync {
    /// The halved interval used for bucketing, in milliseconds.
    fn interval(&self) -> i64;

    /// Event-specific key suffix; `None` or empty appends nothing.
    fn data_qualifier(&self, alert: &Alert) -> Option<String>;

    /// Start of the bucket containing `timestamp`.
    ///
    /// With a zero interval the timestamp itself is the bucket. Buckets
    /// starting below `i64::MIN` saturate there.
    fn time_bucket(&self, timestamp: i64) -> i64 {
        let interval = self.interval();
        if interval <= 0 {
            timestamp
        } else {
            timestamp.saturating_sub(timestamp.rem_euclid(interval))
        }
    }

    /// Start of the bucket `hops` bucket-widths before the alert's bucket.
    fn previous_bucket(&self, timestamp: i64, hops: i64) -> i64 {
        self.time_bucket(timestamp)
            .saturating_sub(self.interval().saturating_mul(hops))
    }

    fn current_key(&self, alert: &Alert) -> String {
        format_key(
            alert,
            self.time_bucket(alert.timestamp),
            self.data_qualifier(alert).as_deref(),
        )
    }

    fn previous_key(&self, alert: &Alert, hops: i64) -> String {
        format_key(
            alert,
            self.previous_bucket(alert.timestamp, hops),
            self.data_qualifier(alert).as_deref(),
        )
    }
}

fn format_key(alert: &Alert, bucket: i64, qualifier: Option<&str>) -> String {
    let mut key = format!(
        "{}{}_{}_{}",
        DEDUP_KEY_PREFIX, alert.device_id, alert.event_type, bucket
    );
    if let Some(qualifier) = qualifier.filter(|q| !q.is_empty()) {
        key.push('_');
        key.push_str(qualifier);
    }
    key
}

/// Keys differ only by device, event type and time.
#[derive(Debug, Clone, Copy)]
pub struct GenericKeyExtractor {
    interval: i64,
}

impl GenericKeyExtractor {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: halve_interval(interval_ms),
        }
    }
}

impl KeyExtractor for GenericKeyExtractor {
    fn interval(&self) -> i64 {
        self.interval
    }

    fn data_qualifier(&self, _alert: &Alert) -> Option<String> {
        None
    }
}

/// Qualifies keys with the geofence id so different fences never collide.
#[derive(Debug, Clone, Copy)]
pub struct GeofenceKeyExtractor {
    interval: i64,
}

impl GeofenceKeyExtractor {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: halve_interval(interval_ms),
        }
    }
}

impl KeyExtractor for GeofenceKeyExtractor {
    fn interval(&self) -> i64 {
        self.interval
    }

    fn data_qualifier(&self, alert: &Alert) -> Option<String> {
        GEOFENCE_ID_ATTRIBUTES
            .iter()
            .find_map(|name| alert.attribute_str(name))
    }
}

/// Event classes with their own key strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Generic,
    Geofence,
}

impl EventKind {
    pub fn of(event_type: &str) -> Self {
        match event_type {
            GEOFENCE_EVENT_TYPE => EventKind::Geofence,
            _ => EventKind::Generic,
        }
    }
}

#[derive(Debug)]
struct Extractors {
    generic: GenericKeyExtractor,
    geofence: GeofenceKeyExtractor,
}

/// Dispatches alerts to their key extractor.
///
/// Must be initialized with the interval before use; only the first
/// [`init`](Self::init) takes effect.
#[derive(Debug, Default)]
pub struct KeyExtractorFactory {
    extractors: OnceCell<Extractors>,
}

impl KeyExtractorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the extractors for `interval_ms`.
    ///
    /// Returns `false` when the factory was already initialized, in which
    /// case nothing changes.
    pub fn init(&self, interval_ms: u64) -> bool {
        let mut initialized = false;
        self.extractors.get_or_init(|| {
            initialized = true;
            Extractors {
                generic: GenericKeyExtractor::new(interval_ms),
                geofence: GeofenceKeyExtractor::new(interval_ms),
            }
        });
        initialized
    }

    pub fn is_initialized(&self) -> bool {
        self.extractors.get().is_some()
    }

    /// Returns the extractor for an event type.
    pub fn extractor_for(&self, event_type: &str) -> Result<&dyn KeyExtractor, DedupError> {
        let extractors = self
            .extractors
            .get()
            .ok_or(DedupError::ExtractorNotInitialized)?;
        Ok(match EventKind::of(event_type) {
            EventKind::Geofence => &extractors.geofence,
            EventKind::Generic => &extractors.generic,
        })
    }
}
