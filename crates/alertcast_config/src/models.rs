// --- File: crates/alertcast_config/src/models.rs ---

use serde::{Deserialize, Serialize};

/// Default FCM HTTP v1 endpoint; the project id is appended at send time.
pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com/v1/projects";

// --- Deduplication Config ---
/// Settings for the alert deduplication engine.
///
/// Every field has a default so the whole section may be omitted from the
/// config files. `store_class` is the only value that must be supplied when
/// deduplication is enabled.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DedupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sliding window in milliseconds. `0` disables bucketing.
    #[serde(default)]
    pub interval_ms: u64,

    /// Name of the key store implementation, e.g. `in-memory`.
    #[serde(default)]
    pub store_class: Option<String>,

    #[serde(default = "default_store_ttl_seconds")]
    pub store_ttl_seconds: u64,

    /// Expected insertions used to size the bloom filter.
    #[serde(default = "default_bloom_filter_insertion_count")]
    pub bloom_filter_insertion_count: usize,

    #[serde(default = "default_bloom_filter_false_positive_rate")]
    pub bloom_filter_false_positive_rate: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 0,
            store_class: None,
            store_ttl_seconds: default_store_ttl_seconds(),
            bloom_filter_insertion_count: default_bloom_filter_insertion_count(),
            bloom_filter_false_positive_rate: default_bloom_filter_false_positive_rate(),
        }
    }
}

// --- Database Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite:data/registrations.db, loaded via ALERTCAST__DATABASE__URL
}

// --- Firebase Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    /// Path to the service account JSON key.
    pub key_path: Option<String>,
    #[serde(default = "default_fcm_endpoint")]
    pub api_endpoint: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

// --- SMS Config ---
// Credentials come from the default AWS chain, optionally exchanged for a
// cross-account session when role_arn is set.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SmsConfig {
    pub region: String,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default = "default_session_duration_secs")]
    pub session_duration_secs: i32,
    #[serde(default = "default_session_name")]
    pub session_name: String,
    #[serde(default)]
    pub default_sender_id: Option<String>,
    #[serde(default = "default_sms_type")]
    pub sms_type: String,
}

// --- Email Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>, // usually ALERTCAST__EMAIL__PASSWORD
    #[serde(default = "default_true")]
    pub tls: bool,
    pub from_address: String,
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_push: bool,
    #[serde(default)]
    pub use_sms: bool,
    #[serde(default)]
    pub use_email: bool,

    #[serde(default)]
    pub dedup: DedupConfig,

    /// OpenMetrics text file rewritten after each run, if set.
    #[serde(default)]
    pub metrics_path: Option<String>,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub firebase: Option<FirebaseConfig>,
    #[serde(default)]
    pub sms: Option<SmsConfig>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

fn default_true() -> bool {
    true
}

fn default_store_ttl_seconds() -> u64 {
    120
}

fn default_bloom_filter_insertion_count() -> usize {
    100
}

fn default_bloom_filter_false_positive_rate() -> f64 {
    0.01
}

fn default_fcm_endpoint() -> String {
    DEFAULT_FCM_ENDPOINT.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    10_000
}

fn default_session_duration_secs() -> i32 {
    900
}

fn default_session_name() -> String {
    "alertcast-sms".to_string()
}

fn default_sms_type() -> String {
    "Transactional".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_locale() -> String {
    "en".to_string()
}
