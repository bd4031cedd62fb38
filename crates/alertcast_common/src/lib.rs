// --- File: crates/alertcast_common/src/lib.rs ---

// Declare modules within this crate
pub mod channel; // Delivery channel contract
pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod metrics; // Delivery metrics hook
pub mod models; // Data structures and models

// Re-export error types and utilities for easier access
pub use error::{config_error, internal_error, AlertcastError, Context};

pub use channel::{BoxFuture, ChannelNotifier, ResponseFuture};
pub use metrics::{ChannelMetrics, PrometheusMetrics};
pub use models::{
    Alert, AlertMessage, AppPlatform, ChannelConfig, ChannelResponse, DeliveryStatus,
    DeviceRegistration, EmailChannelConfig, PushChannelConfig, SmsChannelConfig, UserProfile,
};

// Re-export logging utilities for easier access
pub use logging::{init, init_with_level, log_error};

// This crate provides functionality shared by every alertcast crate: the alert
// and response models, the channel notifier contract, error handling, logging
// and HTTP client construction.
