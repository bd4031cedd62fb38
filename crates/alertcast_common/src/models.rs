// --- File: crates/alertcast_common/src/models.rs ---

// Data structures shared across the dispatch pipeline:
// - the alert considered for suppression and delivery
// - per-channel destination configuration
// - the per-attempt delivery response
// - the push device registration record

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A single vehicle or user event considered for suppression and delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub device_id: String,

    /// Discriminates the dedup key extraction strategy (e.g. `GEOFENCE`).
    pub event_type: String,

    /// Event time in epoch milliseconds.
    pub timestamp: i64,

    /// Free-form event payload, e.g. a geofence identifier or attachments.
    #[serde(default)]
    pub attributes: Map<String, Value>,

    #[serde(default)]
    pub user_profile: Option<UserProfile>,

    #[serde(default)]
    pub channel_config: ChannelConfig,

    /// Rendered content to deliver.
    #[serde(default)]
    pub message: AlertMessage,
}

impl Alert {
    /// Create an alert with empty payload, profile and channel configuration.
    pub fn new(device_id: impl Into<String>, event_type: impl Into<String>, timestamp: i64) -> Self {
        Self {
            device_id: device_id.into(),
            event_type: event_type.into(),
            timestamp,
            attributes: Map::new(),
            user_profile: None,
            channel_config: ChannelConfig::default(),
            message: AlertMessage::default(),
        }
    }

    /// Returns the user id of the resolved profile, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.user_profile.as_ref().map(|p| p.user_id.as_str())
    }

    /// Whether this alert originates from a user registered on the platform.
    ///
    /// Registered users have their push registrations in the registry;
    /// everyone else carries a single platform/token pair in the alert.
    pub fn is_registered_user(&self) -> bool {
        self.user_profile.as_ref().is_some_and(|p| p.registered)
    }

    /// Looks up a string attribute, accepting numbers as well.
    pub fn attribute_str(&self, name: &str) -> Option<String> {
        match self.attributes.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// The resolved user behind an alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub registered: bool,
}

/// Already-rendered content of an alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlertMessage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub html_body: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub sound: Option<String>,
}

/// Per-channel enablement and addresses for an alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    #[serde(default)]
    pub push: Option<PushChannelConfig>,
    #[serde(default)]
    pub sms: Option<SmsChannelConfig>,
    #[serde(default)]
    pub email: Option<EmailChannelConfig>,
}

impl ChannelConfig {
    /// Whether the channel with the given protocol name is enabled.
    pub fn is_enabled(&self, protocol: &str) -> bool {
        match protocol {
            crate::channel::PROTOCOL_PUSH => self.push.as_ref().is_some_and(|c| c.enabled),
            crate::channel::PROTOCOL_SMS => self.sms.as_ref().is_some_and(|c| c.enabled),
            crate::channel::PROTOCOL_EMAIL => self.email.as_ref().is_some_and(|c| c.enabled),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PushChannelConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Device token for non-registered users or for channel setup.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub app_platform: Option<AppPlatform>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SmsChannelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmailChannelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Client application platform of a push registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppPlatform {
    Android,
    Ios,
    Web,
}

impl AppPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppPlatform::Android => "ANDROID",
            AppPlatform::Ios => "IOS",
            AppPlatform::Web => "WEB",
        }
    }
}

impl fmt::Display for AppPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ANDROID" => Ok(AppPlatform::Android),
            "IOS" => Ok(AppPlatform::Ios),
            "WEB" => Ok(AppPlatform::Web),
            other => Err(format!("unknown app platform: {other}")),
        }
    }
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryStatus {
    Success,
    Failure,
    MissingDestination,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failure => "failure",
            DeliveryStatus::MissingDestination => "missing-destination",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one `do_publish`, `setup_channel` or `destroy_channel` call.
///
/// Created fresh per call and handed to the orchestration layer; never
/// persisted here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResponse {
    pub protocol: String,
    pub user_id: Option<String>,
    /// Comma-joined addresses or tokens actually targeted.
    pub destination: String,
    pub status: DeliveryStatus,
    /// The rendered message used for the attempt.
    pub message: Option<String>,
    /// Raw provider response body or request id(s).
    pub provider_response: Option<String>,
}

impl ChannelResponse {
    fn with_status(protocol: &str, user_id: Option<&str>, status: DeliveryStatus) -> Self {
        Self {
            protocol: protocol.to_string(),
            user_id: user_id.map(str::to_string),
            destination: String::new(),
            status,
            message: None,
            provider_response: None,
        }
    }

    pub fn success(protocol: &str, user_id: Option<&str>) -> Self {
        Self::with_status(protocol, user_id, DeliveryStatus::Success)
    }

    pub fn failure(protocol: &str, user_id: Option<&str>) -> Self {
        Self::with_status(protocol, user_id, DeliveryStatus::Failure)
    }

    pub fn missing_destination(protocol: &str, user_id: Option<&str>) -> Self {
        Self::with_status(protocol, user_id, DeliveryStatus::MissingDestination)
    }

    pub fn with_destination<S: AsRef<str>>(mut self, destinations: &[S]) -> Self {
        self.destination = destinations
            .iter()
            .map(|d| d.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_provider_response(mut self, provider_response: impl Into<String>) -> Self {
        self.provider_response = Some(provider_response.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == DeliveryStatus::Success
    }
}

/// Registry entity holding push registrations.
pub const DEVICE_REGISTRATION_ENTITY: &str = "device_registrations";

/// Represents a push device registration.
///
/// Stored in the registration store as a document with the fields
/// `token`, `userId` and `appPlatform`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub token: String,
    pub user_id: String,
    pub app_platform: AppPlatform,
}

impl DeviceRegistration {
    pub const TOKEN_FIELD: &'static str = "token";
    pub const USER_ID_FIELD: &'static str = "userId";
    pub const APP_PLATFORM_FIELD: &'static str = "appPlatform";

    pub fn new(token: impl Into<String>, user_id: impl Into<String>, app_platform: AppPlatform) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            app_platform,
        }
    }

    /// Converts the registration into a registry document.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(Self::TOKEN_FIELD.to_string(), Value::String(self.token.clone()));
        doc.insert(Self::USER_ID_FIELD.to_string(), Value::String(self.user_id.clone()));
        doc.insert(
            Self::APP_PLATFORM_FIELD.to_string(),
            Value::String(self.app_platform.as_str().to_string()),
        );
        doc
    }

    /// Builds a registration from a registry document.
    ///
    /// `user_id` may be absent when the document was projected to token and
    /// platform only; `fallback_user_id` fills it in.
    pub fn from_document(doc: &Map<String, Value>, fallback_user_id: &str) -> Option<Self> {
        let token = doc.get(Self::TOKEN_FIELD)?.as_str()?;
        let app_platform = doc
            .get(Self::APP_PLATFORM_FIELD)?
            .as_str()?
            .parse::<AppPlatform>()
            .ok()?;
        let user_id = doc
            .get(Self::USER_ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or(fallback_user_id);
        Some(Self::new(token, user_id, app_platform))
    }
}
