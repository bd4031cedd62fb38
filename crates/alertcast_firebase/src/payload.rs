//! FCM HTTP v1 message and response shapes.
//!
//! Each platform gets its own payload:
//!
//! - Android: data-only, so the app handles the message in every state.
//! - iOS: notification plus data plus an APNs `aps` wrapper.
//! - Web: a minimal data-only payload.

use alertcast_common::{Alert, AppPlatform};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Wrapper object posted to `messages:send`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FcmMessage {
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Message {
    /// Registration token of the target device
    pub token: String,

    /// Displayed by the OS; absent for data-only messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,

    /// Custom key-value data delivered to the client app
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AndroidConfig {
    pub priority: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Aps {
    pub alert: Notification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(rename = "content-available")]
    pub content_available: u8,
}

const DEFAULT_SOUND: &str = "default";

impl FcmMessage {
    /// Builds the platform-specific message for one token.
    pub fn for_platform(platform: AppPlatform, token: &str, alert: &Alert) -> Self {
        let message = match platform {
            AppPlatform::Android => android_message(token, alert),
            AppPlatform::Ios => ios_message(token, alert),
            AppPlatform::Web => web_message(token, alert),
        };
        Self { message }
    }
}

fn alert_data(alert: &Alert) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("deviceId".to_string(), alert.device_id.clone()),
        ("eventType".to_string(), alert.event_type.clone()),
        ("timestamp".to_string(), alert.timestamp.to_string()),
    ])
}

fn android_message(token: &str, alert: &Alert) -> Message {
    let content = &alert.message;
    let mut data = alert_data(alert);
    data.insert("title".to_string(), content.title.clone());
    data.insert("body".to_string(), content.body.clone());
    if let Some(icon) = &content.icon {
        data.insert("icon".to_string(), icon.clone());
    }
    data.insert(
        "sound".to_string(),
        content.sound.clone().unwrap_or_else(|| DEFAULT_SOUND.to_string()),
    );

    Message {
        token: token.to_string(),
        notification: None,
        data,
        android: Some(AndroidConfig {
            priority: "high".to_string(),
        }),
        apns: None,
    }
}

fn ios_message(token: &str, alert: &Alert) -> Message {
    let content = &alert.message;
    let notification = Notification {
        title: content.title.clone(),
        body: content.body.clone(),
    };

    Message {
        token: token.to_string(),
        notification: Some(notification.clone()),
        data: alert_data(alert),
        android: None,
        apns: Some(ApnsConfig {
            payload: ApnsPayload {
                aps: Aps {
                    alert: notification,
                    sound: Some(
                        content.sound.clone().unwrap_or_else(|| DEFAULT_SOUND.to_string()),
                    ),
                    content_available: 1,
                },
            },
        }),
    }
}

fn web_message(token: &str, alert: &Alert) -> Message {
    let content = &alert.message;
    let data = BTreeMap::from([
        ("title".to_string(), content.title.clone()),
        ("body".to_string(), content.body.clone()),
    ]);

    Message {
        token: token.to_string(),
        notification: None,
        data,
        android: None,
        apns: None,
    }
}

/// Successful send; `name` is `projects/{project}/messages/{id}`.
#[derive(Debug, Deserialize)]
pub struct FcmResponse {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FcmErrorEnvelope {
    error: FcmErrorBody,
}

#[derive(Debug, Deserialize)]
struct FcmErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<Value>,
}

impl FcmErrorBody {
    fn error_code(&self) -> Option<&str> {
        self.details
            .iter()
            .find_map(|detail| detail.get("errorCode").and_then(Value::as_str))
    }
}

/// How one `messages:send` response is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Accepted; carries the message name.
    Delivered(String),
    /// The token is invalid or unregistered and should be pruned.
    StaleToken(String),
    /// Any other failure.
    Failed(String),
}

const NOT_FOUND: u16 = 404;

/// Classifies an FCM response by its HTTP status and body.
pub fn classify_response(status: u16, body: &str) -> SendOutcome {
    if (200..300).contains(&status) {
        return match serde_json::from_str::<FcmResponse>(body) {
            Ok(response) => SendOutcome::Delivered(response.name),
            Err(e) => SendOutcome::Failed(format!("malformed FCM response: {e}")),
        };
    }

    let Ok(FcmErrorEnvelope { error }) = serde_json::from_str::<FcmErrorEnvelope>(body) else {
        return if status == NOT_FOUND {
            SendOutcome::StaleToken(format!("HTTP {status}"))
        } else {
            SendOutcome::Failed(format!("HTTP {status}: {body}"))
        };
    };

    let code = error.error_code().unwrap_or(error.status.as_str());
    let stale = code == "UNREGISTERED"
        || (code == "INVALID_ARGUMENT" && mentions_registration_token(&error.message))
        || error.status == "NOT_FOUND"
        || status == NOT_FOUND;

    let reason = format!("{code}: {}", error.message);
    if stale {
        SendOutcome::StaleToken(reason)
    } else {
        SendOutcome::Failed(reason)
    }
}

fn mentions_registration_token(message: &str) -> bool {
    message.to_ascii_lowercase().contains("registration token")
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertcast_common::AlertMessage;
    use serde_json::json;

    fn alert() -> Alert {
        let mut alert = Alert::new("VIN1", "DOOR_OPEN", 1_700_000_000_000);
        alert.message = AlertMessage {
            title: "Door open".to_string(),
            body: "Driver door opened".to_string(),
            icon: Some("door".to_string()),
            ..AlertMessage::default()
        };
        alert
    }

    #[test]
    fn test_android_is_data_only() {
        let value = serde_json::to_value(FcmMessage::for_platform(
            AppPlatform::Android,
            "tok",
            &alert(),
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({"message": {
                "token": "tok",
                "data": {
                    "body": "Driver door opened",
                    "deviceId": "VIN1",
                    "eventType": "DOOR_OPEN",
                    "icon": "door",
                    "sound": "default",
                    "timestamp": "1700000000000",
                    "title": "Door open"
                },
                "android": {"priority": "high"}
            }})
        );
    }

    #[test]
    fn test_ios_has_notification_and_aps() {
        let value =
            serde_json::to_value(FcmMessage::for_platform(AppPlatform::Ios, "tok", &alert()))
                .unwrap();
        let message = &value["message"];
        assert_eq!(message["notification"]["title"], "Door open");
        assert_eq!(message["data"]["deviceId"], "VIN1");
        assert_eq!(message["apns"]["payload"]["aps"]["alert"]["body"], "Driver door opened");
        assert_eq!(message["apns"]["payload"]["aps"]["content-available"], 1);
        assert!(message.get("android").is_none());
    }

    #[test]
    fn test_web_is_minimal() {
        let value =
            serde_json::to_value(FcmMessage::for_platform(AppPlatform::Web, "tok", &alert()))
                .unwrap();
        assert_eq!(
            value,
            json!({"message": {
                "token": "tok",
                "data": {"body": "Driver door opened", "title": "Door open"}
            }})
        );
    }

    #[test]
    fn test_classify_success() {
        assert_eq!(
            classify_response(200, r#"{"name":"projects/p/messages/1"}"#),
            SendOutcome::Delivered("projects/p/messages/1".to_string())
        );
        assert!(matches!(classify_response(200, "{}"), SendOutcome::Failed(_)));
    }

    #[test]
    fn test_classify_unregistered() {
        let body = json!({"error": {
            "code": 404,
            "message": "Requested entity was not found.",
            "status": "NOT_FOUND",
            "details": [{
                "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                "errorCode": "UNREGISTERED"
            }]
        }});
        assert!(matches!(
            classify_response(404, &body.to_string()),
            SendOutcome::StaleToken(reason) if reason.starts_with("UNREGISTERED")
        ));
    }

    #[test]
    fn test_classify_invalid_token_argument() {
        let body = json!({"error": {
            "code": 400,
            "message": "The registration token is not a valid FCM registration token",
            "status": "INVALID_ARGUMENT"
        }});
        assert!(matches!(
            classify_response(400, &body.to_string()),
            SendOutcome::StaleToken(_)
        ));

        let other = json!({"error": {
            "code": 400,
            "message": "Invalid JSON payload received.",
            "status": "INVALID_ARGUMENT"
        }});
        assert!(matches!(
            classify_response(400, &other.to_string()),
            SendOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_classify_server_errors_are_failures() {
        assert!(matches!(
            classify_response(503, "upstream unavailable"),
            SendOutcome::Failed(reason) if reason.contains("503")
        ));
        let quota = json!({"error": {
            "code": 429,
            "message": "Quota exceeded",
            "status": "RESOURCE_EXHAUSTED",
            "details": [{"errorCode": "QUOTA_EXCEEDED"}]
        }});
        assert!(matches!(
            classify_response(429, &quota.to_string()),
            SendOutcome::Failed(reason) if reason.starts_with("QUOTA_EXCEEDED")
        ));
    }
}
