use alertcast_common::{
    Alert, AlertMessage, BoxFuture, ChannelConfig, ChannelNotifier, DeliveryStatus,
    EmailChannelConfig, PrometheusMetrics, UserProfile,
};
use alertcast_config::EmailConfig;
use alertcast_email::{EmailError, EmailNotifier, EmailTransport};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lettre::Message;
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeTransport {
    failing_recipient: Option<String>,
    sent: Mutex<Vec<(String, String)>>,
}

impl EmailTransport for FakeTransport {
    fn send(&self, message: Message) -> BoxFuture<'_, String, EmailError> {
        Box::pin(async move {
            let recipient = message
                .envelope()
                .to()
                .first()
                .map(ToString::to_string)
                .unwrap_or_default();
            let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
            self.sent.lock().unwrap().push((recipient.clone(), raw));
            if self.failing_recipient.as_deref() == Some(recipient.as_str()) {
                Err(EmailError::TransportError("550 mailbox unavailable".to_string()))
            } else {
                Ok("250 OK".to_string())
            }
        })
    }
}

impl FakeTransport {
    fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(to, _)| to.clone()).collect()
    }
}

fn config() -> EmailConfig {
    EmailConfig {
        smtp_host: "localhost".to_string(),
        smtp_port: 2525,
        username: None,
        password: None,
        tls: false,
        from_address: "alerts@example.com".to_string(),
        default_locale: "en".to_string(),
    }
}

fn notifier(transport: Arc<FakeTransport>) -> EmailNotifier {
    EmailNotifier::new(transport, &config(), Arc::new(PrometheusMetrics::new())).unwrap()
}

fn alert(addresses: &[&str]) -> Alert {
    let mut alert = Alert::new("VIN1", "SERVICE_DUE", 1_000);
    alert.channel_config = ChannelConfig {
        email: Some(EmailChannelConfig {
            enabled: true,
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
        }),
        ..ChannelConfig::default()
    };
    alert.message = AlertMessage {
        title: "Service due".to_string(),
        body: "Your vehicle needs service".to_string(),
        ..AlertMessage::default()
    };
    alert
}

#[tokio::test]
async fn test_missing_destination_sends_nothing() {
    let transport = Arc::new(FakeTransport::default());
    let response = notifier(transport.clone()).do_publish(&alert(&[" "])).await;

    assert_eq!(response.status, DeliveryStatus::MissingDestination);
    assert!(transport.recipients().is_empty());
}

#[tokio::test]
async fn test_one_message_per_recipient() {
    let transport = Arc::new(FakeTransport::default());
    let response = notifier(transport.clone())
        .do_publish(&alert(&["a@example.com", "b@example.com"]))
        .await;

    assert_eq!(response.status, DeliveryStatus::Success);
    assert_eq!(response.destination, "a@example.com,b@example.com");
    assert_eq!(transport.recipients(), vec!["a@example.com", "b@example.com"]);
    assert_eq!(response.provider_response.as_deref(), Some("250 OK; 250 OK"));
}

#[tokio::test]
async fn test_first_error_aborts_remaining_recipients() {
    let transport = Arc::new(FakeTransport {
        failing_recipient: Some("b@example.com".to_string()),
        ..FakeTransport::default()
    });
    let response = notifier(transport.clone())
        .do_publish(&alert(&["a@example.com", "b@example.com", "c@example.com"]))
        .await;

    assert_eq!(response.status, DeliveryStatus::Failure);
    assert_eq!(transport.recipients(), vec!["a@example.com", "b@example.com"]);
    assert!(response.provider_response.unwrap().contains("550"));
}

#[tokio::test]
async fn test_invalid_recipient_fails_the_batch() {
    let transport = Arc::new(FakeTransport::default());
    let response = notifier(transport.clone())
        .do_publish(&alert(&["not an address", "b@example.com"]))
        .await;

    assert_eq!(response.status, DeliveryStatus::Failure);
    assert!(transport.recipients().is_empty());
}

#[tokio::test]
async fn test_attachments_follow_profile_locale() {
    let transport = Arc::new(FakeTransport::default());
    let mut alert = alert(&["a@example.com"]);
    alert.user_profile = Some(UserProfile {
        user_id: "u-1".to_string(),
        locale: Some("de".to_string()),
        registered: true,
    });
    alert.message.subject = Some("Wartung fällig".to_string());
    alert.attributes.insert(
        "attachments".to_string(),
        json!([{"fileName": "report.pdf", "contentType": "application/pdf", "content": STANDARD.encode("%PDF")}]),
    );
    alert.attributes.insert(
        "localeAttachments".to_string(),
        json!({
            "de": [{"fileName": "hinweis.txt", "contentType": "text/plain", "content": STANDARD.encode("Hallo")}],
            "en": [{"fileName": "notice.txt", "contentType": "text/plain", "content": STANDARD.encode("Hello")}]
        }),
    );

    let response = notifier(transport.clone()).do_publish(&alert).await;
    assert_eq!(response.status, DeliveryStatus::Success);
    assert_eq!(response.user_id.as_deref(), Some("u-1"));

    let sent = transport.sent.lock().unwrap();
    let raw = &sent[0].1;
    assert!(raw.contains("report.pdf"));
    assert!(raw.contains("hinweis.txt"));
    assert!(!raw.contains("notice.txt"));
}

#[tokio::test]
async fn test_malformed_attachment_fails_without_sending() {
    let transport = Arc::new(FakeTransport::default());
    let mut alert = alert(&["a@example.com"]);
    alert
        .attributes
        .insert("attachments".to_string(), json!([{"fileName": "x", "content": "%%%"}]));

    let response = notifier(transport.clone()).do_publish(&alert).await;
    assert_eq!(response.status, DeliveryStatus::Failure);
    assert!(transport.recipients().is_empty());
}

#[tokio::test]
async fn test_lifecycle_is_a_no_op() {
    let notifier = notifier(Arc::new(FakeTransport::default()));
    assert!(notifier.setup_channel("u-1", &ChannelConfig::default()).await.is_none());
    assert!(notifier.destroy_channel("u-1", &json!({})).await.is_none());
    assert_eq!(notifier.protocol(), "email");
}

#[test]
fn test_invalid_from_address_is_rejected() {
    let mut config = config();
    config.from_address = "broken".to_string();
    assert!(matches!(
        EmailNotifier::new(
            Arc::new(FakeTransport::default()),
            &config,
            Arc::new(PrometheusMetrics::new())
        ),
        Err(EmailError::AddressError { .. })
    ));
}
