// SMTP transport for alert emails.

use alertcast_common::BoxFuture;
use alertcast_config::EmailConfig;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::error::EmailError;

/// Sends one assembled message and returns the server's reply.
pub trait EmailTransport: Send + Sync {
    fn send(&self, message: Message) -> BoxFuture<'_, String, EmailError>;
}

/// Pooled async SMTP connection.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Connects through a TLS relay when `tls` is set, plain SMTP otherwise.
    /// Credentials are only used when both username and password are present.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        if config.smtp_host.trim().is_empty() {
            return Err(EmailError::ConfigError("smtp_host is empty".to_string()));
        }

        let mut builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| EmailError::ConfigError(format!("SMTP relay error: {e}")))?
                .port(config.smtp_port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
        };

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl EmailTransport for SmtpTransport {
    fn send(&self, message: Message) -> BoxFuture<'_, String, EmailError> {
        Box::pin(async move {
            let response = self
                .transport
                .send(message)
                .await
                .map_err(|e| EmailError::TransportError(e.to_string()))?;
            let reply = format!(
                "{} {}",
                response.code(),
                response.message().collect::<Vec<_>>().join(" ")
            );
            debug!(reply = %reply, "SMTP accepted message");
            Ok(reply)
        })
    }
}
