use alertcast_common::{config_error, AlertcastError, ChannelNotifier, PrometheusMetrics};
use alertcast_config::AppConfig;
use alertcast_db::{RegistrationStore, RegistrationStoreFactory};
use alertcast_dedup::Deduplicator;
use std::sync::Arc;
use tracing::info;

/// Everything the dispatcher needs, wired once at startup.
///
/// Notifiers are only present for channels switched on with `use_*` in the
/// configuration. A switch without its configuration section is a startup
/// error.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub deduplicator: Arc<Deduplicator>,
    pub registry: Arc<dyn RegistrationStore>,
    pub notifiers: Vec<Arc<dyn ChannelNotifier>>,
    pub metrics: Arc<PrometheusMetrics>,
}

/// Returns the section of a channel switched on by `flag`.
///
/// `Ok(None)` when the channel is off; an error when it is on but unconfigured.
fn enabled_section<'a, T>(
    flag: bool,
    section: Option<&'a T>,
    name: &str,
) -> Result<Option<&'a T>, AlertcastError> {
    match (flag, section) {
        (false, _) => Ok(None),
        (true, Some(section)) => Ok(Some(section)),
        (true, None) => Err(config_error(format!(
            "channel is switched on but the [{name}] section is missing"
        ))),
    }
}

impl AppState {
    /// Builds the state from configuration with fresh counters.
    pub async fn build(config: Arc<AppConfig>) -> Result<Self, AlertcastError> {
        Self::build_with_metrics(config, Arc::new(PrometheusMetrics::new())).await
    }

    pub async fn build_with_metrics(
        config: Arc<AppConfig>,
        metrics: Arc<PrometheusMetrics>,
    ) -> Result<Self, AlertcastError> {
        let deduplicator = Deduplicator::new(&config.dedup)
            .map_err(|e| config_error(format!("dedup: {e}")))?
            .with_metrics(metrics.clone());

        let registry = RegistrationStoreFactory::new()
            .from_app_config(&config)
            .await
            .map_err(|e| AlertcastError::DatabaseError(e.to_string()))?;

        #[allow(unused_mut)]
        let mut notifiers: Vec<Arc<dyn ChannelNotifier>> = Vec::new();

        let push = enabled_section(config.use_push, config.firebase.as_ref(), "firebase")?;
        #[cfg(feature = "push")]
        {
            if let Some(firebase) = push {
                let notifier = alertcast_firebase::PushNotifier::from_config(
                    firebase,
                    registry.clone(),
                    metrics.clone(),
                )
                .map_err(|e| config_error(format!("push: {e}")))?;
                notifiers.push(Arc::new(notifier));
            }
        }
        #[cfg(not(feature = "push"))]
        {
            if push.is_some() {
                return Err(config_error("use_push is set but the push feature is not compiled in"));
            }
        }

        let sms = enabled_section(config.use_sms, config.sms.as_ref(), "sms")?;
        #[cfg(feature = "sms")]
        {
            if let Some(sms) = sms {
                let notifier = alertcast_sms::SmsNotifier::from_config(sms, metrics.clone())
                    .await
                    .map_err(|e| config_error(format!("sms: {e}")))?;
                notifiers.push(Arc::new(notifier));
            }
        }
        #[cfg(not(feature = "sms"))]
        {
            if sms.is_some() {
                return Err(config_error("use_sms is set but the sms feature is not compiled in"));
            }
        }

        let email = enabled_section(config.use_email, config.email.as_ref(), "email")?;
        #[cfg(feature = "email")]
        {
            if let Some(email) = email {
                let notifier = alertcast_email::EmailNotifier::from_config(email, metrics.clone())
                    .map_err(|e| config_error(format!("email: {e}")))?;
                notifiers.push(Arc::new(notifier));
            }
        }
        #[cfg(not(feature = "email"))]
        {
            if email.is_some() {
                return Err(config_error("use_email is set but the email feature is not compiled in"));
            }
        }

        info!(
            dedup_enabled = deduplicator.is_enabled(),
            channels = ?notifiers.iter().map(|n| n.protocol().to_string()).collect::<Vec<_>>(),
            "Application state ready"
        );

        Ok(Self::from_parts(
            config,
            Arc::new(deduplicator),
            registry,
            notifiers,
            metrics,
        ))
    }

    /// Assembles a state from already-built parts.
    pub fn from_parts(
        config: Arc<AppConfig>,
        deduplicator: Arc<Deduplicator>,
        registry: Arc<dyn RegistrationStore>,
        notifiers: Vec<Arc<dyn ChannelNotifier>>,
        metrics: Arc<PrometheusMetrics>,
    ) -> Self {
        Self {
            config,
            deduplicator,
            registry,
            notifiers,
            metrics,
        }
    }

    /// Looks up the notifier for a protocol such as `push`.
    pub fn notifier(&self, protocol: &str) -> Option<&Arc<dyn ChannelNotifier>> {
        self.notifiers.iter().find(|n| n.protocol() == protocol)
    }
}
