// --- File: crates/alertcast_common/src/channel.rs ---
//! The delivery channel contract.
//!
//! Every delivery channel (push, SMS, email, in-vehicle messaging) implements
//! [`ChannelNotifier`]. Adapters are constructed once at startup with their
//! configuration, a metrics sink and, where they own external registration
//! state, the registration store.
//!
//! `do_publish` never fails: an empty destination set yields
//! [`DeliveryStatus::MissingDestination`](crate::models::DeliveryStatus) without
//! any network call, and provider errors are logged and reported as
//! [`DeliveryStatus::Failure`](crate::models::DeliveryStatus).

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

use crate::models::{Alert, ChannelConfig, ChannelResponse};

pub const PROTOCOL_PUSH: &str = "push";
pub const PROTOCOL_SMS: &str = "sms";
pub const PROTOCOL_EMAIL: &str = "email";

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Type alias for a boxed future that cannot fail
pub type ResponseFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A delivery channel.
pub trait ChannelNotifier: Send + Sync {
    /// Protocol name of the channel, e.g. `push`.
    fn protocol(&self) -> &str;

    /// Name of the external provider behind the channel.
    fn service_provider_name(&self) -> &str;

    /// Deliver an alert through this channel.
    fn do_publish<'a>(&'a self, alert: &'a Alert) -> ResponseFuture<'a, ChannelResponse>;

    /// Create or remove the external resources backing a user's channel.
    ///
    /// Returns `None` when the channel keeps no such resources.
    fn setup_channel<'a>(
        &'a self,
        user_id: &'a str,
        config: &'a ChannelConfig,
    ) -> ResponseFuture<'a, Option<ChannelResponse>>;

    /// Tear down resources named by a raw unregistration event.
    ///
    /// Failures are logged and swallowed.
    fn destroy_channel<'a>(
        &'a self,
        user_id: &'a str,
        raw_event: &'a Value,
    ) -> ResponseFuture<'a, Option<ChannelResponse>>;
}
