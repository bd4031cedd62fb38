//! Firebase Cloud Messaging push channel for alertcast
//!
//! [`PushNotifier`] implements the
//! [`ChannelNotifier`](alertcast_common::ChannelNotifier) contract on top of
//! the FCM HTTP v1 API and manages the device registrations it delivers to.
//!
//! The crate is split along its seams:
//!
//! - [`auth`]: service-account bearer tokens ([`AccessTokenProvider`])
//! - [`client`]: the HTTP transport ([`FcmTransport`])
//! - [`payload`]: per-platform message shapes and response classification
//! - [`notifier`]: destination resolution and token lifecycle

pub mod auth;
pub mod client;
pub mod error;
pub mod notifier;
pub mod payload;

pub use auth::{AccessTokenProvider, ServiceAccountTokenProvider};
pub use client::{FcmHttpResponse, FcmTransport, FirebaseClient};
pub use error::FirebaseError;
pub use notifier::PushNotifier;
pub use payload::{classify_response, FcmMessage, SendOutcome};
