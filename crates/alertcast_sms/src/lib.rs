//! Amazon SNS SMS channel for alertcast

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod notifier;

pub use error::SmsError;
pub use gateway::{SmsGateway, SnsGateway};
pub use notifier::SmsNotifier;
