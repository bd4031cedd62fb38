// SMTP email channel for alertcast.
//
// Alerts are rendered upstream; this crate assembles the MIME message,
// attaches the files carried in the alert payload and sends it through an
// async SMTP transport.

pub mod error;
pub mod mime;
pub mod notifier;
pub mod transport;

pub use error::EmailError;
pub use mime::{AttachmentFile, InlineImage};
pub use notifier::EmailNotifier;
pub use transport::{EmailTransport, SmtpTransport};
