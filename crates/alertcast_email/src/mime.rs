//! MIME assembly for alert emails.
//!
//! The body layout is:
//!
//! ```text
//! multipart/mixed
//! ├── text/plain                        (no HTML body)
//! │   or multipart/alternative
//! │      ├── text/plain
//! │      └── multipart/related
//! │          ├── text/html
//! │          └── inline images...
//! └── attachments...
//! ```
//!
//! Attachments are read from the alert attributes: the global `attachments`
//! list followed by `localeAttachments[<locale>]`. Inline images come from
//! `inlineImages`. Contents are base64 encoded.

use alertcast_common::{Alert, AlertMessage};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use serde::Deserialize;
use serde_json::Value;

use crate::error::EmailError;

pub const ATTACHMENTS_ATTRIBUTE: &str = "attachments";
pub const LOCALE_ATTACHMENTS_ATTRIBUTE: &str = "localeAttachments";
pub const INLINE_IMAGES_ATTRIBUTE: &str = "inlineImages";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A decoded file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// A decoded image referenced from the HTML body as `cid:<content_id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub content_id: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncodedFile {
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    content_id: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    content: String,
}

impl EncodedFile {
    fn decode(&self) -> Result<(String, Vec<u8>), EmailError> {
        let content = STANDARD.decode(self.content.trim()).map_err(|e| {
            EmailError::AttachmentError(format!(
                "{}: invalid base64 content: {}",
                self.label(),
                e
            ))
        })?;
        let content_type = self
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        Ok((content_type, content))
    }

    fn label(&self) -> &str {
        self.file_name
            .as_deref()
            .or(self.content_id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

fn encoded_files(value: Option<&Value>, attribute: &str) -> Result<Vec<EncodedFile>, EmailError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| EmailError::AttachmentError(format!("{attribute}: {e}"))),
    }
}

/// Merges the global and the locale-specific attachments of an alert.
pub fn collect_attachments(alert: &Alert, locale: &str) -> Result<Vec<AttachmentFile>, EmailError> {
    let global = encoded_files(alert.attributes.get(ATTACHMENTS_ATTRIBUTE), ATTACHMENTS_ATTRIBUTE)?;
    let localized = encoded_files(
        alert
            .attributes
            .get(LOCALE_ATTACHMENTS_ATTRIBUTE)
            .and_then(|by_locale| by_locale.get(locale)),
        LOCALE_ATTACHMENTS_ATTRIBUTE,
    )?;

    global
        .iter()
        .chain(localized.iter())
        .map(|file| {
            let file_name = file.file_name.clone().ok_or_else(|| {
                EmailError::AttachmentError(format!("{}: missing fileName", file.label()))
            })?;
            let (content_type, content) = file.decode()?;
            Ok(AttachmentFile {
                file_name,
                content_type,
                content,
            })
        })
        .collect()
}

/// Reads the inline images of an alert; `fileName` stands in for a missing `contentId`.
pub fn collect_inline_images(alert: &Alert) -> Result<Vec<InlineImage>, EmailError> {
    encoded_files(alert.attributes.get(INLINE_IMAGES_ATTRIBUTE), INLINE_IMAGES_ATTRIBUTE)?
        .iter()
        .map(|file| {
            let content_id = file
                .content_id
                .clone()
                .or_else(|| file.file_name.clone())
                .ok_or_else(|| {
                    EmailError::AttachmentError("inline image without contentId".to_string())
                })?;
            let (content_type, content) = file.decode()?;
            Ok(InlineImage {
                content_id,
                content_type,
                content,
            })
        })
        .collect()
}

fn content_type(value: &str) -> Result<ContentType, EmailError> {
    ContentType::parse(value)
        .map_err(|e| EmailError::AttachmentError(format!("content type {value}: {e}")))
}

/// Builds the message body described in the module docs.
pub fn build_body(
    content: &AlertMessage,
    attachments: &[AttachmentFile],
    inline_images: &[InlineImage],
) -> Result<MultiPart, EmailError> {
    let mut body = match &content.html_body {
        Some(html) => {
            let mut related = MultiPart::related().singlepart(SinglePart::html(html.clone()));
            for image in inline_images {
                related = related.singlepart(
                    Attachment::new_inline(image.content_id.clone())
                        .body(image.content.clone(), content_type(&image.content_type)?),
                );
            }
            MultiPart::mixed().multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(content.body.clone()))
                    .multipart(related),
            )
        }
        None => MultiPart::mixed().singlepart(SinglePart::plain(content.body.clone())),
    };

    for attachment in attachments {
        body = body.singlepart(
            Attachment::new(attachment.file_name.clone())
                .body(attachment.content.clone(), content_type(&attachment.content_type)?),
        );
    }
    Ok(body)
}

/// Parses an address, reporting which one failed.
pub fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address.parse().map_err(|e: lettre::address::AddressError| EmailError::AddressError {
        address: address.to_string(),
        message: e.to_string(),
    })
}

/// Wraps a body into a message for one recipient.
pub fn build_message(
    from: &Mailbox,
    to: Mailbox,
    subject: &str,
    body: MultiPart,
) -> Result<Message, EmailError> {
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(subject)
        .multipart(body)
        .map_err(|e| EmailError::BuildError(e.to_string()))
}
