//! Payload normalization.
//!
//! Maps any recognized [`WebhookPayload`] shape onto the single
//! [`EmailIntent`] the composer understands.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::mime::{Attachment, EmailIntent, IntentError, Mailbox};
use crate::payload::types::{
    AddressEntry, AddressField, AttachmentContent, WebhookAttachment, WebhookPayload,
};

/// Content type used when an attachment does not declare one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Why a single attachment's bytes could not be recovered.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("byte value {value} at index {index} is out of range")]
    ByteOutOfRange { index: usize, value: String },
    #[error("invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unrecognized attachment content: {0}")]
    UnrecognizedContent(String),
}

/// Reduce a webhook payload to an [`EmailIntent`].
///
/// The envelope recipient is the first entry of `recipients`, falling back
/// to the first `to` address. The envelope sender is the first `from`
/// address, while the `From:` header keeps the payload's display text.
/// Attachments whose bytes cannot be decoded are logged and skipped.
pub fn normalize(payload: WebhookPayload) -> Result<EmailIntent, IntentError> {
    let from = payload
        .from
        .as_ref()
        .and_then(first_mailbox)
        .unwrap_or_else(|| Mailbox::new(None, ""));

    let to = payload
        .recipients
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|r| r.trim())
        .find(|r| !r.is_empty())
        .map(str::to_string)
        .or_else(|| {
            payload
                .to
                .as_ref()
                .and_then(first_mailbox)
                .map(|m| m.address)
        })
        .unwrap_or_default();

    let from_header = payload.from.as_ref().and_then(display_text);

    let mut intent = EmailIntent::new(from, to)?
        .with_subject(payload.subject.unwrap_or_default())
        .with_date(
            payload
                .date
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| Utc::now().to_rfc2822()),
        );

    if let Some(text) = from_header {
        intent = intent.with_from_header(text);
    }
    if let Some(message_id) = payload.message_id {
        intent = intent.with_message_id(message_id);
    }
    if let Some(text) = payload.text {
        intent = intent.with_text(text);
    }
    if let Some(html) = payload.html {
        intent = intent.with_html(html);
    }

    let posted = payload.attachments.unwrap_or_default();
    let posted_count = posted.len();
    let attachments: Vec<Attachment> = posted
        .into_iter()
        .enumerate()
        .filter_map(|(index, attachment)| convert_attachment(index, attachment))
        .collect();
    let intent = intent.with_attachments(attachments);

    info!(
        from = %intent.from().address,
        to = %intent.to(),
        subject = %intent.subject(),
        has_text = intent.text().is_some(),
        has_html = intent.html().is_some(),
        attachments = intent.attachments().len(),
        attachments_skipped = posted_count - intent.attachments().len(),
        "payload_normalized"
    );

    Ok(intent)
}

/// Decode attachment content into raw bytes.
pub fn decode_attachment(content: &AttachmentContent) -> Result<Vec<u8>, AttachmentError> {
    match content {
        AttachmentContent::Buffer { data, .. } | AttachmentContent::Bytes(data) => data
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value
                    .as_u64()
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| AttachmentError::ByteOutOfRange {
                        index,
                        value: value.to_string(),
                    })
            })
            .collect(),
        AttachmentContent::Base64(encoded) => {
            let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
            Ok(STANDARD.decode(compact)?)
        }
        AttachmentContent::Other(value) => {
            Err(AttachmentError::UnrecognizedContent(json_kind(value).to_string()))
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn convert_attachment(index: usize, attachment: WebhookAttachment) -> Option<Attachment> {
    let filename = attachment
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| format!("attachment-{}", index + 1));

    let data = match attachment.content.as_ref().map(decode_attachment) {
        Some(Ok(data)) => data,
        None => Vec::new(),
        Some(Err(e)) => {
            warn!(
                filename = %filename,
                error = %e,
                "attachment_decode_failed"
            );
            return None;
        }
    };

    let content_type = attachment
        .content_type
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    Some(Attachment::new(filename, content_type, data))
}

/// First entry with a non-empty address.
fn first_mailbox(field: &AddressField) -> Option<Mailbox> {
    let from_entry = |entry: &AddressEntry| {
        entry
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| Mailbox::new(entry.name.clone(), a))
    };

    match field {
        AddressField::Group { value, .. } | AddressField::List(value) => {
            value.iter().find_map(from_entry)
        }
        AddressField::Single(entry) => from_entry(entry),
        AddressField::Flat(raw) => {
            Some(Mailbox::parse(raw)).filter(|m| !m.address.is_empty())
        }
    }
}

/// Literal display text carried by the field, if any.
fn display_text(field: &AddressField) -> Option<String> {
    match field {
        AddressField::Group { text, .. } => text.clone().filter(|t| !t.trim().is_empty()),
        AddressField::Flat(raw) => Some(raw.trim().to_string()).filter(|t| !t.is_empty()),
        AddressField::Single(_) | AddressField::List(_) => None,
    }
}
