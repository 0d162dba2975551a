//! Inbound webhook JSON shapes.
//!
//! Every field is optional at this level; required-ness is enforced during
//! normalization so a missing field yields a clear 400 rather than a serde
//! error.

use serde::{Deserialize, Serialize};

/// The email notification posted to the webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<AddressField>,
    #[serde(default)]
    pub to: Option<AddressField>,
    /// Explicit envelope recipients; takes precedence over `to`.
    #[serde(default)]
    pub recipients: Option<Vec<String>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default, rename = "messageId", alias = "message_id")]
    pub message_id: Option<String>,
    /// Original headers, accepted in any form and otherwise ignored.
    #[serde(default)]
    pub headers: Option<serde_json::Value>,
    #[serde(default)]
    pub attachments: Option<Vec<WebhookAttachment>>,
}

/// An address field in any of the recognized shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressField {
    /// `{ "value": [{ "address", "name" }], "text": "..." }`
    Group {
        value: Vec<AddressEntry>,
        #[serde(default)]
        text: Option<String>,
    },
    /// `{ "address", "name" }`
    Single(AddressEntry),
    /// `"Name <addr>"` or `"addr"`
    Flat(String),
    /// `[{ "address", "name" }]`
    List(Vec<AddressEntry>),
}

/// One parsed address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressEntry {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One attachment as posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAttachment {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, rename = "contentType", alias = "content_type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content: Option<AttachmentContent>,
}

/// Attachment bytes in any of the recognized encodings.
///
/// Byte arrays are kept as raw JSON values and anything unrecognized lands
/// in `Other`, so one malformed attachment is reported during decoding
/// instead of failing the whole payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttachmentContent {
    /// Node.js `Buffer` serialization: `{ "type": "Buffer", "data": [..] }`
    Buffer {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        data: Vec<serde_json::Value>,
    },
    /// Standard base64 string.
    Base64(String),
    /// Bare byte array.
    Bytes(Vec<serde_json::Value>),
    /// Any other JSON value.
    Other(serde_json::Value),
}
