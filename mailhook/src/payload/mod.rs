//! Inbound webhook payload handling.
//!
//! Several JSON shapes for the same notification are seen in the wild
//! (address groups vs. flat strings, byte arrays vs. base64). They are all
//! deserialized by [`types`] and reduced to one [`EmailIntent`] by
//! [`normalize`].
//!
//! ```text
//! body bytes → WebhookPayload → normalize() → EmailIntent
//! ```
//!
//! [`EmailIntent`]: crate::mime::EmailIntent

pub mod normalize;
pub mod types;

pub use normalize::{decode_attachment, normalize, AttachmentError};
pub use types::{AddressEntry, AddressField, AttachmentContent, WebhookAttachment, WebhookPayload};
