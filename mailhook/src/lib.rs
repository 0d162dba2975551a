//! Mailhook - inbound email webhook to MTA relay.
//!
//! Receives an email notification as a signed JSON webhook, rebuilds it as
//! an RFC 822 / MIME message and hands it to sendmail or an SMTP relay.
//!
//! ## Architecture
//!
//! ```text
//! POST body → signature check → WebhookPayload → EmailIntent → compose() → Backend
//! ```

pub mod config;
pub mod delivery;
pub mod mime;
pub mod payload;
pub mod web;

// Re-export commonly used types
pub use config::{BackendConfig, Config, ConfigError, SmtpConfig};
pub use delivery::{build_backend, Backend, DeliveryError};
pub use mime::{compose, Attachment, EmailIntent, IntentError, Mailbox};
pub use payload::{normalize, WebhookPayload};
pub use web::{router, AppState};
