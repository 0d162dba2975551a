//! RFC 822 / MIME message composition.
//!
//! ## Composition Flow
//!
//! ```text
//! EmailIntent → Structure::select() → compose() → Vec<u8>
//! ```
//!
//! The composer only ever produces messages; it never parses them.

pub mod boundary;
pub mod compose;
pub mod encoding;
pub mod intent;

pub use boundary::generate_boundary;
pub use compose::{compose, Structure, FORWARDED_BY};
pub use encoding::{write_base64_wrapped, LineWrapper, BASE64_LINE_LENGTH};
pub use intent::{Attachment, EmailIntent, IntentError, Mailbox};
