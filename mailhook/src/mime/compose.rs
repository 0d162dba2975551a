//! MIME composer.
//!
//! Turns an [`EmailIntent`] into a complete RFC 822 message, choosing the
//! smallest MIME structure that carries its bodies and attachments.

use std::io;

use tracing::{debug, warn};

use super::boundary::generate_boundary;
use super::encoding::{
    encode_address_header, encode_header_word, sanitize_filename, sanitize_header_value,
    write_base64_wrapped,
};
use super::intent::{Attachment, EmailIntent};

/// Value of the `X-Forwarded-By` header stamped on every message.
pub const FORWARDED_BY: &str = "ForwardEmail Webhook";

const CRLF: &[u8] = b"\r\n";

/// Top-level layout of a composed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    /// `text/plain` only, no MIME-Version, no boundary.
    SinglePart,
    /// `multipart/alternative` at the top level.
    Alternative,
    /// `multipart/mixed` whose first part is a single body.
    Mixed,
    /// `multipart/mixed` whose first part is a nested `multipart/alternative`.
    MixedAlternative,
}

impl Structure {
    pub fn select(has_text: bool, has_html: bool, has_attachments: bool) -> Self {
        match (has_text, has_html, has_attachments) {
            (_, false, false) => Structure::SinglePart,
            (_, true, false) => Structure::Alternative,
            (true, true, true) => Structure::MixedAlternative,
            (_, _, true) => Structure::Mixed,
        }
    }

    pub fn for_intent(intent: &EmailIntent) -> Self {
        Self::select(
            intent.text().is_some(),
            intent.html().is_some(),
            !intent.attachments().is_empty(),
        )
    }
}

/// Render `intent` as RFC 822 bytes.
///
/// Every header and boundary line ends with CRLF. Composition cannot fail;
/// an attachment that cannot be written is logged and left out.
pub fn compose(intent: &EmailIntent) -> Vec<u8> {
    let structure = Structure::for_intent(intent);
    let mut msg = MessageWriter::default();

    msg.header(
        "From",
        &encode_address_header(&sanitize_header_value(&intent.from_header())),
    );
    msg.header("To", &sanitize_header_value(intent.to()));
    msg.header(
        "Subject",
        &encode_header_word(&sanitize_header_value(intent.subject())),
    );
    msg.header("Date", &sanitize_header_value(intent.date()));
    if let Some(message_id) = intent.message_id() {
        msg.header("Message-ID", &format_message_id(message_id));
    }
    msg.header("X-Forwarded-By", FORWARDED_BY);

    let text = intent.text();
    let html = intent.html();

    match structure {
        Structure::SinglePart => {
            msg.header("Content-Type", "text/plain; charset=utf-8");
            msg.blank();
            msg.body(text.unwrap_or_default());
        }
        Structure::Alternative => {
            let boundary = generate_boundary();
            msg.multipart_headers("alternative", &boundary);

            if let Some(text) = text {
                msg.delimiter(&boundary);
                msg.text_part("plain", text);
            }
            if let Some(html) = html {
                msg.delimiter(&boundary);
                msg.text_part("html", html);
            }

            msg.close(&boundary);
        }
        Structure::Mixed | Structure::MixedAlternative => {
            let boundary = generate_boundary();
            msg.multipart_headers("mixed", &boundary);
            msg.delimiter(&boundary);

            match (text, html) {
                (Some(text), Some(html)) => {
                    let alternative = generate_boundary();
                    msg.header(
                        "Content-Type",
                        &format!("multipart/alternative; boundary=\"{}\"", alternative),
                    );
                    msg.blank();
                    msg.delimiter(&alternative);
                    msg.text_part("plain", text);
                    msg.delimiter(&alternative);
                    msg.text_part("html", html);
                    msg.close(&alternative);
                }
                (None, Some(html)) => msg.text_part("html", html),
                (text, None) => msg.text_part("plain", text.unwrap_or_default()),
            }

            for attachment in intent.attachments() {
                match attachment_part(attachment) {
                    Ok(part) => {
                        msg.delimiter(&boundary);
                        msg.raw(&part);
                    }
                    Err(e) => {
                        warn!(
                            filename = %attachment.filename,
                            error = %e,
                            "attachment_write_failed"
                        );
                    }
                }
            }

            msg.close(&boundary);
        }
    }

    debug!(
        structure = ?structure,
        attachments = intent.attachments().len(),
        message_length = msg.buf.len(),
        "email_composed"
    );

    msg.buf
}

/// Render one attachment part (headers + wrapped base64), without its
/// leading delimiter.
fn attachment_part(attachment: &Attachment) -> io::Result<Vec<u8>> {
    let content_type = sanitize_header_value(attachment.content_type.trim());
    let content_type = if content_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        content_type
    };

    let mut part = MessageWriter::default();
    part.header("Content-Type", &content_type);
    part.header("Content-Transfer-Encoding", "base64");
    part.header(
        "Content-Disposition",
        &format!(
            "attachment; filename=\"{}\"",
            sanitize_filename(&attachment.filename)
        ),
    );
    part.blank();

    write_base64_wrapped(part.buf, &attachment.data)
}

fn format_message_id(message_id: &str) -> String {
    let id = sanitize_header_value(message_id.trim());
    if id.starts_with('<') && id.ends_with('>') {
        id
    } else {
        format!("<{}>", id.trim_matches(|c| c == '<' || c == '>'))
    }
}

/// Append-only message buffer with CRLF line discipline.
#[derive(Default)]
struct MessageWriter {
    buf: Vec<u8>,
}

impl MessageWriter {
    fn header(&mut self, name: &str, value: &str) {
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.extend_from_slice(b": ");
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.extend_from_slice(CRLF);
    }

    fn blank(&mut self) {
        self.buf.extend_from_slice(CRLF);
    }

    fn body(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.extend_from_slice(CRLF);
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn multipart_headers(&mut self, subtype: &str, boundary: &str) {
        self.header("MIME-Version", "1.0");
        self.header(
            "Content-Type",
            &format!("multipart/{}; boundary=\"{}\"", subtype, boundary),
        );
        self.blank();
    }

    fn delimiter(&mut self, boundary: &str) {
        self.buf.extend_from_slice(b"--");
        self.buf.extend_from_slice(boundary.as_bytes());
        self.buf.extend_from_slice(CRLF);
    }

    fn close(&mut self, boundary: &str) {
        self.buf.extend_from_slice(b"--");
        self.buf.extend_from_slice(boundary.as_bytes());
        self.buf.extend_from_slice(b"--");
        self.buf.extend_from_slice(CRLF);
    }

    /// A `text/<subtype>` part in 8bit, without its leading delimiter.
    fn text_part(&mut self, subtype: &str, body: &str) {
        self.header("Content-Type", &format!("text/{}; charset=utf-8", subtype));
        self.header("Content-Transfer-Encoding", "8bit");
        self.blank();
        self.body(body);
    }
}
