//! The normalized email intent consumed by the composer.

use std::fmt;

use thiserror::Error;

/// Reasons an intent cannot be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("sender address is empty")]
    MissingSender,
    #[error("recipient address is empty")]
    MissingRecipient,
}

/// A display name and address pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub address: String,
}

impl Mailbox {
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.filter(|n| !n.trim().is_empty()),
            address: address.into(),
        }
    }

    /// Parse `"Name <addr>"` or a bare `"addr"`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match (raw.rfind('<'), raw.ends_with('>')) {
            (Some(open), true) => {
                let address = raw[open + 1..raw.len() - 1].trim();
                let name = raw[..open].trim().trim_matches('"').trim();
                Self::new(Some(name.to_string()), address)
            }
            _ => Self::new(None, raw),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// A single file carried along with the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// Everything needed to render one outgoing message.
///
/// Built once per request and handed to [`compose`](super::compose).
/// [`EmailIntent::new`] is the only constructor, so an intent always has a
/// non-empty sender address and recipient.
#[derive(Debug, Clone)]
pub struct EmailIntent {
    from: Mailbox,
    from_header: Option<String>,
    to: String,
    subject: String,
    date: String,
    message_id: Option<String>,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
}

impl EmailIntent {
    /// Create an intent, rejecting empty sender or recipient addresses.
    pub fn new(from: Mailbox, to: impl Into<String>) -> Result<Self, IntentError> {
        let to = to.into();

        if from.address.trim().is_empty() {
            return Err(IntentError::MissingSender);
        }
        if to.trim().is_empty() {
            return Err(IntentError::MissingRecipient);
        }

        Ok(Self {
            from,
            from_header: None,
            to,
            subject: String::new(),
            date: String::new(),
            message_id: None,
            text: None,
            html: None,
            attachments: Vec::new(),
        })
    }

    /// Use `text` verbatim as the `From:` header instead of the mailbox.
    pub fn with_from_header(mut self, text: impl Into<String>) -> Self {
        self.from_header = Some(text.into()).filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into()).filter(|id| !id.trim().is_empty());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_attachments(mut self, attachments: impl IntoIterator<Item = Attachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    /// Envelope sender address.
    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    /// Literal `From:` header value.
    pub fn from_header(&self) -> String {
        self.from_header
            .clone()
            .unwrap_or_else(|| self.from.to_string())
    }

    /// Envelope and header recipient.
    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Plain-text body, if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// HTML body, if present and non-empty.
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref().filter(|h| !h.is_empty())
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_sender() {
        let result = EmailIntent::new(Mailbox::new(None, ""), "b@y.com");
        assert_eq!(result.unwrap_err(), IntentError::MissingSender);
    }

    #[test]
    fn test_new_rejects_empty_recipient() {
        let result = EmailIntent::new(Mailbox::new(None, "a@x.com"), "  ");
        assert_eq!(result.unwrap_err(), IntentError::MissingRecipient);
    }

    #[test]
    fn test_empty_bodies_are_absent() {
        let intent = EmailIntent::new(Mailbox::new(None, "a@x.com"), "b@y.com")
            .unwrap()
            .with_text("")
            .with_html("");

        assert!(intent.text().is_none());
        assert!(intent.html().is_none());
    }

    #[test]
    fn test_from_header_prefers_literal_text() {
        let mailbox = Mailbox::new(Some("Alice".to_string()), "a@x.com");
        let intent = EmailIntent::new(mailbox.clone(), "b@y.com").unwrap();
        assert_eq!(intent.from_header(), "Alice <a@x.com>");

        let intent = intent.with_from_header("\"Alice A.\" <a@x.com>");
        assert_eq!(intent.from_header(), "\"Alice A.\" <a@x.com>");
        assert_eq!(intent.from(), &mailbox);
    }

    #[test]
    fn test_mailbox_parse() {
        assert_eq!(Mailbox::parse("a@x.com"), Mailbox::new(None, "a@x.com"));
        assert_eq!(
            Mailbox::parse("\"Alice\" <a@x.com>"),
            Mailbox::new(Some("Alice".to_string()), "a@x.com")
        );
        assert_eq!(Mailbox::parse("<a@x.com>"), Mailbox::new(None, "a@x.com"));
    }
}
