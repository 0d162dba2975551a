//! Transfer encoding helpers for composed messages.
//!
//! Attachments are base64 encoded through [`LineWrapper`], which re-chunks
//! the encoder's output into CRLF-terminated lines as it streams.

use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;
use base64::Engine;

/// Maximum encoded line length recommended by RFC 2045.
pub const BASE64_LINE_LENGTH: usize = 76;

/// Longest UTF-8 chunk per encoded-word; 45 bytes become 60 base64 chars,
/// keeping each `=?utf-8?B?...?=` word under 75 characters.
const ENCODED_WORD_CHUNK: usize = 45;

/// Writer adapter that breaks its output into lines of at most `width`
/// bytes, each terminated with CRLF.
///
/// Call [`LineWrapper::finish`] to terminate the final partial line.
pub struct LineWrapper<W> {
    inner: W,
    width: usize,
    column: usize,
}

impl<W: Write> LineWrapper<W> {
    pub fn new(inner: W, width: usize) -> Self {
        Self {
            inner,
            width: width.max(1),
            column: 0,
        }
    }

    /// Terminate the last line (if any) and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.column > 0 {
            self.inner.write_all(b"\r\n")?;
            self.column = 0;
        }
        Ok(self.inner)
    }
}

impl<W: Write> Write for LineWrapper<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;

        while !rest.is_empty() {
            if self.column == self.width {
                self.inner.write_all(b"\r\n")?;
                self.column = 0;
            }

            let take = (self.width - self.column).min(rest.len());
            self.inner.write_all(&rest[..take])?;
            self.column += take;
            rest = &rest[take..];
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Base64-encode `data` into `out`, wrapped at [`BASE64_LINE_LENGTH`].
///
/// Every emitted line, including the last, ends with CRLF. Empty input
/// produces no output.
pub fn write_base64_wrapped<W: Write>(out: W, data: &[u8]) -> io::Result<W> {
    let mut encoder = EncoderWriter::new(LineWrapper::new(out, BASE64_LINE_LENGTH), &STANDARD);
    encoder.write_all(data)?;
    let wrapper = encoder.finish()?;
    wrapper.finish()
}

/// Replace CR and LF so a value cannot start a new header line.
pub fn sanitize_header_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

/// Strip characters that would break out of a quoted `filename="..."`.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\r' | '\n'))
        .collect()
}

/// Encode a header value as RFC 2047 encoded-words when it is not ASCII.
///
/// Long values are split on character boundaries into several words joined
/// by folding whitespace.
pub fn encode_header_word(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;

    for (index, c) in text.char_indices() {
        let next = index + c.len_utf8();
        if next - start > ENCODED_WORD_CHUNK && end > start {
            words.push(encoded_word(&text[start..end]));
            start = end;
        }
        end = next;
    }
    if end > start {
        words.push(encoded_word(&text[start..end]));
    }

    words.join("\r\n ")
}

/// Encode the display name of a `Name <addr>` header value when it is not
/// ASCII, leaving the angle-bracketed address as-is.
///
/// A value without an angle-bracketed address is encoded whole.
pub fn encode_address_header(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    let trimmed = value.trim();
    match trimmed.rfind('<') {
        Some(open) if trimmed.ends_with('>') => {
            let name = trimmed[..open].trim().trim_matches('"').trim();
            let address = &trimmed[open..];
            if name.is_empty() {
                address.to_string()
            } else {
                format!("{} {}", encode_header_word(name), address)
            }
        }
        _ => encode_header_word(trimmed),
    }
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", STANDARD.encode(chunk.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapped(data: &[u8]) -> String {
        String::from_utf8(write_base64_wrapped(Vec::new(), data).unwrap()).unwrap()
    }

    #[test]
    fn test_line_wrapper_splits_across_writes() {
        let mut wrapper = LineWrapper::new(Vec::new(), 4);
        wrapper.write_all(b"abc").unwrap();
        wrapper.write_all(b"defgh").unwrap();
        wrapper.write_all(b"ij").unwrap();
        let out = wrapper.finish().unwrap();

        assert_eq!(out, b"abcd\r\nefgh\r\nij\r\n");
    }

    #[test]
    fn test_line_wrapper_exact_multiple() {
        let mut wrapper = LineWrapper::new(Vec::new(), 4);
        wrapper.write_all(b"abcdefgh").unwrap();
        let out = wrapper.finish().unwrap();

        assert_eq!(out, b"abcd\r\nefgh\r\n");
    }

    #[test]
    fn test_base64_wrapped_1000_bytes() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 37 % 256) as u8).collect();
        let encoded = wrapped(&data);

        assert!(encoded.ends_with("\r\n"));
        let lines: Vec<&str> = encoded.split_terminator("\r\n").collect();
        let (last, full) = lines.split_last().unwrap();
        assert!(full.iter().all(|line| line.len() == BASE64_LINE_LENGTH));
        assert!(last.len() <= BASE64_LINE_LENGTH);
        assert!(!encoded.replace("\r\n", "").contains('\n'));

        let joined: String = lines.concat();
        assert_eq!(STANDARD.decode(joined).unwrap(), data);
    }

    #[test]
    fn test_base64_wrapped_single_line() {
        assert_eq!(wrapped(b"hello"), "aGVsbG8=\r\n");
    }

    #[test]
    fn test_base64_wrapped_line_boundary() {
        // 57 input bytes encode to exactly 76 characters
        let encoded = wrapped(&[0u8; 57]);
        assert_eq!(encoded.len(), 78);
        assert!(encoded.ends_with("\r\n"));
        assert_eq!(encoded.matches("\r\n").count(), 1);
    }

    #[test]
    fn test_base64_wrapped_empty() {
        assert_eq!(wrapped(b""), "");
    }

    #[test]
    fn test_sanitize_header_value() {
        assert_eq!(
            sanitize_header_value("Hi\r\nBcc: evil@example.com"),
            "Hi  Bcc: evil@example.com"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("re\"port\r\n.pdf"), "report.pdf");
    }

    #[test]
    fn test_encode_header_word_ascii_untouched() {
        assert_eq!(encode_header_word("Hello world"), "Hello world");
    }

    #[test]
    fn test_encode_header_word_utf8() {
        let encoded = encode_header_word("Grüße");
        assert_eq!(encoded, format!("=?utf-8?B?{}?=", STANDARD.encode("Grüße")));
    }

    #[test]
    fn test_encode_header_word_long_value_is_folded() {
        let subject = "ünïcödé ".repeat(20);
        let encoded = encode_header_word(&subject);

        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert!(words.len() > 1);
        let mut decoded = Vec::new();
        for word in words {
            assert!(word.len() <= 75);
            let payload = word
                .strip_prefix("=?utf-8?B?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            decoded.extend(STANDARD.decode(payload).unwrap());
        }
        assert_eq!(String::from_utf8(decoded).unwrap(), subject);
    }

    #[test]
    fn test_encode_address_header_ascii_untouched() {
        assert_eq!(encode_address_header("\"Alice\" <a@x.com>"), "\"Alice\" <a@x.com>");
    }

    #[test]
    fn test_encode_address_header_display_name() {
        assert_eq!(
            encode_address_header("\"Jürgen\" <j@x.com>"),
            format!("=?utf-8?B?{}?= <j@x.com>", STANDARD.encode("Jürgen"))
        );
        assert_eq!(
            encode_address_header("Jürgen"),
            format!("=?utf-8?B?{}?=", STANDARD.encode("Jürgen"))
        );
    }
}
