//! Message value type shared by both relay directions.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static CONTENT_LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)content-length:\s*(\d+)\r\n").unwrap());

/// One fully-framed message: the header block (terminated by CRLFCRLF,
/// terminator included) and the body declared by `content-length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Vec<u8>,
    pub body: Vec<u8>,
}

impl Message {
    /// The header block as text, for recognizer matching.
    pub fn header_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.header)
    }

    /// Reassemble the message for byte-for-byte forwarding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header.len() + self.body.len());
        bytes.extend_from_slice(&self.header);
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Extract the `content-length` value from a header block,
    /// case-insensitive, defaulting to 0 when absent.
    pub fn content_length(header: &[u8]) -> usize {
        let text = String::from_utf8_lossy(header);
        CONTENT_LENGTH_RE
            .captures(&text)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_length_is_case_insensitive() {
        let header = b"HTTP/1.1 200 OK\r\nContent-Length: 42\r\n\r\n";
        assert_eq!(Message::content_length(header), 42);
    }

    #[test]
    fn content_length_defaults_to_zero() {
        let header = b"GET /videos/vid.mpd HTTP/1.1\r\n\r\n";
        assert_eq!(Message::content_length(header), 0);
    }

    #[test]
    fn to_bytes_concatenates_header_and_body() {
        let msg = Message {
            header: b"HTTP/1.1 200 OK\r\ncontent-length: 4\r\n\r\n".to_vec(),
            body: b"data".to_vec(),
        };
        assert_eq!(
            msg.to_bytes(),
            b"HTTP/1.1 200 OK\r\ncontent-length: 4\r\n\r\ndata"
        );
    }
}
