//! One-message-at-a-time wire framing.
//!
//! # Responsibilities
//! - Read a complete message: header block up to CRLFCRLF plus a
//!   `content-length` body
//! - Write a complete message, looping on partial writes
//! - Surface orderly peer disconnect as a distinguishable condition
//! - Expose a cancellation-safe readiness probe for the relay loop
//!
//! # Design Decisions
//! - Header bytes are consumed one at a time from a buffered reader; the
//!   control messages this protocol exchanges are small and never pipelined
//! - Peer close is `FramingError::PeerClosed`, never a generic I/O error,
//!   so callers can tear down a single connection instead of failing wide

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::message::Message;

/// Upper bound on a single message body, sized to the largest segment an
/// origin serves.
pub const MAX_BODY_LEN: usize = 2 * 1000 * 1000;

/// Error type for framing operations.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The peer closed the connection, before or during a message.
    #[error("peer closed the connection")]
    PeerClosed,

    /// The declared body length exceeds [`MAX_BODY_LEN`].
    #[error("declared body length {0} exceeds the message size limit")]
    BodyTooLarge(usize),

    /// Any other I/O failure on the stream.
    #[error("stream I/O failed: {0}")]
    Io(std::io::Error),
}

fn classify(e: std::io::Error) -> FramingError {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::ConnectionReset => FramingError::PeerClosed,
        _ => FramingError::Io(e),
    }
}

/// Wait until the reader has buffered bytes available.
///
/// Cancellation-safe (a plain `fill_buf`), so the relay loop can `select!`
/// over both directions of a pair without losing partial reads. Returns
/// `PeerClosed` on EOF.
pub async fn wait_readable<R>(reader: &mut R) -> Result<(), FramingError>
where
    R: AsyncBufRead + Unpin,
{
    let buffered = reader.fill_buf().await.map_err(classify)?;
    if buffered.is_empty() {
        return Err(FramingError::PeerClosed);
    }
    Ok(())
}

/// Read one complete message: headers through CRLFCRLF, then exactly
/// `content-length` body bytes (zero if the header is absent).
pub async fn read_message<R>(reader: &mut R) -> Result<Message, FramingError>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = Vec::with_capacity(256);
    while !header.ends_with(b"\r\n\r\n") {
        let byte = reader.read_u8().await.map_err(classify)?;
        header.push(byte);
    }

    let content_length = Message::content_length(&header);
    if content_length > MAX_BODY_LEN {
        return Err(FramingError::BodyTooLarge(content_length));
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await.map_err(classify)?;

    Ok(Message { header, body })
}

/// Write the full byte sequence to the stream.
pub async fn send_message<W>(writer: &mut W, bytes: &[u8]) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await.map_err(classify)?;
    writer.flush().await.map_err(classify)?;
    Ok(())
}
