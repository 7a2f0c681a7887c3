//! Binary routing protocol between the proxy and the load balancer.
//!
//! One request and one response per connection, then close. Layouts are
//! fixed-width with big-endian 16-bit fields and must stay bit-exact:
//! request = 4-byte IPv4 + 2-byte correlation id; response = 4-byte IPv4 +
//! 2-byte port + 2-byte correlation id.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Wire size of a routing request.
pub const REQUEST_LEN: usize = 6;
/// Wire size of a routing response.
pub const RESPONSE_LEN: usize = 8;

/// Error type for one routing exchange.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer closed before a complete record was exchanged. On the proxy
    /// side this is also how a balancer refusal surfaces.
    #[error("peer closed before completing the routing exchange")]
    PeerClosed,

    /// The response echoed a different correlation id than the request.
    #[error("correlation id mismatch: sent {sent}, received {received}")]
    CorrelationMismatch { sent: u16, received: u16 },

    #[error("routing exchange I/O failed: {0}")]
    Io(std::io::Error),
}

fn classify(e: std::io::Error) -> ProtocolError {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::ConnectionReset => ProtocolError::PeerClosed,
        _ => ProtocolError::Io(e),
    }
}

/// Routing request: which client does the proxy want an origin for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequest {
    pub client_addr: Ipv4Addr,
    pub request_id: u16,
}

impl RouteRequest {
    pub fn encode(&self) -> [u8; REQUEST_LEN] {
        let mut bytes = [0u8; REQUEST_LEN];
        bytes[..4].copy_from_slice(&self.client_addr.octets());
        bytes[4..].copy_from_slice(&self.request_id.to_be_bytes());
        bytes
    }

    pub fn decode(bytes: [u8; REQUEST_LEN]) -> Self {
        Self {
            client_addr: Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            request_id: u16::from_be_bytes([bytes[4], bytes[5]]),
        }
    }

    pub async fn read_from<R>(reader: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = [0u8; REQUEST_LEN];
        reader.read_exact(&mut bytes).await.map_err(classify)?;
        Ok(Self::decode(bytes))
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.encode()).await.map_err(classify)
    }
}

/// Routing response: the origin endpoint, echoing the request's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteResponse {
    pub server_addr: Ipv4Addr,
    pub server_port: u16,
    pub request_id: u16,
}

impl RouteResponse {
    pub fn encode(&self) -> [u8; RESPONSE_LEN] {
        let mut bytes = [0u8; RESPONSE_LEN];
        bytes[..4].copy_from_slice(&self.server_addr.octets());
        bytes[4..6].copy_from_slice(&self.server_port.to_be_bytes());
        bytes[6..].copy_from_slice(&self.request_id.to_be_bytes());
        bytes
    }

    pub fn decode(bytes: [u8; RESPONSE_LEN]) -> Self {
        Self {
            server_addr: Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            server_port: u16::from_be_bytes([bytes[4], bytes[5]]),
            request_id: u16::from_be_bytes([bytes[6], bytes[7]]),
        }
    }

    pub async fn read_from<R>(reader: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = [0u8; RESPONSE_LEN];
        reader.read_exact(&mut bytes).await.map_err(classify)?;
        Ok(Self::decode(bytes))
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.encode()).await.map_err(classify)
    }
}

/// Proxy-side exchange: ask the balancer which origin should serve
/// `client_addr`.
///
/// Opens a short-lived connection, sends one request with a random
/// correlation id, reads one response, and verifies the echoed id. The
/// connection is dropped either way.
pub async fn route_via_balancer(
    hostname: &str,
    port: u16,
    client_addr: Ipv4Addr,
) -> Result<SocketAddr, ProtocolError> {
    let mut stream = TcpStream::connect((hostname, port))
        .await
        .map_err(ProtocolError::Io)?;

    let request = RouteRequest {
        client_addr,
        request_id: rand::random(),
    };
    request.write_to(&mut stream).await?;

    let response = RouteResponse::read_from(&mut stream).await?;
    if response.request_id != request.request_id {
        return Err(ProtocolError::CorrelationMismatch {
            sent: request.request_id,
            received: response.request_id,
        });
    }

    Ok(SocketAddr::V4(SocketAddrV4::new(
        response.server_addr,
        response.server_port,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout_is_bit_exact() {
        let request = RouteRequest {
            client_addr: Ipv4Addr::new(10, 0, 0, 1),
            request_id: 0x1234,
        };
        assert_eq!(request.encode(), [10, 0, 0, 1, 0x12, 0x34]);
        assert_eq!(RouteRequest::decode(request.encode()), request);
    }

    #[test]
    fn response_layout_is_bit_exact() {
        let response = RouteResponse {
            server_addr: Ipv4Addr::new(192, 168, 1, 20),
            server_port: 8000,
            request_id: 0xBEEF,
        };
        assert_eq!(
            response.encode(),
            [192, 168, 1, 20, 0x1F, 0x40, 0xBE, 0xEF]
        );
        assert_eq!(RouteResponse::decode(response.encode()), response);
    }

    #[tokio::test]
    async fn records_survive_a_stream() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let request = RouteRequest {
            client_addr: Ipv4Addr::new(1, 2, 3, 4),
            request_id: 7,
        };
        request.write_to(&mut a).await.unwrap();
        assert_eq!(RouteRequest::read_from(&mut b).await.unwrap(), request);
    }

    #[tokio::test]
    async fn truncated_record_is_peer_closed() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&[1, 2, 3]).await.unwrap();
        drop(a);
        match RouteRequest::read_from(&mut b).await {
            Err(ProtocolError::PeerClosed) => {}
            other => panic!("expected PeerClosed, got {other:?}"),
        }
    }
}
