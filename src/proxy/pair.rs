//! The connection pair: one client socket relayed to one origin socket.
//!
//! # Responsibilities
//! - Multiplex the two directions, servicing one complete message at a time
//! - Intercept recognized client requests: fold in throughput reports,
//!   populate the bitrate catalog, rewrite manifest and segment requests
//! - Forward origin traffic to the client unchanged
//! - Tear both sides down together
//!
//! # Design Decisions
//! - The pair task owns all four stream halves; dropping the pair closes
//!   both sockets, so no observer can see one side without the other
//! - Direction choice uses a cancellation-safe readiness probe; once a side
//!   is chosen, its message is read to completion before the loop returns
//!   to waiting (the reference design's per-connection head-of-line
//!   blocking, kept deliberately)
//! - A message is forwarded only once fully framed

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::abr::catalog::{self, ManifestError};
use crate::abr::selector;
use crate::balancer::protocol::ProtocolError;
use crate::http::recognize::{self, ClientRequest, RecognizeError};
use crate::net::framing::{self, FramingError};
use crate::proxy::engine::ProxyEngine;

/// The fixed reply for fragment reports; never touches the origin.
pub const OK_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n";

/// Error type for one connection pair's lifetime.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Recognize(#[from] RecognizeError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("routing exchange failed: {0}")]
    Routing(#[from] ProtocolError),

    #[error("origin connection failed: {0}")]
    Connect(std::io::Error),

    #[error("load balancing requires an IPv4 client, got {0}")]
    NonIpv4Client(std::net::IpAddr),
}

/// A paired client/origin connection, owned by a single task.
pub struct ConnectionPair {
    client_rd: BufReader<OwnedReadHalf>,
    client_wr: OwnedWriteHalf,
    origin_rd: BufReader<OwnedReadHalf>,
    origin_wr: OwnedWriteHalf,
    peer: SocketAddr,
}

impl ConnectionPair {
    pub fn new(client: TcpStream, origin: TcpStream, peer: SocketAddr) -> Self {
        let (client_rd, client_wr) = client.into_split();
        let (origin_rd, origin_wr) = origin.into_split();
        Self {
            client_rd: BufReader::new(client_rd),
            client_wr,
            origin_rd: BufReader::new(origin_rd),
            origin_wr,
            peer,
        }
    }

    /// Relay until either peer disconnects or a connection-scoped fault.
    ///
    /// An orderly disconnect on either side is the normal end of a pair and
    /// returns `Ok`; the caller only sees genuine faults.
    pub async fn relay(&mut self, proxy: &ProxyEngine) -> Result<(), RelayError> {
        match self.relay_loop(proxy).await {
            Err(RelayError::Framing(FramingError::PeerClosed)) => {
                tracing::info!(peer_addr = %self.peer, "connection pair closed");
                Ok(())
            }
            other => other,
        }
    }

    async fn relay_loop(&mut self, proxy: &ProxyEngine) -> Result<(), RelayError> {
        loop {
            tokio::select! {
                ready = framing::wait_readable(&mut self.client_rd) => {
                    ready?;
                    self.handle_client_message(proxy).await?;
                }
                ready = framing::wait_readable(&mut self.origin_rd) => {
                    ready?;
                    self.forward_origin_message().await?;
                }
            }
        }
    }

    async fn handle_client_message(&mut self, proxy: &ProxyEngine) -> Result<(), RelayError> {
        let message = framing::read_message(&mut self.client_rd).await?;

        match recognize::classify(&message.header_text())? {
            ClientRequest::FragmentReport(report) => {
                let sample = proxy.throughput().record(
                    &report.uuid,
                    report.fragment_size,
                    report.start_ms,
                    report.end_ms,
                );
                tracing::info!(
                    uuid = %report.uuid,
                    fragment_size = report.fragment_size,
                    elapsed_ms = report.end_ms - report.start_ms,
                    instant_kbps = sample.instant_kbps as u64,
                    average_kbps = sample.average_kbps,
                    "client finished receiving a segment"
                );
                framing::send_message(&mut self.client_wr, OK_RESPONSE).await?;
            }
            ClientRequest::Manifest(request) => {
                self.ensure_catalog(proxy, &request.path).await?;
                let rewritten = format!(
                    "GET {}/vid-no-list.mpd HTTP/1.1\r\ncontent-length: 0\r\n\r\n",
                    request.path
                );
                framing::send_message(&mut self.origin_wr, rewritten.as_bytes()).await?;
                tracing::info!(
                    uuid = %request.uuid,
                    path = %request.path,
                    "manifest request forwarded without the bitrate list"
                );
            }
            ClientRequest::Segment(request) => {
                let rates = self.ensure_catalog(proxy, &request.path).await?;
                let estimate = proxy.throughput().estimate(&request.uuid);
                match selector::select_bitrate(&rates, estimate) {
                    Some(bitrate) => {
                        let rewritten = format!(
                            "GET {}/video/vid-{}-seg-{}.m4s HTTP/1.1\r\ncontent-length: 0\r\n\r\n",
                            request.path, bitrate, request.segment
                        );
                        framing::send_message(&mut self.origin_wr, rewritten.as_bytes()).await?;
                        tracing::info!(
                            uuid = %request.uuid,
                            segment = %request.segment,
                            bitrate,
                            estimate_kbps = estimate,
                            "segment request forwarded"
                        );
                    }
                    None => {
                        tracing::warn!(
                            path = %request.path,
                            "no video bitrates advertised, forwarding segment request unchanged"
                        );
                        framing::send_message(&mut self.origin_wr, &message.to_bytes()).await?;
                    }
                }
            }
            ClientRequest::Passthrough => {
                framing::send_message(&mut self.origin_wr, &message.to_bytes()).await?;
            }
        }
        Ok(())
    }

    /// Forward one origin message to the client byte-for-byte.
    async fn forward_origin_message(&mut self) -> Result<(), RelayError> {
        let message = framing::read_message(&mut self.origin_rd).await?;
        framing::send_message(&mut self.client_wr, &message.to_bytes()).await?;
        Ok(())
    }

    /// Look up the bitrate list for a path, fetching the manifest over this
    /// pair's origin connection on first reference. Cached paths never
    /// re-contact the origin.
    async fn ensure_catalog(
        &mut self,
        proxy: &ProxyEngine,
        path: &str,
    ) -> Result<Arc<Vec<u32>>, RelayError> {
        if let Some(rates) = proxy.catalog().get(path) {
            return Ok(rates);
        }

        let probe = format!("GET {path}/vid.mpd HTTP/1.1\r\ncontent-length: 0\r\n\r\n");
        framing::send_message(&mut self.origin_wr, probe.as_bytes()).await?;
        let manifest = framing::read_message(&mut self.origin_rd).await?;

        let rates = catalog::parse_manifest_bitrates(&String::from_utf8_lossy(&manifest.body))?;
        tracing::debug!(path = %path, rates = ?rates, "bitrate catalog populated");
        Ok(proxy.catalog().insert(path.to_string(), rates))
    }
}
