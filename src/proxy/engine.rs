//! Proxy engine: shared state and the accept loop.
//!
//! # Responsibilities
//! - Own the cross-connection state: throughput table, bitrate catalog,
//!   origin target
//! - Accept clients, resolve their origin (directly or via the balancer),
//!   and spawn one task per connection pair
//! - Track how many pairs are live
//!
//! # Design Decisions
//! - State is engine-owned, never ambient: tests construct isolated engines
//! - One task owns both sockets of a pair, so teardown is atomic by
//!   construction; per-connection faults never reach the accept loop

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::abr::catalog::BitrateCatalog;
use crate::abr::throughput::ThroughputTracker;
use crate::balancer::protocol;
use crate::proxy::pair::{ConnectionPair, RelayError};

/// Where new client connections are sent.
#[derive(Debug, Clone)]
pub enum OriginTarget {
    /// Every client shares the one configured origin.
    Direct { hostname: String, port: u16 },
    /// Ask the balancer at this endpoint which origin to use, once per
    /// client connection.
    Balanced { hostname: String, port: u16 },
}

/// The proxy engine. One per process; shared by every connection task.
pub struct ProxyEngine {
    origin: OriginTarget,
    throughput: ThroughputTracker,
    catalog: BitrateCatalog,
    active_pairs: AtomicUsize,
}

impl ProxyEngine {
    pub fn new(origin: OriginTarget, alpha: f64) -> Self {
        Self {
            origin,
            throughput: ThroughputTracker::new(alpha),
            catalog: BitrateCatalog::new(),
            active_pairs: AtomicUsize::new(0),
        }
    }

    pub fn throughput(&self) -> &ThroughputTracker {
        &self.throughput
    }

    pub fn catalog(&self) -> &BitrateCatalog {
        &self.catalog
    }

    /// Number of currently live connection pairs.
    pub fn active_pairs(&self) -> usize {
        self.active_pairs.load(Ordering::Relaxed)
    }

    /// Accept clients until the listener fails.
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> Result<(), std::io::Error> {
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, "proxy listening for clients");

        loop {
            let (client, peer) = listener.accept().await?;
            tracing::info!(peer_addr = %peer, "new client connection");

            let engine = Arc::clone(&self);
            tokio::spawn(async move {
                match engine.serve_client(client, peer).await {
                    Ok(()) => {}
                    Err(e) => {
                        tracing::warn!(peer_addr = %peer, error = %e, "connection pair failed");
                    }
                }
            });
        }
    }

    /// Drive one client from origin resolution to pair teardown.
    pub async fn serve_client(&self, client: TcpStream, peer: SocketAddr) -> Result<(), RelayError> {
        let origin = self.connect_origin(peer).await?;
        let _guard = self.track_pair();
        let mut pair = ConnectionPair::new(client, origin, peer);
        pair.relay(self).await
    }

    async fn connect_origin(&self, peer: SocketAddr) -> Result<TcpStream, RelayError> {
        match &self.origin {
            OriginTarget::Direct { hostname, port } => {
                TcpStream::connect((hostname.as_str(), *port))
                    .await
                    .map_err(RelayError::Connect)
            }
            OriginTarget::Balanced { hostname, port } => {
                let IpAddr::V4(client_addr) = peer.ip() else {
                    return Err(RelayError::NonIpv4Client(peer.ip()));
                };
                let server = protocol::route_via_balancer(hostname, *port, client_addr).await?;
                tracing::info!(peer_addr = %peer, server = %server, "balancer assigned origin");
                TcpStream::connect(server).await.map_err(RelayError::Connect)
            }
        }
    }

    fn track_pair(&self) -> PairGuard<'_> {
        self.active_pairs.fetch_add(1, Ordering::Relaxed);
        PairGuard {
            counter: &self.active_pairs,
        }
    }
}

/// Guard that keeps the live-pair count honest whatever path tears the
/// pair down.
struct PairGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
