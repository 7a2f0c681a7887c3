//! Round-robin routing strategy.

use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::balancer::strategy::RoutingStrategy;

/// Error type for loading the server list.
#[derive(Debug, Error)]
pub enum ServerListError {
    #[error("failed to read server list: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed server list: {0}")]
    Malformed(&'static str),

    #[error("server list contains no servers")]
    Empty,
}

/// Round-robin selector.
/// Stores an internal cursor to rotate through the configured servers,
/// ignoring client identity.
#[derive(Debug)]
pub struct RoundRobin {
    servers: Vec<(Ipv4Addr, u16)>,
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new(servers: Vec<(Ipv4Addr, u16)>) -> Self {
        Self {
            servers,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Load the server list from disk at startup.
    pub fn from_file(path: &Path) -> Result<Self, ServerListError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(parse_server_list(&text)?))
    }
}

impl RoutingStrategy for RoundRobin {
    fn resolve(&self, _client: Ipv4Addr) -> Option<(Ipv4Addr, u16)> {
        if self.servers.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.servers.len();
        Some(self.servers[index])
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

/// Parse a server-info file: a count header line, then one `<ip> <port>`
/// entry per server.
pub fn parse_server_list(text: &str) -> Result<Vec<(Ipv4Addr, u16)>, ServerListError> {
    let mut tokens = text.split_whitespace();
    tokens
        .next()
        .ok_or(ServerListError::Malformed("missing count header"))?;
    let count: usize = tokens
        .next()
        .ok_or(ServerListError::Malformed("missing server count"))?
        .parse()
        .map_err(|_| ServerListError::Malformed("server count is not a number"))?;

    let mut servers = Vec::with_capacity(count);
    for _ in 0..count {
        let addr: Ipv4Addr = tokens
            .next()
            .ok_or(ServerListError::Malformed("truncated server entry"))?
            .parse()
            .map_err(|_| ServerListError::Malformed("server address is not IPv4"))?;
        let port: u16 = tokens
            .next()
            .ok_or(ServerListError::Malformed("truncated server entry"))?
            .parse()
            .map_err(|_| ServerListError::Malformed("server port is not a number"))?;
        servers.push((addr, port));
    }

    if servers.is_empty() {
        return Err(ServerListError::Empty);
    }
    Ok(servers)
}
