//! Geographic routing strategy.
//!
//! # Responsibilities
//! - Load the network topology: clients, servers, weighted directed links
//! - Precompute each client's closest server (single-source shortest path
//!   from every client node)
//! - Resolve requests by lookup in the resulting immutable map
//!
//! # Design Decisions
//! - All graph work happens once at startup; request-time resolution never
//!   touches the graph
//! - An unmapped client is a refusal, never a fabricated endpoint

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::net::Ipv4Addr;
use std::path::Path;

use thiserror::Error;

use crate::balancer::strategy::RoutingStrategy;

/// The serving port geographic responses carry; the topology file holds
/// addresses only.
pub const GEO_SERVING_PORT: u16 = 8000;

/// Error type for loading the topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to read topology: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed topology: {0}")]
    Malformed(&'static str),
}

/// The network graph described by a topology file. Node indices are the
/// file's line order and stay stable for the process lifetime.
#[derive(Debug)]
pub struct Topology {
    pub adjacency: Vec<Vec<(usize, u32)>>,
    pub clients: Vec<(usize, Ipv4Addr)>,
    pub servers: Vec<(usize, Ipv4Addr)>,
}

impl Topology {
    pub fn from_file(path: &Path) -> Result<Self, TopologyError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a topology description: a node-count header, `CLIENT <ip>` /
    /// `SERVER <ip>` lines, a link-count header, then `<from> <to> <cost>`
    /// triples.
    pub fn parse(text: &str) -> Result<Self, TopologyError> {
        let mut tokens = text.split_whitespace();

        tokens
            .next()
            .ok_or(TopologyError::Malformed("missing node count header"))?;
        let node_count: usize = tokens
            .next()
            .ok_or(TopologyError::Malformed("missing node count"))?
            .parse()
            .map_err(|_| TopologyError::Malformed("node count is not a number"))?;

        let mut clients = Vec::new();
        let mut servers = Vec::new();
        for node in 0..node_count {
            let kind = tokens
                .next()
                .ok_or(TopologyError::Malformed("truncated node table"))?;
            let addr: Ipv4Addr = tokens
                .next()
                .ok_or(TopologyError::Malformed("truncated node table"))?
                .parse()
                .map_err(|_| TopologyError::Malformed("node address is not IPv4"))?;
            match kind {
                "CLIENT" => clients.push((node, addr)),
                "SERVER" => servers.push((node, addr)),
                _ => return Err(TopologyError::Malformed("node kind must be CLIENT or SERVER")),
            }
        }

        tokens
            .next()
            .ok_or(TopologyError::Malformed("missing link count header"))?;
        let link_count: usize = tokens
            .next()
            .ok_or(TopologyError::Malformed("missing link count"))?
            .parse()
            .map_err(|_| TopologyError::Malformed("link count is not a number"))?;

        let mut adjacency = vec![Vec::new(); node_count];
        for _ in 0..link_count {
            let mut field = || {
                tokens
                    .next()
                    .ok_or(TopologyError::Malformed("truncated link table"))
            };
            let from: usize = field()?
                .parse()
                .map_err(|_| TopologyError::Malformed("link endpoint is not a number"))?;
            let to: usize = field()?
                .parse()
                .map_err(|_| TopologyError::Malformed("link endpoint is not a number"))?;
            let cost: u32 = field()?
                .parse()
                .map_err(|_| TopologyError::Malformed("link cost is not a number"))?;
            if from >= node_count || to >= node_count {
                return Err(TopologyError::Malformed("link endpoint out of range"));
            }
            adjacency[from].push((to, cost));
        }

        Ok(Self {
            adjacency,
            clients,
            servers,
        })
    }
}

/// Single-source shortest paths over non-negative weights: binary-heap
/// relaxation, `None` for unreachable nodes.
pub fn shortest_paths(adjacency: &[Vec<(usize, u32)>], start: usize) -> Vec<Option<u64>> {
    let mut dist: Vec<Option<u64>> = vec![None; adjacency.len()];
    let mut heap = BinaryHeap::new();
    dist[start] = Some(0);
    heap.push(Reverse((0u64, start)));

    while let Some(Reverse((d, node))) = heap.pop() {
        // Stale entry: a shorter path to this node was already settled.
        if dist[node].is_some_and(|best| d > best) {
            continue;
        }
        for &(next, cost) in &adjacency[node] {
            let candidate = d + u64::from(cost);
            if dist[next].map_or(true, |best| candidate < best) {
                dist[next] = Some(candidate);
                heap.push(Reverse((candidate, next)));
            }
        }
    }

    dist
}

/// Geographic selector: immutable closest-server map derived from the
/// topology, one shortest-path run per client node. Ties go to the earliest
/// server in file order.
#[derive(Debug)]
pub struct Geographic {
    closest: HashMap<Ipv4Addr, Ipv4Addr>,
}

impl Geographic {
    pub fn new(topology: &Topology) -> Self {
        let mut closest = HashMap::new();
        for &(client_node, client_addr) in &topology.clients {
            let dist = shortest_paths(&topology.adjacency, client_node);
            let mut best: Option<(u64, Ipv4Addr)> = None;
            for &(server_node, server_addr) in &topology.servers {
                if let Some(d) = dist[server_node] {
                    if best.map_or(true, |(best_d, _)| d < best_d) {
                        best = Some((d, server_addr));
                    }
                }
            }
            if let Some((_, server_addr)) = best {
                closest.insert(client_addr, server_addr);
            }
        }
        Self { closest }
    }

    pub fn from_file(path: &Path) -> Result<Self, TopologyError> {
        Ok(Self::new(&Topology::from_file(path)?))
    }
}

impl RoutingStrategy for Geographic {
    fn resolve(&self, client: Ipv4Addr) -> Option<(Ipv4Addr, u16)> {
        self.closest
            .get(&client)
            .map(|&server| (server, GEO_SERVING_PORT))
    }

    fn name(&self) -> &'static str {
        "geographic"
    }
}
