//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! proxy: new client accepted
//!     → protocol.rs (one request/response exchange over a short-lived
//!       connection, correlation id verified)
//! balancer: connection accepted
//!     → server.rs (read request, drive the exchange)
//!     → Apply the routing strategy fixed at startup:
//!         - round_robin.rs (rotate through the server list)
//!         - geo.rs (lookup in the precomputed closest-server map)
//!     → Respond with the origin endpoint, or refuse and close
//! ```
//!
//! # Design Decisions
//! - Strategies are stateless per-exchange; the round-robin cursor is the
//!   only mutable piece
//! - Graph work happens once at startup; resolution is O(1) at request time
//! - A refusal closes the connection without a response, distinct from a
//!   malformed exchange

pub mod geo;
pub mod protocol;
pub mod round_robin;
pub mod server;
pub mod strategy;

pub use geo::Geographic;
pub use round_robin::RoundRobin;
pub use strategy::RoutingStrategy;
