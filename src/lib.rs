//! Adaptive bitrate streaming proxy and load balancer.
//!
//! Two binaries share this library:
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │                ADAPTIVE PROXY                 │
//!   Client ───────┼─▶ proxy::engine ──▶ http::recognize ──▶ abr  │
//!                 │        │                                │     │
//!                 │        ▼                                ▼     │
//!   Client ◀──────┼── net::framing ◀──────────── rewritten request│──▶ Origin
//!                 └────────┼─────────────────────────────────────┘
//!                          │ one routing exchange per client (--balance)
//!                          ▼
//!                 ┌──────────────────────────────────────────────┐
//!                 │  LOAD BALANCER: balancer::server ──▶ strategy │
//!                 │      round-robin cursor │ closest-server map  │
//!                 └──────────────────────────────────────────────┘
//! ```
//!
//! `adaptive-proxy` pairs each client with a video origin, measures the
//! client's throughput from fragment reports, and rewrites segment requests
//! to the highest sustainable bitrate. `load-balancer` answers one binary
//! routing exchange per connection, round-robin or by network distance.

// Core subsystems
pub mod http;
pub mod net;
pub mod proxy;

// Bitrate selection
pub mod abr;

// Routing service
pub mod balancer;

// Cross-cutting concerns
pub mod config;

pub use proxy::{OriginTarget, ProxyEngine};
