//! Strategy seam for origin resolution.

use std::net::Ipv4Addr;

/// A routing strategy resolves a client address to an origin endpoint.
///
/// `None` is a refusal: the balancer closes the connection without
/// responding. The active strategy is fixed for the balancer's entire run.
pub trait RoutingStrategy: Send + Sync {
    fn resolve(&self, client: Ipv4Addr) -> Option<(Ipv4Addr, u16)>;

    /// Short name for startup logging.
    fn name(&self) -> &'static str;
}
