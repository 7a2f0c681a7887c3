//! Command-line configuration for both binaries.
//!
//! Validation happens at parse time: ports must be in [1024, 65535] and the
//! smoothing constant in [0, 1]. Invalid configuration exits non-zero with a
//! message before any socket is opened.

pub mod balancer;
pub mod proxy;

pub use balancer::{BalancerArgs, BalancerMode};
pub use proxy::ProxyArgs;

pub(crate) fn port_in_range(s: &str) -> Result<u16, String> {
    let port: u16 = s
        .parse()
        .map_err(|_| format!("`{s}` is not a valid port number"))?;
    if port < 1024 {
        return Err("port must be in the range [1024, 65535]".to_string());
    }
    Ok(port)
}
