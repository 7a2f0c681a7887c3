//! Proxy command-line arguments.

use clap::Parser;

use crate::config::port_in_range;

/// An HTTP proxy for adaptive bitrate selection.
#[derive(Parser, Debug)]
#[command(name = "adaptive-proxy")]
pub struct ProxyArgs {
    /// Consult a load balancer for each client instead of a fixed origin.
    /// With this flag, hostname/port name the balancer.
    #[arg(short, long)]
    pub balance: bool,

    /// TCP port to listen on for client connections.
    #[arg(short, long, value_parser = port_in_range)]
    pub listen_port: u16,

    /// Hostname of the video server, or of the balancer with --balance.
    #[arg(long)]
    pub hostname: String,

    /// Port of the video server, or of the balancer with --balance.
    #[arg(short, long, value_parser = port_in_range)]
    pub port: u16,

    /// EWMA throughput smoothing constant, in [0, 1].
    #[arg(short, long, value_parser = alpha_in_range)]
    pub alpha: f64,
}

fn alpha_in_range(s: &str) -> Result<f64, String> {
    let alpha: f64 = s
        .parse()
        .map_err(|_| format!("`{s}` is not a valid number"))?;
    if !(0.0..=1.0).contains(&alpha) {
        return Err("alpha must be in the range [0, 1]".to_string());
    }
    Ok(alpha)
}
