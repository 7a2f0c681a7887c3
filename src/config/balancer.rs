//! Balancer command-line arguments.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::config::port_in_range;

/// A load balancer implementing round-robin and geographic routing.
#[derive(Parser, Debug)]
#[command(name = "load-balancer")]
#[command(group(ArgGroup::new("mode").required(true).args(["rr", "geo"])))]
pub struct BalancerArgs {
    /// TCP port to listen on for routing requests.
    #[arg(short, long, value_parser = port_in_range)]
    pub port: u16,

    /// Rotate through the configured servers, ignoring client identity.
    #[arg(short, long)]
    pub rr: bool,

    /// Route each client to its closest server by link cost.
    #[arg(short, long)]
    pub geo: bool,

    /// Path to the server list (--rr) or topology description (--geo).
    #[arg(short, long)]
    pub servers: PathBuf,
}

/// The routing mode fixed for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalancerMode {
    RoundRobin,
    Geographic,
}

impl BalancerArgs {
    pub fn mode(&self) -> BalancerMode {
        if self.rr {
            BalancerMode::RoundRobin
        } else {
            BalancerMode::Geographic
        }
    }
}
