use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adaptive_proxy::balancer::{server, Geographic, RoundRobin, RoutingStrategy};
use adaptive_proxy::config::{BalancerArgs, BalancerMode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adaptive_proxy=info,load_balancer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = BalancerArgs::parse();

    let strategy: Box<dyn RoutingStrategy> = match args.mode() {
        BalancerMode::RoundRobin => Box::new(RoundRobin::from_file(&args.servers)?),
        BalancerMode::Geographic => Box::new(Geographic::from_file(&args.servers)?),
    };

    let listener = TcpListener::bind(("0.0.0.0", args.port)).await?;

    server::run(listener, strategy).await?;

    Ok(())
}
