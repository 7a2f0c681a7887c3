use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adaptive_proxy::config::ProxyArgs;
use adaptive_proxy::{OriginTarget, ProxyEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adaptive_proxy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ProxyArgs::parse();

    let origin = if args.balance {
        OriginTarget::Balanced {
            hostname: args.hostname.clone(),
            port: args.port,
        }
    } else {
        OriginTarget::Direct {
            hostname: args.hostname.clone(),
            port: args.port,
        }
    };

    let listener = TcpListener::bind(("0.0.0.0", args.listen_port)).await?;

    tracing::info!(
        listen_port = args.listen_port,
        balance = args.balance,
        target = %format!("{}:{}", args.hostname, args.port),
        alpha = args.alpha,
        "adaptive proxy started"
    );

    let engine = Arc::new(ProxyEngine::new(origin, args.alpha));
    engine.run(listener).await?;

    Ok(())
}
