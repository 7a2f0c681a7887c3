//! Balancer accept loop.
//!
//! Each accepted connection carries exactly one stateless exchange:
//! read one request, resolve, respond (or refuse), close. Exchanges are
//! serviced sequentially; nothing is shared across them but the strategy.

use tokio::net::{TcpListener, TcpStream};

use crate::balancer::protocol::{ProtocolError, RouteRequest, RouteResponse};
use crate::balancer::strategy::RoutingStrategy;

/// How one exchange concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A response was sent.
    Routed(RouteResponse),
    /// No route existed for the client; the connection is closed without a
    /// response.
    Refused,
}

/// Serve routing exchanges until the listener fails.
pub async fn run(
    listener: TcpListener,
    strategy: Box<dyn RoutingStrategy>,
) -> Result<(), std::io::Error> {
    let local_addr = listener.local_addr()?;
    tracing::info!(
        address = %local_addr,
        strategy = strategy.name(),
        "load balancer serving"
    );

    loop {
        let (mut stream, peer) = listener.accept().await?;
        if let Err(e) = serve_exchange(&mut stream, strategy.as_ref()).await {
            tracing::warn!(peer_addr = %peer, error = %e, "routing exchange failed");
        }
        // Dropping the stream closes the exchange either way.
    }
}

/// Run one request/response exchange on an accepted connection.
pub async fn serve_exchange(
    stream: &mut TcpStream,
    strategy: &dyn RoutingStrategy,
) -> Result<Resolution, ProtocolError> {
    let request = RouteRequest::read_from(stream).await?;
    tracing::info!(
        client = %request.client_addr,
        request_id = request.request_id,
        "received routing request"
    );

    let Some((server_addr, server_port)) = strategy.resolve(request.client_addr) else {
        tracing::info!(
            client = %request.client_addr,
            request_id = request.request_id,
            "no route for client, refusing"
        );
        return Ok(Resolution::Refused);
    };

    let response = RouteResponse {
        server_addr,
        server_port,
        request_id: request.request_id,
    };
    response.write_to(stream).await?;
    tracing::info!(
        server = %server_addr,
        port = server_port,
        request_id = request.request_id,
        "responded to routing request"
    );
    Ok(Resolution::Routed(response))
}
