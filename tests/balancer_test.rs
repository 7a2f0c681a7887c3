//! End-to-end balancer behavior over real sockets.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use adaptive_proxy::balancer::geo::{Geographic, Topology, GEO_SERVING_PORT};
use adaptive_proxy::balancer::protocol::{self, ProtocolError, RouteRequest};
use adaptive_proxy::balancer::{server, RoundRobin, RoutingStrategy};

async fn start_balancer(strategy: Box<dyn RoutingStrategy>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server::run(listener, strategy).await;
    });
    addr
}

async fn route(balancer: SocketAddr, client: Ipv4Addr) -> Result<SocketAddr, ProtocolError> {
    timeout(
        Duration::from_secs(5),
        protocol::route_via_balancer(&balancer.ip().to_string(), balancer.port(), client),
    )
    .await
    .expect("timed out waiting for the balancer")
}

#[tokio::test]
async fn round_robin_visits_servers_in_order_and_wraps() {
    let rr = RoundRobin::new(vec![
        (Ipv4Addr::new(10, 0, 0, 1), 8001),
        (Ipv4Addr::new(10, 0, 0, 2), 8002),
        (Ipv4Addr::new(10, 0, 0, 3), 8003),
    ]);
    let balancer = start_balancer(Box::new(rr)).await;

    let client = Ipv4Addr::new(1, 1, 1, 1);
    let mut routed = Vec::new();
    for _ in 0..4 {
        routed.push(route(balancer, client).await.unwrap());
    }

    let expected: Vec<SocketAddr> = vec![
        "10.0.0.1:8001".parse().unwrap(),
        "10.0.0.2:8002".parse().unwrap(),
        "10.0.0.3:8003".parse().unwrap(),
        "10.0.0.1:8001".parse().unwrap(),
    ];
    assert_eq!(routed, expected);
}

#[tokio::test]
async fn geographic_routing_resolves_known_clients() {
    let topology = Topology::parse(
        "NUM_NODES: 3\n\
         CLIENT 1.0.0.1\n\
         SERVER 2.0.0.1\n\
         SERVER 2.0.0.2\n\
         NUM_LINKS: 2\n\
         0 1 5\n\
         0 2 1\n",
    )
    .unwrap();
    let balancer = start_balancer(Box::new(Geographic::new(&topology))).await;

    let routed = route(balancer, Ipv4Addr::new(1, 0, 0, 1)).await.unwrap();
    assert_eq!(
        routed,
        SocketAddr::from((Ipv4Addr::new(2, 0, 0, 2), GEO_SERVING_PORT))
    );
}

#[tokio::test]
async fn geographic_refusal_closes_without_a_response() {
    let topology = Topology::parse(
        "NUM_NODES: 2\n\
         CLIENT 1.0.0.1\n\
         SERVER 2.0.0.1\n\
         NUM_LINKS: 1\n\
         0 1 3\n",
    )
    .unwrap();
    let balancer = start_balancer(Box::new(Geographic::new(&topology))).await;

    // Unknown client: the connection closes with no bytes sent back.
    match route(balancer, Ipv4Addr::new(9, 9, 9, 9)).await {
        Err(ProtocolError::PeerClosed) => {}
        other => panic!("expected PeerClosed, got {other:?}"),
    }

    // The balancer keeps serving after a refusal.
    let routed = route(balancer, Ipv4Addr::new(1, 0, 0, 1)).await.unwrap();
    assert_eq!(
        routed,
        SocketAddr::from((Ipv4Addr::new(2, 0, 0, 1), GEO_SERVING_PORT))
    );
}

#[tokio::test]
async fn correlation_mismatch_fails_the_exchange() {
    // A misbehaving balancer that echoes the wrong correlation id.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = [0u8; protocol::REQUEST_LEN];
        stream.read_exact(&mut request).await.unwrap();
        let received = RouteRequest::decode(request);
        let mut response = [0u8; protocol::RESPONSE_LEN];
        response[..4].copy_from_slice(&[10, 0, 0, 1]);
        response[4..6].copy_from_slice(&8000u16.to_be_bytes());
        response[6..].copy_from_slice(&received.request_id.wrapping_add(1).to_be_bytes());
        stream.write_all(&response).await.unwrap();
    });

    match route(addr, Ipv4Addr::new(1, 0, 0, 1)).await {
        Err(ProtocolError::CorrelationMismatch { .. }) => {}
        other => panic!("expected CorrelationMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn balancer_survives_a_client_that_sends_nothing() {
    let rr = RoundRobin::new(vec![(Ipv4Addr::new(10, 0, 0, 1), 8001)]);
    let balancer = start_balancer(Box::new(rr)).await;

    // Connect and immediately hang up; the exchange fails but the loop lives.
    let stream = TcpStream::connect(balancer).await.unwrap();
    drop(stream);

    let routed = route(balancer, Ipv4Addr::new(1, 1, 1, 1)).await.unwrap();
    assert_eq!(routed, "10.0.0.1:8001".parse::<SocketAddr>().unwrap());
}
