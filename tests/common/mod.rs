//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::BufReader;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

use adaptive_proxy::net::framing;

pub const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period duration="PT634S">
    <AdaptationSet mimeType="audio/mp4">
      <Representation id="audio" bandwidth="128"/>
    </AdaptationSet>
    <AdaptationSet mimeType="video/mp4">
      <Representation id="v0" bandwidth="500"/>
      <Representation id="v1" bandwidth="1000"/>
      <Representation id="v2" bandwidth="2000"/>
      <Representation id="v3" bandwidth="4000"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

/// Requests the mock origin has seen, as request lines, in arrival order.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Start a mock video origin speaking the same message framing as the
/// proxy. It records every request line and answers: the manifest body for
/// `vid.mpd`, a fixed body for anything else.
pub async fn start_mock_origin() -> (SocketAddr, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));

    let accept_log = Arc::clone(&log);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let log = Arc::clone(&accept_log);
                    tokio::spawn(async move {
                        serve_origin_connection(socket, log).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log)
}

async fn serve_origin_connection(socket: TcpStream, log: RequestLog) {
    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let message = match framing::read_message(&mut reader).await {
            Ok(message) => message,
            Err(_) => break,
        };
        let request_line = message
            .header_text()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        log.lock().unwrap().push(request_line.clone());

        let sent = if request_line.contains("/vid.mpd") {
            respond(&mut write_half, MANIFEST).await
        } else {
            respond(&mut write_half, "origin-data").await
        };
        if sent.is_err() {
            break;
        }
    }
}

async fn respond(
    writer: &mut OwnedWriteHalf,
    body: &str,
) -> Result<(), adaptive_proxy::net::framing::FramingError> {
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    framing::send_message(writer, response.as_bytes()).await
}
