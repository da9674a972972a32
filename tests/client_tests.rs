//! Client Tests
//!
//! End-to-end scenarios against stub servers speaking the wire protocol.

use std::collections::HashMap;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use driftkv::{Client, ClientConfig, ClientError, ConnectionPolicy};

/// Spawn a one-shot server: accept one connection, read one request,
/// write the canned reply, close.
async fn stub_server(reply: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await.unwrap();
        socket.write_all(reply).await.unwrap();
    });
    addr
}

// =============================================================================
// Get Scenarios
// =============================================================================

#[tokio::test]
async fn test_get_returns_value() {
    let addr = stub_server(b"OK\r\nvalue1\r\n").await;
    let client = Client::connect(addr).await.unwrap();
    assert_eq!(client.get("key1").await.unwrap(), "value1");
}

#[tokio::test]
async fn test_get_marker_form_returns_value() {
    let addr = stub_server(b"OK\r\n\r\nvalue1\r\n\r\n").await;
    let client = Client::connect(addr).await.unwrap();
    assert_eq!(client.get("key1").await.unwrap(), "value1");
}

#[tokio::test]
async fn test_get_missing_returns_empty_string() {
    let addr = stub_server(b"OK\r\n\r\n").await;
    let client = Client::connect(addr).await.unwrap();
    assert_eq!(client.get("missing").await.unwrap(), "");
}

#[tokio::test]
async fn test_get_expired_returns_server_error_with_empty_detail() {
    let addr = stub_server(b"Err\r\n").await;
    let client = Client::connect(addr).await.unwrap();
    match client.get("expired").await.unwrap_err() {
        ClientError::Server { detail } => assert_eq!(detail, ""),
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_server_error_detail_is_preserved() {
    let addr = stub_server(b"Err\r\nbad request\r\n").await;
    let client = Client::connect(addr).await.unwrap();
    match client.get("key1").await.unwrap_err() {
        ClientError::Server { detail } => assert_eq!(detail, "bad request"),
        other => panic!("expected server error, got {:?}", other),
    }
}

// =============================================================================
// Set Scenarios
// =============================================================================

#[tokio::test]
async fn test_set_returns_confirmation_verbatim() {
    let addr = stub_server(b"OK\r\ninsert completed\r\n\r\n").await;
    let client = Client::connect(addr).await.unwrap();
    let confirmation = client.set("key1", &b"value1"[..], None).await.unwrap();
    assert_eq!(confirmation, "insert completed");
}

#[tokio::test]
async fn test_set_with_expiration_sends_duration_header() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (captured_tx, captured_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let read = socket.read(&mut buf).await.unwrap();
        captured_tx.send(buf[..read].to_vec()).unwrap();
        socket
            .write_all(b"OK\r\nstored for 300 seconds\r\n\r\n")
            .await
            .unwrap();
    });

    let client = Client::connect(addr).await.unwrap();
    let confirmation = client
        .set("token", &b"123456"[..], Some(300))
        .await
        .unwrap();
    assert_eq!(confirmation, "stored for 300 seconds");

    let request = String::from_utf8(captured_rx.await.unwrap()).unwrap();
    assert!(request.starts_with("set token\r\n"), "request: {:?}", request);
    assert!(request.contains("duration: 300\r\n"), "request: {:?}", request);
}

// =============================================================================
// Argument Validation
// =============================================================================

#[tokio::test]
async fn test_invalid_key_rejected_before_any_io() {
    // Nothing is listening here; a dial attempt would fail loudly.
    let client = Client::connect("127.0.0.1:1").await.unwrap();

    let result = client.get("bad key").await;
    assert!(matches!(result, Err(ClientError::InvalidArgument(_))));

    let result = client.set("cr\r\nlf", &b"v"[..], None).await;
    assert!(matches!(result, Err(ClientError::InvalidArgument(_))));

    assert_eq!(client.pending_calls(), 0);
}

// =============================================================================
// Connection Failures
// =============================================================================

#[tokio::test]
async fn test_connect_refused_surfaces_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let config = ClientConfig::builder()
        .server_addr(&addr)
        .policy(ConnectionPolicy::Shared)
        .build();
    let result = Client::with_config(config).await;
    assert!(matches!(result, Err(ClientError::Connection(_))));
}

// =============================================================================
// Stub Store Round Trip
// =============================================================================

enum StubRequest {
    Set { key: String, value: Vec<u8> },
    Get { key: String },
}

fn dechunk(mut body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let pos = body
            .windows(2)
            .position(|w| w == b"\r\n")
            .expect("chunk size line");
        let size: usize = std::str::from_utf8(&body[..pos]).unwrap().parse().unwrap();
        if size == 0 {
            return out;
        }
        let start = pos + 2;
        out.extend_from_slice(&body[start..start + size]);
        body = &body[start + size + 2..];
    }
}

fn parse_request(buffer: &[u8]) -> Option<StubRequest> {
    let header_end = buffer.windows(4).position(|w| w == b"\r\n\r\n")?;
    let header = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let mut tokens = header.split("\r\n").next().unwrap().split(' ');
    let verb = tokens.next().unwrap().to_string();
    let key = tokens.next().unwrap_or("").to_string();
    let body = &buffer[header_end + 4..];

    match verb.as_str() {
        "get" => Some(StubRequest::Get { key }),
        "set" => {
            if header.to_lowercase().contains("transfer-encoding: chunked") {
                if !body.ends_with(b"0\r\n\r\n") {
                    return None;
                }
                Some(StubRequest::Set {
                    key,
                    value: dechunk(body),
                })
            } else {
                if body.len() < 2 || !body.ends_with(b"\r\n") {
                    return None;
                }
                Some(StubRequest::Set {
                    key,
                    value: body[..body.len() - 2].to_vec(),
                })
            }
        }
        other => panic!("unexpected verb {:?}", other),
    }
}

async fn read_request(socket: &mut TcpStream) -> StubRequest {
    let mut buffer: Vec<u8> = Vec::new();
    let mut read_buf = [0u8; 4096];
    loop {
        if let Some(request) = parse_request(&buffer) {
            return request;
        }
        let read = socket.read(&mut read_buf).await.unwrap();
        assert!(read > 0, "client closed mid-request");
        buffer.extend_from_slice(&read_buf[..read]);
    }
}

/// Spawn a minimal in-memory store speaking the wire protocol, one
/// request per connection, chunking get replies above the threshold.
async fn spawn_stub_store() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let mut store: HashMap<String, Vec<u8>> = HashMap::new();
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            match read_request(&mut socket).await {
                StubRequest::Set { key, value } => {
                    store.insert(key, value);
                    socket
                        .write_all(b"OK\r\ninsert completed\r\n\r\n")
                        .await
                        .unwrap();
                }
                StubRequest::Get { key } => {
                    let reply = match store.get(&key) {
                        Some(value) if value.len() > 4096 => {
                            let mut reply =
                                b"OK\r\ntransfer-encoding: chunked\r\n\r\n".to_vec();
                            for chunk in value.chunks(4096) {
                                reply.extend_from_slice(
                                    format!("{}\r\n", chunk.len()).as_bytes(),
                                );
                                reply.extend_from_slice(chunk);
                                reply.extend_from_slice(b"\r\n");
                            }
                            reply.extend_from_slice(b"0\r\n\r\n");
                            reply
                        }
                        Some(value) => {
                            let mut reply = b"OK\r\n\r\n".to_vec();
                            reply.extend_from_slice(value);
                            reply.extend_from_slice(b"\r\n\r\n");
                            reply
                        }
                        None => b"OK\r\n\r\n".to_vec(),
                    };
                    socket.write_all(&reply).await.unwrap();
                }
            }
        }
    });
    addr
}

#[tokio::test]
async fn test_large_value_survives_chunked_framing_both_ways() {
    let addr = spawn_stub_store().await;
    let client = Client::connect(addr).await.unwrap();

    let value: Vec<u8> = (0..20_000).map(|i| b'a' + (i % 17) as u8).collect();
    let confirmation = client.set("bulk", value.clone(), None).await.unwrap();
    assert_eq!(confirmation, "insert completed");

    let fetched = client.get("bulk").await.unwrap();
    assert_eq!(fetched.as_bytes(), &value[..]);
}

#[tokio::test]
async fn test_small_value_round_trip_through_stub_store() {
    let addr = spawn_stub_store().await;
    let client = Client::connect(addr).await.unwrap();

    client.set("key1", &b"value1"[..], None).await.unwrap();
    assert_eq!(client.get("key1").await.unwrap(), "value1");
    assert_eq!(client.get("missing").await.unwrap(), "");
}
