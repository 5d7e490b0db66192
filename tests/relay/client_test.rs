//! HTTP relay against a one-shot local destination.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

use relay_bridge::classify::MessageKind;
use relay_bridge::payload::build_payload;
use relay_bridge::relay::{EnvelopeSigner, HttpRelay, Relay, RelayError};
use relay_bridge::routing::{ChannelRoute, ChannelType};

use crate::fixtures::{image, message, MONITORED_CHANNEL};

/// A request as received by the fake destination.
struct CapturedRequest {
    /// Request line and headers.
    head: String,
    /// Raw body.
    body: String,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_owned())
        })
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => panic!("listener should bind: {err}"),
    };
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => panic!("listener should expose local addr: {err}"),
    };
    (listener, format!("http://{addr}/webhook/discord"))
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> CapturedRequest {
    let mut raw = Vec::new();
    let mut buf = [0_u8; 4096];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        raw.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&raw).into_owned();
        if let Some((head, body)) = text.split_once("\r\n\r\n") {
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    key.trim()
                        .eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if body.len() >= content_length {
                return CapturedRequest {
                    head: head.to_owned(),
                    body: body.to_owned(),
                };
            }
        }
    }
    CapturedRequest {
        head: String::new(),
        body: String::new(),
    }
}

/// Serve exactly one request, answer with `status_line`, and hand back what was received.
async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let (listener, url) = bind().await;
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = tx.send(request);
        }
    });

    (url, rx)
}

fn route(url: &str, channel_type: ChannelType) -> ChannelRoute {
    ChannelRoute {
        channel_id: MONITORED_CHANNEL.to_owned(),
        label: "test-destination".to_owned(),
        channel_type,
        destination: Url::parse(url).expect("valid url"),
        signer: Arc::new(EnvelopeSigner::new("test-secret-key", "discord-bot")),
    }
}

fn relay() -> HttpRelay {
    match HttpRelay::new(Duration::from_secs(5)) {
        Ok(relay) => relay,
        Err(err) => panic!("relay client should build: {err}"),
    }
}

#[tokio::test]
async fn posts_payload_with_signed_headers() {
    let (url, captured) = serve_once("200 OK", "ok").await;
    let route = route(&url, ChannelType::Finance);
    let msg = message("receipt", vec![image("https://x/1.png", "image/png")]);
    let payload = build_payload(&msg, MessageKind::Image);

    let receipt = match relay().relay(&route, MessageKind::Image, &payload).await {
        Ok(receipt) => receipt,
        Err(err) => panic!("relay should succeed: {err}"),
    };
    assert_eq!(receipt.status, 200);

    let request = match captured.await {
        Ok(request) => request,
        Err(err) => panic!("destination should capture the request: {err}"),
    };
    assert!(request.head.starts_with("POST /webhook/discord HTTP/1.1"));
    assert_eq!(request.header("content-type").as_deref(), Some("application/json"));
    assert_eq!(request.header("x-message-type").as_deref(), Some("image"));
    assert_eq!(request.header("x-channel-type").as_deref(), Some("finance"));

    let body: serde_json::Value = serde_json::from_str(&request.body).expect("body is JSON");
    let expected = serde_json::to_value(&payload).expect("payload serializes");
    assert_eq!(body, expected);

    let auth = request.header("authorization").unwrap_or_default();
    let token = match auth.strip_prefix("Bearer ") {
        Some(token) => token,
        None => panic!("expected bearer authorization, got {auth:?}"),
    };
    let claims = match route.signer.verify(token) {
        Ok(claims) => claims,
        Err(err) => panic!("destination should be able to verify the token: {err}"),
    };
    assert_eq!(claims.message_type, MessageKind::Image);
    assert_eq!(claims.channel_type, ChannelType::Finance);
    assert_eq!(claims.data, expected);
}

#[tokio::test]
async fn non_success_status_is_failure() {
    let (url, _captured) = serve_once("401 Unauthorized", "invalid signature").await;
    let route = route(&url, ChannelType::General);
    let payload = build_payload(&message("hello", vec![]), MessageKind::Text);

    let result = relay().relay(&route, MessageKind::Text, &payload).await;
    match result {
        Err(RelayError::HttpStatus { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid signature");
        }
        other => panic!("expected HttpStatus error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_destination_is_transport_failure() {
    let (listener, url) = bind().await;
    drop(listener);

    let route = route(&url, ChannelType::General);
    let payload = build_payload(&message("hello", vec![]), MessageKind::Text);

    let result = relay().relay(&route, MessageKind::Text, &payload).await;
    assert!(
        matches!(result, Err(RelayError::Transport(_))),
        "expected transport error, got {result:?}"
    );
}

#[tokio::test]
async fn silent_destination_times_out() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        if let Ok((socket, _)) = listener.accept().await {
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        }
    });

    let relay = HttpRelay::new(Duration::from_millis(200)).expect("client builds");
    let route = route(&url, ChannelType::General);
    let payload = build_payload(&message("hello", vec![]), MessageKind::Text);

    match relay.relay(&route, MessageKind::Text, &payload).await {
        Err(RelayError::Transport(err)) => assert!(err.is_timeout(), "unexpected error: {err}"),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn custom_client_settings_are_used() {
    let (url, captured) = serve_once("204 No Content", "").await;
    let client = match reqwest::Client::builder()
        .user_agent("custom-agent/1.0")
        .build()
    {
        Ok(client) => client,
        Err(err) => panic!("client should build: {err}"),
    };
    let relay = HttpRelay::with_client(client);
    let route = route(&url, ChannelType::General);
    let payload = build_payload(&message("hello", vec![]), MessageKind::Text);

    match relay.relay(&route, MessageKind::Text, &payload).await {
        Ok(receipt) => assert_eq!(receipt.status, 204),
        Err(err) => panic!("relay should succeed: {err}"),
    }

    let request = match captured.await {
        Ok(request) => request,
        Err(err) => panic!("destination should capture the request: {err}"),
    };
    assert_eq!(request.header("user-agent").as_deref(), Some("custom-agent/1.0"));
    assert_eq!(request.header("x-channel-type").as_deref(), Some("general"));
}

#[tokio::test]
async fn default_client_identifies_itself() {
    let (url, captured) = serve_once("200 OK", "ok").await;
    let route = route(&url, ChannelType::General);
    let payload = build_payload(&message("hello", vec![]), MessageKind::Text);

    if let Err(err) = relay().relay(&route, MessageKind::Text, &payload).await {
        panic!("relay should succeed: {err}");
    }
    let request = match captured.await {
        Ok(request) => request,
        Err(err) => panic!("destination should capture the request: {err}"),
    };
    let agent = request.header("user-agent").unwrap_or_default();
    assert!(agent.starts_with("relay-bridge/"), "user agent: {agent}");
}
