//! Drives `GeminiProvider` and `Dispatcher` against a local HTTP listener
//! serving canned responses.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use guidedesk::config::Config;
use guidedesk::dispatcher::{ContextExcerpt, DispatchResult, Dispatcher, FallbackReason, Origin};
use guidedesk::providers::{CompletionProvider, CompletionRequest, GeminiProvider, ProviderError};

/// One captured request: request line plus decoded JSON body.
struct Captured {
    request_line: String,
    body: Value,
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Error",
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn read_request(socket: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let (head_end, content_length) = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
            let len = head
                .lines()
                .find_map(|l| {
                    l.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                })
                .unwrap_or(0);
            break (pos + 4, len);
        }
    };
    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending body");
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let request_line = head.lines().next().unwrap_or_default().to_string();
    let body = serde_json::from_slice(&buf[head_end..head_end + content_length]).unwrap_or(Value::Null);
    Captured { request_line, body }
}

/// Serve `responses` in order, one per connection. Returns the base URL and a
/// receiver of captured requests.
async fn serve(responses: Vec<(u16, String)>) -> (String, mpsc::UnboundedReceiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let captured = read_request(&mut socket).await;
            let _ = tx.send(captured);
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason_phrase(status),
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
    });
    (format!("http://{}/v1beta", addr), rx)
}

fn success_body(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }],
        "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 3, "totalTokenCount": 15 }
    })
    .to_string()
}

fn config_for(base_url: &str) -> Config {
    let mut config = Config::default();
    config.provider.api_key = Some("test-key".into());
    config.provider.base_url = base_url.to_string();
    config.provider.timeout_secs = 1;
    config.rate_limit.min_spacing_ms = 0;
    config
}

fn dispatcher_for(config: &Config) -> Dispatcher {
    let provider = GeminiProvider::from_config(&config.provider).unwrap();
    Dispatcher::from_config(config, Arc::new(provider))
}

fn request() -> CompletionRequest {
    CompletionRequest {
        system: "Be helpful".into(),
        query: "What is MRCM?".into(),
    }
}

#[tokio::test]
async fn test_success_parses_text_and_sends_key() {
    let (base, mut rx) = serve(vec![(200, success_body("MRCM answer"))]).await;
    let provider = GeminiProvider::from_config(&config_for(&base).provider).unwrap();

    let completion = provider.generate(&request()).await.unwrap();
    assert_eq!(completion.text, "MRCM answer");
    assert_eq!(completion.usage.unwrap().total_tokens, 15);

    let captured = rx.recv().await.unwrap();
    assert!(captured.request_line.starts_with("POST /v1beta/models/gemini-1.5-flash:generateContent?key=test-key"));
    assert_eq!(captured.body["contents"][0]["parts"][0]["text"], "What is MRCM?");
    assert_eq!(captured.body["systemInstruction"]["parts"][0]["text"], "Be helpful");
}

#[tokio::test]
async fn test_status_codes_surface_structurally() {
    let (base, _rx) = serve(vec![(
        429,
        r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
    )])
    .await;
    let provider = GeminiProvider::from_config(&config_for(&base).provider).unwrap();
    let err = provider.generate(&request()).await.unwrap_err();
    assert_eq!(
        err,
        ProviderError::Status {
            status: 429,
            message: "Resource has been exhausted".into()
        }
    );
}

#[tokio::test]
async fn test_dispatch_caches_network_answer() {
    let (base, mut rx) = serve(vec![(200, success_body("The MRCM is a machine readable model."))]).await;
    let d = dispatcher_for(&config_for(&base));

    let first = d.dispatch("What is MRCM?", None).await;
    let second = d.dispatch("  what is   mrcm? ", None).await;

    assert_eq!(
        first,
        DispatchResult::Answered {
            text: "The MRCM is a machine readable model.".into(),
            origin: Origin::Network
        }
    );
    assert_eq!(
        second,
        DispatchResult::Answered {
            text: "The MRCM is a machine readable model.".into(),
            origin: Origin::Cache
        }
    );
    assert!(rx.recv().await.is_some());
    assert!(rx.try_recv().is_err(), "exactly one network call");
}

#[tokio::test]
async fn test_dispatch_maps_http_failures() {
    let cases = [
        (429, FallbackReason::RateLimited),
        (401, FallbackReason::Unconfigured),
        (403, FallbackReason::Unconfigured),
        (500, FallbackReason::Network),
    ];
    for (status, expected) in cases {
        let (base, _rx) = serve(vec![(status, r#"{"error":{"message":"nope"}}"#.to_string())]).await;
        let d = dispatcher_for(&config_for(&base));
        match d.dispatch("q", None).await {
            DispatchResult::Fallback { reason, .. } => assert_eq!(reason, expected, "status {status}"),
            other => panic!("status {status}: expected fallback, got {other:?}"),
        }
        assert_eq!(d.cache_stats().await.size, 0);
    }
}

#[tokio::test]
async fn test_dispatch_empty_candidates_is_unknown() {
    let (base, _rx) = serve(vec![(200, r#"{"candidates":[]}"#.to_string())]).await;
    let d = dispatcher_for(&config_for(&base));
    let result = d.dispatch("q", None).await;
    assert!(matches!(
        result,
        DispatchResult::Fallback {
            reason: FallbackReason::Unknown,
            ..
        }
    ));
}

#[tokio::test]
async fn test_dispatch_connection_refused_is_network() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let d = dispatcher_for(&config_for(&format!("http://{}/v1beta", addr)));
    let result = d.dispatch("q", None).await;
    assert!(matches!(
        result,
        DispatchResult::Fallback {
            reason: FallbackReason::Network,
            ..
        }
    ));
}

#[tokio::test]
async fn test_dispatch_timeout_is_network() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept and hold the connection without answering.
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        drop(socket);
    });

    let d = dispatcher_for(&config_for(&format!("http://{}/v1beta", addr)));
    let result = d.dispatch("q", None).await;
    assert!(matches!(
        result,
        DispatchResult::Fallback {
            reason: FallbackReason::Network,
            ..
        }
    ));
}

/// Answer with headers promising 1000 body bytes, send 10, then either hold
/// the connection past the client timeout or close it.
async fn serve_truncated_body(hold: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        let head = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 1000\r\n\r\n{\"candida";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        if hold {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
        drop(socket);
    });
    format!("http://{}/v1beta", addr)
}

#[tokio::test]
async fn test_body_timeout_is_network() {
    let base = serve_truncated_body(true).await;
    let d = dispatcher_for(&config_for(&base));
    let result = d.dispatch("q", None).await;
    assert!(matches!(
        result,
        DispatchResult::Fallback {
            reason: FallbackReason::Network,
            ..
        }
    ));
}

#[tokio::test]
async fn test_body_cut_short_is_network() {
    let base = serve_truncated_body(false).await;
    let d = dispatcher_for(&config_for(&base));
    let result = d.dispatch("q", None).await;
    assert!(matches!(
        result,
        DispatchResult::Fallback {
            reason: FallbackReason::Network,
            ..
        }
    ));
}

#[tokio::test]
async fn test_malformed_body_is_unknown() {
    let (base, _rx) = serve(vec![(200, "not json".to_string())]).await;
    let d = dispatcher_for(&config_for(&base));
    let result = d.dispatch("q", None).await;
    assert!(matches!(
        result,
        DispatchResult::Fallback {
            reason: FallbackReason::Unknown,
            ..
        }
    ));
}

#[tokio::test]
async fn test_payload_carries_truncated_context() {
    let (base, mut rx) = serve(vec![(200, success_body("ok"))]).await;
    let d = dispatcher_for(&config_for(&base));
    let long = "y".repeat(700);
    let ctx = vec![ContextExcerpt::new("Body Structure", long.clone())];

    d.dispatch("What is a body structure?", Some(&ctx)).await;

    let captured = rx.recv().await.unwrap();
    let system = captured.body["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(system.contains("1. Body Structure:"));
    assert!(system.contains(&format!("{}...", "y".repeat(500))));
    assert!(!system.contains(&long));
    assert_eq!(
        captured.body["contents"][0]["parts"][0]["text"],
        "What is a body structure?"
    );
}
