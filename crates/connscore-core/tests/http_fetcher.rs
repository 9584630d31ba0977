//! HttpFetcher against a local canned HTTP server.

use std::time::Duration;

use time::macros::date;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use connscore_core::{Error, FetchConfig, HttpFetcher, PageSource, USER_AGENTS, extract};

/// Serve one request with `status` and `body`, handing back the raw request.
async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
    });

    (format!("http://{}", addr), rx)
}

fn fetcher(base_url: String) -> HttpFetcher {
    HttpFetcher::new(FetchConfig {
        base_url,
        timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn fetches_companion_page_with_browser_headers() {
    let (base, request) = serve_once(
        "200 OK",
        "<p><strong>Today's difficulty is 3.4 out of 5</strong></p>",
    )
    .await;
    let day = date!(2025 - 03 - 09);

    let body = fetcher(base).fetch(day).await.unwrap();
    let record = extract(&body, day).unwrap();
    assert_eq!(record.rating(), 3.4);

    let request = request.await.unwrap();
    let lower = request.to_lowercase();
    assert!(
        request.starts_with("GET /2025/03/09/crosswords/connections-companion-638.html HTTP/1.1"),
        "{request}"
    );
    assert!(lower.contains("accept-language: en-us,en;q=0.5"));
    let agent = request
        .lines()
        .find_map(|l| l.strip_prefix("user-agent: ").or_else(|| l.strip_prefix("User-Agent: ")))
        .unwrap();
    assert!(USER_AGENTS.contains(&agent), "{agent}");
}

#[tokio::test]
async fn configured_user_agent_is_sent() {
    let (base, request) = serve_once("200 OK", "ok").await;
    let fetcher = HttpFetcher::new(FetchConfig {
        base_url: base,
        user_agent: Some("connscore-test/1.0".into()),
        ..Default::default()
    })
    .unwrap();

    fetcher.fetch(date!(2024 - 01 - 01)).await.unwrap();
    let request = request.await.unwrap().to_lowercase();
    assert!(request.contains("user-agent: connscore-test/1.0"), "{request}");
}

#[tokio::test]
async fn non_success_status_is_http_error() {
    let (base, _request) = serve_once("403 Forbidden", "blocked").await;

    let err = fetcher(base).fetch(date!(2024 - 01 - 01)).await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 403, .. }), "{err}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = fetcher(format!("http://{}", addr))
        .fetch(date!(2024 - 01 - 01))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network { .. }), "{err}");
    assert!(err.is_retryable());
}
