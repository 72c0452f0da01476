// ABOUTME: Integration tests for the network-origin precondition.
// ABOUTME: Runs the HTTP lookup against local listeners to cover success and fail-closed paths.

mod support;

use haven_verify::precondition::{
    Authorization, AuthorizedRangeSet, HttpAddressLookup, PreconditionChecker,
};
use haven_verify::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use support::FakeLookup;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned HTTP response per connection.
async fn serve(response: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    format!("http://{}/", addr)
}

/// Accept connections and never answer.
async fn black_hole() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{}/", addr)
}

fn checker(url: String, ranges: &[&str]) -> PreconditionChecker {
    let lookup = HttpAddressLookup::new(url, Duration::from_millis(300)).unwrap();
    PreconditionChecker::new(Arc::new(lookup), AuthorizedRangeSet::parse(ranges).unwrap())
}

#[tokio::test]
async fn address_inside_range_is_authorized() {
    support::init_tracing();
    let url = serve("HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n10.20.30.40\n").await;

    let authorization = checker(url, &["10.0.0.0/8"]).check().await;

    assert_eq!(
        authorization,
        Authorization::Authorized("10.20.30.40".parse().unwrap())
    );
}

#[tokio::test]
async fn address_outside_range_is_not_authorized() {
    let url = serve("HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n203.0.113.9\n").await;

    let checker = checker(url, &["10.0.0.0/8"]);

    assert!(!checker.is_authorized().await);
    assert!(matches!(checker.check().await, Authorization::Outside(_)));
}

#[tokio::test]
async fn lookup_timeout_fails_closed() {
    let url = black_hole().await;

    let authorization = checker(url, &["0.0.0.0/0"]).check().await;

    assert!(matches!(authorization, Authorization::Unknown(_)));
    assert!(!authorization.is_authorized());
}

#[tokio::test]
async fn error_status_fails_closed() {
    let url = serve("HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\n\r\n").await;

    let authorization = checker(url, &["0.0.0.0/0"]).check().await;

    assert!(matches!(authorization, Authorization::Unknown(reason) if reason.contains("503")));
}

#[tokio::test]
async fn garbage_body_fails_closed() {
    let url = serve("HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\nnot an ip").await;

    assert!(!checker(url, &["0.0.0.0/0"]).is_authorized().await);
}

#[tokio::test(start_paused = true)]
async fn lookup_is_retried_under_its_policy() {
    let lookup = Arc::new(FakeLookup::failing(502));
    let checker = PreconditionChecker::new(lookup.clone(), AuthorizedRangeSet::default())
        .with_retry(RetryPolicy::new(3, Duration::from_secs(2)).unwrap());

    assert!(!checker.is_authorized().await);
    assert_eq!(lookup.calls(), 3);
}
