//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{Method, StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;

/// Start a backend that answers every request with `201 Created`, an
/// `x-backend: echo` header and a body of `"{method} {path?query}"`.
///
/// Each response is held back by `delay`.
pub async fn start_echo_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(move |method: Method, uri: Uri| async move {
        tokio::time::sleep(delay).await;
        let target = uri.path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or_default();
        (
            StatusCode::CREATED,
            [("x-backend", "echo")],
            format!("{} {}", method, target),
        )
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

/// Client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
