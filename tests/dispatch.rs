//! End-to-end dispatch over real sockets.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use path_dispatcher::config::{load_config, Configuration, PathMap};
use path_dispatcher::http::HyperUpstream;
use path_dispatcher::WebServer;
use reqwest::StatusCode;

mod common;

fn local_server() -> WebServer {
    WebServer::with_upstream(Arc::new(HyperUpstream::plaintext()))
        .with_bind_host(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn local_config() -> Configuration {
    Configuration {
        listen_port: 0,
        bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        ..Default::default()
    }
}

fn mapping(kind: &str) -> PathMap {
    PathMap {
        kind: kind.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_mock_route_returns_file_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("users.json");
    std::fs::write(&file, br#"{"users":[]}"#).unwrap();

    let mut config = local_config();
    config.path_maps.insert(
        "/users".into(),
        PathMap {
            mock_file: Some(file),
            ..mapping("mock")
        },
    );

    let mut server = local_server();
    server.process_config(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let client = common::client();

    for path in ["/users", "/users/42?active=true"] {
        let resp = client.post(format!("http://{}{}", addr, path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), r#"{"users":[]}"#);
    }

    // "/usersx" is not under "/users".
    let resp = client.get(format!("http://{}/usersx", addr)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.text().await.unwrap(), "Cannot GET /usersx");
}

#[tokio::test]
async fn test_proxy_relays_upstream_response() {
    let backend = common::start_echo_backend(Duration::ZERO).await;

    let mut config = local_config();
    config.default_api_address = backend.to_string();
    config.path_maps.insert("/api".into(), mapping("proxy"));

    let mut server = local_server();
    server.process_config(&config).await.unwrap();
    let addr = server.local_addr().unwrap();

    let resp = common::client()
        .delete(format!("http://{}/api/orders?id=7", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers()["x-backend"], "echo");
    // Without forwardMethod the upstream always sees a GET.
    assert_eq!(resp.text().await.unwrap(), "GET /api/orders?id=7");
}

#[tokio::test]
async fn test_proxy_forwards_method_when_enabled() {
    let backend = common::start_echo_backend(Duration::ZERO).await;

    let mut config = local_config();
    config.path_maps.insert(
        "/api".into(),
        PathMap {
            server_path: Some(backend.to_string()),
            forward_method: true,
            ..mapping("proxy")
        },
    );

    let mut server = local_server();
    server.process_config(&config).await.unwrap();
    let addr = server.local_addr().unwrap();

    let resp = common::client()
        .put(format!("http://{}/api/orders", addr))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "PUT /api/orders");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = closed.local_addr().unwrap();
    drop(closed);

    let mut config = local_config();
    config.default_api_address = dead.to_string();
    config.path_maps.insert("/api".into(), mapping("proxy"));

    let mut server = local_server();
    server.process_config(&config).await.unwrap();
    let addr = server.local_addr().unwrap();

    let resp = common::client()
        .get(format!("http://{}/api/anything", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_static_route_serves_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("css")).unwrap();
    std::fs::write(dir.path().join("css/site.css"), "body{}").unwrap();

    let mut config = local_config();
    config.path_maps.insert(
        "/assets".into(),
        PathMap {
            local_path: Some(dir.path().to_path_buf()),
            ..mapping("static")
        },
    );

    let mut server = local_server();
    server.process_config(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let client = common::client();

    let resp = client
        .get(format!("http://{}/assets/css/site.css", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "body{}");

    let resp = client
        .get(format!("http://{}/assets/missing.css", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmap_answers_404_on_same_port() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("ok.txt");
    std::fs::write(&file, "ok").unwrap();

    let mut config = local_config();
    config.path_maps.insert(
        "/ok".into(),
        PathMap {
            mock_file: Some(file),
            ..mapping("mock")
        },
    );

    let mut server = local_server();
    server.process_config(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let client = common::client();

    let resp = client.get(format!("http://{}/ok", addr)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    server.unmap();

    let resp = client.get(format!("http://{}/ok", addr)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.text().await.unwrap(), "Cannot GET /ok");
}

#[tokio::test]
async fn test_set_port_moves_listener() {
    let mut server = local_server();
    server.set_port(0).await.unwrap();
    let old = server.local_addr().unwrap();

    server.set_port(0).await.unwrap();
    let new = server.local_addr().unwrap();
    assert_eq!(server.closed_listeners(), 1);

    assert!(tokio::net::TcpStream::connect(old).await.is_err() || old == new);
    let resp = common::client()
        .get(format!("http://{}/", new))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_in_flight_request_survives_rebind() {
    let backend = common::start_echo_backend(Duration::from_millis(500)).await;

    let mut config = local_config();
    config.default_api_address = backend.to_string();
    config.path_maps.insert("/slow".into(), mapping("proxy"));

    let mut server = local_server();
    server.process_config(&config).await.unwrap();
    let old = server.local_addr().unwrap();

    let in_flight = tokio::spawn(async move {
        common::client()
            .get(format!("http://{}/slow/report", old))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.set_port(0).await.unwrap();

    assert_eq!(in_flight.await.unwrap(), "GET /slow/report");
    server.shutdown(Duration::from_secs(5)).await;
}

#[tokio::test]
async fn test_config_file_end_to_end() {
    let backend = common::start_echo_backend(Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let mock = dir.path().join("health.json");
    std::fs::write(&mock, r#"{"status":"up"}"#).unwrap();

    let config_path = dir.path().join("dispatcher.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
defaultApiAddress = "{backend}"
listenPort = 0
bindHost = "127.0.0.1"

[pathMaps."/health"]
type = "mock"
mockFile = "{mock}"

[pathMaps."/api"]
type = "proxy"
"#,
            backend = backend,
            mock = mock.display()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let mut server = local_server();
    server.process_config(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let client = common::client();

    let resp = client.get(format!("http://{}/health", addr)).send().await.unwrap();
    assert_eq!(resp.text().await.unwrap(), r#"{"status":"up"}"#);

    let resp = client.get(format!("http://{}/api/v1", addr)).send().await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "GET /api/v1");
}
