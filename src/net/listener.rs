//! Listening socket with an accept loop that can be stopped and drained.
//!
//! # Responsibilities
//! - Bind the configured address
//! - Accept connections and serve them against the shared `Application`
//! - Stop accepting on request and confirm the socket is closed
//! - Drain accepted connections gracefully in the background
//!
//! # Design Decisions
//! - `close` returns only after the accept loop has exited and the
//!   `TcpListener` has been dropped, so a rebind never overlaps two sockets
//! - Draining is decoupled from closing: in-flight requests finish while the
//!   replacement listener is already serving
//! - Accept errors (e.g. fd exhaustion) back off briefly instead of spinning

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::Request;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::error::DispatchError;
use crate::net::connection::{ConnectionTracker, ListenerId};
use crate::routing::Application;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound socket and the task accepting on it.
pub struct ActiveListener {
    id: ListenerId,
    local_addr: SocketAddr,
    stop_tx: oneshot::Sender<()>,
    accept_task: JoinHandle<GracefulShutdown>,
    connections: ConnectionTracker,
}

impl ActiveListener {
    /// Bind `addr` and start accepting connections for `app`.
    pub async fn bind(addr: SocketAddr, app: Arc<Application>) -> Result<Self, DispatchError> {
        let bind_error = |source| DispatchError::Bind {
            address: addr.to_string(),
            source,
        };

        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let id = ListenerId::new();
        let connections = ConnectionTracker::new();
        let (stop_tx, stop_rx) = oneshot::channel();

        tracing::info!(listener_id = %id, address = %local_addr, "Listener bound");

        let accept_task = tokio::spawn(accept_loop(id, listener, app, connections.clone(), stop_rx));

        Ok(Self {
            id,
            local_addr,
            stop_tx,
            accept_task,
            connections,
        })
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Connections accepted by this listener that are still open.
    pub fn active_connections(&self) -> u64 {
        self.connections.active_count()
    }

    /// Stop accepting and wait until the socket is closed.
    ///
    /// The returned handle completes once every connection accepted by this
    /// listener has finished.
    pub async fn close(self) -> JoinHandle<()> {
        let _ = self.stop_tx.send(());

        let graceful = match self.accept_task.await {
            Ok(graceful) => graceful,
            Err(e) => {
                tracing::error!(listener_id = %self.id, error = %e, "Accept loop failed");
                return tokio::spawn(async {});
            }
        };

        let id = self.id;
        let connections = self.connections;
        tracing::info!(
            listener_id = %id,
            address = %self.local_addr,
            active_connections = connections.active_count(),
            "Listener closed, draining connections"
        );

        tokio::spawn(async move {
            graceful.shutdown().await;
            tracing::debug!(
                listener_id = %id,
                remaining = connections.active_count(),
                "Listener drained"
            );
        })
    }
}

async fn accept_loop(
    id: ListenerId,
    listener: TcpListener,
    app: Arc<Application>,
    connections: ConnectionTracker,
    mut stop_rx: oneshot::Receiver<()>,
) -> GracefulShutdown {
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            // A dropped sender stops the loop too.
            _ = &mut stop_rx => break,
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(listener_id = %id, error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };

                let guard = connections.track();
                tracing::debug!(
                    listener_id = %id,
                    connection_id = %guard.id(),
                    peer_addr = %peer_addr,
                    "Connection accepted"
                );

                let app = Arc::clone(&app);
                let service = ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .service_fn(move |request: Request<Incoming>| {
                        let app = Arc::clone(&app);
                        async move { Ok::<_, Infallible>(app.dispatch(request.map(Body::new)).await) }
                    });

                let connection = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), TowerToHyperService::new(service));
                let connection = graceful.watch(connection);

                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::debug!(connection_id = %guard.id(), error = %e, "Connection ended with error");
                    }
                    drop(guard);
                });
            }
        }
    }

    drop(listener);
    graceful
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn serves_until_closed() {
        let app = Arc::new(Application::new());
        let listener = ActiveListener::bind(loopback(), app).await.unwrap();
        let addr = listener.local_addr();
        assert_ne!(listener.port(), 0);

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /nothing HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 404"));
        assert!(response.ends_with("Cannot GET /nothing"));

        let drain = listener.close().await;
        drain.await.unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn counts_open_connections_until_drained() {
        let app = Arc::new(Application::new());
        let listener = ActiveListener::bind(loopback(), app).await.unwrap();
        assert_eq!(listener.active_connections(), 0);

        let idle = TcpStream::connect(listener.local_addr()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while listener.active_connections() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(listener.active_connections(), 1);

        drop(idle);
        let drain = listener.close().await;
        tokio::time::timeout(Duration::from_secs(5), drain).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn rebind_same_port_after_close() {
        let app = Arc::new(Application::new());
        let first = ActiveListener::bind(loopback(), app.clone()).await.unwrap();
        let addr = first.local_addr();
        let first_id = first.id();
        let _ = first.close().await;

        let second = ActiveListener::bind(addr, app).await.unwrap();
        assert_eq!(second.local_addr(), addr);
        assert_ne!(second.id(), first_id);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let app = Arc::new(Application::new());
        let first = ActiveListener::bind(loopback(), app.clone()).await.unwrap();
        let err = ActiveListener::bind(first.local_addr(), app).await.err().unwrap();
        assert_eq!(err.code(), crate::error::BIND_FAILED);
    }
}
