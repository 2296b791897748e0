//! Proxy strategy: relay requests to an upstream host.
//!
//! # Responsibilities
//! - Send the inbound path to the mapping's upstream host
//! - Relay the upstream status, headers and streaming body verbatim
//! - Resolve the local response with 502 when the upstream cannot be reached
//!
//! # Design Decisions
//! - The upstream call is a GET with an empty body unless the mapping sets
//!   `forward_method`
//! - Inbound headers are not forwarded; the client sets `Host` from the
//!   upstream authority
//! - Nothing is written locally before the upstream head arrives
//! - The query string is forwarded along with the path. A relay that sends
//!   the bare path (as Express's `req.path` does) would silently drop it;
//!   this one does not

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::IntoResponse;

use crate::config::ProxyMapping;
use crate::http::client::{UpstreamClient, UpstreamRequest};
use crate::http::response::RouteError;
use crate::routing::{Application, Handler, HandlerFuture};

pub const STRATEGY: &str = "proxy";

pub struct ProxyHandler {
    mapping: ProxyMapping,
    upstream: Arc<dyn UpstreamClient>,
}

impl ProxyHandler {
    pub fn new(mapping: ProxyMapping, upstream: Arc<dyn UpstreamClient>) -> Self {
        Self { mapping, upstream }
    }

    /// Register a proxy route for every method at `mapping.share_path`.
    pub fn map(app: &Application, mapping: ProxyMapping, upstream: Arc<dyn UpstreamClient>) {
        tracing::info!(
            share_path = %mapping.share_path,
            server_path = %mapping.server_path,
            forward_method = mapping.forward_method,
            "Mapping proxy route"
        );
        let share_path = mapping.share_path.clone();
        app.register_all(&share_path, STRATEGY, Arc::new(Self::new(mapping, upstream)));
    }
}

impl Handler for ProxyHandler {
    fn call(&self, request: Request<Body>) -> HandlerFuture {
        let hostname = self.mapping.server_path.clone();
        let upstream = Arc::clone(&self.upstream);
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let (method, body) = if self.mapping.forward_method {
            let (parts, body) = request.into_parts();
            (parts.method, body)
        } else {
            (Method::GET, Body::empty())
        };

        Box::pin(async move {
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                upstream = %hostname,
                path = %path,
                "Proxying request"
            );

            let outbound = UpstreamRequest {
                method,
                hostname: hostname.clone(),
                path,
                body,
            };

            match upstream.send(outbound).await {
                Ok(response) => {
                    tracing::debug!(
                        request_id = %request_id,
                        status = %response.status(),
                        "Upstream responded"
                    );
                    response
                }
                Err(source) => {
                    let err = RouteError::Upstream { host: hostname, source };
                    tracing::error!(request_id = %request_id, error = %err, "Upstream error");
                    err.into_response()
                }
            }
        })
    }
}
