//! Upstream HTTP client used by the proxy strategy.
//!
//! # Responsibilities
//! - Define the seam the proxy strategy talks through (`UpstreamClient`)
//! - Provide the hyper-based implementation: HTTPS by default, plaintext
//!   for local upstreams
//!
//! # Design Decisions
//! - The returned response carries the upstream head untouched and a
//!   streaming body; nothing is buffered
//! - Connection pooling is left to hyper-util's legacy client

use axum::body::Body;
use axum::http::uri::Scheme;
use axum::http::{Method, Request, Response, Uri};
use futures_util::future::BoxFuture;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::response::BoxError;

/// A request to relay upstream.
pub struct UpstreamRequest {
    pub method: Method,
    /// Upstream authority, `host` or `host:port`.
    pub hostname: String,
    /// Origin-form path, including any query string.
    pub path: String,
    pub body: Body,
}

/// Sends a request to an upstream host and resolves once the response head
/// has arrived.
pub trait UpstreamClient: Send + Sync + 'static {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'static, Result<Response<Body>, BoxError>>;
}

/// hyper-util client over a rustls connector.
#[derive(Clone)]
pub struct HyperUpstream {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    scheme: Scheme,
}

impl HyperUpstream {
    /// Upstreams are reached over HTTPS.
    pub fn https() -> Self {
        Self::with_scheme(Scheme::HTTPS)
    }

    /// Upstreams are reached over plain HTTP.
    pub fn plaintext() -> Self {
        Self::with_scheme(Scheme::HTTP)
    }

    fn with_scheme(scheme: Scheme) -> Self {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, scheme }
    }
}

impl Default for HyperUpstream {
    fn default() -> Self {
        Self::https()
    }
}

impl UpstreamClient for HyperUpstream {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'static, Result<Response<Body>, BoxError>> {
        let client = self.client.clone();
        let scheme = self.scheme.clone();

        Box::pin(async move {
            let uri = Uri::builder()
                .scheme(scheme)
                .authority(request.hostname.as_str())
                .path_and_query(request.path.as_str())
                .build()?;

            let upstream_request = Request::builder()
                .method(request.method)
                .uri(uri)
                .body(request.body)?;

            let response = client.request(upstream_request).await?;
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}
