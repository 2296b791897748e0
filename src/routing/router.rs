//! Route table and request dispatch.
//!
//! # Responsibilities
//! - Hold the ordered route table behind a lock-free snapshot
//! - Append, extend, replace and clear the table atomically
//! - Dispatch a request to the first matching route
//!
//! # Design Decisions
//! - The table is an immutable `RouteTable` swapped through `ArcSwap`;
//!   readers never see a half-built or half-cleared table
//! - First registered match wins, later duplicates are shadowed
//! - Each dispatch clones the matched handler's `Arc`, so in-flight requests
//!   keep their handler even after the table is cleared or replaced
//! - Unmatched requests get a plain 404

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::http::response::RouteError;
use crate::observability::metrics;
use crate::routing::matcher::PathPrefixMatcher;

/// Future returned by a route handler.
pub type HandlerFuture = BoxFuture<'static, Response>;

/// A registered request handler.
///
/// Implementations own everything they need; nothing is borrowed from the
/// configuration they were built from.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: Request<Body>) -> HandlerFuture;
}

/// How a route sees the request URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Invoked for every method with the full request URI.
    All,
    /// Mounted at a prefix; the prefix is stripped before the handler runs.
    Mount,
}

/// One entry of the route table.
#[derive(Clone)]
pub struct Route {
    matcher: PathPrefixMatcher,
    kind: RouteKind,
    strategy: &'static str,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn share_path(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// Name of the strategy that registered this route.
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("share_path", &self.matcher.prefix())
            .field("kind", &self.kind)
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// Immutable, ordered set of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// First route whose share path covers `path`.
    pub fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(path))
    }
}

/// The HTTP application: a live route table plus dispatch.
pub struct Application {
    table: ArcSwap<RouteTable>,
}

impl Application {
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::default()),
        }
    }

    /// Register `handler` for every method at `path`.
    pub fn register_all(&self, path: &str, strategy: &'static str, handler: Arc<dyn Handler>) {
        self.push(Route {
            matcher: PathPrefixMatcher::new(path),
            kind: RouteKind::All,
            strategy,
            handler,
        });
    }

    /// Serve the tree under `directory` at `path`.
    pub fn mount_static(&self, path: &str, directory: impl Into<PathBuf>) {
        let handler = StaticDir {
            service: ServeDir::new(directory.into()),
        };
        self.push(Route {
            matcher: PathPrefixMatcher::new(path),
            kind: RouteKind::Mount,
            strategy: "static",
            handler: Arc::new(handler),
        });
    }

    fn push(&self, route: Route) {
        self.table.rcu(|current| {
            let mut next = RouteTable::clone(current);
            next.routes.push(route.clone());
            next
        });
    }

    /// Append every route of `staged` in one store.
    pub fn extend(&self, staged: &RouteTable) {
        self.table.rcu(|current| {
            let mut next = RouteTable::clone(current);
            next.routes.extend(staged.routes.iter().cloned());
            next
        });
    }

    /// Swap in `table` as the whole route table.
    pub fn replace(&self, table: RouteTable) {
        self.table.store(Arc::new(table));
    }

    /// Drop every route in one store.
    pub fn clear(&self) {
        self.replace(RouteTable::default());
    }

    /// The current table.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    pub fn route_count(&self) -> usize {
        self.table.load().len()
    }

    /// Route `request` to the first matching handler.
    pub async fn dispatch(&self, mut request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let matched = {
            let table = self.table.load();
            table.find(&path).map(|route| {
                let mounted_path = match route.kind {
                    RouteKind::Mount => route.matcher.strip(&path).map(str::to_string),
                    RouteKind::All => None,
                };
                (Arc::clone(&route.handler), route.strategy, mounted_path)
            })
        };

        let Some((handler, strategy, mounted_path)) = matched else {
            tracing::debug!(method = %method, path = %path, "No route matched");
            metrics::record_request(method.as_str(), "none", 404, start);
            return (StatusCode::NOT_FOUND, format!("Cannot {} {}", method, path)).into_response();
        };

        if let Some(mounted_path) = mounted_path {
            match rewrite_path(request.uri(), &mounted_path) {
                Ok(uri) => *request.uri_mut() = uri,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Failed to rewrite mounted path");
                    let response = RouteError::BadRequest(e.to_string()).into_response();
                    metrics::record_request(method.as_str(), strategy, response.status().as_u16(), start);
                    return response;
                }
            }
        }

        let response = handler.call(request).await;
        metrics::record_request(method.as_str(), strategy, response.status().as_u16(), start);
        response
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

fn rewrite_path(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

/// Directory serving backed by tower-http.
struct StaticDir {
    service: ServeDir,
}

impl Handler for StaticDir {
    fn call(&self, request: Request<Body>) -> HandlerFuture {
        let service = self.service.clone();
        Box::pin(async move {
            match service.oneshot(request).await {
                Ok(response) => response.map(Body::new),
                Err(never) => match never {},
            }
        })
    }
}
