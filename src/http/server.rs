//! The dispatcher server.
//!
//! # Responsibilities
//! - Turn a `Configuration` into routes (mock / proxy / static)
//! - Own the route table (`Application`) for the server's lifetime
//! - Own the single listening socket and rebind it on demand
//! - Drain closed listeners and bound the wait at shutdown
//!
//! # Design Decisions
//! - Configuration entries are staged into a scratch table first; the live
//!   table only changes once every entry has been mapped
//! - `process_config` appends, `reload` replaces
//! - Routes are in place before the port is (re)bound
//! - The port manager is an explicit `Unbound` / `Bound` state machine

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::{Configuration, MockMapping, ProxyMapping, RouteMapping, StaticMapping};
use crate::error::DispatchError;
use crate::http::client::{HyperUpstream, UpstreamClient};
use crate::net::{ActiveListener, ListenerId};
use crate::observability::metrics;
use crate::routing::{Application, RouteTable};
use crate::strategy::{MockHandler, ProxyHandler, StaticHandler};

/// Listening state of a [`WebServer`].
pub enum PortState {
    Unbound,
    Bound(ActiveListener),
}

impl PortState {
    pub fn is_bound(&self) -> bool {
        matches!(self, PortState::Bound(_))
    }

    pub fn listener(&self) -> Option<&ActiveListener> {
        match self {
            PortState::Bound(listener) => Some(listener),
            PortState::Unbound => None,
        }
    }
}

/// An HTTP application plus the socket serving it.
pub struct WebServer {
    app: Arc<Application>,
    upstream: Arc<dyn UpstreamClient>,
    bind_host: IpAddr,
    state: PortState,
    draining: Vec<JoinHandle<()>>,
    closed_listeners: u64,
}

impl WebServer {
    /// A server whose proxy routes reach upstreams over HTTPS.
    pub fn new() -> Self {
        Self::with_upstream(Arc::new(HyperUpstream::https()))
    }

    /// A server whose proxy routes go through `upstream`.
    pub fn with_upstream(upstream: Arc<dyn UpstreamClient>) -> Self {
        Self {
            app: Arc::new(Application::new()),
            upstream,
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            state: PortState::Unbound,
            draining: Vec::new(),
            closed_listeners: 0,
        }
    }

    /// Address used by subsequent binds. `process_config` overrides it.
    pub fn with_bind_host(mut self, bind_host: IpAddr) -> Self {
        self.bind_host = bind_host;
        self
    }

    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }

    /// Map every entry of `config`, in order, then bind `config.listen_port`.
    ///
    /// The first entry that fails aborts the call and nothing from this
    /// configuration is registered.
    pub async fn process_config(&mut self, config: &Configuration) -> Result<(), DispatchError> {
        let staged = self.stage(config)?;
        self.app.extend(&staged);
        self.routes_changed();

        tracing::info!(
            registered = staged.len(),
            total = self.app.route_count(),
            default_api_address = %config.default_api_address,
            "Configuration processed"
        );

        self.bind_host = config.bind_host;
        self.set_port(config.listen_port).await
    }

    /// Replace the whole route table with the routes of `config`, then
    /// rebind `config.listen_port`.
    ///
    /// On a mapping error the live table is left untouched. When the new
    /// address cannot be bound, the previous address is bound again before
    /// the bind error is returned; the server only ends up unbound if that
    /// fails too.
    pub async fn reload(&mut self, config: &Configuration) -> Result<(), DispatchError> {
        let staged = self.stage(config)?;
        let registered = staged.len();
        self.app.replace(staged);
        self.routes_changed();

        tracing::info!(registered, "Route table replaced");

        let previous = self.local_addr();
        self.bind_host = config.bind_host;
        let err = match self.set_port(config.listen_port).await {
            Ok(()) => return Ok(()),
            Err(err @ DispatchError::Bind { .. }) => err,
            Err(err) => return Err(err),
        };

        if let Some(previous) = previous {
            tracing::warn!(error = %err, address = %previous, "Rebind failed, restoring previous address");
            self.bind_host = previous.ip();
            if let Err(restore) = self.set_port(previous.port()).await {
                tracing::error!(error = %restore, "Previous address could not be restored");
            }
        }
        Err(err)
    }

    fn stage(&self, config: &Configuration) -> Result<RouteTable, DispatchError> {
        let staged = Application::new();
        for (key, entry) in &config.path_maps {
            let mapping = entry.resolve(key, &config.default_api_address)?;
            self.apply(&staged, mapping)?;
        }
        Ok(RouteTable::clone(&staged.snapshot()))
    }

    fn apply(&self, app: &Application, mapping: RouteMapping) -> Result<(), DispatchError> {
        match mapping {
            RouteMapping::Mock(mapping) => MockHandler::map(app, mapping),
            RouteMapping::Proxy(mapping) => ProxyHandler::map(app, mapping, Arc::clone(&self.upstream)),
            RouteMapping::Static(mapping) => StaticHandler::map(app, mapping)?,
        }
        Ok(())
    }

    pub fn map_mock(&self, mapping: MockMapping) {
        MockHandler::map(&self.app, mapping);
        self.routes_changed();
    }

    pub fn map_proxy(&self, mapping: ProxyMapping) {
        ProxyHandler::map(&self.app, mapping, Arc::clone(&self.upstream));
        self.routes_changed();
    }

    pub fn map_static(&self, mapping: StaticMapping) -> Result<(), DispatchError> {
        StaticHandler::map(&self.app, mapping)?;
        self.routes_changed();
        Ok(())
    }

    /// Drop every route. The listener keeps accepting; requests get 404.
    pub fn unmap(&self) {
        let previous = self.app.route_count();
        self.app.clear();
        self.routes_changed();
        tracing::info!(removed = previous, "Route table cleared");
    }

    pub fn route_count(&self) -> usize {
        self.app.route_count()
    }

    fn routes_changed(&self) {
        metrics::set_route_count(self.app.route_count());
    }

    /// Close the current listener, if any, then bind `port`.
    ///
    /// The listener is always replaced, even when `port` is unchanged. On a
    /// bind failure the server is left unbound.
    pub async fn set_port(&mut self, port: u16) -> Result<(), DispatchError> {
        let rebinding = self.close_server().await;

        let addr = SocketAddr::new(self.bind_host, port);
        let listener = ActiveListener::bind(addr, Arc::clone(&self.app)).await?;

        if rebinding {
            metrics::record_rebind(listener.port());
        }
        tracing::info!(
            listener_id = %listener.id(),
            address = %listener.local_addr(),
            rebinding,
            "Listening"
        );

        self.state = PortState::Bound(listener);
        Ok(())
    }

    /// Stop the current listener. Returns whether there was one.
    ///
    /// Its connections keep draining in the background.
    pub async fn close_server(&mut self) -> bool {
        match std::mem::replace(&mut self.state, PortState::Unbound) {
            PortState::Unbound => false,
            PortState::Bound(listener) => {
                let drain = listener.close().await;
                self.draining.retain(|handle| !handle.is_finished());
                self.draining.push(drain);
                self.closed_listeners += 1;
                true
            }
        }
    }

    pub fn port_state(&self) -> &PortState {
        &self.state
    }

    /// Port actually bound, if listening.
    pub fn active_port(&self) -> Option<u16> {
        self.state.listener().map(ActiveListener::port)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.state.listener().map(ActiveListener::local_addr)
    }

    pub fn listener_id(&self) -> Option<ListenerId> {
        self.state.listener().map(ActiveListener::id)
    }

    /// Number of listeners closed over the server's lifetime.
    pub fn closed_listeners(&self) -> u64 {
        self.closed_listeners
    }

    /// Close the listener and wait up to `drain_timeout` for every closed
    /// listener's connections to finish.
    pub async fn shutdown(mut self, drain_timeout: Duration) {
        self.close_server().await;

        let drains = std::mem::take(&mut self.draining);
        match tokio::time::timeout(drain_timeout, futures_util::future::join_all(drains)).await {
            Ok(_) => tracing::info!("All connections drained"),
            Err(_) => tracing::warn!(
                timeout_secs = drain_timeout.as_secs(),
                "Drain timeout elapsed, abandoning open connections"
            ),
        }
    }
}

impl Default for WebServer {
    fn default() -> Self {
        Self::new()
    }
}
