//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! WebServer::set_port
//!     → listener.rs (bind, accept loop)
//!     → connection.rs (identity, live connection count)
//!     → Application::dispatch
//!
//! Listener States:
//!     Bound → Closed (socket dropped) → Drained (all connections done)
//! ```
//!
//! # Design Decisions
//! - One listener per server at a time
//! - Closing is confirmed before a replacement is bound
//! - Closed listeners drain instead of resetting connections

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, ConnectionTracker, ListenerId};
pub use listener::ActiveListener;
