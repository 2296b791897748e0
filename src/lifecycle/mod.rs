//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → LifecycleEvent::Shutdown → close listener → drain → exit
//!     SIGHUP         → LifecycleEvent::Reload   → re-read config → WebServer::reload
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging/metrics, then routes, then the port
//! - Shutdown has timeout: open connections are abandoned after `drainTimeoutSecs`

pub mod signals;

pub use signals::{LifecycleEvent, Signals};
