//! Path-prefix HTTP dispatcher library.
//!
//! Serves a single port whose routes are built from a configuration file.
//! Each route answers with a mock file, relays to an upstream host, or
//! serves a local directory.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod strategy;

pub use config::Configuration;
pub use error::DispatchError;
pub use http::WebServer;
