//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration
//!     → server.rs (WebServer: stage routes, swap table, bind port)
//!
//! Request to a proxy route
//!     → client.rs (UpstreamClient → upstream host)
//!     → upstream head + streaming body relayed as-is
//!
//! Request-time failure (file missing, upstream down)
//!     → response.rs (RouteError → status code)
//! ```

pub mod client;
pub mod response;
pub mod server;

pub use client::{HyperUpstream, UpstreamClient, UpstreamRequest};
pub use response::RouteError;
pub use server::{PortState, WebServer};
