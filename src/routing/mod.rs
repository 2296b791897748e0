//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Strategy registration (mock / proxy / static)
//!     → router.rs (Application::register_all / mount_static)
//!     → new RouteTable snapshot stored atomically
//!
//! Incoming Request (path)
//!     → router.rs (Application::dispatch)
//!     → matcher.rs (segment-aware prefix match)
//!     → matched Handler or 404
//! ```
//!
//! # Design Decisions
//! - Routes are matched in registration order, first match wins
//! - No regex in hot path (prefix matching only)
//! - Table mutations are whole-table swaps, never in-place edits

pub mod matcher;
pub mod router;

pub use matcher::PathPrefixMatcher;
pub use router::{Application, Handler, HandlerFuture, Route, RouteKind, RouteTable};
