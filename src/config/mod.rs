//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/JSON)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Configuration (validated, immutable)
//!     → WebServer::process_config / WebServer::reload
//!
//! On change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → WebServer::reload swaps the route table and rebinds
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - `pathMaps` keeps file order, which is the registration order

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    Configuration, MockMapping, ObservabilityConfig, PathMap, ProxyMapping, RouteMapping,
    StaticMapping,
};
