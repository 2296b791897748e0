//! Route strategies.
//!
//! Each strategy consumes one mapping and registers exactly one route on an
//! [`Application`](crate::routing::Application):
//!
//! ```text
//! MockMapping   → mock.rs         → register_all(share_path, stream file)
//! ProxyMapping  → proxy.rs        → register_all(share_path, relay upstream)
//! StaticMapping → static_files.rs → mount_static(share_path, local_path)
//! ```

pub mod mock;
pub mod proxy;
pub mod static_files;

pub use mock::MockHandler;
pub use proxy::ProxyHandler;
pub use static_files::StaticHandler;
