//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration, dispatch, listener lifecycle:
//!     → tracing events (structured fields)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, filtered by RUST_LOG / config)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
