//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Health checkers, proxy, gateway produce:
//!     → logging.rs (structured log events, provider/network fields)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Provider URLs never appear in logs or labels, only provider names
//! - Metrics are cheap (atomic increments)
//! - One metrics server per process, shared by all gateways

pub mod logging;
pub mod metrics;

pub use self::metrics::MetricsServer;
