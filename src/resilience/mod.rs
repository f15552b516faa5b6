//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → retries.rs (pick next untried target within the budget)
//!     → per-attempt timeout (proxy)
//!     → On failure: back to retries.rs with the next ranked target
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Failover moves to a different target immediately, no backoff
//! - JSON-RPC is POST-only, so retries do not depend on HTTP method

pub mod retries;

pub use retries::{is_retryable_status, RetryBudget};
