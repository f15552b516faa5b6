//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (checker.rs):
//!     Periodic timer (one loop per target)
//!     → Probe target (eth_blockNumber, optional gasLeft())
//!     → Apply outcome to state.rs
//!     → Publish snapshot (arc-swap)
//!
//! Aggregation (manager.rs):
//!     Read every snapshot
//!     → Rank: healthy before unhealthy, then priority, then block number
//!     → Router picks from the ranked list
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Only the owning checker writes its state; readers never block on a probe
//! - Probe cycles for a target are serialised, targets are independent
//! - Health state is per-target, never persisted

pub mod checker;
pub mod manager;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use checker::{HealthCheckError, HealthChecker};
pub use manager::{HealthCheckManager, TargetStatus};
pub use state::{HealthState, ProbeOutcome, Thresholds, Transition};
