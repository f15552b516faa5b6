//! Target health state machine.
//!
//! # States
//! - Healthy: target is preferred by the router
//! - Unhealthy: target is only tried once every healthy target has been
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: consecutive failures >= failure_threshold
//! Unhealthy → Healthy: consecutive successes >= success_threshold
//! ```
//!
//! Any success resets the failure streak and any failure resets the success
//! streak. A new target starts Healthy so a fresh gateway serves traffic
//! before its first probe lands.

use serde::Serialize;

/// Outcome of one probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The block-number probe succeeded (and the secondary probe, when it counts).
    Success {
        block_number: u64,
        secondary_metric: Option<u64>,
    },
    /// The cycle failed. A block number or secondary value may still have
    /// been observed, e.g. when only a health-affecting secondary probe failed.
    Failure {
        block_number: Option<u64>,
        secondary_metric: Option<u64>,
    },
}

/// A health flip caused by applying an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BecameHealthy,
    BecameUnhealthy,
}

/// Snapshot of one target's health. Published whole, never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthState {
    pub is_healthy: bool,
    pub block_number: u64,
    pub secondary_metric: u64,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            is_healthy: true,
            block_number: 0,
            secondary_metric: 0,
            consecutive_failures: 0,
            consecutive_successes: 0,
        }
    }
}

/// Consecutive-outcome thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub failure: u32,
    pub success: u32,
}

impl HealthState {
    /// Compute the next state for `outcome`.
    pub fn apply(&self, outcome: ProbeOutcome, thresholds: Thresholds) -> (Self, Option<Transition>) {
        let mut next = *self;
        let mut transition = None;

        match outcome {
            ProbeOutcome::Success {
                block_number,
                secondary_metric,
            } => {
                next.block_number = block_number;
                if let Some(value) = secondary_metric {
                    next.secondary_metric = value;
                }
                next.consecutive_failures = 0;
                next.consecutive_successes = next.consecutive_successes.saturating_add(1);

                if !next.is_healthy && next.consecutive_successes >= thresholds.success {
                    next.is_healthy = true;
                    transition = Some(Transition::BecameHealthy);
                }
            }
            ProbeOutcome::Failure {
                block_number,
                secondary_metric,
            } => {
                if let Some(block) = block_number {
                    next.block_number = block;
                }
                if let Some(value) = secondary_metric {
                    next.secondary_metric = value;
                }
                next.consecutive_successes = 0;
                next.consecutive_failures = next.consecutive_failures.saturating_add(1);

                if next.is_healthy && next.consecutive_failures >= thresholds.failure {
                    next.is_healthy = false;
                    transition = Some(Transition::BecameUnhealthy);
                }
            }
        }

        (next, transition)
    }
}
