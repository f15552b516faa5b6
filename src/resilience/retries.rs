//! Per-request failover budget.
//!
//! # Design Decisions
//! - A request never visits the same target twice
//! - The budget caps attempts, not time; each attempt has its own timeout
//! - Transport errors, timeouts and any non-2xx status are retryable

use std::collections::HashSet;

use axum::http::StatusCode;

use crate::config::TargetConfig;

/// Remaining attempts and the targets already tried for one inbound request.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    remaining: usize,
    tried: HashSet<String>,
}

impl RetryBudget {
    /// `max_attempts == 0` means one attempt per target.
    pub fn new(max_attempts: u32, target_count: usize) -> Self {
        let remaining = match max_attempts {
            0 => target_count,
            n => n as usize,
        };
        Self {
            remaining,
            tried: HashSet::new(),
        }
    }

    /// Take the highest-ranked untried target, consuming one attempt.
    pub fn next_target<'a>(&mut self, ranked: &'a [TargetConfig]) -> Option<&'a TargetConfig> {
        if self.remaining == 0 {
            return None;
        }
        let target = ranked.iter().find(|t| !self.tried.contains(&t.name))?;
        self.tried.insert(target.name.clone());
        self.remaining -= 1;
        Some(target)
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn attempts(&self) -> usize {
        self.tried.len()
    }

    pub fn tried(&self, name: &str) -> bool {
        self.tried.contains(name)
    }
}

/// Whether an upstream response should trigger failover.
pub fn is_retryable_status(status: StatusCode) -> bool {
    !status.is_success()
}
