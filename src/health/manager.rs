//! Health check manager.
//!
//! # Responsibilities
//! - Own one [`HealthChecker`] per configured target
//! - Start and stop them as a unit
//! - Rank targets for the proxy from their latest committed snapshots

use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::config::{HealthCheckConfig, TargetConfig};
use crate::health::checker::{HealthCheckError, HealthChecker};
use crate::health::state::HealthState;
use crate::lifecycle::ShutdownSignal;

/// One entry of the aggregated view.
#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
    #[serde(skip)]
    pub target: TargetConfig,
    pub name: String,
    pub priority: u32,
    /// Healthy but more than `max_block_lag` blocks behind the best target.
    pub lagging: bool,
    #[serde(flatten)]
    pub state: HealthState,
}

impl TargetStatus {
    fn tier(&self) -> u8 {
        match (self.state.is_healthy, self.lagging) {
            (true, false) => 0,
            (true, true) => 1,
            (false, _) => 2,
        }
    }
}

#[derive(Debug)]
pub struct HealthCheckManager {
    network: String,
    checkers: Vec<Arc<HealthChecker>>,
    max_block_lag: Option<u64>,
}

impl HealthCheckManager {
    /// Build one checker per target. Any failure fails the whole manager.
    pub fn new(
        targets: &[TargetConfig],
        config: &HealthCheckConfig,
        network: &str,
    ) -> Result<Self, HealthCheckError> {
        let config = Arc::new(config.clone());
        let checkers = targets
            .iter()
            .map(|target| HealthChecker::new(target.clone(), Arc::clone(&config), network).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_checkers(network, checkers, config.max_block_lag))
    }

    pub fn with_checkers(
        network: &str,
        checkers: Vec<Arc<HealthChecker>>,
        max_block_lag: Option<u64>,
    ) -> Self {
        Self {
            network: network.to_string(),
            checkers,
            max_block_lag,
        }
    }

    /// Launch every checker. Does not wait for first probes.
    pub async fn start(&self, shutdown: ShutdownSignal) -> Result<(), HealthCheckError> {
        for checker in &self.checkers {
            checker.start(shutdown.clone());
        }
        tracing::info!(
            network = %self.network,
            targets = self.checkers.len(),
            "Health check manager started"
        );
        Ok(())
    }

    /// Stop every checker, even if some fail. Returns the first error.
    pub async fn stop(&self) -> Result<(), HealthCheckError> {
        let results = join_all(self.checkers.iter().map(|c| c.stop())).await;
        let mut first = None;
        for err in results.into_iter().filter_map(Result::err) {
            tracing::error!(network = %self.network, error = %err, "Health checker failed to stop");
            first.get_or_insert(err);
        }
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn checkers(&self) -> &[Arc<HealthChecker>] {
        &self.checkers
    }

    pub fn checker(&self, name: &str) -> Option<&Arc<HealthChecker>> {
        self.checkers.iter().find(|c| c.name() == name)
    }

    /// Point-in-time aggregated view, most preferred first.
    pub fn statuses(&self) -> Vec<TargetStatus> {
        let snapshots: Vec<(TargetConfig, HealthState)> = self
            .checkers
            .iter()
            .map(|c| (c.target().clone(), c.state()))
            .collect();

        let best_block = snapshots
            .iter()
            .filter(|(_, state)| state.is_healthy)
            .map(|(_, state)| state.block_number)
            .max()
            .unwrap_or(0);

        let mut statuses: Vec<TargetStatus> = snapshots
            .into_iter()
            .map(|(target, state)| {
                let lagging = state.is_healthy
                    && self
                        .max_block_lag
                        .is_some_and(|lag| best_block.saturating_sub(state.block_number) > lag);
                TargetStatus {
                    name: target.name.clone(),
                    priority: target.priority,
                    target,
                    lagging,
                    state,
                }
            })
            .collect();

        // Stable: equal keys keep configuration order.
        statuses.sort_by(|a, b| {
            a.tier()
                .cmp(&b.tier())
                .then(b.priority.cmp(&a.priority))
                .then(b.state.block_number.cmp(&a.state.block_number))
        });
        statuses
    }

    /// Targets in descending preference. Unhealthy targets are kept at the
    /// end so a request can still be attempted when nothing is healthy.
    pub fn ranked_targets(&self) -> Vec<TargetConfig> {
        self.statuses().into_iter().map(|s| s.target).collect()
    }

    pub fn healthy_count(&self) -> usize {
        self.checkers.iter().filter(|c| c.is_healthy()).count()
    }
}
