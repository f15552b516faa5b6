//! Active health checking for one target.
//!
//! # Responsibilities
//! - Periodically probe the target (block number, optional secondary metric)
//! - Feed outcomes through the threshold state machine
//! - Publish the resulting snapshot for lock-free readers

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::blockchain::{Probe, ProbeClient, ProbeError, ProbeResult};
use crate::config::{HealthCheckConfig, TargetConfig};
use crate::health::state::{HealthState, ProbeOutcome, Thresholds, Transition};
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum HealthCheckError {
    #[error("failed to create health checker for target '{target}': {source}")]
    Construction {
        target: String,
        #[source]
        source: ProbeError,
    },

    #[error("health checker for target '{target}' panicked: {source}")]
    Join {
        target: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

pub struct HealthChecker {
    target: TargetConfig,
    network: String,
    config: Arc<HealthCheckConfig>,
    probe: Arc<dyn Probe>,
    state: ArcSwap<HealthState>,
    // Serialises probe cycles so updates for one target are strictly ordered.
    cycle: tokio::sync::Mutex<()>,
    shutdown: Shutdown,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthChecker {
    /// Create a checker backed by an alloy [`ProbeClient`].
    pub fn new(
        target: TargetConfig,
        config: Arc<HealthCheckConfig>,
        network: &str,
    ) -> Result<Self, HealthCheckError> {
        let client = ProbeClient::new(&target, &config.secondary_metric, config.timeout())
            .map_err(|source| HealthCheckError::Construction {
                target: target.name.clone(),
                source,
            })?;
        Ok(Self::with_probe(target, config, network, Arc::new(client)))
    }

    /// Create a checker around any [`Probe`] implementation.
    pub fn with_probe(
        target: TargetConfig,
        config: Arc<HealthCheckConfig>,
        network: &str,
        probe: Arc<dyn Probe>,
    ) -> Self {
        Self {
            target,
            network: network.to_string(),
            config,
            probe,
            state: ArcSwap::from_pointee(HealthState::default()),
            cycle: tokio::sync::Mutex::new(()),
            shutdown: Shutdown::new(),
            task: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.target.name
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    /// Latest committed snapshot.
    pub fn state(&self) -> HealthState {
        **self.state.load()
    }

    pub fn is_healthy(&self) -> bool {
        self.state.load().is_healthy
    }

    pub fn block_number(&self) -> u64 {
        self.state.load().block_number
    }

    pub fn secondary_metric(&self) -> u64 {
        self.state.load().secondary_metric
    }

    /// Spawn the probe loop. Probes once immediately, then every interval,
    /// until `shutdown` fires or [`stop`](Self::stop) is called.
    pub fn start(self: &Arc<Self>, shutdown: ShutdownSignal) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            tracing::debug!(provider = %self.name(), "Health checker already running");
            return;
        }
        let checker = Arc::clone(self);
        *task = Some(tokio::spawn(checker.run(shutdown)));
    }

    /// Stop the probe loop and wait for it to exit. Idempotent.
    pub async fn stop(&self) -> Result<(), HealthCheckError> {
        self.shutdown.trigger();
        let handle = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.await.map_err(|source| HealthCheckError::Join {
                target: self.target.name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    async fn run(self: Arc<Self>, mut external: ShutdownSignal) {
        let mut own = self.shutdown.subscribe();
        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            provider = %self.name(),
            network = %self.network,
            interval_secs = self.config.interval_secs,
            "Health checker starting"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut own, &mut external) => break,
                _ = ticker.tick() => {}
            }
            // Dropping a cycle half-way is safe: state is only stored at its end.
            tokio::select! {
                biased;
                _ = cancelled(&mut own, &mut external) => break,
                _ = self.check_and_set_health() => {}
            }
        }

        tracing::info!(provider = %self.name(), network = %self.network, "Health checker stopped");
    }

    /// Run one probe cycle and commit the result.
    pub async fn check_and_set_health(&self) -> HealthState {
        let _cycle = self.cycle.lock().await;

        let outcome = self.probe_once().await;
        let thresholds = Thresholds {
            failure: self.config.failure_threshold,
            success: self.config.success_threshold,
        };
        let (next, transition) = self.state.load().apply(outcome, thresholds);
        self.state.store(Arc::new(next));

        match transition {
            Some(Transition::BecameUnhealthy) => tracing::warn!(
                provider = %self.name(),
                network = %self.network,
                consecutive_failures = next.consecutive_failures,
                "Target marked unhealthy"
            ),
            Some(Transition::BecameHealthy) => tracing::info!(
                provider = %self.name(),
                network = %self.network,
                consecutive_successes = next.consecutive_successes,
                "Target recovered"
            ),
            None => {}
        }

        metrics::record_target_health(&self.network, self.name(), next.is_healthy);
        metrics::record_block_number(&self.network, self.name(), next.block_number);
        if self.config.secondary_metric.enabled {
            metrics::record_secondary_metric(&self.network, self.name(), next.secondary_metric);
        }

        next
    }

    async fn probe_once(&self) -> ProbeOutcome {
        let secondary = &self.config.secondary_metric;
        let (block, gas) = if secondary.enabled {
            let (block, gas) = tokio::join!(self.fetch_block_number(), self.fetch_secondary_metric());
            (block, Some(gas))
        } else {
            (self.fetch_block_number().await, None)
        };

        let secondary_value = gas.as_ref().and_then(|r| r.as_ref().ok().copied());
        let secondary_failed = matches!(gas, Some(Err(_)));

        match block {
            Ok(block_number) if !(secondary.affects_health && secondary_failed) => {
                ProbeOutcome::Success {
                    block_number,
                    secondary_metric: secondary_value,
                }
            }
            _ => ProbeOutcome::Failure {
                block_number: block.ok(),
                secondary_metric: secondary_value,
            },
        }
    }

    async fn fetch_block_number(&self) -> ProbeResult<u64> {
        let result = bounded(self.config.timeout(), self.probe.block_number()).await;
        match &result {
            Ok(block) => tracing::debug!(
                provider = %self.name(),
                network = %self.network,
                block_number = block,
                "Fetched block number"
            ),
            Err(e) => {
                tracing::warn!(
                    provider = %self.name(),
                    network = %self.network,
                    error = %e,
                    "Could not fetch block number"
                );
                metrics::record_probe_failure(&self.network, self.name(), "block_number");
            }
        }
        result
    }

    async fn fetch_secondary_metric(&self) -> ProbeResult<u64> {
        let result = bounded(self.config.timeout(), self.probe.secondary_metric()).await;
        match &result {
            Ok(gas) => tracing::debug!(
                provider = %self.name(),
                network = %self.network,
                gas_left = gas,
                "Fetched secondary metric"
            ),
            Err(e) => {
                tracing::warn!(
                    provider = %self.name(),
                    network = %self.network,
                    error = %e,
                    "Could not fetch secondary metric"
                );
                metrics::record_probe_failure(&self.network, self.name(), "secondary_metric");
            }
        }
        result
    }
}

impl std::fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthChecker")
            .field("provider", &self.target.name)
            .field("network", &self.network)
            .field("state", &self.state())
            .finish()
    }
}

async fn bounded<F>(limit: Duration, fut: F) -> ProbeResult<u64>
where
    F: std::future::Future<Output = ProbeResult<u64>>,
{
    time::timeout(limit, fut)
        .await
        .unwrap_or(Err(ProbeError::Timeout(limit)))
}

async fn cancelled(own: &mut ShutdownSignal, external: &mut ShutdownSignal) {
    tokio::select! {
        _ = own.recv() => {}
        _ = external.recv() => {}
    }
}
