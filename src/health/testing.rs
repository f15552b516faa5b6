//! Test doubles for driving checkers without a network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::blockchain::{Probe, ProbeError, ProbeResult};
use crate::config::{HealthCheckConfig, TargetConfig};
use crate::health::checker::HealthChecker;

/// A probe whose answers are set by the test.
#[derive(Debug, Default)]
pub struct FakeProbe {
    block: AtomicU64,
    failing: AtomicBool,
    secondary: Mutex<Option<u64>>,
    delay_ms: AtomicU64,
    calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new(block: u64) -> Self {
        let probe = Self::default();
        probe.set_block(block);
        probe
    }

    pub fn set_block(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// `None` makes the secondary probe fail.
    pub fn set_secondary(&self, value: Option<u64>) {
        *self.secondary.lock().unwrap() = value;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of block-number probes issued.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for FakeProbe {
    async fn block_number(&self) -> ProbeResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProbeError::Rpc("connection refused".to_string()));
        }
        Ok(self.block.load(Ordering::SeqCst))
    }

    async fn secondary_metric(&self) -> ProbeResult<u64> {
        let value = *self.secondary.lock().unwrap();
        value.ok_or_else(|| ProbeError::Rpc("execution reverted".to_string()))
    }
}

pub fn fast_config() -> HealthCheckConfig {
    HealthCheckConfig {
        interval_secs: 1,
        timeout_ms: 500,
        failure_threshold: 2,
        success_threshold: 1,
        ..HealthCheckConfig::default()
    }
}

pub fn target(name: &str, priority: u32) -> TargetConfig {
    TargetConfig {
        name: name.to_string(),
        url: format!("http://{}.invalid", name),
        priority,
    }
}

pub fn checker_with(
    name: &str,
    priority: u32,
    config: HealthCheckConfig,
    probe: Arc<FakeProbe>,
) -> HealthChecker {
    HealthChecker::with_probe(target(name, priority), Arc::new(config), "testnet", probe)
}
