//! Health checks against mock JSON-RPC upstreams over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use rpc_gateway::blockchain::{Probe, ProbeClient, ProbeError};
use rpc_gateway::config::{HealthCheckConfig, SecondaryMetricConfig};
use rpc_gateway::health::{HealthCheckManager, HealthChecker};
use rpc_gateway::lifecycle::Shutdown;

mod common;
use common::{wait_until, MockUpstream};

const GAS_LEFT_CONTRACT: &str = "0x000000000000000000000000000000000000dEaD";

fn config() -> HealthCheckConfig {
    HealthCheckConfig {
        interval_secs: 1,
        timeout_ms: 300,
        failure_threshold: 2,
        success_threshold: 2,
        ..HealthCheckConfig::default()
    }
}

#[tokio::test]
async fn test_probe_client_reads_block_number() {
    let upstream = MockUpstream::start("a").await;
    upstream.set_block(0x1234);

    let client = ProbeClient::new(
        &upstream.target(0),
        &SecondaryMetricConfig::default(),
        Duration::from_millis(500),
    )
    .unwrap();
    assert_eq!(client.block_number().await.unwrap(), 0x1234);
}

#[tokio::test]
async fn test_probe_client_reads_gas_left() {
    let upstream = MockUpstream::start("a").await;
    upstream.set_gas_left(29_000_000);

    let secondary = SecondaryMetricConfig {
        enabled: true,
        affects_health: false,
        contract_address: GAS_LEFT_CONTRACT.to_string(),
    };
    let client = ProbeClient::new(&upstream.target(0), &secondary, Duration::from_millis(500)).unwrap();
    assert_eq!(client.secondary_metric().await.unwrap(), 29_000_000);
}

#[tokio::test]
async fn test_probe_client_times_out() {
    let upstream = MockUpstream::start("a").await;
    upstream.set_delay(Duration::from_secs(2));

    let client = ProbeClient::new(
        &upstream.target(0),
        &SecondaryMetricConfig::default(),
        Duration::from_millis(200),
    )
    .unwrap();
    let err = client.block_number().await.unwrap_err();
    assert!(matches!(err, ProbeError::Timeout(_) | ProbeError::Rpc(_)));
    assert!(!err.to_string().contains(&upstream.addr.to_string()));
}

#[tokio::test]
async fn test_checker_thresholds_over_http() {
    let upstream = MockUpstream::start("a").await;
    upstream.set_block(42);
    let checker = HealthChecker::new(upstream.target(0), Arc::new(config()), "testnet").unwrap();

    let state = checker.check_and_set_health().await;
    assert!(state.is_healthy);
    assert_eq!(state.block_number, 42);

    upstream.set_probe_failing(true);
    assert!(checker.check_and_set_health().await.is_healthy);
    assert!(!checker.check_and_set_health().await.is_healthy);
    assert_eq!(checker.block_number(), 42);

    upstream.set_probe_failing(false);
    upstream.set_block(43);
    assert!(!checker.check_and_set_health().await.is_healthy);
    let state = checker.check_and_set_health().await;
    assert!(state.is_healthy);
    assert_eq!(state.block_number, 43);
}

#[tokio::test]
async fn test_manager_probes_in_background_and_stops() {
    let a = MockUpstream::start("a").await;
    let b = MockUpstream::start("b").await;
    a.set_block(10);
    b.set_block(20);

    let manager = Arc::new(
        HealthCheckManager::new(&[a.target(0), b.target(0)], &config(), "testnet").unwrap(),
    );
    let shutdown = Shutdown::new();
    manager.start(shutdown.subscribe()).await.unwrap();

    let m = Arc::clone(&manager);
    assert!(
        wait_until(Duration::from_secs(3), || {
            let m = Arc::clone(&m);
            async move { m.checkers().iter().all(|c| c.block_number() > 0) }
        })
        .await
    );

    // Equal priority: the higher block number wins.
    let ranked: Vec<String> = manager.ranked_targets().into_iter().map(|t| t.name).collect();
    assert_eq!(ranked, vec!["b", "a"]);

    shutdown.trigger();
    manager.stop().await.unwrap();

    let probes = a.probes();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(a.probes(), probes);
}
