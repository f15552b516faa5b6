//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpc_gateway_target_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `rpc_gateway_target_block_number` (gauge): latest observed block
//! - `rpc_gateway_target_secondary_metric` (gauge): latest `gasLeft()` value
//! - `rpc_gateway_probe_failures_total` (counter)
//! - `rpc_gateway_requests_total` (counter): forwarded requests by provider, status
//! - `rpc_gateway_request_duration_seconds` (histogram)
//! - `rpc_gateway_failovers_total` (counter)
//! - `rpc_gateway_exhausted_total` (counter): requests no target could serve
//!
//! The server is shared by every gateway in the process. Start and stop are
//! reference counted: it binds on the first start and shuts down on the
//! matching last stop.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::MetricsConfig;
use crate::lifecycle::Shutdown;

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

pub fn record_target_health(network: &str, provider: &str, healthy: bool) {
    gauge!(
        "rpc_gateway_target_healthy",
        "network" => network.to_string(),
        "provider" => provider.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_block_number(network: &str, provider: &str, block: u64) {
    gauge!(
        "rpc_gateway_target_block_number",
        "network" => network.to_string(),
        "provider" => provider.to_string()
    )
    .set(block as f64);
}

pub fn record_secondary_metric(network: &str, provider: &str, value: u64) {
    gauge!(
        "rpc_gateway_target_secondary_metric",
        "network" => network.to_string(),
        "provider" => provider.to_string()
    )
    .set(value as f64);
}

pub fn record_probe_failure(network: &str, provider: &str, probe: &'static str) {
    counter!(
        "rpc_gateway_probe_failures_total",
        "network" => network.to_string(),
        "provider" => provider.to_string(),
        "probe" => probe
    )
    .increment(1);
}

pub fn record_request(network: &str, provider: &str, status: u16, start: Instant) {
    counter!(
        "rpc_gateway_requests_total",
        "network" => network.to_string(),
        "provider" => provider.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "rpc_gateway_request_duration_seconds",
        "network" => network.to_string(),
        "provider" => provider.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_failover(network: &str, provider: &str) {
    counter!(
        "rpc_gateway_failovers_total",
        "network" => network.to_string(),
        "provider" => provider.to_string()
    )
    .increment(1);
}

pub fn record_exhausted(network: &str) {
    counter!("rpc_gateway_exhausted_total", "network" => network.to_string()).increment(1);
}

/// Process-wide Prometheus recorder, installed on first use.
fn prometheus_handle() -> &'static PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("A metrics recorder was already installed, /metrics may be empty");
        }
        handle
    })
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metrics address '{0}'")]
    InvalidAddress(String),

    #[error("failed to bind metrics server: {0}")]
    Bind(#[source] std::io::Error),

    #[error("metrics server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

struct Running {
    shutdown: Shutdown,
    server: JoinHandle<Result<(), std::io::Error>>,
    upkeep: JoinHandle<()>,
    local_addr: SocketAddr,
    users: usize,
}

/// HTTP server exposing `GET /metrics`.
pub struct MetricsServer {
    config: MetricsConfig,
    running: Mutex<Option<Running>>,
}

impl MetricsServer {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            running: Mutex::new(None),
        }
    }

    /// Bind and serve, or take another reference if already running.
    /// A no-op when disabled.
    pub async fn start(&self) -> Result<(), MetricsError> {
        if !self.config.enabled {
            tracing::info!("Metrics server disabled");
            return Ok(());
        }

        let mut running = self.running.lock().await;
        if let Some(r) = running.as_mut() {
            r.users += 1;
            return Ok(());
        }

        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .map_err(|_| MetricsError::InvalidAddress(self.config.bind_address.clone()))?;
        let listener = TcpListener::bind(addr).await.map_err(MetricsError::Bind)?;
        let local_addr = listener.local_addr().map_err(MetricsError::Bind)?;

        let handle = prometheus_handle().clone();
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );

        let shutdown = Shutdown::new();
        let mut server_signal = shutdown.subscribe();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_signal.recv().await })
                .await
        });

        let mut upkeep_signal = shutdown.subscribe();
        let upkeep = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(UPKEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => prometheus_handle().run_upkeep(),
                    _ = upkeep_signal.recv() => break,
                }
            }
        });

        tracing::info!(address = %local_addr, "Metrics server listening");
        *running = Some(Running {
            shutdown,
            server,
            upkeep,
            local_addr,
            users: 1,
        });
        Ok(())
    }

    /// Release one reference; the last one stops serving. A no-op when not
    /// running.
    pub async fn stop(&self) -> Result<(), MetricsError> {
        let mut guard = self.running.lock().await;
        let Some(r) = guard.as_mut() else {
            return Ok(());
        };
        if r.users > 1 {
            r.users -= 1;
            return Ok(());
        }
        let Some(running) = guard.take() else {
            return Ok(());
        };
        drop(guard);

        running.shutdown.trigger();
        running.upkeep.await?;
        running.server.await?.map_err(MetricsError::Bind)?;
        tracing::info!("Metrics server stopped");
        Ok(())
    }

    /// Address the server is bound to, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> MetricsConfig {
        MetricsConfig {
            enabled: true,
            bind_address: "127.0.0.1:0".to_string(),
        }
    }

    #[tokio::test]
    async fn test_start_stop_reference_counted() {
        let server = MetricsServer::new(local_config());
        server.start().await.unwrap();
        let addr = server.local_addr().await.unwrap();
        server.start().await.unwrap();
        assert_eq!(server.local_addr().await, Some(addr));

        record_target_health("testnet", "a", true);
        let body = reqwest::get(format!("http://{}/metrics", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("rpc_gateway_target_healthy"));

        server.stop().await.unwrap();
        assert_eq!(server.local_addr().await, Some(addr));
        server.stop().await.unwrap();
        assert!(server.local_addr().await.is_none());
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_server_does_not_bind() {
        let mut config = local_config();
        config.enabled = false;
        let server = MetricsServer::new(config);
        server.start().await.unwrap();
        assert!(server.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let mut config = local_config();
        config.bind_address = "metrics".to_string();
        let err = MetricsServer::new(config).start().await.unwrap_err();
        assert!(matches!(err, MetricsError::InvalidAddress(_)));
    }
}
