//! Gateway composition root.
//!
//! # Responsibilities
//! - Wire health checks, the proxy and the HTTP server for one network
//! - Start and stop them, together with the metrics server, as a unit
//!
//! # Design Decisions
//! - Start and stop run every component even when one fails; errors are
//!   collected rather than short-circuited
//! - The metrics server is shared; a gateway holds at most one reference
//!   to it and releases only its own

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{validate_gateway, ConfigError, GatewayConfig};
use crate::health::{HealthCheckError, HealthCheckManager, TargetStatus};
use crate::http::{HttpServer, Proxy, ProxyError, ServerError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics::MetricsError;
use crate::observability::MetricsServer;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Health(#[from] HealthCheckError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("{}", join_errors(.0))]
    Aggregate(Vec<GatewayError>),
}

fn join_errors(errors: &[GatewayError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl GatewayError {
    /// `Ok` for no errors, the error itself for one, `Aggregate` otherwise.
    fn collect(mut errors: Vec<GatewayError>) -> Result<(), GatewayError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(GatewayError::Aggregate(errors)),
        }
    }
}

/// One network's failover gateway.
pub struct RpcGateway {
    name: String,
    manager: Arc<HealthCheckManager>,
    server: HttpServer,
    metrics: Arc<MetricsServer>,
    metrics_held: AtomicBool,
    shutdown: Shutdown,
}

impl RpcGateway {
    /// Validate the configuration and build every component. Nothing is
    /// started and no network I/O happens here.
    pub fn new(config: GatewayConfig, metrics: Arc<MetricsServer>) -> Result<Self, GatewayError> {
        validate_gateway(&config).map_err(ConfigError::Validation)?;

        let manager = Arc::new(HealthCheckManager::new(
            &config.targets,
            &config.health_checks,
            &config.name,
        )?);
        let proxy = Arc::new(Proxy::new(config.proxy.clone(), Arc::clone(&manager))?);
        let server = HttpServer::new(proxy);

        Ok(Self {
            name: config.name,
            manager,
            server,
            metrics,
            metrics_held: AtomicBool::new(false),
            shutdown: Shutdown::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manager(&self) -> &Arc<HealthCheckManager> {
        &self.manager
    }

    /// Aggregated per-target status, most preferred first.
    pub fn statuses(&self) -> Vec<TargetStatus> {
        self.manager.statuses()
    }

    /// Proxy listener address, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr().await
    }

    /// Start health checks, the proxy server and the metrics server
    /// concurrently. On error the caller is expected to call [`stop`].
    ///
    /// [`stop`]: RpcGateway::stop
    pub async fn start(&self) -> Result<(), GatewayError> {
        let acquire_metrics = async {
            if self.metrics_held.load(Ordering::SeqCst) {
                return Ok(());
            }
            self.metrics.start().await?;
            self.metrics_held.store(true, Ordering::SeqCst);
            Ok::<(), MetricsError>(())
        };
        let (health, server, metrics) = tokio::join!(
            self.manager.start(self.shutdown.subscribe()),
            self.server.start(),
            acquire_metrics,
        );

        let mut errors: Vec<GatewayError> = Vec::new();
        if let Err(e) = health {
            errors.push(e.into());
        }
        if let Err(e) = server {
            errors.push(e.into());
        }
        if let Err(e) = metrics {
            errors.push(e.into());
        }

        match GatewayError::collect(errors) {
            Ok(()) => {
                tracing::info!(gateway = %self.name, "Gateway started");
                Ok(())
            }
            Err(e) => {
                tracing::error!(gateway = %self.name, error = %e, "Gateway failed to start");
                Err(e)
            }
        }
    }

    /// Stop every component. Safe to call more than once.
    pub async fn stop(&self) -> Result<(), GatewayError> {
        self.shutdown.trigger();
        let release_metrics = async {
            if self.metrics_held.swap(false, Ordering::SeqCst) {
                self.metrics.stop().await
            } else {
                Ok(())
            }
        };
        let (health, server, metrics) = tokio::join!(
            self.manager.stop(),
            self.server.stop(),
            release_metrics,
        );

        let mut errors: Vec<GatewayError> = Vec::new();
        if let Err(e) = health {
            errors.push(e.into());
        }
        if let Err(e) = server {
            errors.push(e.into());
        }
        if let Err(e) = metrics {
            errors.push(e.into());
        }

        let result = GatewayError::collect(errors);
        match &result {
            Ok(()) => tracing::info!(gateway = %self.name, "Gateway stopped"),
            Err(e) => tracing::error!(gateway = %self.name, error = %e, "Gateway stopped with errors"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HealthCheckConfig, MetricsConfig, ProxyConfig, TargetConfig};

    fn disabled_metrics() -> Arc<MetricsServer> {
        Arc::new(MetricsServer::new(MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        }))
    }

    fn gateway_config(bind_address: &str) -> GatewayConfig {
        GatewayConfig {
            name: "testnet".to_string(),
            proxy: ProxyConfig {
                bind_address: bind_address.to_string(),
                ..ProxyConfig::default()
            },
            health_checks: HealthCheckConfig::default(),
            targets: vec![TargetConfig {
                name: "a".to_string(),
                url: "http://127.0.0.1:1".to_string(),
                priority: 0,
            }],
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = gateway_config("127.0.0.1:0");
        config.targets.clear();
        let err = RpcGateway::new(config, disabled_metrics()).err().unwrap();
        assert!(matches!(err, GatewayError::Config(ConfigError::Validation(_))));
    }

    #[tokio::test]
    async fn test_start_failure_is_reported_and_stop_cleans_up() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = occupied.local_addr().unwrap().to_string();

        let gateway = RpcGateway::new(gateway_config(&addr), disabled_metrics()).unwrap();
        let err = gateway.start().await.unwrap_err();
        assert!(matches!(err, GatewayError::Server(ServerError::Bind { .. })));

        gateway.stop().await.unwrap();
        assert!(gateway.local_addr().await.is_none());
    }

    #[test]
    fn test_aggregate_message_lists_every_error() {
        let err = GatewayError::Aggregate(vec![
            ServerError::InvalidAddress("x".to_string()).into(),
            MetricsError::InvalidAddress("y".to_string()).into(),
        ]);
        let message = err.to_string();
        assert!(message.contains("'x'"));
        assert!(message.contains("'y'"));
    }
}
