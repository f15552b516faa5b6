//! Configuration schema definitions.
//!
//! Two files make up a deployment: a root file listing the gateways plus the
//! shared observability/metrics settings, and one file per gateway describing
//! its proxy listener, health checks and upstream targets.
//! All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration: shared settings and the list of gateways to run.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RootConfig {
    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Prometheus endpoint shared by every gateway.
    pub metrics: MetricsConfig,

    /// Gateways to start, one per network.
    pub gateways: Vec<GatewayEntry>,
}

/// Reference to a gateway configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEntry {
    /// Gateway identifier for logging.
    pub name: String,

    /// Path to the gateway TOML file, relative to the root file.
    pub config_file: String,
}

/// Configuration of a single gateway (one network, many providers).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Network name, attached to every log line and metric.
    pub name: String,

    /// Inbound proxy settings.
    pub proxy: ProxyConfig,

    /// Health check settings shared by every target.
    pub health_checks: HealthCheckConfig,

    /// Upstream RPC providers.
    pub targets: Vec<TargetConfig>,
}

/// Inbound proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Per-attempt upstream timeout in milliseconds.
    pub upstream_timeout_ms: u64,

    /// Client-facing request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum forwarding attempts per request (0 = one per target).
    pub max_attempts: u32,

    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl ProxyConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            upstream_timeout_ms: 2_000,
            request_timeout_secs: 15,
            max_attempts: 0,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// A configured upstream RPC provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Provider identifier, unique within a gateway.
    pub name: String,

    /// JSON-RPC endpoint. May embed credentials, never logged.
    pub url: String,

    /// Static preference (higher = tried first).
    #[serde(default)]
    pub priority: u32,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Number of consecutive failures before marking unhealthy.
    pub failure_threshold: u32,

    /// Number of consecutive successes before marking healthy.
    pub success_threshold: u32,

    /// Blocks a healthy target may trail the best one before it is demoted.
    pub max_block_lag: Option<u64>,

    /// On-chain `gasLeft()` probe.
    pub secondary_metric: SecondaryMetricConfig,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_ms: 3_000,
            failure_threshold: 2,
            success_threshold: 1,
            max_block_lag: None,
            secondary_metric: SecondaryMetricConfig::default(),
        }
    }
}

/// Secondary liveness probe. Requires a `gasLeft()` contract on the target chain.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SecondaryMetricConfig {
    /// Run the probe at all.
    pub enabled: bool,

    /// Count a failed probe against the failure threshold.
    pub affects_health: bool,

    /// Address of the deployed contract.
    pub contract_address: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Metrics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve `/metrics`.
    pub enabled: bool,

    /// Metrics endpoint bind address.
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:9090".to_string(),
        }
    }
}
