//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! root config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → for each [[gateways]] entry:
//!         gateway config file → loader.rs → validation.rs
//!     → GatewayConfig (validated, immutable)
//!     → handed to the gateway, shared by value/Arc with subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_gateway_config, load_root_config, resolve_gateway_path, ConfigError};
pub use schema::{
    GatewayConfig, GatewayEntry, HealthCheckConfig, LogFormat, MetricsConfig,
    ObservabilityConfig, ProxyConfig, RootConfig, SecondaryMetricConfig, TargetConfig,
};
pub use validation::{validate_gateway, validate_root, ValidationError};
