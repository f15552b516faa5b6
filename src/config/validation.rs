//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check targets are unique and reachable by URL scheme
//! - Validate value ranges (timeouts > 0, thresholds >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function over the parsed config

use std::collections::HashSet;
use std::net::SocketAddr;

use alloy::primitives::Address;
use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RootConfig};

/// A single semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no targets configured")]
    NoTargets,

    #[error("duplicate target name '{0}'")]
    DuplicateTarget(String),

    #[error("target '{name}' has an invalid url: {reason}")]
    InvalidTargetUrl { name: String, reason: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("secondary metric contract address '{0}' is invalid")]
    InvalidContractAddress(String),

    #[error("no gateways configured")]
    NoGateways,
}

/// Validate a gateway configuration.
pub fn validate_gateway(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.targets.is_empty() {
        errors.push(ValidationError::NoTargets);
    }

    let mut names = HashSet::new();
    for target in &config.targets {
        if !names.insert(target.name.as_str()) {
            errors.push(ValidationError::DuplicateTarget(target.name.clone()));
        }
        // Never echo the URL itself, it may carry an API key.
        match Url::parse(&target.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::InvalidTargetUrl {
                name: target.name.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidTargetUrl {
                name: target.name.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if config.proxy.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.proxy.bind_address.clone()));
    }

    let hc = &config.health_checks;
    let positive = [
        ("proxy.upstream_timeout_ms", config.proxy.upstream_timeout_ms),
        ("proxy.request_timeout_secs", config.proxy.request_timeout_secs),
        ("health_checks.interval_secs", hc.interval_secs),
        ("health_checks.timeout_ms", hc.timeout_ms),
        ("health_checks.failure_threshold", u64::from(hc.failure_threshold)),
        ("health_checks.success_threshold", u64::from(hc.success_threshold)),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if hc.secondary_metric.enabled
        && hc.secondary_metric.contract_address.parse::<Address>().is_err()
    {
        errors.push(ValidationError::InvalidContractAddress(
            hc.secondary_metric.contract_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the root configuration.
pub fn validate_root(config: &RootConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.gateways.is_empty() {
        errors.push(ValidationError::NoGateways);
    }
    if config.metrics.enabled && config.metrics.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.metrics.bind_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
