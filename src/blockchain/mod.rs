//! Blockchain probing subsystem.
//!
//! # Data Flow
//! ```text
//! TargetConfig (name, url)
//!     → client.rs (alloy provider, bounded calls)
//!     → eth_blockNumber / eth_call gasLeft()
//!     → types.rs (ProbeError, URL redaction)
//!     → health checker
//! ```
//!
//! # Security Constraints
//! - Provider URLs often embed API keys: never log or return them
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod types;

pub use client::{Probe, ProbeClient};
pub use types::{ProbeError, ProbeResult};
