//! JSON-RPC failover gateway library.

pub mod blockchain;
pub mod config;
pub mod gateway;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::{GatewayConfig, RootConfig};
pub use gateway::{GatewayError, RpcGateway};
pub use lifecycle::Shutdown;
