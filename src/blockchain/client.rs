//! Probe client for a single upstream RPC provider.
//!
//! # Responsibilities
//! - Query the provider's chain head (`eth_blockNumber`)
//! - Optionally run an `eth_call` against a `gasLeft()` contract
//! - Bound every call with the configured timeout
//! - Never let the provider URL (and its API key) reach an error message

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};
use alloy::transports::http::{reqwest, Http};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::blockchain::types::{redact_url, ProbeError, ProbeResult};
use crate::config::{SecondaryMetricConfig, TargetConfig};

const USER_AGENT: &str = "rpc-gateway-health-check";

sol! {
    /// Returns the gas remaining at the point of the call.
    function gasLeft() external view returns (uint256);
}

/// The two calls a health checker needs from an upstream.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Latest block number reported by the upstream.
    async fn block_number(&self) -> ProbeResult<u64>;

    /// Secondary on-chain liveness metric.
    async fn secondary_metric(&self) -> ProbeResult<u64>;
}

/// alloy-backed probe for one target.
#[derive(Clone)]
pub struct ProbeClient {
    name: String,
    url: Url,
    provider: Arc<dyn Provider + Send + Sync>,
    gas_left_contract: Option<Address>,
    timeout_duration: Duration,
}

impl ProbeClient {
    /// Create a probe client. Parses the URL but does not connect.
    pub fn new(
        target: &TargetConfig,
        secondary: &SecondaryMetricConfig,
        timeout_duration: Duration,
    ) -> ProbeResult<Self> {
        let url: Url = target
            .url
            .parse()
            .map_err(|_| ProbeError::InvalidUrl(target.name.clone()))?;

        let gas_left_contract = if secondary.enabled {
            let address = secondary
                .contract_address
                .parse::<Address>()
                .map_err(|_| ProbeError::InvalidContract(secondary.contract_address.clone()))?;
            Some(address)
        } else {
            None
        };

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout_duration)
            .build()
            .map_err(|e| ProbeError::Client(redact_url(&e.to_string(), &url)))?;
        let transport = Http::with_client(http_client, url.clone());
        let provider = ProviderBuilder::new().connect_client(RpcClient::new(transport, false));

        Ok(Self {
            name: target.name.clone(),
            url,
            provider: Arc::new(provider),
            gas_left_contract,
            timeout_duration,
        })
    }

    /// Target name this client probes.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn rpc_error(&self, e: impl std::fmt::Display) -> ProbeError {
        ProbeError::Rpc(redact_url(&e.to_string(), &self.url))
    }
}

#[async_trait]
impl Probe for ProbeClient {
    async fn block_number(&self) -> ProbeResult<u64> {
        match timeout(self.timeout_duration, self.provider.get_block_number()).await {
            Ok(Ok(block)) => Ok(block),
            Ok(Err(e)) => Err(self.rpc_error(e)),
            Err(_) => Err(ProbeError::Timeout(self.timeout_duration)),
        }
    }

    async fn secondary_metric(&self) -> ProbeResult<u64> {
        let Some(contract) = self.gas_left_contract else {
            return Err(ProbeError::Client("secondary metric disabled".to_string()));
        };

        let tx = TransactionRequest::default()
            .with_to(contract)
            .with_input(gasLeftCall {}.abi_encode());

        let output = match timeout(self.timeout_duration, self.provider.call(tx)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(self.rpc_error(e)),
            Err(_) => return Err(ProbeError::Timeout(self.timeout_duration)),
        };

        let gas = U256::abi_decode(&output).map_err(|e| ProbeError::Decode(e.to_string()))?;
        Ok(gas.saturating_to::<u64>())
    }
}

impl std::fmt::Debug for ProbeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeClient")
            .field("name", &self.name)
            .field("host", &self.url.host_str())
            .field("timeout", &self.timeout_duration)
            .field("secondary_metric", &self.gas_left_contract.is_some())
            .finish()
    }
}
