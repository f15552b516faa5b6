//! JSON-RPC failover proxy.
//!
//! # Responsibilities
//! - Walk the ranked target list for each inbound request
//! - Bound every attempt with the upstream timeout
//! - Return the first 2xx response unchanged
//! - Answer 502 once the retry budget or the target list runs out
//!
//! # Design Decisions
//! - The body is buffered once and replayed to every attempt
//! - Unhealthy targets stay in the list, ranked last, so a request is
//!   still attempted when every target is marked unhealthy

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::{ProxyConfig, TargetConfig};
use crate::health::HealthCheckManager;
use crate::http::request::{upstream_headers, X_REQUEST_ID};
use crate::http::response::{gateway_error, jsonrpc_id, mirror};
use crate::observability::metrics;
use crate::resilience::{is_retryable_status, RetryBudget};

const USER_AGENT: &str = "rpc-gateway";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Why a single upstream attempt was abandoned.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned {0}")]
    Status(StatusCode),
}

impl AttemptError {
    fn status_code(&self) -> u16 {
        match self {
            AttemptError::Transport(_) => StatusCode::BAD_GATEWAY.as_u16(),
            AttemptError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT.as_u16(),
            AttemptError::Status(status) => status.as_u16(),
        }
    }
}

struct Upstream {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// Forwards JSON-RPC requests to the best available target.
#[derive(Debug)]
pub struct Proxy {
    network: String,
    manager: Arc<HealthCheckManager>,
    client: reqwest::Client,
    config: ProxyConfig,
}

impl Proxy {
    pub fn new(config: ProxyConfig, manager: Arc<HealthCheckManager>) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProxyError::Client)?;

        Ok(Self {
            network: manager.network().to_string(),
            manager,
            client,
            config,
        })
    }

    pub fn manager(&self) -> &Arc<HealthCheckManager> {
        &self.manager
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Forward one request, failing over across ranked targets.
    pub async fn forward(&self, request_id: &str, headers: &HeaderMap, body: Bytes) -> Response {
        let ranked = self.manager.ranked_targets();
        let mut budget = RetryBudget::new(self.config.max_attempts, ranked.len());

        let mut outgoing = upstream_headers(headers);
        if let Ok(value) = HeaderValue::from_str(request_id) {
            outgoing.insert(X_REQUEST_ID, value);
        }

        let mut previous: Option<&TargetConfig> = None;
        while let Some(target) = budget.next_target(&ranked) {
            if let Some(failed) = previous {
                metrics::record_failover(&self.network, &failed.name);
            }

            let start = Instant::now();
            match self.attempt(target, &outgoing, body.clone()).await {
                Ok(upstream) => {
                    metrics::record_request(&self.network, &target.name, upstream.status.as_u16(), start);
                    tracing::debug!(
                        request_id = %request_id,
                        network = %self.network,
                        target = %target.name,
                        attempt = budget.attempts(),
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Request served"
                    );
                    return mirror(upstream.status, &upstream.headers, upstream.body);
                }
                Err(e) => {
                    metrics::record_request(&self.network, &target.name, e.status_code(), start);
                    tracing::warn!(
                        request_id = %request_id,
                        network = %self.network,
                        target = %target.name,
                        attempt = budget.attempts(),
                        error = %e,
                        "Upstream attempt failed"
                    );
                    previous = Some(target);
                }
            }
        }

        metrics::record_exhausted(&self.network);
        tracing::error!(
            request_id = %request_id,
            network = %self.network,
            attempts = budget.attempts(),
            targets = ranked.len(),
            "No upstream could serve the request"
        );
        gateway_error(
            StatusCode::BAD_GATEWAY,
            jsonrpc_id(&body),
            "all upstream targets failed",
        )
    }

    async fn attempt(
        &self,
        target: &TargetConfig,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Upstream, AttemptError> {
        let timeout = self.config.upstream_timeout();
        let request = self
            .client
            .post(&target.url)
            .headers(headers.clone())
            .body(body);

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(Upstream { status, headers, body })
        };

        let upstream = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(e)) => return Err(AttemptError::Transport(e.without_url().to_string())),
            Err(_) => return Err(AttemptError::Timeout(timeout)),
        };

        if is_retryable_status(upstream.status) {
            return Err(AttemptError::Status(upstream.status));
        }
        Ok(upstream)
    }
}
