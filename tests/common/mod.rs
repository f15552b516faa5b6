//! Shared utilities for integration tests.
//!
//! A mock JSON-RPC upstream on an ephemeral port. Probe methods
//! (`eth_blockNumber`, `eth_call`) are answered from its settings; every
//! other method counts as a proxied request and echoes the upstream name.

#![allow(dead_code)]

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use rpc_gateway::config::{GatewayConfig, HealthCheckConfig, MetricsConfig, ProxyConfig, TargetConfig};
use rpc_gateway::observability::MetricsServer;

struct MockState {
    name: String,
    block: AtomicU64,
    gas_left: AtomicU64,
    status: AtomicU16,
    probe_failing: AtomicBool,
    delay_ms: AtomicU64,
    hits: AtomicUsize,
    probes: AtomicUsize,
}

/// A programmable JSON-RPC upstream.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockUpstream {
    pub async fn start(name: &str) -> Self {
        let state = Arc::new(MockState {
            name: name.to_string(),
            block: AtomicU64::new(100),
            gas_left: AtomicU64::new(0),
            status: AtomicU16::new(200),
            probe_failing: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            hits: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/", post(handle))
            .with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn set_block(&self, block: u64) {
        self.state.block.store(block, Ordering::SeqCst);
    }

    pub fn set_gas_left(&self, gas: u64) {
        self.state.gas_left.store(gas, Ordering::SeqCst);
    }

    /// Status returned for proxied (non-probe) requests.
    pub fn set_status(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    pub fn set_probe_failing(&self, failing: bool) {
        self.state.probe_failing.store(failing, Ordering::SeqCst);
    }

    /// Delay applied before answering any request.
    pub fn set_delay(&self, delay: Duration) {
        self.state.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Proxied (non-probe) requests received.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.state.probes.load(Ordering::SeqCst)
    }

    pub fn target(&self, priority: u32) -> TargetConfig {
        TargetConfig {
            name: self.name().to_string(),
            url: self.url(),
            priority,
        }
    }
}

async fn handle(State(state): State<Arc<MockState>>, body: Bytes) -> axum::response::Response {
    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();

    match method {
        "eth_blockNumber" | "eth_call" => {
            state.probes.fetch_add(1, Ordering::SeqCst);
            if state.probe_failing.load(Ordering::SeqCst) {
                return (StatusCode::INTERNAL_SERVER_ERROR, "probe failure").into_response();
            }
            let result = if method == "eth_blockNumber" {
                format!("{:#x}", state.block.load(Ordering::SeqCst))
            } else {
                format!("0x{:064x}", state.gas_left.load(Ordering::SeqCst))
            };
            Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response()
        }
        _ => {
            state.hits.fetch_add(1, Ordering::SeqCst);
            let status = StatusCode::from_u16(state.status.load(Ordering::SeqCst))
                .unwrap_or(StatusCode::OK);
            if !status.is_success() {
                return (status, format!("{} unavailable", state.name)).into_response();
            }
            Json(json!({ "jsonrpc": "2.0", "id": id, "result": state.name })).into_response()
        }
    }
}

pub fn disabled_metrics() -> Arc<MetricsServer> {
    Arc::new(MetricsServer::new(MetricsConfig {
        enabled: false,
        ..MetricsConfig::default()
    }))
}

/// Gateway config over the given targets, listening on an ephemeral port.
pub fn gateway_config(targets: Vec<TargetConfig>, max_attempts: u32) -> GatewayConfig {
    GatewayConfig {
        name: "testnet".to_string(),
        proxy: ProxyConfig {
            bind_address: "127.0.0.1:0".to_string(),
            upstream_timeout_ms: 500,
            max_attempts,
            ..ProxyConfig::default()
        },
        health_checks: HealthCheckConfig {
            interval_secs: 1,
            timeout_ms: 500,
            failure_threshold: 1,
            success_threshold: 1,
            ..HealthCheckConfig::default()
        },
        targets,
    }
}

pub fn rpc_request(method: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": [] })
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
