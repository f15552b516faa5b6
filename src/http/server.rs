//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: `POST /` proxies, `GET /health` reports
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind, serve in the background, shut down gracefully

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::health::TargetStatus;
use crate::http::proxy::Proxy;
use crate::http::request::request_id;
use crate::lifecycle::Shutdown;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Serialize)]
struct HealthReport {
    network: String,
    healthy: usize,
    targets: Vec<TargetStatus>,
}

struct Running {
    shutdown: Shutdown,
    task: JoinHandle<Result<(), std::io::Error>>,
    local_addr: SocketAddr,
}

/// HTTP front end for one gateway.
pub struct HttpServer {
    router: Router,
    bind_address: String,
    running: Mutex<Option<Running>>,
}

impl HttpServer {
    pub fn new(proxy: Arc<Proxy>) -> Self {
        let bind_address = proxy.config().bind_address.clone();
        let router = Self::build_router(proxy);
        Self {
            router,
            bind_address,
            running: Mutex::new(None),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(proxy: Arc<Proxy>) -> Router {
        let config = proxy.config().clone();
        Router::new()
            .route("/", post(proxy_handler))
            .route("/health", get(health_handler))
            .with_state(proxy)
            .layer(DefaultBodyLimit::max(config.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(config.request_timeout())),
            )
    }

    /// Bind and serve in the background. A no-op when already running.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut running = self.running.lock().await;
        if let Some(r) = running.as_ref() {
            return Ok(r.local_addr);
        }

        let addr: SocketAddr = self
            .bind_address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.bind_address.clone()))?;
        let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
            address: self.bind_address.clone(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;

        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        let app = self.router.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.recv().await })
                .await
        });

        tracing::info!(address = %local_addr, "HTTP server listening");
        *running = Some(Running {
            shutdown,
            task,
            local_addr,
        });
        Ok(local_addr)
    }

    /// Stop accepting connections and drain in-flight requests.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };
        running.shutdown.trigger();
        running.task.await?.map_err(ServerError::Serve)?;
        tracing::info!(address = %running.local_addr, "HTTP server stopped");
        Ok(())
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }
}

async fn proxy_handler(State(proxy): State<Arc<Proxy>>, headers: HeaderMap, body: Bytes) -> Response {
    let id = request_id(&headers);
    proxy.forward(&id, &headers, body).await
}

/// 200 while at least one target is healthy, 503 otherwise.
async fn health_handler(State(proxy): State<Arc<Proxy>>) -> Response {
    let manager = proxy.manager();
    let targets = manager.statuses();
    let healthy = targets.iter().filter(|t| t.state.is_healthy).count();
    let status = if healthy > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let report = HealthReport {
        network: manager.network().to_string(),
        healthy,
        targets,
    };
    (status, Json(report)).into_response()
}
