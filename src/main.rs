//! RPC Failover Gateway
//!
//! Fronts a set of equivalent JSON-RPC providers per network, keeps them
//! under active health checks and fails requests over to the best
//! available one.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────── RPC GATEWAY (per network) ──────────────────┐
//!                     │                                                                       │
//!   JSON-RPC request  │  ┌─────────┐    ┌─────────┐    ┌──────────────┐                      │
//!  ───────────────────┼─▶│  http   │───▶│  proxy  │───▶│ retry budget │─── attempt ─────────┼──▶ Provider A
//!                     │  │ server  │    │         │    │  (failover)  │─── attempt ─────────┼──▶ Provider B
//!                     │  └─────────┘    └────┬────┘    └──────────────┘                      │
//!                     │                      │ ranked_targets()                              │
//!                     │                      ▼                                               │
//!                     │               ┌──────────────┐    ┌────────────────┐                 │
//!                     │               │    health    │───▶│ health checker │─── probe ───────┼──▶ eth_blockNumber
//!                     │               │   manager    │    │  (per target)  │                 │    gasLeft()
//!                     │               └──────────────┘    └────────────────┘                 │
//!                     └───────────────────────────────────────────────────────────────────────┘
//!          shared: config · lifecycle (signals, shutdown) · observability (logs, /metrics)
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use rpc_gateway::config::{load_gateway_config, load_root_config, resolve_gateway_path, GatewayEntry};
use rpc_gateway::lifecycle::{signals, Shutdown, ShutdownSignal};
use rpc_gateway::observability::{logging, MetricsServer};
use rpc_gateway::RpcGateway;

#[derive(Parser, Debug)]
#[command(name = "rpc-gateway", version, about = "JSON-RPC failover gateway")]
struct Cli {
    /// Root configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let root = load_root_config(&cli.config)?;
    logging::init_logging(&root.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        gateways = root.gateways.len(),
        "rpc-gateway starting"
    );

    let metrics = Arc::new(MetricsServer::new(root.metrics.clone()));
    metrics.start().await?;

    let shutdown = Shutdown::new();
    let mut tasks = Vec::with_capacity(root.gateways.len());
    for entry in &root.gateways {
        let path = resolve_gateway_path(&cli.config, entry);
        tasks.push(tokio::spawn(run_gateway(
            entry.clone(),
            path,
            Arc::clone(&metrics),
            shutdown.subscribe(),
        )));
    }

    signals::shutdown_on_signal(&shutdown).await;
    tracing::info!("Shutting down");

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Gateway task failed");
        }
    }
    if let Err(e) = metrics.stop().await {
        tracing::error!(error = %e, "Metrics server failed to stop");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Run one gateway until shutdown. Failures are logged and confined to it.
async fn run_gateway(
    entry: GatewayEntry,
    path: PathBuf,
    metrics: Arc<MetricsServer>,
    mut shutdown: ShutdownSignal,
) {
    let config = match load_gateway_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(gateway = %entry.name, error = %e, "Failed to load gateway config");
            return;
        }
    };

    let gateway = match RpcGateway::new(config, metrics) {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!(gateway = %entry.name, error = %e, "Failed to build gateway");
            return;
        }
    };

    if gateway.start().await.is_err() {
        if let Err(e) = gateway.stop().await {
            tracing::error!(gateway = %entry.name, error = %e, "Failed to tear down gateway");
        }
        return;
    }

    shutdown.recv().await;
    if let Err(e) = gateway.stop().await {
        tracing::error!(gateway = %entry.name, error = %e, "Gateway failed to stop cleanly");
    }
}
