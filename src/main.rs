mod blocks;
mod collector;
mod config;
mod constants;
mod format;
mod models;
mod price;
mod routes;
mod rpc;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use tracing::info;

use crate::config::{load_config, AppConfig};
use crate::routes::{get_blocks, get_metrics, health, service_info};
use crate::rpc::RpcClient;

/// CLI arguments
#[derive(Parser)]
#[command(
    name = "solana-validator-exporter",
    about = "Solana validator Prometheus exporter"
)]
struct Cli {
    /// IP address to bind the server to
    #[arg(long)]
    listen_ip: Option<String>,

    /// Port to bind the server to
    #[arg(long)]
    port: Option<u16>,
}

/// Shared, immutable per-process state handed to every handler.
pub struct AppState {
    pub config: AppConfig,
    pub rpc: RpcClient,
    pub http: reqwest::Client,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "solana_validator_exporter=info".to_string()),
        )
        .init();

    let args = Cli::parse();
    let mut config = load_config().context("failed to load configuration")?;

    if let Some(ip) = args.listen_ip {
        config.server.listen_ip = Some(ip);
    }
    if let Some(port) = args.port {
        config.server.port = Some(port);
    }
    config.validate()?;

    // One pooled HTTP client for the whole process; every RPC and price call
    // shares it, and it is released when main returns.
    let http = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Duration::from_secs(300))
        .pool_max_idle_per_host(config.max_connections)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(constants::CONNECT_TIMEOUT_SECS))
        .user_agent(concat!(
            "solana-validator-exporter/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .context("failed to create HTTP client")?;

    let state = Arc::new(AppState {
        rpc: RpcClient::new(http.clone()),
        http,
        config: config.clone(),
    });

    let app = Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/blocks", get(get_blocks))
        .with_state(state);

    let ip = config
        .server
        .listen_ip
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let port = config.server.port.unwrap_or(8080);
    let addr: SocketAddr = format!("{}:{}", ip, port)
        .parse()
        .context("invalid listen address")?;

    info!("exporter listening on http://{addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("exporter shutdown complete");
    Ok(())
}

/// Waits for ctrl-c so the serve loop can drain and resources drop cleanly.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
