//! HTTP surface: service info, liveness, the scrape endpoint, and the
//! leader-slot window.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::collector;
use crate::format;
use crate::AppState;

pub async fn service_info() -> Json<Value> {
    Json(json!({
        "name": "Solana Validator Exporter",
        "version": env!("CARGO_PKG_VERSION"),
        "metrics_path": "/metrics",
        "health_path": "/health",
        "blocks_path": "/blocks",
    }))
}

/// Liveness only; deliberately does not touch the RPC endpoints.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    let start = Instant::now();

    match scrape(&state).await {
        Ok(mut body) => {
            let duration = start.elapsed().as_secs_f64();
            body.push_str(&format!(
                "# HELP solana_exporter_scrape_duration_seconds Time spent scraping metrics\n\
                 # TYPE solana_exporter_scrape_duration_seconds gauge\n\
                 solana_exporter_scrape_duration_seconds {duration:.3}\n"
            ));
            body.push_str(&format!(
                "# HELP solana_exporter_scrape_timestamp_seconds Unix timestamp of last scrape\n\
                 # TYPE solana_exporter_scrape_timestamp_seconds gauge\n\
                 solana_exporter_scrape_timestamp_seconds {}\n",
                Utc::now().timestamp()
            ));
            info!("metrics scraped successfully in {duration:.2}s");

            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!("error generating metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("# Error generating metrics: {e}\n"),
            )
                .into_response()
        }
    }
}

async fn scrape(state: &AppState) -> anyhow::Result<String> {
    let data = collector::collect(state).await;
    format::render(&data, &state.config)
}

pub async fn get_blocks(State(state): State<Arc<AppState>>) -> Response {
    match crate::blocks::leader_slot_window(&state.rpc, &state.config).await {
        Ok(window) => Json(window).into_response(),
        Err(e) => {
            error!("error building leader slot window: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_liveness_without_rpc() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn service_info_lists_endpoint_paths() {
        let Json(body) = service_info().await;
        assert_eq!(body["name"], "Solana Validator Exporter");
        assert_eq!(body["metrics_path"], "/metrics");
        assert_eq!(body["health_path"], "/health");
        assert_eq!(body["blocks_path"], "/blocks");
    }
}
