//! HTTP exporter for scan metrics.
//!
//! `/metrics` serves the Prometheus text format; `/health` reports whether
//! a scan currently holds the camera, as JSON.

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors from the metrics exporter.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be opened.
    #[error("failed to bind metrics listener: {0}")]
    Bind(#[from] std::io::Error),
    /// The server stopped with an error.
    #[error("metrics server failed: {0}")]
    Server(String),
}

/// Where the exporter listens.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    /// Listens on localhost at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], port)),
        }
    }
}

/// Serves a shared [`MetricsRegistry`] over HTTP.
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: Arc<MetricsRegistry>,
}

impl MetricsServer {
    /// Creates an exporter for `registry`.
    pub fn new(config: MetricsServerConfig, registry: Arc<MetricsRegistry>) -> Self {
        Self { config, registry }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(serve_metrics))
            .route("/health", get(serve_health))
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.registry))
    }

    /// Binds and serves until the runtime shuts down.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Metrics exporter listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServerError::Server(e.to_string()))
    }
}

async fn serve_metrics(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    match registry.encode() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body),
        Err(e) => {
            tracing::warn!(error = %e, "Metrics encoding failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                e.to_string(),
            )
        }
    }
}

async fn serve_health(State(registry): State<Arc<MetricsRegistry>>) -> Json<serde_json::Value> {
    Json(health_report(&registry.snapshot()))
}

fn health_report(snapshot: &MetricsSnapshot) -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "scanning": snapshot.session_active,
        "sessions": snapshot.sessions,
        "confirmations": snapshot.confirmations,
        "device_errors": snapshot.device_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_is_loopback() {
        let config = MetricsServerConfig::default();
        assert_eq!(config.bind_addr.port(), 9090);
        assert!(config.bind_addr.ip().is_loopback());
    }

    #[test]
    fn test_health_report_reflects_session() {
        let report = health_report(&MetricsSnapshot {
            sessions: 3,
            session_active: true,
            confirmations: 2,
            ..Default::default()
        });
        assert_eq!(report["status"], "ok");
        assert_eq!(report["scanning"], true);
        assert_eq!(report["sessions"], 3);
        assert_eq!(report["device_errors"], 0);
    }
}
