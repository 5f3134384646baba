pub mod health;
pub mod metrics;
pub mod status;
pub mod upload;
pub mod webhook;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Where produced artifacts are served from.
pub struct StaticArtifacts<'a> {
    pub public_prefix: &'a str,
    pub output_dir: &'a Path,
}

/// Build the full HTTP surface.
pub fn router(
    state: AppState,
    prometheus: Arc<PrometheusHandle>,
    artifacts: StaticArtifacts<'_>,
    max_upload_bytes: usize,
) -> Router {
    let prefix = format!("/{}", artifacts.public_prefix.trim_matches('/'));

    Router::new()
        .route("/upload", post(upload::upload_csv))
        .route("/status/{request_id}", get(status::get_job_status))
        .route("/health", get(health::health_check))
        .route("/webhook", post(webhook::receive_webhook))
        .with_state(state)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(prometheus),
        )
        .nest_service(&prefix, ServeDir::new(artifacts.output_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}
