use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod health;
pub mod metrics;
pub mod parse;
pub mod status;

/// Build the HTTP API. The `/metrics` route is only mounted when a
/// Prometheus recorder has been installed.
pub fn build_router(
    state: AppState,
    prometheus: Option<Arc<PrometheusHandle>>,
    max_upload_bytes: usize,
) -> Router {
    let mut app = Router::new()
        .route("/", get(health::health_check))
        .route("/health", get(health::health_check))
        .route("/parse", post(parse::parse_document))
        .route("/status/{job_id}", get(status::get_job_status))
        .with_state(state);

    if let Some(handle) = prometheus {
        app = app.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        );
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}
