use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use docparse_api::app_state::AppState;
use docparse_api::build_router;
use docparse_api::config::AppConfig;
use docparse_api::services::{parser::LlamaParseClient, retention::spawn_retention_sweeper};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing document parser API");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "parse_jobs_submitted_total",
        "Total documents accepted for parsing"
    );
    metrics::describe_counter!(
        "parse_jobs_completed_total",
        "Total parse jobs completed"
    );
    metrics::describe_counter!(
        "parse_jobs_failed_total",
        "Total parse jobs that ended in error"
    );
    metrics::describe_counter!(
        "parse_jobs_evicted_total",
        "Total finished jobs removed by the retention sweeper"
    );
    metrics::describe_histogram!(
        "parse_processing_seconds",
        "Time from staging an upload to recording its result"
    );
    metrics::describe_gauge!(
        "parse_jobs_tracked",
        "Current number of jobs held in memory"
    );

    let pipeline_settings = config.pipeline_settings();
    if pipeline_settings.api_key.is_none() {
        tracing::warn!("LLAMA_CLOUD_API_KEY is not set, every parse job will fail");
    }

    // Initialize LlamaParse client
    tracing::info!(base_url = %config.llama_cloud_base_url, "Initializing LlamaParse client");
    let parser = Arc::new(LlamaParseClient::new(config.parser_settings()));

    // Create shared application state
    let state = AppState::new(parser, pipeline_settings);

    let retention = config
        .job_retention()
        .expect("JOB_RETENTION_SECS was validated at load");
    match retention {
        Some(retention) => {
            spawn_retention_sweeper(
                Arc::clone(&state.registry),
                retention,
                config.job_sweep_interval(),
            );
        }
        None => tracing::info!("Job retention disabled, finished jobs are kept for the process lifetime"),
    }

    let app = build_router(state, Some(prometheus_handle), config.max_upload_bytes);

    let bind_addr = config.bind_addr();
    tracing::info!("Starting document parser API on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
