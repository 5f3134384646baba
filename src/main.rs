use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use image_batch_pipeline::app_state::AppState;
use image_batch_pipeline::config::AppConfig;
use image_batch_pipeline::db;
use image_batch_pipeline::routes::{self, StaticArtifacts};
use image_batch_pipeline::services::{
    artifact_store::{ArtifactStore, LocalDiskStore},
    fetcher::ImageFetcher,
    job_store::{JobStore, MemoryJobStore, PgJobStore},
    notifier::WebhookNotifier,
    orchestrator::Orchestrator,
    queue::{self, JobQueue},
    row_processor::RowProcessor,
    transcoder::Transcoder,
};

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

    tracing::info!("Initializing image-batch-pipeline server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    // Job store: PostgreSQL when configured, otherwise in-process
    let jobs: Arc<dyn JobStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to PostgreSQL database");
            let db_pool = db::init_pool(database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running database migrations");
            db::run_migrations(&db_pool)
                .await
                .expect("Failed to run database migrations");

            Arc::new(PgJobStore::new(db_pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, job records are kept in memory");
            Arc::new(MemoryJobStore::new())
        }
    };

    // Artifact storage on local disk
    let disk_store = LocalDiskStore::new(
        &config.output_dir,
        &config.upload_dir,
        &config.public_path_prefix,
    );
    disk_store
        .ensure_dirs()
        .await
        .expect("Failed to create upload/output directories");
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(disk_store);

    let fetcher = ImageFetcher::new(config.fetch_timeout()).expect("Failed to build image fetcher");
    let notifier =
        WebhookNotifier::new(config.fetch_timeout()).expect("Failed to build webhook client");

    let rows = RowProcessor::new(
        Arc::new(fetcher),
        Transcoder::new(config.jpeg_quality),
        artifacts.clone(),
        &config.placeholder_base_url,
    );
    let orchestrator = Arc::new(Orchestrator::new(
        jobs.clone(),
        artifacts,
        Arc::new(notifier),
        rows,
    ));

    // Bounded queue drained by a fixed worker pool
    let job_queue = Arc::new(JobQueue::new(config.queue_capacity));
    queue::spawn_workers(config.worker_count, job_queue.clone(), orchestrator);
    tracing::info!(
        workers = config.worker_count,
        queue_capacity = config.queue_capacity,
        "Worker pool started"
    );

    let state = AppState::new(jobs, job_queue, config.upload_dir.clone());
    let app = routes::router(
        state,
        prometheus_handle,
        StaticArtifacts {
            public_prefix: &config.public_path_prefix,
            output_dir: &config.output_dir,
        },
        config.max_upload_bytes,
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
