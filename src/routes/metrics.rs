use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the pipeline's metrics.
pub fn describe_metrics() {
    metrics::describe_counter!("image_jobs_submitted_total", "Batch jobs accepted by /upload");
    metrics::describe_counter!("image_jobs_completed_total", "Batch jobs that reached COMPLETED");
    metrics::describe_counter!("image_jobs_failed_total", "Batch jobs that reached ERROR");
    metrics::describe_counter!("images_processed_total", "Images fetched, recompressed and stored");
    metrics::describe_counter!("images_failed_total", "Images recorded with the error sentinel");
    metrics::describe_counter!("rows_skipped_total", "Input rows dropped for having fewer than 3 fields");
    metrics::describe_counter!("webhook_failures_total", "Completion callbacks that could not be delivered");
    metrics::describe_histogram!("job_processing_seconds", "Wall time from job start to completion");
    metrics::describe_gauge!("image_job_queue_depth", "Jobs waiting for a worker");
}
