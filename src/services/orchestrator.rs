use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::models::job::{JobStatus, JobUpdate};
use crate::models::row::RowResult;
use crate::models::submission::WebhookPayload;
use crate::services::artifact_store::{ArtifactStore, ArtifactStoreError};
use crate::services::job_store::{JobStore, StoreError};
use crate::services::notifier::Notifier;
use crate::services::result_table::{self, ParsedRow, TableError};
use crate::services::row_processor::RowProcessor;

/// Drives one submitted table from PROCESSING to a terminal state.
///
/// Job store, artifact store and notifier are injected per instance.
pub struct Orchestrator {
    jobs: Arc<dyn JobStore>,
    artifacts: Arc<dyn ArtifactStore>,
    notifier: Arc<dyn Notifier>,
    rows: RowProcessor,
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct Completion {
    pub produced_artifacts: Vec<String>,
    pub result_table_ref: String,
    pub rows_processed: usize,
    pub rows_skipped: usize,
}

impl Orchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        artifacts: Arc<dyn ArtifactStore>,
        notifier: Arc<dyn Notifier>,
        rows: RowProcessor,
    ) -> Self {
        Self {
            jobs,
            artifacts,
            notifier,
            rows,
        }
    }

    /// Process the table at `input_path` for `job_id`.
    ///
    /// Outcomes are observable only through the job record. On success the
    /// callback target, if any, is notified once; its result is ignored.
    pub async fn run(&self, job_id: Uuid, input_path: &Path, callback_url: Option<&str>) {
        let start = Instant::now();
        tracing::info!(job_id = %job_id, input = %input_path.display(), "Starting batch job");

        match self.execute(job_id, input_path).await {
            Ok(completion) => {
                metrics::counter!("image_jobs_completed_total").increment(1);
                metrics::histogram!("job_processing_seconds").record(start.elapsed().as_secs_f64());
                tracing::info!(
                    job_id = %job_id,
                    rows_processed = completion.rows_processed,
                    rows_skipped = completion.rows_skipped,
                    artifacts = completion.produced_artifacts.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Batch job completed"
                );

                if let Some(target) = callback_url {
                    let payload = WebhookPayload {
                        request_id: job_id,
                        status: JobStatus::Completed,
                        compressed_images: completion.produced_artifacts,
                        output_csv: Some(completion.result_table_ref),
                    };
                    self.notifier.notify(target, &payload).await;
                }
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Batch job failed");
                self.fail(job_id, &e.to_string()).await;
            }
        }
    }

    /// Record a job-level failure. Used for pipeline errors and by the
    /// worker when a job task dies unexpectedly.
    ///
    /// Once the job is ERROR, any result table already written for it is
    /// removed; an ERROR job has none.
    pub async fn fail(&self, job_id: Uuid, message: &str) {
        metrics::counter!("image_jobs_failed_total").increment(1);
        if let Err(e) = self
            .jobs
            .update_job(
                job_id,
                JobUpdate::Failed {
                    error: message.to_string(),
                },
            )
            .await
        {
            tracing::error!(job_id = %job_id, error = %e, "Failed to record job error status");
            return;
        }
        if let Err(e) = self.artifacts.discard_result_table(job_id).await {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to remove orphaned result table");
        }
    }

    async fn execute(&self, job_id: Uuid, input_path: &Path) -> Result<Completion, PipelineError> {
        let bytes = tokio::fs::read(input_path)
            .await
            .map_err(|source| PipelineError::ReadInput {
                path: input_path.to_path_buf(),
                source,
            })?;

        let table = result_table::parse_input(&bytes)?;
        tracing::info!(job_id = %job_id, headers = ?table.headers, rows = table.rows.len(), "Parsed input table");

        let mut results: Vec<RowResult> = Vec::with_capacity(table.rows.len());
        let mut produced_artifacts = Vec::new();
        let mut rows_skipped = 0;

        for row in &table.rows {
            let record = match row {
                ParsedRow::Valid(record) => record,
                ParsedRow::Rejected { line, field_count } => {
                    rows_skipped += 1;
                    metrics::counter!("rows_skipped_total").increment(1);
                    tracing::warn!(
                        job_id = %job_id,
                        line,
                        field_count,
                        "Row has fewer than 3 columns, skipping"
                    );
                    continue;
                }
            };

            let result = self.rows.process_row(job_id, record).await;
            for artifact in result.produced_artifacts() {
                self.record_progress(job_id, artifact).await;
                produced_artifacts.push(artifact.to_string());
            }
            if result.failed_count() > 0 {
                tracing::warn!(
                    job_id = %job_id,
                    serial = %result.serial_number,
                    failed = result.failed_count(),
                    total = result.outputs.len(),
                    "Row finished with failed images"
                );
            }
            results.push(result);
        }

        let rendered = result_table::render_result_table(&results)?;
        let result_table_ref = self
            .artifacts
            .put_result_table(job_id, &rendered)
            .await
            .map_err(PipelineError::ResultTable)?;

        self.jobs
            .update_job(
                job_id,
                JobUpdate::Completed {
                    produced_artifacts: produced_artifacts.clone(),
                    result_table_ref: result_table_ref.clone(),
                },
            )
            .await?;

        Ok(Completion {
            produced_artifacts,
            result_table_ref,
            rows_processed: results.len(),
            rows_skipped,
        })
    }

    async fn record_progress(&self, job_id: Uuid, artifact: &str) {
        // The completion write carries the full list, so a missed progress
        // write only delays visibility.
        if let Err(e) = self
            .jobs
            .update_job(job_id, JobUpdate::ArtifactProduced(artifact.to_string()))
            .await
        {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to record job progress");
        }
    }
}

/// Errors that abort a whole job.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to read input {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Failed to write result table: {0}")]
    ResultTable(#[source] ArtifactStoreError),

    #[error("Failed to update job record: {0}")]
    Store(#[from] StoreError),
}
