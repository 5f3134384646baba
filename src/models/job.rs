use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of a batch image job.
///
/// `Processing` is the only non-terminal state; a job never leaves
/// `Completed` or `Error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// One submitted batch and everything the pipeline has recorded about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub produced_artifacts: Vec<String>,
    pub error: Option<String>,
    pub result_table_ref: Option<String>,
    pub callback_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied atomically to a stored job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    /// Progress: one more artifact was stored while processing.
    ArtifactProduced(String),
    Completed {
        produced_artifacts: Vec<String>,
        result_table_ref: String,
    },
    Failed {
        error: String,
    },
}

impl JobUpdate {
    pub fn target_status(&self) -> JobStatus {
        match self {
            JobUpdate::ArtifactProduced(_) => JobStatus::Processing,
            JobUpdate::Completed { .. } => JobStatus::Completed,
            JobUpdate::Failed { .. } => JobStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("job {job_id} is already {status}; cannot apply {attempted} update")]
pub struct JobTransitionError {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub attempted: JobStatus,
}

impl Job {
    pub fn new(id: Uuid, callback_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Processing,
            produced_artifacts: Vec::new(),
            error: None,
            result_table_ref: None,
            callback_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update, refusing anything that would move a terminal job.
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), JobTransitionError> {
        if self.status.is_terminal() {
            return Err(JobTransitionError {
                job_id: self.id,
                status: self.status,
                attempted: update.target_status(),
            });
        }

        match update {
            JobUpdate::ArtifactProduced(artifact) => {
                self.produced_artifacts.push(artifact);
            }
            JobUpdate::Completed {
                produced_artifacts,
                result_table_ref,
            } => {
                self.status = JobStatus::Completed;
                self.produced_artifacts = produced_artifacts;
                self.result_table_ref = Some(result_table_ref);
            }
            JobUpdate::Failed { error } => {
                self.status = JobStatus::Error;
                self.error = Some(error);
            }
        }

        self.updated_at = Utc::now();
        Ok(())
    }
}
