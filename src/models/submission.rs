use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{Job, JobStatus};

/// Optional metadata accompanying an upload.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SubmissionMeta {
    #[garde(length(min = 1, max = 2048))]
    pub webhook_url: Option<String>,
}

/// Response after accepting an upload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub request_id: Uuid,
    pub message: String,
}

/// Response for querying job status.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub request_id: Uuid,
    pub status: JobStatus,
    pub compressed_images: Vec<String>,
    pub error: Option<String>,
    pub output_csv: Option<String>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            request_id: job.id,
            status: job.status,
            compressed_images: job.produced_artifacts,
            error: job.error,
            output_csv: job.result_table_ref,
        }
    }
}

/// Body posted to a caller's callback URL once a job completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub request_id: Uuid,
    pub status: JobStatus,
    pub compressed_images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_csv: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
