use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::JobUpdate;
use crate::models::submission::{ErrorResponse, SubmissionMeta, SubmitResponse};
use crate::services::queue::QueuedJob;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

/// POST /upload: accept a product table and schedule it for processing.
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut file: Option<UploadedFile> = None;
    let mut meta = SubmissionMeta::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
                file = Some(UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some("webhookUrl") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
                let text = text.trim();
                if !text.is_empty() {
                    meta.webhook_url = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No file part"))?;
    if file.filename.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No file selected"));
    }
    meta.validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid webhookUrl: {}", e)))?;

    let job_id = Uuid::new_v4();
    let input_path = state
        .upload_dir
        .join(format!("{}_{}", job_id, secure_filename(&file.filename)));

    let saved = async {
        tokio::fs::create_dir_all(state.upload_dir.as_path()).await?;
        tokio::fs::write(&input_path, &file.bytes).await
    }
    .await;
    saved.map_err(|e| {
        tracing::error!(error = %e, path = %input_path.display(), "Failed to save upload");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Invalid file format or upload failed")
    })?;

    state
        .jobs
        .create_job(job_id, meta.webhook_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!(job_id = %job_id, error = %e, "Failed to create job record");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create job")
        })?;

    metrics::counter!("image_jobs_submitted_total").increment(1);

    if let Err(e) = state.queue.enqueue(QueuedJob {
        job_id,
        input_path: input_path.clone(),
        callback_url: meta.webhook_url.clone(),
    }) {
        tracing::warn!(job_id = %job_id, error = %e, "Rejecting upload, job queue unavailable");
        metrics::counter!("image_jobs_failed_total").increment(1);
        if let Err(store_err) = state
            .jobs
            .update_job(job_id, JobUpdate::Failed { error: e.to_string() })
            .await
        {
            tracing::error!(job_id = %job_id, error = %store_err, "Failed to record job error status");
        }
        if let Err(io_err) = tokio::fs::remove_file(&input_path).await {
            tracing::warn!(job_id = %job_id, error = %io_err, path = %input_path.display(), "Failed to remove rejected upload");
        }
        return Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()));
    }

    tracing::info!(
        job_id = %job_id,
        filename = %file.filename,
        bytes = file.bytes.len(),
        webhook = meta.webhook_url.is_some(),
        "Upload accepted, processing scheduled"
    );

    Ok(Json(SubmitResponse {
        request_id: job_id,
        message: "File Uploaded Successfully, Processing Started".to_string(),
    }))
}

/// Reduce a client-supplied filename to a safe single path component.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload.csv".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("products.csv"), "products.csv");
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\my list.csv"), "my_list.csv");
        assert_eq!(secure_filename(".hidden"), "hidden");
        assert_eq!(secure_filename("..."), "upload.csv");
    }
}
