use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::submission::{ErrorResponse, JobStatusResponse};

/// GET /status/{request_id}: current status and artifacts of a job.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<JobStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Invalid Request ID".to_string(),
            }),
        )
    };

    let job_id = Uuid::parse_str(&request_id).map_err(|_| not_found())?;

    match state.jobs.get_job(job_id).await {
        Ok(Some(job)) => Ok(Json(job.into())),
        Ok(None) => Err(not_found()),
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Failed to load job");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to load job".to_string(),
                }),
            ))
        }
    }
}
