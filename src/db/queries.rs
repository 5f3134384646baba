use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus, JobUpdate};

/// Insert a new job in the PROCESSING state
pub async fn create_job(
    pool: &PgPool,
    job_id: Uuid,
    callback_url: Option<&str>,
) -> Result<Job, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO image_jobs (id, status, callback_url)
        VALUES ($1, 'PROCESSING', $2)
        RETURNING id, status, produced_artifacts, error, result_table_ref, callback_url,
                  created_at, updated_at
        "#,
    )
    .bind(job_id)
    .bind(callback_url)
    .fetch_one(pool)
    .await?;

    job_from_row(&row)
}

/// Get a job by ID
pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, status, produced_artifacts, error, result_table_ref, callback_url,
               created_at, updated_at
        FROM image_jobs
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// Apply an update to a job that is still PROCESSING.
///
/// Returns `false` when no row matched, i.e. the job is unknown or already
/// terminal. Each statement is a single atomic UPDATE.
pub async fn apply_update(
    pool: &PgPool,
    job_id: Uuid,
    update: &JobUpdate,
) -> Result<bool, sqlx::Error> {
    let result = match update {
        JobUpdate::ArtifactProduced(artifact) => {
            sqlx::query(
                r#"
                UPDATE image_jobs
                SET produced_artifacts = array_append(produced_artifacts, $2),
                    updated_at = NOW()
                WHERE id = $1 AND status = 'PROCESSING'
                "#,
            )
            .bind(job_id)
            .bind(artifact)
            .execute(pool)
            .await?
        }
        JobUpdate::Completed {
            produced_artifacts,
            result_table_ref,
        } => {
            sqlx::query(
                r#"
                UPDATE image_jobs
                SET status = 'COMPLETED',
                    produced_artifacts = $2,
                    result_table_ref = $3,
                    updated_at = NOW()
                WHERE id = $1 AND status = 'PROCESSING'
                "#,
            )
            .bind(job_id)
            .bind(produced_artifacts)
            .bind(result_table_ref)
            .execute(pool)
            .await?
        }
        JobUpdate::Failed { error } => {
            sqlx::query(
                r#"
                UPDATE image_jobs
                SET status = 'ERROR',
                    error = $2,
                    updated_at = NOW()
                WHERE id = $1 AND status = 'PROCESSING'
                "#,
            )
            .bind(job_id)
            .bind(error)
            .execute(pool)
            .await?
        }
    };

    Ok(result.rows_affected() == 1)
}

fn job_from_row(row: &PgRow) -> Result<Job, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::from_str(&status_str).map_err(|e| sqlx::Error::ColumnDecode {
        index: "status".to_string(),
        source: Box::new(e),
    })?;

    Ok(Job {
        id: row.try_get("id")?,
        status,
        produced_artifacts: row.try_get("produced_artifacts")?,
        error: row.try_get("error")?,
        result_table_ref: row.try_get("result_table_ref")?,
        callback_url: row.try_get("callback_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
