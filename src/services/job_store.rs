use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::queries;
use crate::models::job::{Job, JobTransitionError, JobUpdate};

/// Read/write contract the pipeline needs from job persistence.
///
/// Each `update_job` call is applied as one unit; readers never observe a
/// half-applied update.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job_id: Uuid, callback_url: Option<&str>) -> Result<Job, StoreError>;

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<(), StoreError>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, job_id: Uuid, callback_url: Option<&str>) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job_id) {
            return Err(StoreError::Duplicate(job_id));
        }
        let job = Job::new(job_id, callback_url.map(str::to_string));
        jobs.insert(job_id, job.clone());
        Ok(job)
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        job.apply(update)?;
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// PostgreSQL-backed store.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, job_id: Uuid, callback_url: Option<&str>) -> Result<Job, StoreError> {
        Ok(queries::create_job(&self.pool, job_id, callback_url).await?)
    }

    async fn update_job(&self, job_id: Uuid, update: JobUpdate) -> Result<(), StoreError> {
        if queries::apply_update(&self.pool, job_id, &update).await? {
            return Ok(());
        }

        // Nothing matched: either unknown or already terminal.
        match queries::get_job(&self.pool, job_id).await? {
            Some(job) => Err(StoreError::Transition(JobTransitionError {
                job_id,
                status: job.status,
                attempted: update.target_status(),
            })),
            None => Err(StoreError::NotFound(job_id)),
        }
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(queries::get_job(&self.pool, job_id).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {0} already exists")]
    Duplicate(Uuid),

    #[error(transparent)]
    Transition(#[from] JobTransitionError),
}
