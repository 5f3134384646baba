use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::services::orchestrator::Orchestrator;

/// Work item handed from the upload handler to a background worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedJob {
    pub job_id: Uuid,
    pub input_path: PathBuf,
    pub callback_url: Option<String>,
}

/// Bounded in-process job queue.
///
/// Submitters never wait: when the queue is full `enqueue` fails right away
/// and the caller decides what to do with the job.
pub struct JobQueue {
    sender: mpsc::Sender<QueuedJob>,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    capacity: usize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            capacity,
        }
    }

    /// Enqueue a job for the worker pool.
    pub fn enqueue(&self, job: QueuedJob) -> Result<(), QueueError> {
        match self.sender.try_send(job) {
            Ok(()) => {
                metrics::gauge!("image_job_queue_depth").set(self.depth() as f64);
                Ok(())
            }
            Err(TrySendError::Full(job)) => Err(QueueError::Full(job.job_id)),
            Err(TrySendError::Closed(job)) => Err(QueueError::Closed(job.job_id)),
        }
    }

    /// Wait for the next job. Returns `None` once every sender is gone.
    pub async fn dequeue(&self) -> Option<QueuedJob> {
        let job = self.receiver.lock().await.recv().await;
        metrics::gauge!("image_job_queue_depth").set(self.depth() as f64);
        job
    }

    /// Number of jobs waiting for a worker.
    pub fn depth(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Start `count` workers that drain `queue` through `orchestrator`.
///
/// Each job runs in its own task so a panic inside the job body is caught
/// here and recorded as a job error instead of killing the worker.
pub fn spawn_workers(
    count: usize,
    queue: Arc<JobQueue>,
    orchestrator: Arc<Orchestrator>,
) -> Vec<JoinHandle<()>> {
    (0..count.max(1))
        .map(|worker_id| {
            let queue = queue.clone();
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                tracing::info!(worker_id, "Worker ready");
                while let Some(job) = queue.dequeue().await {
                    run_job(worker_id, &orchestrator, job).await;
                }
                tracing::info!(worker_id, "Job queue closed, worker exiting");
            })
        })
        .collect()
}

async fn run_job(worker_id: usize, orchestrator: &Arc<Orchestrator>, job: QueuedJob) {
    let job_id = job.job_id;
    tracing::debug!(worker_id, job_id = %job_id, "Picked up job");

    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .run(job.job_id, &job.input_path, job.callback_url.as_deref())
                .await;
        })
    };

    if let Err(e) = task.await {
        tracing::error!(worker_id, job_id = %job_id, error = %e, "Job task aborted");
        orchestrator
            .fail(job_id, &format!("Worker crashed while processing job: {}", e))
            .await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Job queue is full; job {0} was not scheduled")]
    Full(Uuid),

    #[error("Job queue is closed; job {0} was not scheduled")]
    Closed(Uuid),
}
