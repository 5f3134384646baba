use std::path::PathBuf;
use std::sync::Arc;

use crate::services::{job_store::JobStore, queue::JobQueue};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub queue: Arc<JobQueue>,
    pub upload_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(jobs: Arc<dyn JobStore>, queue: Arc<JobQueue>, upload_dir: PathBuf) -> Self {
        Self {
            jobs,
            queue,
            upload_dir: Arc::new(upload_dir),
        }
    }
}
