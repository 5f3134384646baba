use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:5000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string. Jobs are kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Directory for uploaded input tables and generated result tables
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Directory for recompressed images
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// URL path prefix under which artifacts are served
    #[serde(default = "default_public_path_prefix")]
    pub public_path_prefix: String,

    /// Per-image download timeout
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// JPEG quality used when re-encoding (0-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Image service used in place of URLs that are not direct images
    #[serde(default = "default_placeholder_base_url")]
    pub placeholder_base_url: String,

    /// Number of background workers draining the job queue
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Maximum number of submitted jobs waiting for a worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Request body limit for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("static/compressed_images")
}

fn default_public_path_prefix() -> String {
    "/static/compressed_images".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_jpeg_quality() -> u8 {
    50
}

fn default_placeholder_base_url() -> String {
    "https://picsum.photos".to_string()
}

fn default_worker_count() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_url: None,
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            public_path_prefix: default_public_path_prefix(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            jpeg_quality: default_jpeg_quality(),
            placeholder_base_url: default_placeholder_base_url(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}
