//! Shared test harness: a local HTTP server standing in for remote image
//! hosts and callback receivers, plus a fully wired pipeline over temp dirs.

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use image_batch_pipeline::models::job::Job;
use image_batch_pipeline::models::submission::WebhookPayload;
use image_batch_pipeline::services::{
    artifact_store::{ArtifactStore, LocalDiskStore},
    fetcher::ImageFetcher,
    job_store::{JobStore, MemoryJobStore},
    notifier::WebhookNotifier,
    orchestrator::Orchestrator,
    row_processor::RowProcessor,
    transcoder::Transcoder,
};

/// Fetch timeout used by test pipelines; `slow*` images take longer.
pub const TEST_FETCH_TIMEOUT: Duration = Duration::from_millis(500);
const SLOW_RESPONSE: Duration = Duration::from_secs(3);

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 128]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([20, 120, 220]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

#[derive(Clone, Default)]
struct FixtureState {
    requests: Arc<Mutex<Vec<String>>>,
    webhooks: Arc<Mutex<Vec<WebhookPayload>>>,
}

/// Local server for image downloads and webhook deliveries.
///
/// `/images/{name}` behaves by name prefix: `missing*` is a 404, `slow*`
/// outlives the test fetch timeout, `garbage*` returns non-image bytes,
/// anything else is a small image (JPEG for .jpg/.jpeg, PNG otherwise).
/// `/placeholder/{w}/{h}` serves a PNG and `/hook` records payloads.
pub struct FixtureServer {
    pub addr: SocketAddr,
    state: FixtureState,
}

impl FixtureServer {
    pub async fn spawn() -> Self {
        let state = FixtureState::default();
        let app = Router::new()
            .route("/images/{name}", get(serve_image))
            .route("/placeholder/{width}/{height}", get(serve_placeholder))
            .route("/hook", post(record_webhook))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn image_url(&self, name: &str) -> String {
        self.url(&format!("/images/{}", name))
    }

    pub fn placeholder_base(&self) -> String {
        self.url("/placeholder")
    }

    pub fn hook_url(&self) -> String {
        self.url("/hook")
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn webhooks(&self) -> Vec<WebhookPayload> {
        self.state.webhooks.lock().unwrap().clone()
    }
}

async fn serve_image(State(state): State<FixtureState>, Path(name): Path<String>) -> Response {
    state.requests.lock().unwrap().push(format!("/images/{}", name));
    let lower = name.to_lowercase();

    if lower.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if lower.starts_with("slow") {
        tokio::time::sleep(SLOW_RESPONSE).await;
    }
    if lower.starts_with("garbage") {
        return (StatusCode::OK, "definitely not an image").into_response();
    }

    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        ([("content-type", "image/jpeg")], jpeg_bytes(24, 16)).into_response()
    } else {
        ([("content-type", "image/png")], png_bytes(24, 16)).into_response()
    }
}

async fn serve_placeholder(
    State(state): State<FixtureState>,
    Path((width, height)): Path<(u32, u32)>,
) -> Response {
    state
        .requests
        .lock()
        .unwrap()
        .push(format!("/placeholder/{}/{}", width, height));
    ([("content-type", "image/png")], png_bytes(width / 10, height / 10)).into_response()
}

async fn record_webhook(
    State(state): State<FixtureState>,
    Json(payload): Json<WebhookPayload>,
) -> StatusCode {
    state.webhooks.lock().unwrap().push(payload);
    StatusCode::OK
}

/// Orchestrator wired to in-memory jobs and temp-dir storage.
pub struct Pipeline {
    pub jobs: Arc<MemoryJobStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub dir: TempDir,
}

impl Pipeline {
    pub fn new(server: &FixtureServer) -> Self {
        Self::with_stores(
            server,
            |jobs| jobs as Arc<dyn JobStore>,
            |disk| Arc::new(disk) as Arc<dyn ArtifactStore>,
        )
    }

    /// Like `new`, but the orchestrator sees the stores through the given
    /// wrappers. `jobs` stays the unwrapped backing store for assertions.
    pub fn with_stores(
        server: &FixtureServer,
        wrap_jobs: impl FnOnce(Arc<MemoryJobStore>) -> Arc<dyn JobStore>,
        wrap_artifacts: impl FnOnce(LocalDiskStore) -> Arc<dyn ArtifactStore>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let jobs = Arc::new(MemoryJobStore::new());
        let artifacts = wrap_artifacts(LocalDiskStore::new(
            dir.path().join("compressed"),
            dir.path().join("uploads"),
            "/static/compressed_images",
        ));

        let rows = RowProcessor::new(
            Arc::new(ImageFetcher::new(TEST_FETCH_TIMEOUT).unwrap()),
            Transcoder::new(50),
            artifacts.clone(),
            &server.placeholder_base(),
        );
        let orchestrator = Orchestrator::new(
            wrap_jobs(jobs.clone()),
            artifacts,
            Arc::new(WebhookNotifier::new(Duration::from_secs(2)).unwrap()),
            rows,
        );

        Self {
            jobs,
            orchestrator: Arc::new(orchestrator),
            dir,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("compressed")
    }

    /// Write `csv` to disk, create the job, and run it to completion.
    pub async fn run_csv(&self, csv: &[u8], callback_url: Option<&str>) -> Job {
        let (job_id, input_path) = self.submit_csv(csv, callback_url).await;
        self.orchestrator.run(job_id, &input_path, callback_url).await;

        self.jobs.get_job(job_id).await.unwrap().unwrap()
    }

    /// Write `csv` to disk and create its job without running it.
    pub async fn submit_csv(&self, csv: &[u8], callback_url: Option<&str>) -> (Uuid, PathBuf) {
        let job_id = Uuid::new_v4();
        let input_path = self.dir.path().join(format!("{}_input.csv", job_id));
        std::fs::write(&input_path, csv).unwrap();

        self.jobs.create_job(job_id, callback_url).await.unwrap();
        (job_id, input_path)
    }

    /// Poll the backing store until the job leaves PROCESSING.
    pub async fn wait_for_terminal(&self, job_id: Uuid) -> Job {
        for _ in 0..100 {
            let job = self.jobs.get_job(job_id).await.unwrap().unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("job {} did not finish in time", job_id);
    }
}

/// Read a result table as rows of fields, header included.
pub fn read_result_table(path: &str) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}
