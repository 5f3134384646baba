use std::sync::Arc;
use uuid::Uuid;

use crate::models::row::{ImageOutcome, InputRecord, RowResult};
use crate::services::artifact_store::{ArtifactStore, ArtifactStoreError};
use crate::services::fetcher::{FetchError, ImageFetcher};
use crate::services::transcoder::{TranscodeError, Transcoder};

/// URL suffixes accepted as direct image links (compared lowercase).
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Fetches, recompresses and stores every image referenced by one row.
pub struct RowProcessor {
    fetcher: Arc<ImageFetcher>,
    transcoder: Transcoder,
    artifacts: Arc<dyn ArtifactStore>,
    placeholder_base: String,
}

impl RowProcessor {
    pub fn new(
        fetcher: Arc<ImageFetcher>,
        transcoder: Transcoder,
        artifacts: Arc<dyn ArtifactStore>,
        placeholder_base: &str,
    ) -> Self {
        Self {
            fetcher,
            transcoder,
            artifacts,
            placeholder_base: placeholder_base.trim_end_matches('/').to_string(),
        }
    }

    /// Process a row's images strictly in order.
    ///
    /// A failure at one position records the error sentinel there and moves
    /// on; the row itself never fails.
    pub async fn process_row(&self, job_id: Uuid, record: &InputRecord) -> RowResult {
        let input_urls = split_urls(&record.raw_url_text);
        tracing::info!(
            job_id = %job_id,
            serial = %record.serial_number,
            product = %record.product_label,
            url_count = input_urls.len(),
            "Processing row"
        );

        let mut outputs = Vec::with_capacity(input_urls.len());
        for (index, url) in input_urls.iter().enumerate() {
            let source = self.resolve_source(url, index);
            let outcome = match self
                .process_image(job_id, &record.product_label, index, &source)
                .await
            {
                Ok(public_ref) => {
                    metrics::counter!("images_processed_total").increment(1);
                    tracing::info!(job_id = %job_id, index, public_ref = %public_ref, "Stored compressed image");
                    ImageOutcome::Stored(public_ref)
                }
                Err(e) => {
                    metrics::counter!("images_failed_total", "kind" => e.kind()).increment(1);
                    tracing::error!(job_id = %job_id, index, url = %source, error = %e, "Image processing failed");
                    ImageOutcome::Failed
                }
            };
            outputs.push(outcome);
        }

        RowResult {
            serial_number: record.serial_number.clone(),
            product_label: record.product_label.clone(),
            input_urls,
            outputs,
        }
    }

    /// The URL actually fetched for position `index`.
    pub fn resolve_source(&self, url: &str, index: usize) -> String {
        if is_direct_image_url(url) {
            url.to_string()
        } else {
            let placeholder = placeholder_url(&self.placeholder_base, index);
            tracing::warn!(url = %url, placeholder = %placeholder, "Not a direct image URL, using placeholder");
            placeholder
        }
    }

    async fn process_image(
        &self,
        job_id: Uuid,
        label: &str,
        index: usize,
        url: &str,
    ) -> Result<String, ImageError> {
        let raw = self.fetcher.fetch(url).await?;

        let transcoder = self.transcoder;
        let encoded = tokio::task::spawn_blocking(move || transcoder.transcode(&raw))
            .await
            .map_err(|e| ImageError::Worker(e.to_string()))??;

        let filename = artifact_filename(job_id, label, index);
        Ok(self.artifacts.put_artifact(&filename, &encoded).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Store(#[from] ArtifactStoreError),

    #[error("Transcode task aborted: {0}")]
    Worker(String),
}

impl ImageError {
    fn kind(&self) -> &'static str {
        match self {
            ImageError::Fetch(_) => "network",
            ImageError::Transcode(_) | ImageError::Worker(_) => "decode",
            ImageError::Store(_) => "store",
        }
    }
}

/// Split on commas, trim, and drop empty entries, keeping order.
pub fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether the URL string ends in a recognized image extension.
///
/// The whole string is compared, so a trailing query string or fragment
/// disqualifies it while an extension inside the query qualifies it.
pub fn is_direct_image_url(url: &str) -> bool {
    let url = url.trim().to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| url.ends_with(ext))
}

/// Placeholder for position `index`. Keyed only by position, so the same
/// index resolves to the same placeholder in every row.
pub fn placeholder_url(base: &str, index: usize) -> String {
    format!("{}/{}/{}", base, 400 + index * 10, 300 + index * 10)
}

/// Replace every non-alphanumeric character with `_`.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn artifact_filename(job_id: Uuid, label: &str, index: usize) -> String {
    format!("{}_{}_{}.jpg", job_id, sanitize_label(label), index)
}
