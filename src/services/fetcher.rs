use reqwest::Client;
use std::time::Duration;

/// HTTP client that downloads one image at a time under a fixed timeout.
pub struct ImageFetcher {
    http: Client,
    timeout: Duration,
}

impl ImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("image-batch-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { http, timeout })
    }

    /// Download the raw bytes behind `url`. No retries.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(url, e))?;
        Ok(bytes.to_vec())
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs_f64(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: f64 },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
