use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Persists recompressed images and generated result tables.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store an image under `filename` and return its public reference.
    async fn put_artifact(&self, filename: &str, bytes: &[u8]) -> Result<String, ArtifactStoreError>;

    /// Store the result table for a job and return its reference.
    async fn put_result_table(&self, job_id: Uuid, bytes: &[u8]) -> Result<String, ArtifactStoreError>;

    /// Remove a result table written for a job that did not complete.
    /// Removing a table that is already gone is not an error.
    async fn discard_result_table(&self, job_id: Uuid) -> Result<(), ArtifactStoreError>;
}

/// Local filesystem store; artifacts are later served statically from `output_dir`.
pub struct LocalDiskStore {
    output_dir: PathBuf,
    table_dir: PathBuf,
    public_prefix: String,
}

impl LocalDiskStore {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        table_dir: impl Into<PathBuf>,
        public_prefix: &str,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            table_dir: table_dir.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Create the backing directories if missing.
    pub async fn ensure_dirs(&self) -> Result<(), ArtifactStoreError> {
        for dir in [&self.output_dir, &self.table_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ArtifactStoreError::Io {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn public_ref(&self, filename: &str) -> String {
        format!("{}/{}", self.public_prefix, filename)
    }

    fn result_table_path(&self, job_id: Uuid) -> PathBuf {
        self.table_dir.join(format!("{}_output.csv", job_id))
    }

    async fn write(&self, path: PathBuf, bytes: &[u8]) -> Result<(), ArtifactStoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ArtifactStoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| ArtifactStoreError::Io { path, source })
    }
}

#[async_trait]
impl ArtifactStore for LocalDiskStore {
    async fn put_artifact(&self, filename: &str, bytes: &[u8]) -> Result<String, ArtifactStoreError> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(ArtifactStoreError::InvalidName(filename.to_string()));
        }
        self.write(self.output_dir.join(filename), bytes).await?;
        Ok(self.public_ref(filename))
    }

    async fn put_result_table(&self, job_id: Uuid, bytes: &[u8]) -> Result<String, ArtifactStoreError> {
        let path = self.result_table_path(job_id);
        self.write(path.clone(), bytes).await?;
        Ok(path.display().to_string())
    }

    async fn discard_result_table(&self, job_id: Uuid) -> Result<(), ArtifactStoreError> {
        let path = self.result_table_path(job_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ArtifactStoreError::Io { path, source }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactStoreError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to store artifact under name {0:?}")]
    InvalidName(String),
}
