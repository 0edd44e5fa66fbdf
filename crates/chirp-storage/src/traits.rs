//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must
//! implement. The pipeline stages depend only on this trait, never on a
//! concrete backend.

use async_trait::async_trait;
use chirp_core::{PipelineError, StorageBackend};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => PipelineError::NotFound(key),
            StorageError::InvalidKey(msg) => PipelineError::Validation(msg),
            StorageError::ConfigError(msg) => PipelineError::Config(msg),
            other => PipelineError::Transient(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Content-addressed key/value storage with the four capabilities the
/// pipeline needs: put, get, existence probe, and list-by-prefix. Keys are
/// paths under the store root (see the crate root documentation).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` at `key`, overwriting any existing object.
    /// Returns the object's URI.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String>;

    /// Fetch the full object at `key`. Missing keys return
    /// [`StorageError::NotFound`].
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Existence probe, used for idempotent skip-if-exists checks.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List all keys under `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// URI for a key (e.g. `s3://bucket/key`), without touching the store.
    fn uri(&self, key: &str) -> String;

    /// The backend type serving this store.
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_pipeline_taxonomy() {
        let err: PipelineError = StorageError::NotFound("metadata/x.json".into()).into();
        assert!(matches!(err, PipelineError::NotFound(_)));

        let err: PipelineError = StorageError::UploadFailed("timeout".into()).into();
        assert!(err.is_transient());

        let err: PipelineError = StorageError::InvalidKey("../escape".into()).into();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
