//! Chirp Provider Library
//!
//! Wraps the external recording metadata/audio provider behind the
//! [`RecordingProvider`] capability trait. The shipped implementation talks
//! to the Xeno-canto public API v3; tests substitute stub implementations.

pub mod descriptor;
pub mod xeno_canto;

use async_trait::async_trait;
use chirp_core::PipelineError;
use thiserror::Error;

pub use descriptor::{parse_length_seconds, RecordingDescriptor, RecordingPage};
pub use xeno_canto::XenoCantoProvider;

/// Provider operation errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API request failed: {0}")]
    Request(String),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<ProviderError> for PipelineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(what) => PipelineError::NotFound(what),
            ProviderError::Malformed(msg) => PipelineError::Validation(msg),
            ProviderError::Config(msg) => PipelineError::Config(msg),
            ProviderError::Request(msg) => PipelineError::Transient(msg),
            ProviderError::Status { status, body } => {
                // Server-side and throttling failures are worth retrying;
                // anything else means the request itself is wrong.
                if status >= 500 || status == 429 {
                    PipelineError::Transient(format!("status {}: {}", status, body))
                } else {
                    PipelineError::Validation(format!("status {}: {}", status, body))
                }
            }
        }
    }
}

/// Capability interface for the external metadata/audio provider.
///
/// One paginated search call per page; exhaustion is signaled by an empty
/// page. Pagination may repeat items across page boundaries — callers must
/// deduplicate by recording id.
#[async_trait]
pub trait RecordingProvider: Send + Sync {
    /// Fetch one page of recording descriptors for a species common name.
    /// Pages are 1-indexed.
    async fn search_page(
        &self,
        species_common_name: &str,
        page: u32,
    ) -> ProviderResult<RecordingPage>;

    /// Download the audio blob behind a descriptor's URL.
    async fn download_audio(&self, url: &str) -> ProviderResult<Vec<u8>>;
}
