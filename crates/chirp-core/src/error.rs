//! Error taxonomy for the pipeline.
//!
//! Per-item failures are converted to a skip-and-log outcome at the item
//! boundary; only `Persist` and `Config` abort a run.

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Network/API/object-store hiccup. Retried with bounded backoff.
    #[error("transient I/O error: {0}")]
    Transient(String),

    /// A referenced object-store key or API resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Audio bytes that fail to decode. Skipped, never retried.
    #[error("corrupt input: {0}")]
    CorruptInput(String),

    /// Referential or field-shape violation. Rejected at write time.
    #[error("validation error: {0}")]
    Validation(String),

    /// Catalog metadata could not be written back to the store.
    #[error("catalog persistence failed: {0}")]
    Persist(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether the operation that produced this error may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Transient(_))
    }

    /// Whether this error must abort the whole run rather than skip one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Persist(_) | PipelineError::Config(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
