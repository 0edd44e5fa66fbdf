//! Chirp Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration, and
//! run summaries shared across all chirp components.

pub mod config;
pub mod error;
pub mod models;
pub mod species;
pub mod storage_types;
pub mod summary;

// Re-export commonly used types
pub use config::Config;
pub use error::{PipelineError, PipelineResult};
pub use models::{Recording, Spectrogram, SpectrogramParams};
pub use species::species_slug;
pub use storage_types::StorageBackend;
pub use summary::{RunSummary, StageSummary};
