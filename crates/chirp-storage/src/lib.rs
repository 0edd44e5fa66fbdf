//! Chirp Storage Library
//!
//! Object-store abstraction and implementations for the pipeline: the
//! [`Storage`] trait plus S3 (via `object_store`) and local-filesystem
//! backends.
//!
//! # Key layout
//!
//! All backends share one key layout, centralized in the [`keys`] module:
//!
//! - `raw-audio/{species_slug}/{recording_id}.mp3`
//! - `spectrograms/{species_slug}/{recording_id}.png`
//! - `metadata/recordings_metadata.{csv,json}`
//! - `metadata/spectrograms_metadata.{csv,json}`
//!
//! Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
pub mod local;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use chirp_core::StorageBackend;
pub use factory::create_storage;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
