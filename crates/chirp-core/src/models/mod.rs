//! Data models for the pipeline.
//!
//! One sub-module per domain entity. Catalog containers for these rows live
//! in the `chirp-catalog` crate.

mod recording;
mod spectrogram;

pub use recording::*;
pub use spectrogram::*;
