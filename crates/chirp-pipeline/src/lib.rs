//! Chirp Pipeline Library
//!
//! The two ETL stages and everything between them:
//!
//! - [`Ingestor`] drives provider pagination, downloads audio, and fills the
//!   recording catalog.
//! - [`SpectrogramDeriver`] turns stored audio into fixed-parameter
//!   mel-spectrogram PNGs and fills the spectrogram catalog, skipping
//!   already-derived entries so re-runs are idempotent.
//!
//! Both stages catch per-item failures at the item boundary and convert them
//! to skip-and-log outcomes; only catalog persistence failures abort a run.

pub mod derive;
pub mod dsp;
pub mod ingest;
pub mod retry;

pub use derive::SpectrogramDeriver;
pub use ingest::Ingestor;
