//! Chirp Catalog Library
//!
//! In-memory tables of [`Recording`](chirp_core::Recording) and
//! [`Spectrogram`](chirp_core::Spectrogram) rows with the shared catalog
//! discipline: `load`, `upsert` (replace by primary key), and `persist`.
//!
//! `persist` writes both a CSV representation (authoritative for tabular
//! consumption) and a JSON representation (authoritative for structured
//! fields such as spectrogram params) from one in-memory snapshot in the
//! same call, so the two can never diverge. `load` reads the JSON
//! representation back; a missing metadata object yields an empty catalog.

mod recordings;
mod spectrograms;

pub use recordings::RecordingCatalog;
pub use spectrograms::SpectrogramCatalog;
