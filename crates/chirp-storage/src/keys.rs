//! Shared key generation for storage backends.
//!
//! All object-store keys are produced here so the layout stays consistent
//! between the ingest and derive stages.

use chirp_core::species_slug;

pub const RECORDINGS_METADATA_CSV: &str = "metadata/recordings_metadata.csv";
pub const RECORDINGS_METADATA_JSON: &str = "metadata/recordings_metadata.json";
pub const SPECTROGRAMS_METADATA_CSV: &str = "metadata/spectrograms_metadata.csv";
pub const SPECTROGRAMS_METADATA_JSON: &str = "metadata/spectrograms_metadata.json";

/// Key for a raw audio blob: `raw-audio/{species_slug}/{recording_id}.mp3`.
pub fn audio_key(species_common_name: &str, recording_id: &str) -> String {
    format!(
        "raw-audio/{}/{}.mp3",
        species_slug(species_common_name),
        recording_id
    )
}

/// Key for a derived image: `spectrograms/{species_slug}/{recording_id}.png`.
pub fn spectrogram_key(species_common_name: &str, recording_id: &str) -> String {
    format!(
        "spectrograms/{}/{}.png",
        species_slug(species_common_name),
        recording_id
    )
}

/// Prefix holding all audio for one species.
pub fn species_audio_prefix(species_common_name: &str) -> String {
    format!("raw-audio/{}/", species_slug(species_common_name))
}
