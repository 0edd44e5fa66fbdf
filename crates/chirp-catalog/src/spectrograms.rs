use std::collections::BTreeMap;

use crate::RecordingCatalog;
use chirp_core::{PipelineError, PipelineResult, Spectrogram, SpectrogramParams};
use chirp_storage::{keys, Storage, StorageError};
use serde::Serialize;

/// Table of derived-spectrogram rows keyed by (`recording_id`, params).
///
/// Rows hold a non-owning reference into the recording catalog; upserts of
/// rows referencing an unknown `recording_id` are rejected, so referential
/// integrity holds for everything that gets persisted.
#[derive(Debug, Default, Clone)]
pub struct SpectrogramCatalog {
    rows: BTreeMap<(String, String), Spectrogram>,
}

#[derive(Serialize)]
struct SpectrogramCsvRow<'a> {
    recording_id: &'a str,
    spectrogram_s3_uri: String,
    audio_s3_uri: String,
    spectrogram_params: String,
    image_width: u32,
    image_height: u32,
    sample_rate: u32,
    duration_seconds: f64,
    species_common_name: &'a str,
    species_scientific_name: &'a str,
}

impl SpectrogramCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the persisted catalog, or an empty one when none exists yet.
    pub async fn load(storage: &dyn Storage) -> PipelineResult<Self> {
        let data = match storage.get(keys::SPECTROGRAMS_METADATA_JSON).await {
            Ok(data) => data,
            Err(StorageError::NotFound(_)) => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };

        let rows: Vec<Spectrogram> = serde_json::from_slice(&data).map_err(|e| {
            PipelineError::Validation(format!("Invalid spectrograms metadata: {}", e))
        })?;

        let mut catalog = Self::new();
        for row in rows {
            catalog.rows.insert(row.identity_key(), row);
        }
        Ok(catalog)
    }

    /// Insert or replace the row with the same identity, after validating
    /// the referenced recording exists and the image dimensions are sane.
    pub fn upsert(
        &mut self,
        row: Spectrogram,
        recordings: &RecordingCatalog,
    ) -> PipelineResult<()> {
        if !recordings.contains(&row.recording_id) {
            return Err(PipelineError::Validation(format!(
                "Spectrogram references unknown recording_id {}",
                row.recording_id
            )));
        }
        if row.image_width == 0 || row.image_height == 0 {
            return Err(PipelineError::Validation(format!(
                "Spectrogram for {} has empty image dimensions",
                row.recording_id
            )));
        }

        self.rows.insert(row.identity_key(), row);
        Ok(())
    }

    /// Idempotency probe: is there already an entry for this recording under
    /// these params?
    pub fn contains(&self, recording_id: &str, params: &SpectrogramParams) -> bool {
        self.rows
            .contains_key(&(recording_id.to_string(), params.fingerprint()))
    }

    pub fn get(&self, recording_id: &str, params: &SpectrogramParams) -> Option<&Spectrogram> {
        self.rows
            .get(&(recording_id.to_string(), params.fingerprint()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Spectrogram> {
        self.rows.values()
    }

    /// Write the CSV and JSON representations from one snapshot.
    pub async fn persist(&self, storage: &dyn Storage) -> PipelineResult<()> {
        let snapshot: Vec<&Spectrogram> = self.rows.values().collect();

        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| PipelineError::Persist(format!("spectrograms JSON: {}", e)))?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &snapshot {
            let params_json = serde_json::to_string(&row.params)
                .map_err(|e| PipelineError::Persist(format!("spectrogram params: {}", e)))?;
            writer
                .serialize(SpectrogramCsvRow {
                    recording_id: &row.recording_id,
                    spectrogram_s3_uri: storage.uri(&row.spectrogram_object_key),
                    audio_s3_uri: storage.uri(&row.audio_object_key),
                    spectrogram_params: params_json,
                    image_width: row.image_width,
                    image_height: row.image_height,
                    sample_rate: row.params.sample_rate,
                    duration_seconds: row.duration_seconds,
                    species_common_name: &row.species_common_name,
                    species_scientific_name: &row.species_scientific_name,
                })
                .map_err(|e| PipelineError::Persist(format!("spectrograms CSV: {}", e)))?;
        }
        let csv_bytes = writer
            .into_inner()
            .map_err(|e| PipelineError::Persist(format!("spectrograms CSV: {}", e)))?;

        storage
            .put(keys::SPECTROGRAMS_METADATA_CSV, csv_bytes, "text/csv")
            .await
            .map_err(|e| PipelineError::Persist(e.to_string()))?;
        storage
            .put(keys::SPECTROGRAMS_METADATA_JSON, json, "application/json")
            .await
            .map_err(|e| PipelineError::Persist(e.to_string()))?;

        tracing::info!(rows = self.rows.len(), "Persisted spectrogram catalog");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_core::Recording;
    use chirp_storage::LocalStorage;
    use chrono::Utc;
    use tempfile::tempdir;

    fn recording(id: &str) -> Recording {
        Recording {
            recording_id: id.to_string(),
            species_scientific_name: "Hylocichla mustelina".to_string(),
            species_common_name: "Wood Thrush".to_string(),
            audio_object_key: format!("raw-audio/wood_thrush/{}.mp3", id),
            quality: "B".to_string(),
            duration_seconds: 31.5,
            location: "Ithaca, New York".to_string(),
            country: "United States".to_string(),
            ingested_at: Utc::now(),
        }
    }

    fn spectrogram(id: &str, params: SpectrogramParams) -> Spectrogram {
        Spectrogram {
            recording_id: id.to_string(),
            spectrogram_object_key: format!("spectrograms/wood_thrush/{}.png", id),
            audio_object_key: format!("raw-audio/wood_thrush/{}.mp3", id),
            params,
            image_width: 1292,
            image_height: 128,
            duration_seconds: 31.5,
            species_common_name: "Wood Thrush".to_string(),
            species_scientific_name: "Hylocichla mustelina".to_string(),
        }
    }

    fn recordings_with(ids: &[&str]) -> RecordingCatalog {
        let mut catalog = RecordingCatalog::new();
        for id in ids {
            catalog.upsert(recording(id));
        }
        catalog
    }

    #[test]
    fn upsert_rejects_unknown_recording_id() {
        let recordings = recordings_with(&["XC1"]);
        let mut catalog = SpectrogramCatalog::new();

        let result = catalog.upsert(spectrogram("XC999", Default::default()), &recordings);
        assert!(matches!(result, Err(PipelineError::Validation(_))));
        assert!(catalog.is_empty());
    }

    #[test]
    fn upsert_is_keyed_by_recording_and_params() {
        let recordings = recordings_with(&["XC1"]);
        let mut catalog = SpectrogramCatalog::new();

        let params = SpectrogramParams::default();
        catalog.upsert(spectrogram("XC1", params), &recordings).unwrap();
        catalog.upsert(spectrogram("XC1", params), &recordings).unwrap();
        assert_eq!(catalog.len(), 1);

        // A params change is a new identity, not an overwrite.
        let mut narrow = params;
        narrow.n_mels = 64;
        catalog.upsert(spectrogram("XC1", narrow), &recordings).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("XC1", &params));
        assert!(catalog.contains("XC1", &narrow));
    }

    #[test]
    fn upsert_rejects_empty_dimensions() {
        let recordings = recordings_with(&["XC1"]);
        let mut catalog = SpectrogramCatalog::new();

        let mut row = spectrogram("XC1", Default::default());
        row.image_width = 0;
        assert!(matches!(
            catalog.upsert(row, &recordings),
            Err(PipelineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn persist_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();
        let recordings = recordings_with(&["XC1", "XC2"]);

        let mut catalog = SpectrogramCatalog::new();
        catalog
            .upsert(spectrogram("XC1", Default::default()), &recordings)
            .unwrap();
        catalog
            .upsert(spectrogram("XC2", Default::default()), &recordings)
            .unwrap();
        catalog.persist(&storage).await.unwrap();

        let loaded = SpectrogramCatalog::load(&storage).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains("XC1", &Default::default()));
        assert_eq!(
            loaded.get("XC1", &Default::default()).unwrap().image_height,
            128
        );
    }

    #[tokio::test]
    async fn csv_carries_params_as_json() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();
        let recordings = recordings_with(&["XC1"]);

        let mut catalog = SpectrogramCatalog::new();
        catalog
            .upsert(spectrogram("XC1", Default::default()), &recordings)
            .unwrap();
        catalog.persist(&storage).await.unwrap();

        let csv_bytes = storage.get(keys::SPECTROGRAMS_METADATA_CSV).await.unwrap();
        let csv_text = String::from_utf8(csv_bytes).unwrap();
        assert!(csv_text.starts_with(
            "recording_id,spectrogram_s3_uri,audio_s3_uri,spectrogram_params,image_width,\
             image_height,sample_rate,duration_seconds,species_common_name,species_scientific_name"
        ));
        assert!(csv_text.contains("\"\"n_fft\"\":2048"));
    }
}
