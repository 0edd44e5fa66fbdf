use std::collections::BTreeMap;

use chirp_core::{PipelineError, PipelineResult, Recording};
use chirp_storage::{keys, Storage, StorageError};
use serde::Serialize;

/// Table of raw-recording rows keyed by `recording_id`.
///
/// Append/merge only: re-runs upsert by id, nothing is ever deleted.
#[derive(Debug, Default, Clone)]
pub struct RecordingCatalog {
    rows: BTreeMap<String, Recording>,
}

/// Tabular view of a row, with the object key rendered as a store URI.
#[derive(Serialize)]
struct RecordingCsvRow<'a> {
    recording_id: &'a str,
    species_scientific_name: &'a str,
    species_common_name: &'a str,
    audio_s3_uri: String,
    recording_quality: &'a str,
    duration_seconds: f64,
    location: &'a str,
}

impl RecordingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the persisted catalog, or an empty one when none exists yet.
    pub async fn load(storage: &dyn Storage) -> PipelineResult<Self> {
        let data = match storage.get(keys::RECORDINGS_METADATA_JSON).await {
            Ok(data) => data,
            Err(StorageError::NotFound(_)) => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };

        let rows: Vec<Recording> = serde_json::from_slice(&data)
            .map_err(|e| PipelineError::Validation(format!("Invalid recordings metadata: {}", e)))?;

        let mut catalog = Self::new();
        for row in rows {
            catalog.upsert(row);
        }
        Ok(catalog)
    }

    /// Insert or replace the row with the same `recording_id`.
    pub fn upsert(&mut self, row: Recording) {
        self.rows.insert(row.recording_id.clone(), row);
    }

    pub fn get(&self, recording_id: &str) -> Option<&Recording> {
        self.rows.get(recording_id)
    }

    pub fn contains(&self, recording_id: &str) -> bool {
        self.rows.contains_key(recording_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in stable (id) order.
    pub fn rows(&self) -> impl Iterator<Item = &Recording> {
        self.rows.values()
    }

    /// Write the CSV and JSON representations from one snapshot.
    ///
    /// A failure here is fatal to the run: without the metadata write the
    /// store no longer reflects completed work.
    pub async fn persist(&self, storage: &dyn Storage) -> PipelineResult<()> {
        let snapshot: Vec<&Recording> = self.rows.values().collect();

        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| PipelineError::Persist(format!("recordings JSON: {}", e)))?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &snapshot {
            let audio_s3_uri = if row.audio_object_key.is_empty() {
                String::new()
            } else {
                storage.uri(&row.audio_object_key)
            };
            writer
                .serialize(RecordingCsvRow {
                    recording_id: &row.recording_id,
                    species_scientific_name: &row.species_scientific_name,
                    species_common_name: &row.species_common_name,
                    audio_s3_uri,
                    recording_quality: &row.quality,
                    duration_seconds: row.duration_seconds,
                    location: &row.location,
                })
                .map_err(|e| PipelineError::Persist(format!("recordings CSV: {}", e)))?;
        }
        let csv_bytes = writer
            .into_inner()
            .map_err(|e| PipelineError::Persist(format!("recordings CSV: {}", e)))?;

        storage
            .put(keys::RECORDINGS_METADATA_CSV, csv_bytes, "text/csv")
            .await
            .map_err(|e| PipelineError::Persist(e.to_string()))?;
        storage
            .put(keys::RECORDINGS_METADATA_JSON, json, "application/json")
            .await
            .map_err(|e| PipelineError::Persist(e.to_string()))?;

        tracing::info!(rows = self.rows.len(), "Persisted recording catalog");
        Ok(())
    }
}
