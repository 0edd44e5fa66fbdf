//! Ingest stage: provider pagination → audio download → object store → catalog.

use std::collections::HashSet;
use std::sync::Arc;

use chirp_catalog::RecordingCatalog;
use chirp_core::{Config, PipelineResult, Recording, StageSummary};
use chirp_provider::{RecordingDescriptor, RecordingProvider};
use chirp_storage::{keys, Storage};
use chrono::Utc;

use crate::retry::with_backoff;

/// Drives metadata acquisition and audio storage for a species list.
///
/// Failure policy: transient provider/storage errors are retried with
/// bounded backoff; a recording whose download still fails is kept in the
/// catalog with an empty audio key and the batch continues. Only catalog
/// persistence failures abort the run.
pub struct Ingestor {
    provider: Arc<dyn RecordingProvider>,
    storage: Arc<dyn Storage>,
    target_per_species: usize,
    max_attempts: u32,
}

impl Ingestor {
    pub fn new(
        provider: Arc<dyn RecordingProvider>,
        storage: Arc<dyn Storage>,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            storage,
            target_per_species: config.recordings_per_species,
            max_attempts: config.download_max_attempts,
        }
    }

    /// Ingest up to the configured number of recordings per species,
    /// checkpointing the catalog after each species completes.
    pub async fn ingest(
        &self,
        species_list: &[String],
        catalog: &mut RecordingCatalog,
    ) -> PipelineResult<StageSummary> {
        let mut summary = StageSummary::default();

        for species in species_list {
            let descriptors = self.collect_descriptors(species).await?;
            tracing::info!(
                species = %species,
                count = descriptors.len(),
                "Collected recording descriptors"
            );

            for descriptor in descriptors {
                self.ingest_one(species, descriptor, catalog, &mut summary)
                    .await?;
            }

            // Checkpoint: a crash mid-run loses at most one species' progress.
            catalog.persist(self.storage.as_ref()).await?;
        }

        Ok(summary)
    }

    /// Page through the provider until the target count is reached or the
    /// provider is exhausted, deduplicating by recording id (pagination may
    /// repeat boundary items).
    async fn collect_descriptors(
        &self,
        species: &str,
    ) -> PipelineResult<Vec<RecordingDescriptor>> {
        let mut seen = HashSet::new();
        let mut collected = Vec::new();
        let mut page = 1u32;

        loop {
            let result = with_backoff("metadata search", self.max_attempts, || async move {
                self.provider
                    .search_page(species, page)
                    .await
                    .map_err(Into::into)
            })
            .await;

            let page_data = match result {
                Ok(data) => data,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        species = %species,
                        page,
                        error = %err,
                        "Abandoning pagination for species"
                    );
                    break;
                }
            };

            if page_data.is_empty() {
                break;
            }

            for descriptor in page_data.recordings {
                if collected.len() >= self.target_per_species {
                    break;
                }
                if seen.insert(descriptor.recording_id.clone()) {
                    collected.push(descriptor);
                }
            }

            if collected.len() >= self.target_per_species {
                break;
            }
            if page_data.num_pages != 0 && page >= page_data.num_pages {
                break;
            }
            page += 1;
        }

        Ok(collected)
    }

    async fn ingest_one(
        &self,
        species: &str,
        descriptor: RecordingDescriptor,
        catalog: &mut RecordingCatalog,
        summary: &mut StageSummary,
    ) -> PipelineResult<()> {
        let common_name = if descriptor.common_name.is_empty() {
            species.to_string()
        } else {
            descriptor.common_name.clone()
        };
        let audio_key = keys::audio_key(&common_name, &descriptor.recording_id);

        // Idempotent storage: a recording whose blob already made it into the
        // store is not downloaded again.
        if let Some(existing) = catalog.get(&descriptor.recording_id) {
            if existing.has_audio()
                && self
                    .storage
                    .exists(&existing.audio_object_key)
                    .await
                    .unwrap_or(false)
            {
                summary.skipped_existing += 1;
                return Ok(());
            }
        }

        let make_row = |audio_object_key: String| Recording {
            recording_id: descriptor.recording_id.clone(),
            species_scientific_name: descriptor.scientific_name.clone(),
            species_common_name: common_name.clone(),
            audio_object_key,
            quality: descriptor.quality.clone(),
            duration_seconds: descriptor.duration_seconds,
            location: descriptor.location.clone(),
            country: descriptor.country.clone(),
            ingested_at: Utc::now(),
        };

        match self.fetch_and_store(&descriptor, &audio_key).await {
            Ok(()) => {
                catalog.upsert(make_row(audio_key));
                summary.succeeded += 1;
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::warn!(
                    recording_id = %descriptor.recording_id,
                    error = %err,
                    "Audio acquisition failed; keeping recording without audio"
                );
                catalog.upsert(make_row(String::new()));
                summary.skipped_failed += 1;
            }
        }

        Ok(())
    }

    /// Download the audio blob and store it under `audio_key`, retrying each
    /// step independently.
    async fn fetch_and_store(
        &self,
        descriptor: &RecordingDescriptor,
        audio_key: &str,
    ) -> PipelineResult<()> {
        let bytes = with_backoff("audio download", self.max_attempts, || async move {
            self.provider
                .download_audio(&descriptor.audio_url)
                .await
                .map_err(Into::into)
        })
        .await?;

        with_backoff("audio upload", self.max_attempts, || {
            let data = bytes.clone();
            async move {
                self.storage
                    .put(audio_key, data, "audio/mpeg")
                    .await
                    .map(|_| ())
                    .map_err(Into::into)
            }
        })
        .await
    }
}
