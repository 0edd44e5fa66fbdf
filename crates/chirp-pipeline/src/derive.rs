//! Derive stage: stored audio → mel-spectrogram PNG → object store → catalog.

use std::sync::Arc;

use chirp_catalog::{RecordingCatalog, SpectrogramCatalog};
use chirp_core::{
    Config, PipelineError, PipelineResult, Recording, Spectrogram, SpectrogramParams, StageSummary,
};
use chirp_storage::{keys, Storage};
use tokio::sync::Semaphore;

use crate::dsp;
use crate::retry::with_backoff;

/// Derives one spectrogram per stored recording under the run's fixed
/// parameters, skipping entries that already exist.
///
/// Per-item transforms are independent, so items run on a bounded concurrent
/// worker pool; catalog upserts stay on the calling task (single writer).
pub struct SpectrogramDeriver {
    storage: Arc<dyn Storage>,
    params: SpectrogramParams,
    concurrency: usize,
    max_attempts: u32,
}

enum DeriveOutcome {
    /// Newly transformed and uploaded.
    Derived(Spectrogram),
    /// The image object already existed. `Some` when the catalog row was
    /// rebuilt from the stored image, `None` when the row could not be read.
    Existing(Option<Spectrogram>),
    Failed,
}

impl SpectrogramDeriver {
    pub fn new(storage: Arc<dyn Storage>, config: &Config) -> Self {
        Self {
            storage,
            params: config.spectrogram,
            concurrency: config.derive_concurrency,
            max_attempts: config.download_max_attempts,
        }
    }

    /// Derive spectrograms for every recording with stored audio.
    ///
    /// Idempotent: a second run over the same catalog with unchanged params
    /// performs zero new writes.
    pub async fn derive(
        &self,
        recordings: &RecordingCatalog,
        catalog: &mut SpectrogramCatalog,
    ) -> PipelineResult<StageSummary> {
        let mut summary = StageSummary::default();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::new();

        for recording in recordings.rows() {
            if !recording.has_audio() {
                continue;
            }
            if catalog.contains(&recording.recording_id, &self.params) {
                summary.skipped_existing += 1;
                continue;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore closed");

            let task = DeriveTask {
                storage: self.storage.clone(),
                params: self.params,
                max_attempts: self.max_attempts,
                recording: recording.clone(),
            };

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                (task.recording.recording_id.clone(), task.run().await)
            }));
        }

        let mut dirty = false;
        for handle in handles {
            match handle.await {
                Ok((recording_id, DeriveOutcome::Derived(row))) => {
                    match catalog.upsert(row, recordings) {
                        Ok(()) => {
                            summary.succeeded += 1;
                            dirty = true;
                        }
                        Err(err) => {
                            tracing::warn!(
                                recording_id = %recording_id,
                                error = %err,
                                "Rejected derived spectrogram row"
                            );
                            summary.skipped_failed += 1;
                        }
                    }
                }
                Ok((recording_id, DeriveOutcome::Existing(row))) => {
                    if let Some(row) = row {
                        match catalog.upsert(row, recordings) {
                            Ok(()) => dirty = true,
                            Err(err) => tracing::warn!(
                                recording_id = %recording_id,
                                error = %err,
                                "Rejected reconstructed spectrogram row"
                            ),
                        }
                    }
                    summary.skipped_existing += 1;
                }
                Ok((_, DeriveOutcome::Failed)) => summary.skipped_failed += 1,
                Err(err) => {
                    tracing::error!(error = %err, "Derive worker crashed");
                    summary.skipped_failed += 1;
                }
            }
        }

        if dirty {
            catalog.persist(self.storage.as_ref()).await?;
        }

        Ok(summary)
    }
}

struct DeriveTask {
    storage: Arc<dyn Storage>,
    params: SpectrogramParams,
    max_attempts: u32,
    recording: Recording,
}

impl DeriveTask {
    async fn run(&self) -> DeriveOutcome {
        let image_key = keys::spectrogram_key(
            &self.recording.species_common_name,
            &self.recording.recording_id,
        );

        match self.storage.exists(&image_key).await {
            Ok(true) => {
                // The image outlived its metadata (crash between upload and
                // persist). Rebuild the row from the stored image instead of
                // re-deriving.
                match self.reconstruct_row(&image_key).await {
                    Ok(row) => DeriveOutcome::Existing(Some(row)),
                    Err(err) => {
                        tracing::warn!(
                            recording_id = %self.recording.recording_id,
                            error = %err,
                            "Stored image exists but row reconstruction failed"
                        );
                        DeriveOutcome::Existing(None)
                    }
                }
            }
            Ok(false) => match self.derive_one(&image_key).await {
                Ok(row) => DeriveOutcome::Derived(row),
                Err(err) => {
                    tracing::warn!(
                        recording_id = %self.recording.recording_id,
                        error = %err,
                        "Spectrogram derivation failed"
                    );
                    DeriveOutcome::Failed
                }
            },
            Err(err) => {
                tracing::warn!(
                    recording_id = %self.recording.recording_id,
                    error = %err,
                    "Existence probe failed"
                );
                DeriveOutcome::Failed
            }
        }
    }

    async fn derive_one(&self, image_key: &str) -> PipelineResult<Spectrogram> {
        let audio = with_backoff("audio fetch", self.max_attempts, || async move {
            self.storage
                .get(&self.recording.audio_object_key)
                .await
                .map_err(PipelineError::from)
        })
        .await?;

        // The transform chain is CPU-bound; keep it off the async workers.
        let params = self.params;
        let mel = tokio::task::spawn_blocking(move || -> PipelineResult<dsp::MelImage> {
            let decoded = dsp::decode_audio(audio)?;
            let samples = dsp::resample(decoded.samples, decoded.sample_rate, params.sample_rate)?;
            dsp::mel_spectrogram_image(&samples, &params)
        })
        .await
        .map_err(|e| PipelineError::CorruptInput(format!("Transform task failed: {}", e)))??;

        let png = dsp::encode_png(&mel)?;
        with_backoff("image upload", self.max_attempts, || {
            let data = png.clone();
            async move {
                self.storage
                    .put(image_key, data, "image/png")
                    .await
                    .map(|_| ())
                    .map_err(PipelineError::from)
            }
        })
        .await?;

        Ok(self.row(image_key, mel.width, mel.height))
    }

    async fn reconstruct_row(&self, image_key: &str) -> PipelineResult<Spectrogram> {
        let png = with_backoff("image fetch", self.max_attempts, || async move {
            self.storage.get(image_key).await.map_err(PipelineError::from)
        })
        .await?;

        let (width, height) = dsp::png_dimensions(&png)?;
        Ok(self.row(image_key, width, height))
    }

    fn row(&self, image_key: &str, width: u32, height: u32) -> Spectrogram {
        Spectrogram {
            recording_id: self.recording.recording_id.clone(),
            spectrogram_object_key: image_key.to_string(),
            audio_object_key: self.recording.audio_object_key.clone(),
            params: self.params,
            image_width: width,
            image_height: height,
            duration_seconds: self.recording.duration_seconds,
            species_common_name: self.recording.species_common_name.clone(),
            species_scientific_name: self.recording.species_scientific_name.clone(),
        }
    }
}
