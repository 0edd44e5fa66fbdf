//! Configuration module
//!
//! Configuration is collected from the environment (with `.env` support via
//! dotenvy) into a single [`Config`] value constructed at batch start and
//! passed by reference through the pipeline stages.

use std::env;

use crate::models::SpectrogramParams;
use crate::storage_types::StorageBackend;

// Defaults
const RECORDINGS_PER_SPECIES: usize = 50;
const DOWNLOAD_MAX_ATTEMPTS: u32 = 3;
const DERIVE_CONCURRENCY: usize = 4;
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Xeno-canto API v3 key. Required for ingestion, unused by derivation.
    pub xeno_canto_api_key: Option<String>,
    pub http_timeout_secs: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...).
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Batch configuration
    pub target_species: Vec<String>,
    pub recordings_per_species: usize,
    /// Optional Xeno-canto quality filter (e.g. "A" or ">C").
    pub min_quality: Option<String>,
    pub download_max_attempts: u32,
    pub derive_concurrency: usize,
    pub spectrogram: SpectrogramParams,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .parse::<StorageBackend>()?;

        let target_species: Vec<String> = env::var("TARGET_SPECIES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let defaults = SpectrogramParams::default();
        let spectrogram = SpectrogramParams {
            n_fft: parse_env("SPECTROGRAM_N_FFT", defaults.n_fft),
            hop_length: parse_env("SPECTROGRAM_HOP_LENGTH", defaults.hop_length),
            n_mels: parse_env("SPECTROGRAM_N_MELS", defaults.n_mels),
            fmin_hz: parse_env("SPECTROGRAM_FMIN_HZ", defaults.fmin_hz),
            fmax_hz: parse_env("SPECTROGRAM_FMAX_HZ", defaults.fmax_hz),
            sample_rate: parse_env("SPECTROGRAM_SAMPLE_RATE", defaults.sample_rate),
        };

        let config = Config {
            xeno_canto_api_key: env::var("XENO_CANTO_API_KEY").ok(),
            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or_else(|| env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            target_species,
            recordings_per_species: parse_env("RECORDINGS_PER_SPECIES", RECORDINGS_PER_SPECIES),
            min_quality: env::var("MIN_QUALITY").ok(),
            download_max_attempts: parse_env("DOWNLOAD_MAX_ATTEMPTS", DOWNLOAD_MAX_ATTEMPTS),
            derive_concurrency: parse_env("DERIVE_CONCURRENCY", DERIVE_CONCURRENCY),
            spectrogram,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET must be set for the s3 backend"));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set for the s3 backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set for the local backend"
                    ));
                }
            }
        }

        if self.spectrogram.n_fft == 0 || self.spectrogram.hop_length == 0 {
            return Err(anyhow::anyhow!(
                "spectrogram n_fft and hop_length must be non-zero"
            ));
        }
        if self.spectrogram.n_mels == 0 {
            return Err(anyhow::anyhow!("spectrogram n_mels must be non-zero"));
        }
        if self.spectrogram.fmax_hz <= self.spectrogram.fmin_hz {
            return Err(anyhow::anyhow!(
                "spectrogram fmax_hz must be greater than fmin_hz"
            ));
        }
        if self.derive_concurrency == 0 {
            return Err(anyhow::anyhow!("DERIVE_CONCURRENCY must be at least 1"));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> Config {
        Config {
            xeno_canto_api_key: Some("key".to_string()),
            http_timeout_secs: 30,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/chirp".to_string()),
            local_storage_base_url: None,
            target_species: vec!["Northern Cardinal".to_string()],
            recordings_per_species: 50,
            min_quality: None,
            download_max_attempts: 3,
            derive_concurrency: 4,
            spectrogram: SpectrogramParams::default(),
        }
    }

    #[test]
    fn local_backend_requires_path() {
        let mut config = local_config();
        assert!(config.validate().is_ok());
        config.local_storage_path = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut config = local_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());
        config.s3_bucket = Some("chirp-data".to_string());
        config.s3_region = Some("us-east-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_frequency_range() {
        let mut config = local_config();
        config.spectrogram.fmax_hz = 0.0;
        assert!(config.validate().is_err());
    }
}
