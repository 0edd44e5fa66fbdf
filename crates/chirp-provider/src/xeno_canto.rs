//! Xeno-canto API v3 client.
//!
//! API v3 requires a key, issued per account. Searches use the tag grammar
//! (`en:`, `q:`); pagination is a 1-indexed `page` parameter with the page
//! count echoed back as `numPages`.

use crate::descriptor::{RawRecording, RecordingPage};
use crate::{ProviderError, ProviderResult, RecordingProvider};
use async_trait::async_trait;
use chirp_core::Config;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://xeno-canto.org/api/3";
const USER_AGENT: &str = concat!("chirp-pipeline/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Xeno-canto API.
#[derive(Clone, Debug)]
pub struct XenoCantoProvider {
    client: Client,
    base_url: String,
    api_key: String,
    min_quality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "numPages", default)]
    num_pages: u32,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    recordings: Vec<RawRecording>,
}

impl XenoCantoProvider {
    pub fn new(
        api_key: String,
        min_quality: Option<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            api_key,
            min_quality,
        })
    }

    /// Create a provider from configuration. Fails when no API key is set.
    pub fn from_config(config: &Config) -> ProviderResult<Self> {
        let api_key = config.xeno_canto_api_key.clone().ok_or_else(|| {
            ProviderError::Config(
                "Xeno-canto API key is required. Set XENO_CANTO_API_KEY; keys are issued \
                 from your xeno-canto.org account page."
                    .to_string(),
            )
        })?;

        Self::new(
            api_key,
            config.min_quality.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// Override the API base URL (integration tests point this at a stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the v3 tag query for a species common name.
    ///
    /// Multi-word values are quoted; terms are joined with spaces.
    fn build_query(&self, species_common_name: &str) -> String {
        let mut parts = vec![tag("en", species_common_name)];
        if let Some(quality) = &self.min_quality {
            parts.push(tag("q", quality));
        }
        parts.join(" ")
    }
}

fn tag(name: &str, value: &str) -> String {
    if value.contains(' ') {
        format!("{}:\"{}\"", name, value)
    } else {
        format!("{}:{}", name, value)
    }
}

#[async_trait]
impl RecordingProvider for XenoCantoProvider {
    async fn search_page(
        &self,
        species_common_name: &str,
        page: u32,
    ) -> ProviderResult<RecordingPage> {
        let url = format!("{}/recordings", self.base_url);
        let query = self.build_query(species_common_name);
        let page_param = page.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query.as_str()),
                ("page", page_param.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let total = body.recordings.len();
        let recordings: Vec<_> = body
            .recordings
            .into_iter()
            .filter_map(RawRecording::into_descriptor)
            .collect();

        tracing::debug!(
            species = %species_common_name,
            page,
            num_pages = body.num_pages,
            descriptors = recordings.len(),
            dropped = total - recordings.len(),
            "Fetched search page"
        );

        Ok(RecordingPage {
            page: if body.page == 0 { page } else { body.page },
            num_pages: body.num_pages,
            recordings,
        })
    }

    async fn download_audio(&self, url: &str) -> ProviderResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ProviderError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(min_quality: Option<&str>) -> XenoCantoProvider {
        XenoCantoProvider::new(
            "test-key".to_string(),
            min_quality.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn query_quotes_multi_word_names() {
        let query = provider(None).build_query("Northern Cardinal");
        assert_eq!(query, "en:\"Northern Cardinal\"");
    }

    #[test]
    fn query_leaves_single_words_unquoted() {
        let query = provider(None).build_query("Veery");
        assert_eq!(query, "en:Veery");
    }

    #[test]
    fn query_appends_quality_filter() {
        let query = provider(Some(">C")).build_query("Wood Thrush");
        assert_eq!(query, "en:\"Wood Thrush\" q:>C");
    }

    #[test]
    fn from_config_requires_api_key() {
        let mut config = Config {
            xeno_canto_api_key: None,
            http_timeout_secs: 30,
            storage_backend: chirp_core::StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/chirp".into()),
            local_storage_base_url: None,
            target_species: vec![],
            recordings_per_species: 10,
            min_quality: None,
            download_max_attempts: 3,
            derive_concurrency: 4,
            spectrogram: Default::default(),
        };
        assert!(XenoCantoProvider::from_config(&config).is_err());

        config.xeno_canto_api_key = Some("key".to_string());
        assert!(XenoCantoProvider::from_config(&config).is_ok());
    }
}
