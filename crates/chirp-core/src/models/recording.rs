use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One external audio item, as fixed at the ingestion boundary.
///
/// `recording_id` is assigned by the provider and is the primary key of the
/// recording catalog. `audio_object_key` is empty until the blob has been
/// stored successfully; rows are upserted, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub recording_id: String,
    pub species_scientific_name: String,
    pub species_common_name: String,
    #[serde(default)]
    pub audio_object_key: String,
    pub quality: String,
    pub duration_seconds: f64,
    pub location: String,
    #[serde(default)]
    pub country: String,
    pub ingested_at: DateTime<Utc>,
}

impl Recording {
    /// True once the audio blob has been stored.
    pub fn has_audio(&self) -> bool {
        !self.audio_object_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Recording {
        Recording {
            recording_id: "XC100001".to_string(),
            species_scientific_name: "Cardinalis cardinalis".to_string(),
            species_common_name: "Northern Cardinal".to_string(),
            audio_object_key: String::new(),
            quality: "A".to_string(),
            duration_seconds: 47.0,
            location: "Austin, Texas".to_string(),
            country: "United States".to_string(),
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn has_audio_tracks_object_key() {
        let mut rec = sample();
        assert!(!rec.has_audio());
        rec.audio_object_key = "raw-audio/northern_cardinal/XC100001.mp3".to_string();
        assert!(rec.has_audio());
    }

    #[test]
    fn json_round_trip() {
        let rec = sample();
        let json = serde_json::to_string(&rec).unwrap();
        let back: Recording = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
