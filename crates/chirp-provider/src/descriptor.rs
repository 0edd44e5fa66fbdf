//! Fixed-shape recording descriptors.
//!
//! The provider API returns loosely-typed JSON; conversion to
//! [`RecordingDescriptor`] happens once at the ingestion boundary, and
//! descriptors missing required fields are dropped there rather than
//! propagated downstream.

use serde::Deserialize;

/// One page of search results.
#[derive(Debug, Clone)]
pub struct RecordingPage {
    pub page: u32,
    pub num_pages: u32,
    pub recordings: Vec<RecordingDescriptor>,
}

impl RecordingPage {
    /// An empty page signals provider exhaustion.
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

/// A validated recording descriptor with every field the catalog needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingDescriptor {
    pub recording_id: String,
    pub scientific_name: String,
    pub common_name: String,
    pub quality: String,
    pub country: String,
    pub location: String,
    pub audio_url: String,
    pub duration_seconds: f64,
}

/// Raw descriptor as returned by the Xeno-canto API.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRecording {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub gen: String,
    #[serde(default)]
    pub sp: String,
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub cnt: String,
    #[serde(default)]
    pub loc: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub length: String,
}

impl RawRecording {
    /// Convert into a fixed-shape descriptor, or `None` when a required
    /// field (id, audio URL) is missing.
    pub(crate) fn into_descriptor(self) -> Option<RecordingDescriptor> {
        if self.id.is_empty() || self.file.is_empty() {
            tracing::warn!(
                id = %self.id,
                "Dropping descriptor with missing required fields"
            );
            return None;
        }

        let duration_seconds = parse_length_seconds(&self.length).unwrap_or_else(|| {
            tracing::debug!(id = %self.id, length = %self.length, "Unparsable length field");
            0.0
        });

        Some(RecordingDescriptor {
            recording_id: self.id,
            scientific_name: format!("{} {}", self.gen, self.sp).trim().to_string(),
            common_name: self.en,
            quality: self.q,
            country: self.cnt,
            location: self.loc,
            audio_url: self.file,
            duration_seconds,
        })
    }
}

/// Parse the provider's `length` field (`"m:ss"` or `"h:mm:ss"`) to seconds.
pub fn parse_length_seconds(length: &str) -> Option<f64> {
    let parts: Vec<&str> = length.split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let mut total = 0.0;
    for part in &parts {
        let value: f64 = part.trim().parse().ok()?;
        if value < 0.0 {
            return None;
        }
        total = total * 60.0 + value;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, file: &str) -> RawRecording {
        RawRecording {
            id: id.to_string(),
            gen: "Cardinalis".to_string(),
            sp: "cardinalis".to_string(),
            en: "Northern Cardinal".to_string(),
            q: "A".to_string(),
            cnt: "United States".to_string(),
            loc: "Austin, Texas".to_string(),
            file: file.to_string(),
            length: "0:47".to_string(),
        }
    }

    #[test]
    fn parse_length_minutes_seconds() {
        assert_eq!(parse_length_seconds("0:47"), Some(47.0));
        assert_eq!(parse_length_seconds("1:23"), Some(83.0));
        assert_eq!(parse_length_seconds("12"), Some(12.0));
    }

    #[test]
    fn parse_length_hours() {
        assert_eq!(parse_length_seconds("1:02:03"), Some(3723.0));
    }

    #[test]
    fn parse_length_rejects_garbage() {
        assert_eq!(parse_length_seconds(""), None);
        assert_eq!(parse_length_seconds("abc"), None);
        assert_eq!(parse_length_seconds("1:2:3:4"), None);
    }

    #[test]
    fn descriptor_conversion_keeps_fields() {
        let desc = raw("XC1", "https://xeno-canto.org/1/download")
            .into_descriptor()
            .unwrap();
        assert_eq!(desc.recording_id, "XC1");
        assert_eq!(desc.scientific_name, "Cardinalis cardinalis");
        assert_eq!(desc.duration_seconds, 47.0);
    }

    #[test]
    fn descriptor_without_id_or_url_is_dropped() {
        assert!(raw("", "https://example.com/a.mp3").into_descriptor().is_none());
        assert!(raw("XC2", "").into_descriptor().is_none());
    }
}
