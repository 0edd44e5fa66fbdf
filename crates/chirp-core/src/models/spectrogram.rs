use serde::{Deserialize, Serialize};

/// Fixed analysis parameters for mel-spectrogram derivation.
///
/// Identical for every recording in a run, which is what makes the output
/// images directly comparable downstream. A change in any field changes the
/// [`fingerprint`](SpectrogramParams::fingerprint) and therefore the identity
/// of derived entries — stale entries under old params are left in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramParams {
    /// FFT window size in samples.
    pub n_fft: usize,
    /// Hop between adjacent analysis windows in samples.
    pub hop_length: usize,
    /// Number of mel filter banks (output image height).
    pub n_mels: usize,
    /// Lowest analyzed frequency in Hz.
    pub fmin_hz: f32,
    /// Highest analyzed frequency in Hz. Bird calls sit mostly below 8 kHz.
    pub fmax_hz: f32,
    /// Sample rate the audio is resampled to before analysis.
    pub sample_rate: u32,
}

impl Default for SpectrogramParams {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            fmin_hz: 0.0,
            fmax_hz: 8000.0,
            sample_rate: 22050,
        }
    }
}

impl SpectrogramParams {
    /// Compact identity string, part of the derived-entry identity key.
    pub fn fingerprint(&self) -> String {
        format!(
            "fft{}-hop{}-mel{}-f{:.0}-{:.0}-sr{}",
            self.n_fft, self.hop_length, self.n_mels, self.fmin_hz, self.fmax_hz, self.sample_rate
        )
    }
}

/// One derived mel-spectrogram image per recording and parameter set.
///
/// Holds a non-owning reference to the source recording by `recording_id`,
/// plus denormalized species/duration fields so the derived catalog is
/// queryable on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrogram {
    pub recording_id: String,
    pub spectrogram_object_key: String,
    pub audio_object_key: String,
    pub params: SpectrogramParams,
    pub image_width: u32,
    pub image_height: u32,
    pub duration_seconds: f64,
    pub species_common_name: String,
    pub species_scientific_name: String,
}

impl Spectrogram {
    /// Identity key: at most one entry may exist per (recording, params).
    pub fn identity_key(&self) -> (String, String) {
        (self.recording_id.clone(), self.params.fingerprint())
    }
}
