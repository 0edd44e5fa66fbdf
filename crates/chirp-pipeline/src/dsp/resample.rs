//! Sample-rate conversion using rubato.
//!
//! All audio is normalized to the fixed analysis rate before the STFT so
//! that every derived image shares the same time/frequency resolution.

use chirp_core::{PipelineError, PipelineResult};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Resample mono audio from `input_rate` to `output_rate`.
///
/// Returns the input untouched when the rates already match.
pub fn resample(samples: Vec<f32>, input_rate: u32, output_rate: u32) -> PipelineResult<Vec<f32>> {
    if input_rate == output_rate {
        return Ok(samples);
    }
    if samples.is_empty() {
        return Err(PipelineError::CorruptInput(
            "Cannot resample empty audio".to_string(),
        ));
    }

    tracing::debug!(input_rate, output_rate, frames = samples.len(), "Resampling audio");

    // One-shot conversion: the chunk size is the whole clip.
    let input_frames = samples.len();
    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        input_frames,
        1,
    )
    .map_err(|e| PipelineError::CorruptInput(format!("Failed to create resampler: {}", e)))?;

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| PipelineError::CorruptInput(format!("Resampling failed: {}", e)))?;

    output
        .pop()
        .ok_or_else(|| PipelineError::CorruptInput("Resampler produced no output".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, seconds: f32) -> Vec<f32> {
        let count = (rate as f32 * seconds) as usize;
        (0..count)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn matching_rates_pass_through() {
        let input = sine(440.0, 22050, 0.1);
        let output = resample(input.clone(), 22050, 22050).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn halves_frame_count_for_half_rate() {
        let input = sine(440.0, 44100, 0.5);
        let frames = input.len();
        let output = resample(input, 44100, 22050).unwrap();

        let expected = frames / 2;
        let tolerance = expected / 100 + 16;
        assert!(
            (output.len() as i64 - expected as i64).unsigned_abs() as usize <= tolerance,
            "expected ~{} frames, got {}",
            expected,
            output.len()
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        let result = resample(Vec::new(), 44100, 22050);
        assert!(matches!(result, Err(PipelineError::CorruptInput(_))));
    }
}
