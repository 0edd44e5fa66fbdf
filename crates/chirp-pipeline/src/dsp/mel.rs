//! Mel-spectrogram computation: STFT, mel filter bank, log-power scaling.
//!
//! Uses a Hann window for spectral leakage reduction. Output intensities are
//! scaled relative to the clip's peak with an 80 dB floor, then quantized to
//! 8-bit, with row 0 holding the highest mel band.

use chirp_core::{PipelineError, PipelineResult, SpectrogramParams};
use realfft::RealFftPlanner;

/// Dynamic range below the peak kept in the output image.
const TOP_DB: f32 = 80.0;

/// Grayscale image buffer produced from one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct MelImage {
    pub width: u32,
    pub height: u32,
    /// Row-major, `width * height` bytes, row 0 = highest mel band.
    pub pixels: Vec<u8>,
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filters as sparse (bin, weight) lists, one per band.
fn mel_filterbank(params: &SpectrogramParams) -> Vec<Vec<(usize, f32)>> {
    let n_bins = params.n_fft / 2 + 1;
    let nyquist = params.sample_rate as f32 / 2.0;
    let fmax = params.fmax_hz.min(nyquist);

    let mel_lo = hz_to_mel(params.fmin_hz);
    let mel_hi = hz_to_mel(fmax);

    // n_mels + 2 breakpoints, evenly spaced on the mel scale.
    let breakpoints: Vec<f32> = (0..params.n_mels + 2)
        .map(|i| mel_to_hz(mel_lo + (mel_hi - mel_lo) * i as f32 / (params.n_mels + 1) as f32))
        .collect();

    let bin_hz = params.sample_rate as f32 / params.n_fft as f32;

    let mut bank = Vec::with_capacity(params.n_mels);
    for band in 0..params.n_mels {
        let (lo, center, hi) = (
            breakpoints[band],
            breakpoints[band + 1],
            breakpoints[band + 2],
        );

        let mut filter = Vec::new();
        for bin in 0..n_bins {
            let freq = bin as f32 * bin_hz;
            let weight = if freq <= lo || freq >= hi {
                0.0
            } else if freq <= center {
                (freq - lo) / (center - lo)
            } else {
                (hi - freq) / (hi - center)
            };
            if weight > 0.0 {
                filter.push((bin, weight));
            }
        }
        bank.push(filter);
    }
    bank
}

/// Compute the mel-spectrogram image for mono audio already at
/// `params.sample_rate`.
///
/// Width is the number of STFT frames, height is `n_mels`. Deterministic for
/// a given input and parameter set.
pub fn mel_spectrogram_image(
    samples: &[f32],
    params: &SpectrogramParams,
) -> PipelineResult<MelImage> {
    let n_fft = params.n_fft;
    let hop = params.hop_length;

    if samples.len() < n_fft {
        return Err(PipelineError::CorruptInput(format!(
            "Audio too short for analysis: {} samples < window of {}",
            samples.len(),
            n_fft
        )));
    }

    let fft = RealFftPlanner::<f32>::new().plan_fft_forward(n_fft);
    let window = hann_window(n_fft);
    let filterbank = mel_filterbank(params);

    // Pre-allocate FFT buffers once and reuse across frames
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();
    let mut power = vec![0.0f32; n_fft / 2 + 1];

    let mut mel_frames: Vec<Vec<f32>> = Vec::with_capacity((samples.len() - n_fft) / hop + 1);

    let mut pos = 0;
    while pos + n_fft <= samples.len() {
        for (inp, (&sample, &weight)) in input
            .iter_mut()
            .zip(samples[pos..pos + n_fft].iter().zip(window.iter()))
        {
            *inp = sample * weight;
        }

        fft.process(&mut input, &mut spectrum)
            .map_err(|e| PipelineError::CorruptInput(format!("FFT failed: {}", e)))?;

        for (bin, value) in power.iter_mut().zip(spectrum.iter()) {
            *bin = value.norm_sqr();
        }

        let mel: Vec<f32> = filterbank
            .iter()
            .map(|filter| filter.iter().map(|&(bin, w)| w * power[bin]).sum())
            .collect();
        mel_frames.push(mel);

        pos += hop;
    }

    let peak = mel_frames
        .iter()
        .flatten()
        .copied()
        .fold(f32::MIN_POSITIVE, f32::max);

    let width = mel_frames.len();
    let height = params.n_mels;
    let mut pixels = vec![0u8; width * height];

    for (x, mel) in mel_frames.iter().enumerate() {
        for (band, &energy) in mel.iter().enumerate() {
            let db = 10.0 * (energy.max(1e-10) / peak).log10();
            let intensity = (db.clamp(-TOP_DB, 0.0) + TOP_DB) / TOP_DB * 255.0;
            // row 0 = highest band
            let y = height - 1 - band;
            pixels[y * width + x] = intensity.round() as u8;
        }
    }

    Ok(MelImage {
        width: width as u32,
        height: height as u32,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, params: &SpectrogramParams, seconds: f32) -> Vec<f32> {
        let count = (params.sample_rate as f32 * seconds) as usize;
        (0..count)
            .map(|i| {
                (2.0 * std::f32::consts::PI * freq * i as f32 / params.sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn image_dimensions_follow_frame_count_and_bands() {
        let params = SpectrogramParams::default();
        let samples = sine(1000.0, &params, 1.0);
        let image = mel_spectrogram_image(&samples, &params).unwrap();

        let expected_width = (samples.len() - params.n_fft) / params.hop_length + 1;
        assert_eq!(image.width as usize, expected_width);
        assert_eq!(image.height as usize, params.n_mels);
        assert_eq!(image.pixels.len(), expected_width * params.n_mels);
    }

    #[test]
    fn transform_is_deterministic() {
        let params = SpectrogramParams::default();
        let samples = sine(2000.0, &params, 0.5);

        let first = mel_spectrogram_image(&samples, &params).unwrap();
        let second = mel_spectrogram_image(&samples, &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn peak_band_is_stable_across_frames() {
        let params = SpectrogramParams::default();
        let samples = sine(2000.0, &params, 1.0);
        let image = mel_spectrogram_image(&samples, &params).unwrap();

        let column_argmax = |x: usize| {
            (0..image.height as usize)
                .max_by_key(|&y| image.pixels[y * image.width as usize + x])
                .unwrap()
        };

        let mid = image.width as usize / 2;
        assert_eq!(column_argmax(1), column_argmax(mid));
        // Peak intensity normalizes to full scale somewhere in the image.
        assert_eq!(image.pixels.iter().copied().max(), Some(255));
    }

    #[test]
    fn too_short_input_is_corrupt() {
        let params = SpectrogramParams::default();
        let samples = vec![0.0f32; params.n_fft - 1];
        let result = mel_spectrogram_image(&samples, &params);
        assert!(matches!(result, Err(PipelineError::CorruptInput(_))));
    }

    #[test]
    fn filterbank_covers_all_bands() {
        let params = SpectrogramParams::default();
        let bank = mel_filterbank(&params);
        assert_eq!(bank.len(), params.n_mels);
        // Upper bands span wider frequency ranges and must not be empty.
        assert!(!bank[params.n_mels - 1].is_empty());
    }
}
