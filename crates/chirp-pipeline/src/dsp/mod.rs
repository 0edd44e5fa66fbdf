//! Audio transform chain: decode → resample → mel projection → rasterize.
//!
//! Every step is a pure function of its input plus the fixed
//! [`SpectrogramParams`](chirp_core::SpectrogramParams), so derived images
//! are deterministic for a given recording.

pub mod decode;
pub mod mel;
pub mod render;
pub mod resample;

pub use decode::{decode_audio, DecodedAudio};
pub use mel::{mel_spectrogram_image, MelImage};
pub use render::{encode_png, png_dimensions};
pub use resample::resample;
