//! Lossless rasterization of mel images.

use crate::dsp::mel::MelImage;
use chirp_core::{PipelineError, PipelineResult};
use image::{GenericImageView, GrayImage, ImageFormat};
use std::io::Cursor;

/// Encode a mel image buffer as a grayscale PNG.
pub fn encode_png(mel: &MelImage) -> PipelineResult<Vec<u8>> {
    let img = GrayImage::from_raw(mel.width, mel.height, mel.pixels.clone()).ok_or_else(|| {
        PipelineError::Validation("Pixel buffer does not match image dimensions".to_string())
    })?;

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| PipelineError::Validation(format!("PNG encoding failed: {}", e)))?;

    Ok(buffer.into_inner())
}

/// Read the dimensions of a stored image, used when reconstructing a catalog
/// row for an image that already exists in the store.
pub fn png_dimensions(data: &[u8]) -> PipelineResult<(u32, u32)> {
    let img = image::load_from_memory(data)
        .map_err(|e| PipelineError::CorruptInput(format!("Failed to read stored image: {}", e)))?;
    Ok(img.dimensions())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_read_dimensions_round_trips() {
        let mel = MelImage {
            width: 16,
            height: 8,
            pixels: (0..16 * 8).map(|i| (i % 256) as u8).collect(),
        };

        let png = encode_png(&mel).unwrap();
        assert_eq!(png_dimensions(&png).unwrap(), (16, 8));
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let mel = MelImage {
            width: 16,
            height: 8,
            pixels: vec![0; 10],
        };
        assert!(matches!(
            encode_png(&mel),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn garbage_png_is_corrupt_input() {
        assert!(matches!(
            png_dimensions(b"not a png"),
            Err(PipelineError::CorruptInput(_))
        ));
    }
}
