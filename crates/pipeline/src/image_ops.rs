//! Re-encoding of produced images within fixed bounds.
//!
//! The tagging model rejects large inputs, so every background-removed image
//! is shrunk to fit a square box and re-encoded as PNG (keeping the alpha
//! channel the removal produced) before it is accepted.

use std::io::Cursor;

use closet_model::ImagePayload;
use image::ImageFormat;
use image::imageops::FilterType;

use crate::error::{IntakeError, Result};

/// Longest side of a stored image, in pixels
pub const MAX_DIMENSION: u32 = 1024;

/// Largest accepted data URL, in bytes
pub const MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;

/// Size bounds applied to produced images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_dimension: u32,
    pub max_payload_bytes: usize,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
        }
    }
}

/// Decode `bytes`, shrink to fit `limits.max_dimension`, encode as PNG.
///
/// Aspect ratio is preserved and images are never upscaled. Fails with
/// [`IntakeError::TooLarge`] if the final data URL is over the byte ceiling.
///
/// CPU-bound: call it from `spawn_blocking`.
pub fn fit_and_encode_png(bytes: &[u8], limits: &ImageLimits) -> Result<ImagePayload> {
    let decoded = image::load_from_memory(bytes)?;

    let max = limits.max_dimension;
    let fitted = if decoded.width() > max || decoded.height() > max {
        decoded.resize(max, max, FilterType::Triangle)
    } else {
        decoded
    };

    let mut encoded = Vec::new();
    fitted.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;

    let payload = ImagePayload::from_bytes("image/png", &encoded);
    if payload.len() > limits.max_payload_bytes {
        return Err(IntakeError::TooLarge {
            size: payload.len(),
            limit: limits.max_payload_bytes,
        });
    }
    Ok(payload)
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 0]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
