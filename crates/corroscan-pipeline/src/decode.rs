//! Image decoding and pixel-layout normalization.
//!
//! Accepts encoded bytes (PNG, JPEG, BMP, WebP) or an already decoded
//! image and produces the 8-bit RGB grid the detector works on.

use image::DynamicImage;

use crate::types::{PipelineError, RgbImage};

/// Decode encoded image bytes.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty and
/// [`PipelineError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Convert an 8-bit RGB or RGBA image to RGB, discarding alpha.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] for any other layout
/// (grayscale, 16-bit, float), which is not a 3-channel 8-bit photo.
pub fn to_rgb(image: &DynamicImage) -> Result<RgbImage, PipelineError> {
    match image {
        DynamicImage::ImageRgb8(rgb) => Ok(rgb.clone()),
        DynamicImage::ImageRgba8(_) => Ok(image.to_rgb8()),
        other => Err(PipelineError::InvalidInput(format!(
            "expected 8-bit RGB or RGBA, got {:?}",
            other.color()
        ))),
    }
}

/// Decode bytes straight to an RGB grid.
///
/// # Errors
///
/// Any error of [`decode`] or [`to_rgb`].
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    to_rgb(&decode(bytes)?)
}
