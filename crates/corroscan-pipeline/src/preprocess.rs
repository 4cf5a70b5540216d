//! Noise suppression and local contrast enhancement.
//!
//! A 3×3 Gaussian pass knocks down sensor noise, then CLAHE is applied to
//! the lightness channel only, so shadowed corrosion gains contrast
//! without its hue shifting. This is the first pipeline stage; every
//! detector reads its output.

use crate::clahe::{CLIP_LIMIT, TILE_GRID, clahe};
use crate::color::rgb_to_lab;
use crate::types::{PipelineError, RgbImage};

/// Binomial 3-tap kernel, the discrete Gaussian for a 3×3 window.
pub const BLUR_KERNEL: [f32; 3] = [0.25, 0.5, 0.25];

/// Blur each channel of an RGB image with [`BLUR_KERNEL`] in both axes.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur_rgb(image: &RgbImage) -> RgbImage {
    imageproc::filter::separable_filter_equal(image, &BLUR_KERNEL)
}

/// Apply CLAHE to the Lab lightness channel and convert back to RGB.
#[must_use = "returns the enhanced image"]
pub fn enhance_contrast(image: &RgbImage) -> RgbImage {
    let lab = rgb_to_lab(image);
    let lightness = clahe(&lab.lightness, CLIP_LIMIT, TILE_GRID);
    lab.with_lightness(lightness).to_rgb()
}

/// Reject images with no pixels.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if either dimension is zero.
pub fn ensure_non_empty(image: &RgbImage) -> Result<(), PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::InvalidInput(format!(
            "image has zero area ({}x{})",
            image.width(),
            image.height(),
        )));
    }
    Ok(())
}

/// Blur then contrast-enhance `image`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image has zero area.
pub fn preprocess(image: &RgbImage) -> Result<RgbImage, PipelineError> {
    ensure_non_empty(image)?;
    Ok(enhance_contrast(&gaussian_blur_rgb(image)))
}
