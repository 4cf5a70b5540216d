//! Fit an inspection photo inside a working-resolution box.
//!
//! Detection runs at whatever resolution it is given, and thresholds such
//! as the minimum area are in pixels, so collaborators that accept
//! arbitrarily large photos shrink them first. Images are never
//! enlarged.

use std::fmt;

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::types::RgbImage;

/// Resampling filter used when shrinking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownsampleFilter {
    /// Nearest-neighbor: fastest, blocky.
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom).
    CatmullRom,
    /// Gaussian: smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: sharpest.
    Lanczos3,
}

impl DownsampleFilter {
    /// Every filter, fastest first.
    pub const ALL: [Self; 5] = [
        Self::Nearest,
        Self::Triangle,
        Self::CatmullRom,
        Self::Gaussian,
        Self::Lanczos3,
    ];

    const fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nearest => "nearest",
            Self::Triangle => "triangle",
            Self::CatmullRom => "catmull-rom",
            Self::Gaussian => "gaussian",
            Self::Lanczos3 => "lanczos3",
        })
    }
}

/// Target size for fitting `(width, height)` inside the box, or `None`
/// when it already fits. Aspect ratio is preserved; neither side drops
/// below 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fitted_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> Option<(u32, u32)> {
    if width <= max_width && height <= max_height {
        return None;
    }
    let scale = (f64::from(max_width) / f64::from(width)).min(f64::from(max_height) / f64::from(height));
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    Some((w.min(max_width.max(1)), h.min(max_height.max(1))))
}

/// Shrink `image` to fit inside `max_width × max_height`.
///
/// Returns the (possibly unchanged) image and whether it was resized.
#[must_use]
pub fn fit_within(
    image: &RgbImage,
    max_width: u32,
    max_height: u32,
    filter: DownsampleFilter,
) -> (RgbImage, bool) {
    match fitted_dimensions(image.width(), image.height(), max_width, max_height) {
        Some((w, h)) => {
            log::debug!(
                "resizing {}x{} to {w}x{h} ({filter})",
                image.width(),
                image.height()
            );
            (imageops::resize(image, w, h, filter.to_image_filter()), true)
        }
        None => (image.clone(), false),
    }
}
