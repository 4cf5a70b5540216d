//! Brightness statistics of an input image.

use serde::{Deserialize, Serialize};

use crate::color::luminance;
use crate::types::RgbImage;

/// Luminance statistics, used by collaborators to flag poorly exposed
/// inspection photos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    /// Mean luminance.
    pub mean_brightness: f64,
    /// Population standard deviation of luminance.
    pub std_brightness: f64,
    /// Darkest luminance.
    pub min_brightness: u8,
    /// Brightest luminance.
    pub max_brightness: u8,
    /// `std / mean`; 0 for a black image.
    pub contrast: f64,
}

impl ImageStats {
    /// Compute statistics; an empty image yields all zeros.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_rgb(image: &RgbImage) -> Self {
        let gray = luminance(image);
        let raw = gray.as_raw();
        if raw.is_empty() {
            return Self::default();
        }
        let n = raw.len() as f64;
        let mean = raw.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let variance = raw
            .iter()
            .map(|&v| (f64::from(v) - mean).powi(2))
            .sum::<f64>()
            / n;
        let std = variance.sqrt();
        Self {
            mean_brightness: mean,
            std_brightness: std,
            min_brightness: raw.iter().copied().min().unwrap_or(0),
            max_brightness: raw.iter().copied().max().unwrap_or(0),
            contrast: if mean > 0.0 { std / mean } else { 0.0 },
        }
    }
}
