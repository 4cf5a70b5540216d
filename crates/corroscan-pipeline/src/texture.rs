//! Surface-roughness channel.
//!
//! Local standard deviation of luminance over a square window, computed
//! from exact integer integral images of a reflect-101 padded copy so
//! that perfectly flat areas have zero deviation. The map is stretched
//! to `[0, 255]` and thresholded by the profile's texture sensitivity.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::integral_image::{integral_image, integral_squared_image};

use crate::border::reflect_101;
use crate::color::luminance;
use crate::mask::{acceptance_threshold, threshold_above};
use crate::types::RgbImage;

/// Side of the square neighborhood in pixels.
pub const WINDOW: u32 = 9;

const RADIUS: u32 = WINDOW / 2;

/// Sums of `v` and `v²` over the window centred on each pixel.
struct BoxSums {
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

/// `gray` grown by [`RADIUS`] on every side, mirrored reflect-101.
fn pad_reflect_101(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let r = i64::from(RADIUS);
    GrayImage::from_fn(w + 2 * RADIUS, h + 2 * RADIUS, |x, y| {
        *gray.get_pixel(
            reflect_101(i64::from(x) - r, w),
            reflect_101(i64::from(y) - r, h),
        )
    })
}

/// Sum over the `WINDOW`-square whose top-left corner in the padded
/// image is `(x, y)`, read from an integral image.
fn window_sum(integral: &Image<Luma<u64>>, x: u32, y: u32) -> u64 {
    let at = |x, y| integral.get_pixel(x, y).0[0];
    let (x1, y1) = (x + WINDOW, y + WINDOW);
    at(x1, y1) + at(x, y) - at(x, y1) - at(x1, y)
}

fn box_sums(gray: &GrayImage) -> BoxSums {
    let padded = pad_reflect_101(gray);
    let sums = integral_image::<_, u64>(&padded);
    let squares = integral_squared_image::<_, u64>(&padded);

    let capacity = gray.pixels().len();
    let mut sum = Vec::with_capacity(capacity);
    let mut sum_sq = Vec::with_capacity(capacity);
    for y in 0..gray.height() {
        for x in 0..gray.width() {
            sum.push(window_sum(&sums, x, y));
            sum_sq.push(window_sum(&squares, x, y));
        }
    }
    BoxSums { sum, sum_sq }
}

/// Local standard deviation of a grayscale image, row-major.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn local_std_dev(gray: &GrayImage) -> Vec<f64> {
    let n = u64::from(WINDOW * WINDOW);
    let sums = box_sums(gray);
    sums.sum
        .iter()
        .zip(&sums.sum_sq)
        .map(|(&s, &sq)| {
            // n·Σv² ≥ (Σv)² by Cauchy-Schwarz, so this never underflows.
            let scaled_var = n * sq - s * s;
            (scaled_var as f64).sqrt() / n as f64
        })
        .collect()
}

/// Stretch a map linearly onto `[0, 255]`, truncating.
///
/// A constant map has no contrast to stretch and becomes all zeros.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn normalize_to_bytes(values: &[f64], width: u32, height: u32) -> GrayImage {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    let bytes = if range > 0.0 {
        values
            .iter()
            .map(|&v| ((v - min) / range * 255.0) as u8)
            .collect()
    } else {
        vec![0; values.len()]
    };
    GrayImage::from_raw(width, height, bytes).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Normalized roughness map of the preprocessed image.
#[must_use = "returns the roughness map"]
pub fn roughness(image: &RgbImage) -> GrayImage {
    let gray = luminance(image);
    let std = local_std_dev(&gray);
    normalize_to_bytes(&std, gray.width(), gray.height())
}

/// Binary texture mask: pixels rougher than `⌊255 · (1 − s)⌋`.
#[must_use = "returns the texture mask"]
pub fn texture_mask(image: &RgbImage, texture_sensitivity: f64) -> GrayImage {
    threshold_above(&roughness(image), acceptance_threshold(texture_sensitivity))
}
