//! Rust-color channel.
//!
//! Each HSV range of the active profile yields an in-range mask; the
//! masks are OR-ed and cleaned up morphologically, since rust color is
//! the strongest single cue but tends to be grainy and gappy.

use image::{GrayImage, Luma};

use crate::color::rgb_to_hsv;
use crate::mask::{ON, clean};
use crate::profile::{ColorProfile, HsvRange};
use crate::types::RgbImage;

/// Pixels whose HSV value lies inside `range`.
#[must_use = "returns the in-range mask"]
pub fn in_range(image: &RgbImage, range: &HsvRange) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let hsv = rgb_to_hsv(image.get_pixel(x, y).0);
        Luma([if range.contains(hsv) { ON } else { 0 }])
    })
}

/// Union of every range in the profile, before cleanup.
#[must_use = "returns the raw color mask"]
pub fn raw_color_mask(image: &RgbImage, profile: &ColorProfile) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let hsv = rgb_to_hsv(image.get_pixel(x, y).0);
        Luma([if profile.matches(hsv) { ON } else { 0 }])
    })
}

/// Cleaned rust-color mask of the preprocessed image.
#[must_use = "returns the color mask"]
pub fn color_mask(image: &RgbImage, profile: &ColorProfile) -> GrayImage {
    clean(&raw_color_mask(image, profile))
}
