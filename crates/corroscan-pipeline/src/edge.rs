//! Edge-density channel.
//!
//! Canny edges of the luminance image, dilated so that dense edge
//! networks (flaking, pitting) grow into solid regions while isolated
//! straight edges stay thin.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use crate::canny::canny;
use crate::color::luminance;
use crate::types::RgbImage;

/// Lower hysteresis threshold on L1 gradient magnitude.
pub const CANNY_LOW: f32 = 50.0;

/// Upper hysteresis threshold on L1 gradient magnitude.
pub const CANNY_HIGH: f32 = 150.0;

/// Dilation reach in pixels: two passes of a 3×3 cross, i.e. a diamond
/// of radius 2.
pub const DILATION_RADIUS: u8 = 2;

/// Raw Canny edges of the image's luminance.
#[must_use = "returns the binary edge map"]
pub fn edges(image: &RgbImage) -> GrayImage {
    canny(&luminance(image), CANNY_LOW, CANNY_HIGH)
}

/// Grow an edge map by [`DILATION_RADIUS`].
#[must_use = "returns the dilated edge map"]
pub fn dilate_edges(edges: &GrayImage) -> GrayImage {
    dilate(edges, Norm::L1, DILATION_RADIUS)
}

/// Binary edge-density mask of the preprocessed image.
#[must_use = "returns the edge mask"]
pub fn edge_mask(image: &RgbImage) -> GrayImage {
    dilate_edges(&edges(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::count_on;
    use image::Rgb;

    #[test]
    fn flat_image_has_no_edges() {
        let img = RgbImage::from_pixel(25, 25, Rgb([90, 90, 90]));
        assert_eq!(count_on(&edge_mask(&img)), 0);
    }

    #[test]
    fn dilation_widens_a_step_edge() {
        let img = RgbImage::from_fn(30, 30, |x, _| {
            if x < 15 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let raw = count_on(&edges(&img));
        let mask = edge_mask(&img);
        assert!(count_on(&mask) > raw);
        assert_eq!(mask.get_pixel(16, 15).0[0], 255);
        assert_eq!(mask.get_pixel(12, 15).0[0], 255);
        assert_eq!(mask.get_pixel(5, 15).0[0], 0);
        assert_eq!(mask.get_pixel(25, 15).0[0], 0);
    }

    #[test]
    fn mask_is_binary() {
        let img = RgbImage::from_fn(20, 20, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([20, 20, 20])
            } else {
                Rgb([220, 220, 220])
            }
        });
        assert!(edge_mask(&img).pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }
}
