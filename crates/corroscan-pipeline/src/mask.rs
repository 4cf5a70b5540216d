//! Binary mask utilities shared by the detection channels.
//!
//! Masks are `GrayImage`s holding only 0 (background) or 255
//! (candidate corrosion). Cleanup morphology uses the 5×5 elliptical
//! structuring element below, anchored at its center.

use image::{GrayImage, Luma};
use imageproc::morphology::{self, Mask};

/// Foreground value.
pub const ON: u8 = 255;

/// Rows of the 5×5 elliptical cleanup element (21 pixels).
const CLEANUP_ELLIPSE: [[u8; 5]; 5] = [
    [0, 0, 1, 0, 0],
    [1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1],
    [0, 0, 1, 0, 0],
];

/// Byte threshold for a sensitivity-style knob: `⌊255 · (1 − s)⌋`.
///
/// Higher sensitivity yields a lower threshold. Inputs are clamped to
/// `[0, 1]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn acceptance_threshold(sensitivity: f64) -> u8 {
    (255.0 * (1.0 - sensitivity.clamp(0.0, 1.0))) as u8
}

/// Mark pixels strictly above `threshold` as foreground.
#[must_use = "returns the binary mask"]
pub fn threshold_above(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([if image.get_pixel(x, y).0[0] > threshold {
            ON
        } else {
            0
        }])
    })
}

/// The cleanup structuring element.
#[must_use]
pub fn cleanup_element() -> Mask {
    let shape = GrayImage::from_fn(5, 5, |x, y| {
        Luma([CLEANUP_ELLIPSE[y as usize][x as usize] * ON])
    });
    Mask::from_image(&shape, 2, 2)
}

/// Close (dilate then erode) to bridge small gaps, then open (erode then
/// dilate) to drop speckle.
#[must_use = "returns the cleaned mask"]
pub fn clean(mask: &GrayImage) -> GrayImage {
    let element = cleanup_element();
    let closed = morphology::grayscale_close(mask, &element);
    morphology::grayscale_open(&closed, &element)
}

/// Number of foreground pixels.
#[must_use]
pub fn count_on(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn paint(mask: &mut GrayImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) {
        for y in ys {
            for x in xs.clone() {
                mask.put_pixel(x, y, Luma([ON]));
            }
        }
    }

    #[test]
    fn acceptance_threshold_truncates() {
        assert_eq!(acceptance_threshold(0.5), 127);
        assert_eq!(acceptance_threshold(0.65), 89);
        assert_eq!(acceptance_threshold(1.0), 0);
        assert_eq!(acceptance_threshold(0.1), 229);
    }

    #[test]
    fn acceptance_threshold_is_monotone() {
        let mut previous = u8::MAX;
        for step in 1..=10 {
            let t = acceptance_threshold(f64::from(step) / 10.0);
            assert!(t <= previous);
            previous = t;
        }
    }

    #[test]
    fn threshold_is_strict() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[126, 127, 128][x as usize]]));
        let mask = threshold_above(&img, 127);
        assert_eq!(mask.as_raw(), &vec![0, 0, ON]);
    }

    #[test]
    fn cleanup_element_is_the_21_pixel_ellipse() {
        let mut canvas = GrayImage::new(9, 9);
        canvas.put_pixel(4, 4, Luma([ON]));
        let footprint = morphology::grayscale_dilate(&canvas, &cleanup_element());
        assert_eq!(count_on(&footprint), 21);
        assert_eq!(footprint.get_pixel(4, 2).0[0], ON);
        assert_eq!(footprint.get_pixel(2, 4).0[0], ON);
        assert_eq!(footprint.get_pixel(3, 3).0[0], ON);
        assert_eq!(footprint.get_pixel(2, 2).0[0], 0);
        assert_eq!(footprint.get_pixel(6, 6).0[0], 0);
    }

    #[test]
    fn clean_removes_speckle() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(10, 10, Luma([ON]));
        assert_eq!(count_on(&clean(&mask)), 0);
    }

    #[test]
    fn clean_removes_thirteen_pixel_diamond() {
        // An L1 ball of radius 2 cannot contain the ellipse.
        let mut mask = GrayImage::new(21, 21);
        for y in 8..=12_i32 {
            for x in 8..=12_i32 {
                if (x - 10).abs() + (y - 10).abs() <= 2 {
                    mask.put_pixel(x as u32, y as u32, Luma([ON]));
                }
            }
        }
        assert_eq!(count_on(&mask), 13);
        assert_eq!(count_on(&clean(&mask)), 0);
    }

    #[test]
    fn clean_removes_strips_narrower_than_five() {
        let mut mask = GrayImage::new(40, 40);
        paint(&mut mask, 10..14, 5..35);
        assert_eq!(count_on(&clean(&mask)), 0);
    }

    #[test]
    fn clean_keeps_five_wide_strips() {
        let mut mask = GrayImage::new(40, 40);
        paint(&mut mask, 10..15, 5..35);
        let cleaned = clean(&mask);
        assert_eq!(cleaned.get_pixel(12, 20).0[0], ON);
        assert_eq!(cleaned.get_pixel(10, 20).0[0], ON);
        assert_eq!(cleaned.get_pixel(15, 20).0[0], 0);
    }

    #[test]
    fn clean_keeps_solid_blocks() {
        let mut mask = GrayImage::new(40, 40);
        paint(&mut mask, 10..30, 10..30);
        let cleaned = clean(&mask);
        assert_eq!(cleaned.get_pixel(20, 20).0[0], ON);
        assert_eq!(cleaned.get_pixel(2, 2).0[0], 0);
        // Three pixels at each corner fall outside every ellipse placement.
        assert_eq!(count_on(&cleaned), 400 - 12);
        assert_eq!(cleaned.get_pixel(11, 10).0[0], 0);
        assert_eq!(cleaned.get_pixel(12, 10).0[0], ON);
    }

    #[test]
    fn clean_keeps_blocks_touching_the_border() {
        let mut mask = GrayImage::new(30, 30);
        paint(&mut mask, 0..12, 0..12);
        let cleaned = clean(&mask);
        assert_eq!(cleaned.get_pixel(2, 2).0[0], ON);
        assert_eq!(cleaned.get_pixel(6, 6).0[0], ON);
        assert!(count_on(&cleaned) >= 100);
    }

    #[test]
    fn clean_fills_pinholes() {
        let mut mask = GrayImage::from_pixel(30, 30, Luma([ON]));
        mask.put_pixel(15, 15, Luma([0]));
        assert_eq!(clean(&mask).get_pixel(15, 15).0[0], ON);
    }
}
