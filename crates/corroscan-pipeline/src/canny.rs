//! Canny edge detection.
//!
//! Sobel gradients with L1 magnitude, non-maximum suppression along the
//! quantized gradient direction, then hysteresis tracing over all eight
//! neighbors with explicit bounds checks. The input is expected to be
//! smoothed already; no blur is applied here.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Edge pixel value in the output map.
const EDGE: u8 = 255;

const NEIGHBORS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Quantized gradient direction, in image coordinates (y down).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Direction {
    fn of(gx: f32, gy: f32) -> Self {
        let mut angle = gy.atan2(gx).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if (22.5..67.5).contains(&angle) {
            Self::Diagonal
        } else if (67.5..112.5).contains(&angle) {
            Self::Vertical
        } else if (112.5..157.5).contains(&angle) {
            Self::AntiDiagonal
        } else {
            Self::Horizontal
        }
    }

    /// Offsets of the two neighbors along the gradient.
    const fn across(self) -> [(i64, i64); 2] {
        match self {
            Self::Horizontal => [(-1, 0), (1, 0)],
            Self::Diagonal => [(1, 1), (-1, -1)],
            Self::Vertical => [(0, -1), (0, 1)],
            Self::AntiDiagonal => [(-1, 1), (1, -1)],
        }
    }
}

/// Row-major gradient magnitudes with the image dimensions.
struct Magnitudes {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Magnitudes {
    fn get(&self, x: i64, y: i64) -> Option<f32> {
        let (x, y) = (u32::try_from(x).ok()?, u32::try_from(y).ok()?);
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values.get((y * self.width + x) as usize).copied()
    }
}

/// Detect edges; returns 255 on edge pixels and 0 elsewhere.
///
/// Pixels with magnitude `>= high` seed edges, which then grow through
/// 8-connected pixels with magnitude `>= low`. `low` is clamped to at
/// most `high`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let low = low.min(high);
    let (width, height) = image.dimensions();

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);

    let magnitudes = Magnitudes {
        width,
        height,
        values: gx
            .pixels()
            .zip(gy.pixels())
            .map(|(h, v)| f32::from(h.0[0]).abs() + f32::from(v.0[0]).abs())
            .collect(),
    };

    let thinned = suppress_non_maxima(&magnitudes, &gx, &gy);
    hysteresis(&thinned, low, high)
}

/// Keep only pixels that are local maxima across their gradient.
fn suppress_non_maxima(
    magnitudes: &Magnitudes,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Magnitudes {
    let mut values = vec![0.0; magnitudes.values.len()];
    for (x, y, h) in gx.enumerate_pixels() {
        let (xi, yi) = (i64::from(x), i64::from(y));
        let Some(m) = magnitudes.get(xi, yi) else {
            continue;
        };
        if m == 0.0 {
            continue;
        }
        let v = gy.get_pixel(x, y).0[0];
        let direction = Direction::of(f32::from(h.0[0]), f32::from(v));
        let is_max = direction
            .across()
            .iter()
            .all(|&(dx, dy)| magnitudes.get(xi + dx, yi + dy).is_none_or(|n| m >= n));
        if is_max {
            values[(y * magnitudes.width + x) as usize] = m;
        }
    }
    Magnitudes {
        width: magnitudes.width,
        height: magnitudes.height,
        values,
    }
}

/// Trace edges from strong seeds through weak pixels.
fn hysteresis(thinned: &Magnitudes, low: f32, high: f32) -> GrayImage {
    let mut out = GrayImage::new(thinned.width, thinned.height);
    let mut stack = Vec::new();

    for y in 0..thinned.height {
        for x in 0..thinned.width {
            let seed = thinned.get(i64::from(x), i64::from(y)).unwrap_or(0.0);
            if seed < high || out.get_pixel(x, y).0[0] == EDGE {
                continue;
            }
            out.put_pixel(x, y, Luma([EDGE]));
            stack.push((i64::from(x), i64::from(y)));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBORS {
                    let (nx, ny) = (cx + dx, cy + dy);
                    let Some(m) = thinned.get(nx, ny) else {
                        continue;
                    };
                    // In bounds, so both coordinates fit in u32.
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let (ux, uy) = (nx as u32, ny as u32);
                    if m >= low && out.get_pixel(ux, uy).0[0] != EDGE {
                        out.put_pixel(ux, uy, Luma([EDGE]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}
