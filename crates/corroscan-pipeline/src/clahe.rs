//! Contrast-limited adaptive histogram equalization.
//!
//! The image is split into a grid of tiles (padded by mirroring so every
//! tile has the same pixel count). Each tile gets a clipped, equalized
//! lookup table; output pixels blend the four nearest tile tables
//! bilinearly so tile seams do not show.

use image::{GrayImage, Luma};

use crate::border::reflect_101;

/// Histogram clip limit, as a multiple of the mean bin height.
pub const CLIP_LIMIT: f32 = 2.0;

/// Tiles per axis.
pub const TILE_GRID: u32 = 8;

const BINS: usize = 256;

/// Equalize `image` with the given clip limit and tiles-per-axis.
///
/// A non-positive `clip_limit` disables clipping (plain adaptive
/// equalization). A `grid` of 0 is treated as 1.
#[must_use = "returns the equalized image"]
pub fn clahe(image: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let grid = grid.max(1);
    let tile_w = w.div_ceil(grid);
    let tile_h = h.div_ceil(grid);

    let luts: Vec<[u8; BINS]> = (0..grid)
        .flat_map(|ty| (0..grid).map(move |tx| (tx, ty)))
        .map(|(tx, ty)| tile_lut(image, tx * tile_w, ty * tile_h, tile_w, tile_h, clip_limit))
        .collect();

    interpolate(image, &luts, grid, tile_w, tile_h)
}

/// Clipped, equalized lookup table for one tile.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn tile_lut(
    image: &GrayImage,
    x0: u32,
    y0: u32,
    tile_w: u32,
    tile_h: u32,
    clip_limit: f32,
) -> [u8; BINS] {
    let (w, h) = image.dimensions();
    let mut hist = [0u32; BINS];
    for y in y0..y0 + tile_h {
        let sy = reflect_101(i64::from(y), h);
        for x in x0..x0 + tile_w {
            let sx = reflect_101(i64::from(x), w);
            hist[usize::from(image.get_pixel(sx, sy).0[0])] += 1;
        }
    }

    let area = tile_w * tile_h;
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        clip_histogram(&mut hist, limit);
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; BINS];
    let mut cumulative = 0u32;
    for (out, &count) in lut.iter_mut().zip(&hist) {
        cumulative += count;
        *out = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Cap every bin at `limit` and spread the excess evenly.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let bins = BINS as u32;
    let per_bin = excess / bins;
    let mut residual = excess - per_bin * bins;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if residual > 0 {
        let step = (bins / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }
}

/// Blend the four nearest tile tables for every pixel.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
fn interpolate(
    image: &GrayImage,
    luts: &[[u8; BINS]],
    grid: u32,
    tile_w: u32,
    tile_h: u32,
) -> GrayImage {
    let last = grid as i64 - 1;
    // (low tile, high tile, weight of high tile) along one axis.
    let axis = |pos: u32, tile: u32| {
        let f = pos as f32 / tile as f32 - 0.5;
        let lo = f.floor();
        let weight = f - lo;
        let lo = lo as i64;
        (lo.max(0) as usize, (lo + 1).min(last) as usize, weight)
    };

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = usize::from(image.get_pixel(x, y).0[0]);
        let (tx1, tx2, xa) = axis(x, tile_w);
        let (ty1, ty2, ya) = axis(y, tile_h);
        let g = grid as usize;
        let at = |tx: usize, ty: usize| f32::from(luts[ty * g + tx][v]);

        let top = at(tx1, ty1).mul_add(1.0 - xa, at(tx2, ty1) * xa);
        let bottom = at(tx1, ty2).mul_add(1.0 - xa, at(tx2, ty2) * xa);
        let out = top.mul_add(1.0 - ya, bottom * ya);
        Luma([out.round().clamp(0.0, 255.0) as u8])
    })
}
