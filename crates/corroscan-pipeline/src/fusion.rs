//! Weighted fusion of the three channel masks into one detection mask.
//!
//! Evidence is accumulated exactly in tenths of a byte: a pixel scores
//! `5·color + 3·texture + 2·edge` on a `0..=2550` scale, which is the
//! `0.5 / 0.3 / 0.2` blend multiplied by ten. A pixel is accepted when its
//! evidence reaches `2550 · (1 − s)`, so exact ties pass. At the default
//! sensitivity this accepts rust color on its own and, symmetrically,
//! texture and edges together. The fused mask receives the same
//! close-then-open cleanup as the color channel.

use image::{GrayImage, Luma};

use crate::mask::{ON, clean};

/// Channel weights in tenths; they sum to [`EVIDENCE_SCALE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionWeights {
    /// Rust-color weight.
    pub color: u16,
    /// Roughness weight.
    pub texture: u16,
    /// Edge-density weight.
    pub edge: u16,
}

/// Color dominates; texture and edges corroborate.
pub const FUSION_WEIGHTS: FusionWeights = FusionWeights {
    color: 5,
    texture: 3,
    edge: 2,
};

/// Evidence of a pixel that is on in every channel.
pub const EVIDENCE_SCALE: u16 = 10 * ON as u16;

/// Weighted evidence of one pixel, in `0..=EVIDENCE_SCALE`.
#[must_use]
pub fn evidence(color: u8, texture: u8, edge: u8) -> u16 {
    let w = FUSION_WEIGHTS;
    w.color * u16::from(color) + w.texture * u16::from(texture) + w.edge * u16::from(edge)
}

/// Minimum evidence accepted at `sensitivity`: `round(2550 · (1 − s))`.
///
/// Never below 1, so a pixel with no evidence is never accepted.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn acceptance_level(sensitivity: f64) -> u16 {
    let level = (f64::from(EVIDENCE_SCALE) * (1.0 - sensitivity.clamp(0.0, 1.0))).round() as u16;
    level.max(1)
}

/// Fuse the channels and keep pixels whose evidence reaches the level.
///
/// The output takes the color mask's size and treats missing pixels in
/// the other masks as background.
#[must_use = "returns the fused mask"]
pub fn fuse(
    color: &GrayImage,
    texture: &GrayImage,
    edge: &GrayImage,
    sensitivity: f64,
) -> GrayImage {
    let level = acceptance_level(sensitivity);
    let sample = |m: &GrayImage, x: u32, y: u32| m.get_pixel_checked(x, y).map_or(0, |p| p.0[0]);
    let raw = GrayImage::from_fn(color.width(), color.height(), |x, y| {
        let score = evidence(sample(color, x, y), sample(texture, x, y), sample(edge, x, y));
        Luma([if score >= level { ON } else { 0 }])
    });
    clean(&raw)
}
