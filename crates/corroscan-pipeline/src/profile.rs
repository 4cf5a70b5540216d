//! Rust-color profiles per pipeline type.
//!
//! Bounds are in 8-bit HSV: hue in `[0, 180)` (degrees halved), saturation
//! and value in `[0, 255]`. See [`crate::color::rgb_to_hsv`].

use serde::Serialize;

/// Inclusive lower/upper HSV bounds of one rust shade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HsvRange {
    /// Lower `[h, s, v]` bound, inclusive.
    pub lower: [u8; 3],
    /// Upper `[h, s, v]` bound, inclusive.
    pub upper: [u8; 3],
}

impl HsvRange {
    const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Whether an HSV triple lies within both bounds on every channel.
    #[must_use]
    pub const fn contains(&self, hsv: [u8; 3]) -> bool {
        hsv[0] >= self.lower[0]
            && hsv[0] <= self.upper[0]
            && hsv[1] >= self.lower[1]
            && hsv[1] <= self.upper[1]
            && hsv[2] >= self.lower[2]
            && hsv[2] <= self.upper[2]
    }
}

/// The set of HSV ranges considered rust-like, plus the texture
/// sensitivity used for the roughness channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorProfile {
    /// Rust shades; order is significant only for scoring sums.
    pub ranges: &'static [HsvRange],
    /// Fraction of the normalized roughness range treated as rough.
    pub texture_sensitivity: f64,
}

impl ColorProfile {
    /// Whether any range contains the HSV triple.
    #[must_use]
    pub fn matches(&self, hsv: [u8; 3]) -> bool {
        self.ranges.iter().any(|r| r.contains(hsv))
    }

    /// Number of ranges containing the HSV triple.
    #[must_use]
    pub fn match_count(&self, hsv: [u8; 3]) -> usize {
        self.ranges.iter().filter(|r| r.contains(hsv)).count()
    }
}

/// Marine pipelines: orange-brown, reddish-brown, and dark oxidation.
pub static SUBSEA: ColorProfile = ColorProfile {
    ranges: &[
        HsvRange::new([5, 50, 50], [15, 255, 255]),
        HsvRange::new([0, 50, 50], [10, 255, 255]),
        HsvRange::new([10, 50, 20], [25, 255, 150]),
    ],
    texture_sensitivity: 0.7,
};

/// Atmospheric corrosion on land pipelines.
pub static CROSS_COUNTRY: ColorProfile = ColorProfile {
    ranges: &[
        HsvRange::new([5, 70, 50], [15, 255, 255]),
        HsvRange::new([0, 60, 50], [10, 255, 255]),
        HsvRange::new([10, 50, 30], [20, 255, 200]),
    ],
    texture_sensitivity: 0.6,
};

/// Broad fallback: orange, red, brown, and yellow-brown rust.
pub static GENERAL: ColorProfile = ColorProfile {
    ranges: &[
        HsvRange::new([5, 50, 50], [15, 255, 255]),
        HsvRange::new([0, 50, 50], [10, 255, 255]),
        HsvRange::new([10, 50, 30], [25, 255, 200]),
        HsvRange::new([15, 50, 50], [30, 255, 255]),
    ],
    texture_sensitivity: 0.65,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PipelineType;

    #[test]
    fn every_pipeline_type_has_a_profile() {
        assert_eq!(PipelineType::Subsea.profile().ranges.len(), 3);
        assert_eq!(PipelineType::CrossCountry.profile().ranges.len(), 3);
        assert_eq!(PipelineType::Unknown.profile().ranges.len(), 4);
    }

    #[test]
    fn bounds_are_ordered() {
        for profile in [&SUBSEA, &CROSS_COUNTRY, &GENERAL] {
            assert!((0.0..=1.0).contains(&profile.texture_sensitivity));
            for r in profile.ranges {
                for c in 0..3 {
                    assert!(r.lower[c] <= r.upper[c], "{r:?}");
                }
                assert!(r.upper[0] < 180, "hue bound outside 8-bit hue space");
            }
        }
    }

    #[test]
    fn range_is_inclusive() {
        let r = HsvRange::new([5, 50, 50], [15, 255, 255]);
        assert!(r.contains([5, 50, 50]));
        assert!(r.contains([15, 255, 255]));
        assert!(!r.contains([4, 50, 50]));
        assert!(!r.contains([16, 100, 100]));
        assert!(!r.contains([10, 49, 100]));
    }

    #[test]
    fn overlapping_ranges_are_counted_separately() {
        // Hue 10 with moderate value sits in orange, red, and brown.
        assert_eq!(GENERAL.match_count([10, 200, 180]), 3);
        assert!(GENERAL.matches([10, 200, 180]));
    }

    #[test]
    fn gray_never_matches() {
        for v in [0, 64, 128, 255] {
            assert!(!GENERAL.matches([0, 0, v]));
            assert!(!SUBSEA.matches([0, 0, v]));
            assert!(!CROSS_COUNTRY.matches([0, 0, v]));
        }
    }
}
