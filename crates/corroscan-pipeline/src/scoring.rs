//! Confidence scoring and severity triage of plausible regions.
//!
//! Confidence blends three cues: how rust-colored the region's bounding
//! box is in the original image, whether its shape looks like a
//! corrosion patch, and how large it is.

use crate::color::rgb_to_hsv;
use crate::contour::Region;
use crate::profile::ColorProfile;
use crate::types::{BoundingBox, Detection, RgbImage, Severity};

/// Shape score before bonuses.
pub const SHAPE_BASE: f64 = 0.5;

/// Bonus for each shape cue that looks like corrosion.
pub const SHAPE_BONUS: f64 = 0.2;

/// Circularity range of irregular but compact patches.
pub const CIRCULARITY_RANGE: (f64, f64) = (0.3, 0.8);

/// Extent range of patches that neither fill their box nor are wiry.
pub const EXTENT_RANGE: (f64, f64) = (0.3, 0.9);

/// Area at which the size score saturates.
pub const SIZE_SATURATION_AREA: f64 = 2000.0;

/// Weights of the color, shape and size scores.
pub const CONFIDENCE_WEIGHTS: (f64, f64, f64) = (0.5, 0.3, 0.2);

/// `(minimum area, minimum confidence, severity)`, checked in order; both
/// bounds are exclusive. Anything below the last tier is
/// [`Severity::Low`].
pub const SEVERITY_TIERS: [(f64, f64, Severity); 3] = [
    (5000.0, 0.8, Severity::Critical),
    (2000.0, 0.6, Severity::High),
    (800.0, 0.4, Severity::Medium),
];

/// Sum over profile ranges of the fraction of box pixels in that range,
/// capped at 1.
///
/// Overlapping ranges count a pixel once per range, so strongly
/// rust-colored boxes saturate quickly. The box is clipped to the image;
/// an empty intersection scores 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn color_score(image: &RgbImage, bbox: BoundingBox, profile: &ColorProfile) -> f64 {
    let x_end = bbox.x.saturating_add(bbox.width).min(image.width());
    let y_end = bbox.y.saturating_add(bbox.height).min(image.height());
    if bbox.x >= x_end || bbox.y >= y_end {
        return 0.0;
    }

    let mut matches = 0usize;
    for y in bbox.y..y_end {
        for x in bbox.x..x_end {
            matches += profile.match_count(rgb_to_hsv(image.get_pixel(x, y).0));
        }
    }
    let total = u64::from(x_end - bbox.x) * u64::from(y_end - bbox.y);
    (matches as f64 / total as f64).min(1.0)
}

/// Base score plus a bonus per in-range shape cue (bounds inclusive).
#[must_use]
pub fn shape_score(circularity: f64, extent: f64) -> f64 {
    let within = |v: f64, (lo, hi): (f64, f64)| (lo..=hi).contains(&v);
    let mut score = SHAPE_BASE;
    if within(circularity, CIRCULARITY_RANGE) {
        score += SHAPE_BONUS;
    }
    if within(extent, EXTENT_RANGE) {
        score += SHAPE_BONUS;
    }
    score
}

/// `min(area / 2000, 1)`.
#[must_use]
pub fn size_score(area: f64) -> f64 {
    (area / SIZE_SATURATION_AREA).min(1.0)
}

/// Weighted blend of the three scores, clamped to `[0, 1]`.
#[must_use]
pub fn confidence(color: f64, shape: f64, size: f64) -> f64 {
    let (wc, ws, wz) = CONFIDENCE_WEIGHTS;
    wc.mul_add(color, ws.mul_add(shape, wz * size))
        .clamp(0.0, 1.0)
}

/// First tier whose area and confidence are both strictly exceeded.
#[must_use]
pub fn classify_severity(area: f64, confidence: f64) -> Severity {
    SEVERITY_TIERS
        .iter()
        .find(|(min_area, min_conf, _)| area > *min_area && confidence > *min_conf)
        .map_or(Severity::Low, |&(_, _, severity)| severity)
}

/// Score one region against the original image. The id is left at 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn score_region(region: &Region, original: &RgbImage, profile: &ColorProfile) -> Detection {
    let circularity = region.circularity();
    let extent = region.extent();
    let confidence = confidence(
        color_score(original, region.bounding_box, profile),
        shape_score(circularity, extent),
        size_score(region.area),
    );
    let severity = classify_severity(region.area, confidence);
    Detection {
        id: 0,
        bounding_box: region.bounding_box,
        area: region.area as u32,
        perimeter: region.perimeter as u32,
        circularity,
        aspect_ratio: region.aspect_ratio(),
        extent,
        confidence,
        severity,
        risk_assessment: severity.risk_assessment().to_owned(),
    }
}

/// Score every region, sort by descending confidence (stable, so ties
/// keep discovery order), and number them from 1.
#[must_use]
pub fn score_regions(regions: &[Region], original: &RgbImage, profile: &ColorProfile) -> Vec<Detection> {
    let mut detections: Vec<Detection> = regions
        .iter()
        .map(|r| score_region(r, original, profile))
        .collect();
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    for (id, detection) in (1..).zip(detections.iter_mut()) {
        detection.id = id;
    }
    detections
}
