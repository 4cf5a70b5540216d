//! Region extraction: outer borders of the fused mask and their shape
//! metrics, followed by the plausibility filter.
//!
//! Only outermost borders are traced; holes and borders nested inside
//! another region are ignored, so each connected patch becomes exactly
//! one [`Region`].

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::types::BoundingBox;

/// Regions whose bounding box is more elongated than this are rejected.
pub const MAX_ASPECT_RATIO: f64 = 10.0;

/// Regions filling less than this fraction of their box are rejected.
pub const MIN_EXTENT: f64 = 0.1;

/// A traced outer border with its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Inclusive pixel extent of the border.
    pub bounding_box: BoundingBox,
    /// Polygon area enclosed by the border's pixel centres.
    pub area: f64,
    /// Closed polygon length of the border.
    pub perimeter: f64,
}

impl Region {
    /// Measure a closed border. Returns `None` for an empty point list.
    #[must_use]
    pub fn from_border(points: &[Point<u32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        let mut twice_area = 0.0;
        let mut perimeter = 0.0;

        for (i, p) in points.iter().enumerate() {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);

            let q = &points[(i + 1) % points.len()];
            let (px, py) = (f64::from(p.x), f64::from(p.y));
            let (qx, qy) = (f64::from(q.x), f64::from(q.y));
            twice_area += px.mul_add(qy, -(qx * py));
            perimeter += (qx - px).hypot(qy - py);
        }

        Some(Self {
            bounding_box: BoundingBox {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            },
            area: twice_area.abs() / 2.0,
            perimeter,
        })
    }

    /// `4π·area / perimeter²`; 0 for a degenerate border.
    #[must_use]
    pub fn circularity(&self) -> f64 {
        if self.perimeter > 0.0 {
            4.0 * std::f64::consts::PI * self.area / (self.perimeter * self.perimeter)
        } else {
            0.0
        }
    }

    /// Bounding-box elongation, at least 1.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        self.bounding_box.aspect_ratio()
    }

    /// Area over bounding-box area.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extent(&self) -> f64 {
        self.area / self.bounding_box.area() as f64
    }
}

/// Trace the outermost borders of a binary mask, in raster discovery
/// order.
#[must_use]
pub fn trace_regions(mask: &GrayImage) -> Vec<Region> {
    find_contours::<u32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| Region::from_border(&c.points))
        .collect()
}

/// Why a region was dropped by [`RegionFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Area below the configured minimum.
    TooSmall,
    /// Bounding box longer than [`MAX_ASPECT_RATIO`] times its width.
    TooElongated,
    /// Fills less than [`MIN_EXTENT`] of its bounding box.
    TooSparse,
}

/// Plausibility checks applied to every traced region, in order: area,
/// elongation, sparseness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionFilter {
    min_area: f64,
}

impl RegionFilter {
    /// Filter with the given minimum area in pixels.
    #[must_use]
    pub fn new(min_area: u32) -> Self {
        Self {
            min_area: f64::from(min_area),
        }
    }

    /// Accept the region or name the first check it fails.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] reason for an implausible region.
    pub fn check(&self, region: &Region) -> Result<(), Rejection> {
        if region.area < self.min_area {
            return Err(Rejection::TooSmall);
        }
        if region.aspect_ratio() > MAX_ASPECT_RATIO {
            return Err(Rejection::TooElongated);
        }
        if region.extent() < MIN_EXTENT {
            return Err(Rejection::TooSparse);
        }
        Ok(())
    }
}

/// How many regions each check removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCounts {
    /// Removed by the area check.
    pub too_small: usize,
    /// Removed by the aspect-ratio check.
    pub too_elongated: usize,
    /// Removed by the extent check.
    pub too_sparse: usize,
}

impl RejectionCounts {
    fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::TooSmall => self.too_small += 1,
            Rejection::TooElongated => self.too_elongated += 1,
            Rejection::TooSparse => self.too_sparse += 1,
        }
    }

    /// Total rejected.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.too_small + self.too_elongated + self.too_sparse
    }
}

/// Surviving regions plus bookkeeping for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Regions that passed every check, in discovery order.
    pub regions: Vec<Region>,
    /// Number of outer borders traced before filtering.
    pub traced: usize,
    /// Per-check rejection counts.
    pub rejections: RejectionCounts,
}

/// Trace the fused mask and keep plausible regions.
#[must_use]
pub fn extract_regions(mask: &GrayImage, min_area: u32) -> Extraction {
    let filter = RegionFilter::new(min_area);
    let traced = trace_regions(mask);
    let count = traced.len();
    let mut rejections = RejectionCounts::default();
    let regions = traced
        .into_iter()
        .filter(|region| match filter.check(region) {
            Ok(()) => true,
            Err(reason) => {
                log::trace!(
                    "rejected region at {:?}: {reason:?} (area {:.1})",
                    region.bounding_box,
                    region.area
                );
                rejections.record(reason);
                false
            }
        })
        .collect();
    Extraction {
        regions,
        traced: count,
        rejections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn filled(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let inside = rects
                .iter()
                .any(|&(rx, ry, rw, rh)| (rx..rx + rw).contains(&x) && (ry..ry + rh).contains(&y));
            Luma([if inside { 255 } else { 0 }])
        })
    }

    fn square(x: u32, y: u32, side: u32) -> Region {
        Region {
            bounding_box: BoundingBox {
                x,
                y,
                width: side,
                height: side,
            },
            area: f64::from((side - 1) * (side - 1)),
            perimeter: f64::from(4 * (side - 1)),
        }
    }

    #[test]
    fn empty_mask_has_no_regions() {
        assert!(trace_regions(&GrayImage::new(10, 10)).is_empty());
    }

    #[test]
    fn rectangle_metrics() {
        let mask = filled(40, 40, &[(5, 8, 20, 10)]);
        let regions = trace_regions(&mask);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!(
            r.bounding_box,
            BoundingBox {
                x: 5,
                y: 8,
                width: 20,
                height: 10
            }
        );
        // Pixel-centre polygon is 19 × 9.
        assert!((r.area - 171.0).abs() < 1e-9, "area {}", r.area);
        assert!((r.perimeter - 56.0).abs() < 1e-9, "perimeter {}", r.perimeter);
        assert!((r.aspect_ratio() - 2.0).abs() < 1e-9);
        assert!((r.extent() - 171.0 / 200.0).abs() < 1e-9);
    }

    #[test]
    fn holes_and_nested_regions_are_ignored() {
        let mut mask = filled(40, 40, &[(5, 5, 30, 30)]);
        for y in 12..28 {
            for x in 12..28 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        for y in 17..23 {
            for x in 17..23 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let regions = trace_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bounding_box.width, 30);
    }

    #[test]
    fn separate_patches_are_separate_regions() {
        let mask = filled(60, 30, &[(2, 2, 10, 10), (30, 5, 12, 12)]);
        assert_eq!(trace_regions(&mask).len(), 2);
    }

    #[test]
    fn single_pixel_is_degenerate() {
        let mask = filled(10, 10, &[(4, 4, 1, 1)]);
        let regions = trace_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].area.abs() < f64::EPSILON);
        assert!(regions[0].circularity().abs() < f64::EPSILON);
        assert_eq!(regions[0].bounding_box.width, 1);
    }

    #[test]
    fn filter_checks_in_order() {
        let filter = RegionFilter::new(200);
        assert_eq!(filter.check(&square(0, 0, 10)), Err(Rejection::TooSmall));
        assert_eq!(filter.check(&square(0, 0, 40)), Ok(()));

        let long = Region {
            bounding_box: BoundingBox {
                x: 0,
                y: 0,
                width: 300,
                height: 20,
            },
            area: 5000.0,
            perimeter: 640.0,
        };
        assert_eq!(filter.check(&long), Err(Rejection::TooElongated));

        let sparse = Region {
            bounding_box: BoundingBox {
                x: 0,
                y: 0,
                width: 100,
                height: 100,
            },
            area: 900.0,
            perimeter: 2000.0,
        };
        assert_eq!(filter.check(&sparse), Err(Rejection::TooSparse));
    }

    #[test]
    fn boundary_values_pass() {
        let filter = RegionFilter::new(100);
        let exact = Region {
            bounding_box: BoundingBox {
                x: 0,
                y: 0,
                width: 100,
                height: 10,
            },
            area: 100.0,
            perimeter: 200.0,
        };
        // area == min, aspect == 10, extent == 0.1 are all accepted.
        assert_eq!(filter.check(&exact), Ok(()));
    }

    #[test]
    fn extraction_counts_rejections() {
        let mask = filled(100, 100, &[(5, 5, 30, 30), (60, 60, 5, 5), (50, 2, 45, 2)]);
        let extraction = extract_regions(&mask, 200);
        assert_eq!(extraction.traced, 3);
        assert_eq!(extraction.regions.len(), 1);
        assert_eq!(extraction.rejections.total(), 2);
        assert_eq!(extraction.rejections.too_small, 2);
    }
}
