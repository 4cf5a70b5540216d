//! Shared types for the corroscan detection pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::profile::ColorProfile;

/// Re-export `GrayImage` so downstream crates can reference the
/// intermediate masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the source
/// and annotated images without depending on `image` directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an image buffer.
    #[must_use]
    pub fn of<P: image::Pixel>(image: &image::ImageBuffer<P, Vec<P::Subpixel>>) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Which kind of pipeline was photographed.
///
/// Selects the [`ColorProfile`] used for rust-color segmentation and
/// the texture sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineType {
    /// Marine pipelines; tuned for dark, saturated oxidation.
    Subsea,
    /// Buried/atmospheric land pipelines.
    CrossCountry,
    /// Anything else; uses the broadest general profile.
    #[default]
    Unknown,
}

impl PipelineType {
    /// Parse a collaborator-supplied pipeline label.
    ///
    /// Matching ignores case and surrounding whitespace. `urban`,
    /// `industrial`, and every unrecognized label fall back to
    /// [`Unknown`](Self::Unknown).
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "subsea" => Self::Subsea,
            "cross-country" | "cross_country" | "crosscountry" | "cross country" => {
                Self::CrossCountry
            }
            _ => Self::Unknown,
        }
    }

    /// The color profile for this pipeline type.
    #[must_use]
    pub const fn profile(self) -> &'static ColorProfile {
        match self {
            Self::Subsea => &crate::profile::SUBSEA,
            Self::CrossCountry => &crate::profile::CROSS_COUNTRY,
            Self::Unknown => &crate::profile::GENERAL,
        }
    }

    /// Lowercase label, as accepted by [`from_label`](Self::from_label).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Subsea => "subsea",
            Self::CrossCountry => "cross-country",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PipelineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable per-run detection configuration.
///
/// Only constructible through [`try_new`](Self::try_new) (or
/// [`Default`]), so every value in circulation is within range.
/// Deserialization is routed through the same validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDetectionConfig", into = "RawDetectionConfig")]
pub struct DetectionConfig {
    sensitivity: f64,
    min_area: u32,
    pipeline_type: PipelineType,
}

impl DetectionConfig {
    /// Lowest accepted sensitivity.
    pub const MIN_SENSITIVITY: f64 = 0.1;
    /// Highest accepted sensitivity.
    pub const MAX_SENSITIVITY: f64 = 1.0;
    /// Lowest accepted minimum region area (pixels).
    pub const MIN_AREA_LOWER: u32 = 50;
    /// Highest accepted minimum region area (pixels).
    pub const MIN_AREA_UPPER: u32 = 10_000;

    /// Default fusion sensitivity.
    pub const DEFAULT_SENSITIVITY: f64 = 0.5;
    /// Default minimum region area (pixels).
    pub const DEFAULT_MIN_AREA: u32 = 200;

    /// Build a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `sensitivity` is not
    /// a finite value in `[0.1, 1.0]` or `min_area` is outside
    /// `[50, 10000]`.
    pub fn try_new(
        sensitivity: f64,
        min_area: u32,
        pipeline_type: PipelineType,
    ) -> Result<Self, PipelineError> {
        if !sensitivity.is_finite()
            || !(Self::MIN_SENSITIVITY..=Self::MAX_SENSITIVITY).contains(&sensitivity)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "sensitivity must be between {} and {}, got {sensitivity}",
                Self::MIN_SENSITIVITY,
                Self::MAX_SENSITIVITY,
            )));
        }
        if !(Self::MIN_AREA_LOWER..=Self::MIN_AREA_UPPER).contains(&min_area) {
            return Err(PipelineError::InvalidConfig(format!(
                "minimum area must be between {} and {} pixels, got {min_area}",
                Self::MIN_AREA_LOWER,
                Self::MIN_AREA_UPPER,
            )));
        }
        Ok(Self {
            sensitivity,
            min_area,
            pipeline_type,
        })
    }

    /// Fusion sensitivity in `[0.1, 1.0]`; higher accepts more pixels.
    #[must_use]
    pub const fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    /// Minimum accepted region area in pixels.
    #[must_use]
    pub const fn min_area(&self) -> u32 {
        self.min_area
    }

    /// Pipeline type selecting the color profile.
    #[must_use]
    pub const fn pipeline_type(&self) -> PipelineType {
        self.pipeline_type
    }

    /// The active color profile.
    #[must_use]
    pub const fn profile(&self) -> &'static ColorProfile {
        self.pipeline_type.profile()
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: Self::DEFAULT_SENSITIVITY,
            min_area: Self::DEFAULT_MIN_AREA,
            pipeline_type: PipelineType::Unknown,
        }
    }
}

/// Unvalidated wire form of [`DetectionConfig`].
#[derive(Serialize, Deserialize)]
struct RawDetectionConfig {
    sensitivity: f64,
    min_area: u32,
    #[serde(default)]
    pipeline_type: PipelineType,
}

impl TryFrom<RawDetectionConfig> for DetectionConfig {
    type Error = PipelineError;

    fn try_from(raw: RawDetectionConfig) -> Result<Self, Self::Error> {
        Self::try_new(raw.sensitivity, raw.min_area, raw.pipeline_type)
    }
}

impl From<DetectionConfig> for RawDetectionConfig {
    fn from(config: DetectionConfig) -> Self {
        Self {
            sensitivity: config.sensitivity,
            min_area: config.min_area,
            pipeline_type: config.pipeline_type,
        }
    }
}

/// Discrete maintenance-triage tier.
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Routine monitoring.
    Low,
    /// Maintenance within 90 days.
    Medium,
    /// Maintenance within 30 days.
    High,
    /// Immediate action.
    Critical,
}

impl Severity {
    /// All tiers, least severe first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Human-readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Maintenance recommendation for this tier.
    #[must_use]
    pub const fn risk_assessment(self) -> &'static str {
        match self {
            Self::Critical => "Immediate action required",
            Self::High => "Schedule maintenance within 30 days",
            Self::Medium => "Monitor and schedule maintenance within 90 days",
            Self::Low => "Monitor during next routine inspection",
        }
    }

    /// Dashboard color as a `#RRGGBB` string.
    #[must_use]
    pub const fn hex_color(self) -> &'static str {
        match self {
            Self::Critical => "#FF0000",
            Self::High => "#FF8C00",
            Self::Medium => "#FFD700",
            Self::Low => "#32CD32",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Axis-aligned pixel rectangle, inclusive of its edge pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels (at least 1).
    pub width: u32,
    /// Height in pixels (at least 1).
    pub height: u32,
}

impl BoundingBox {
    /// Area of the box in pixels.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// `max(w, h) / min(w, h)`; always at least 1.
    #[must_use]
    pub fn aspect_ratio(self) -> f64 {
        let long = self.width.max(self.height).max(1);
        let short = self.width.min(self.height).max(1);
        f64::from(long) / f64::from(short)
    }
}

/// One scored corrosion region.
///
/// Every field is consumed verbatim by reporting collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// 1-based rank by descending confidence.
    pub id: u32,
    /// Bounding box of the region.
    pub bounding_box: BoundingBox,
    /// Enclosed area in pixels, truncated.
    pub area: u32,
    /// Boundary length in pixels, truncated.
    pub perimeter: u32,
    /// `4π·area / perimeter²`.
    pub circularity: f64,
    /// `max(w, h) / min(w, h)` of the bounding box.
    pub aspect_ratio: f64,
    /// Area divided by bounding-box area.
    pub extent: f64,
    /// Fused confidence in `[0, 1]`.
    pub confidence: f64,
    /// Triage tier.
    pub severity: Severity,
    /// Recommendation text for [`severity`](Self::severity).
    pub risk_assessment: String,
}

/// Output of one detection run.
///
/// An empty `detections` list is a clean inspection, not a failure; in
/// that case `annotated` is an unmodified copy of the input.
///
/// Uses custom `Serialize`/`Deserialize` implementations because
/// `RgbImage` does not implement serde traits. The annotated image is
/// serialized as a `(width, height, raw_pixels)` tuple.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Detections sorted by descending confidence.
    pub detections: Vec<Detection>,
    /// Copy of the input with boxes and labels drawn on it.
    pub annotated: RgbImage,
}

impl DetectionResult {
    /// Whether nothing was flagged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.detections.is_empty()
    }

    /// Dimensions of the annotated image (equal to the input's).
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.annotated)
    }

    /// Aggregate counts for reporting.
    #[must_use]
    pub fn summary(&self) -> crate::summary::DetectionSummary {
        crate::summary::DetectionSummary::from_detections(&self.detections)
    }
}

#[derive(Serialize, Deserialize)]
struct DetectionResultProxy {
    detections: Vec<Detection>,
    annotated: (u32, u32, Vec<u8>),
}

impl Serialize for DetectionResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = DetectionResultProxy {
            detections: self.detections.clone(),
            annotated: (
                self.annotated.width(),
                self.annotated.height(),
                self.annotated.as_raw().clone(),
            ),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DetectionResult {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = DetectionResultProxy::deserialize(deserializer)?;
        let (width, height, raw) = proxy.annotated;
        let annotated = RgbImage::from_raw(width, height, raw)
            .ok_or_else(|| serde::de::Error::custom("invalid RGB image dimensions"))?;
        Ok(Self {
            detections: proxy.detections,
            annotated,
        })
    }
}

/// Detection result with every intermediate raster preserved.
///
/// Lets a viewer show what each channel contributed.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Blurred and contrast-enhanced copy of the input.
    pub preprocessed: RgbImage,
    /// Rust-color mask after morphological cleanup.
    pub color_mask: GrayImage,
    /// Local-roughness mask.
    pub texture_mask: GrayImage,
    /// Dilated edge mask.
    pub edge_mask: GrayImage,
    /// Fused decision mask that regions were traced from.
    pub combined_mask: GrayImage,
    /// Final detections and annotated image.
    pub result: DetectionResult,
}

/// Errors that can occur during detection.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image has zero area or an unsupported pixel layout.
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    /// Detection configuration is out of range.
    #[error("invalid detection configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidInput(String),
    InvalidConfig(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidInput(s) => PipelineErrorProxy::InvalidInput(s.clone()),
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed decode error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidInput(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidInput(s) => Self::InvalidInput(s),
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
        })
    }
}
