//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use corroscan_pipeline::{DetectionConfig, Pipeline, PipelineError, RgbImage};
//! # fn run(image: RgbImage) -> Result<(), PipelineError> {
//! let staged = Pipeline::new(image, DetectionConfig::default())
//!     .preprocess()?
//!     .detect_channels()
//!     .fuse()
//!     .extract_regions()
//!     .score()
//!     .annotate()
//!     .into_staged();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for the one fallible stage), carrying the intermediates
//! computed so far. Masks are owned values handed from stage to stage;
//! no buffer is shared or mutated across channels.
//!
//! # Memory
//!
//! From [`ChannelsDetected`] onward every state keeps the original and
//! preprocessed images plus up to four full-size masks, because
//! [`StagedResult`] returns all of them. Callers that only want the
//! detections should use [`Annotated::into_result`], which drops the
//! masks.

use crate::contour::Extraction;
use crate::diagnostics::StageMetrics;
use crate::fusion::acceptance_level;
use crate::mask::{acceptance_threshold, count_on};
use crate::stats::ImageStats;
use crate::summary::DetectionSummary;
use crate::types::{
    Detection, DetectionConfig, DetectionResult, GrayImage, PipelineError, RgbImage, StagedResult,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`preprocess`](Self::preprocess) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .preprocess() to continue"]
pub struct Pending {
    config: DetectionConfig,
    original: RgbImage,
}

impl Pending {
    /// The source image.
    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.original
    }

    /// Blur and contrast-enhance the source image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the image has zero
    /// area.
    pub fn preprocess(self) -> Result<Preprocessed, PipelineError> {
        let preprocessed = crate::preprocess::preprocess(&self.original)?;
        log::debug!(
            "preprocessed {}x{} image",
            preprocessed.width(),
            preprocessed.height()
        );
        Ok(Preprocessed {
            config: self.config,
            original: self.original,
            preprocessed,
        })
    }
}

// ───────────────────────── Stage 1: Preprocessed ─────────────────────

/// Pipeline state after blur and contrast enhancement.
///
/// Call [`detect_channels`](Self::detect_channels) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .detect_channels() to continue"]
pub struct Preprocessed {
    config: DetectionConfig,
    original: RgbImage,
    preprocessed: RgbImage,
}

impl Preprocessed {
    /// The enhanced image every detector reads.
    #[must_use]
    pub const fn preprocessed(&self) -> &RgbImage {
        &self.preprocessed
    }

    /// Run the color, texture and edge detectors on the preprocessed
    /// image. The three channels are independent of one another.
    pub fn detect_channels(self) -> ChannelsDetected {
        let profile = self.config.profile();
        let color_mask = crate::color_mask::color_mask(&self.preprocessed, profile);
        let texture_mask =
            crate::texture::texture_mask(&self.preprocessed, profile.texture_sensitivity);
        let raw_edges = crate::edge::edges(&self.preprocessed);
        let raw_edge_pixels = count_on(&raw_edges);
        let edge_mask = crate::edge::dilate_edges(&raw_edges);
        log::debug!(
            "channels: color={} texture={} edge={} (raw {raw_edge_pixels})",
            count_on(&color_mask),
            count_on(&texture_mask),
            count_on(&edge_mask),
        );
        ChannelsDetected {
            config: self.config,
            original: self.original,
            preprocessed: self.preprocessed,
            color_mask,
            texture_mask,
            edge_mask,
            raw_edge_pixels,
        }
    }
}

// ───────────────────────── Stage 2: ChannelsDetected ─────────────────

/// Pipeline state holding the three channel masks.
///
/// Call [`fuse`](Self::fuse) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .fuse() to continue"]
pub struct ChannelsDetected {
    config: DetectionConfig,
    original: RgbImage,
    preprocessed: RgbImage,
    color_mask: GrayImage,
    texture_mask: GrayImage,
    edge_mask: GrayImage,
    raw_edge_pixels: u64,
}

impl ChannelsDetected {
    /// Cleaned rust-color mask.
    #[must_use]
    pub const fn color_mask(&self) -> &GrayImage {
        &self.color_mask
    }

    /// Roughness mask.
    #[must_use]
    pub const fn texture_mask(&self) -> &GrayImage {
        &self.texture_mask
    }

    /// Dilated edge mask.
    #[must_use]
    pub const fn edge_mask(&self) -> &GrayImage {
        &self.edge_mask
    }

    /// Combine the channels into one decision mask.
    pub fn fuse(self) -> Fused {
        let combined_mask = crate::fusion::fuse(
            &self.color_mask,
            &self.texture_mask,
            &self.edge_mask,
            self.config.sensitivity(),
        );
        log::debug!("fused mask: {} pixels", count_on(&combined_mask));
        Fused {
            config: self.config,
            original: self.original,
            preprocessed: self.preprocessed,
            color_mask: self.color_mask,
            texture_mask: self.texture_mask,
            edge_mask: self.edge_mask,
            combined_mask,
        }
    }
}

// ───────────────────────── Stage 3: Fused ────────────────────────────

/// Pipeline state after mask fusion.
///
/// Call [`extract_regions`](Self::extract_regions) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .extract_regions() to continue"]
pub struct Fused {
    config: DetectionConfig,
    original: RgbImage,
    preprocessed: RgbImage,
    color_mask: GrayImage,
    texture_mask: GrayImage,
    edge_mask: GrayImage,
    combined_mask: GrayImage,
}

impl Fused {
    /// The fused decision mask.
    #[must_use]
    pub const fn combined_mask(&self) -> &GrayImage {
        &self.combined_mask
    }

    /// Trace region borders in the fused mask and drop implausible ones.
    pub fn extract_regions(self) -> RegionsExtracted {
        let extraction =
            crate::contour::extract_regions(&self.combined_mask, self.config.min_area());
        log::debug!(
            "regions: {} traced, {} kept",
            extraction.traced,
            extraction.regions.len()
        );
        RegionsExtracted {
            config: self.config,
            original: self.original,
            preprocessed: self.preprocessed,
            color_mask: self.color_mask,
            texture_mask: self.texture_mask,
            edge_mask: self.edge_mask,
            combined_mask: self.combined_mask,
            extraction,
        }
    }
}

// ───────────────────────── Stage 4: RegionsExtracted ─────────────────

/// Pipeline state holding the plausible regions.
///
/// Call [`score`](Self::score) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .score() to continue"]
pub struct RegionsExtracted {
    config: DetectionConfig,
    original: RgbImage,
    preprocessed: RgbImage,
    color_mask: GrayImage,
    texture_mask: GrayImage,
    edge_mask: GrayImage,
    combined_mask: GrayImage,
    extraction: Extraction,
}

impl RegionsExtracted {
    /// Surviving regions and filter bookkeeping.
    #[must_use]
    pub const fn extraction(&self) -> &Extraction {
        &self.extraction
    }

    /// Score regions against the original image and rank them.
    pub fn score(self) -> Scored {
        let detections = crate::scoring::score_regions(
            &self.extraction.regions,
            &self.original,
            self.config.profile(),
        );
        log::debug!("scored {} detections", detections.len());
        Scored {
            config: self.config,
            original: self.original,
            preprocessed: self.preprocessed,
            color_mask: self.color_mask,
            texture_mask: self.texture_mask,
            edge_mask: self.edge_mask,
            combined_mask: self.combined_mask,
            detections,
        }
    }
}

// ───────────────────────── Stage 5: Scored ───────────────────────────

/// Pipeline state holding the ranked detections.
///
/// Call [`annotate`](Self::annotate) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .annotate() to continue"]
pub struct Scored {
    config: DetectionConfig,
    original: RgbImage,
    preprocessed: RgbImage,
    color_mask: GrayImage,
    texture_mask: GrayImage,
    edge_mask: GrayImage,
    combined_mask: GrayImage,
    detections: Vec<Detection>,
}

impl Scored {
    /// Detections sorted by descending confidence.
    #[must_use]
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Draw the detections onto a copy of the original image.
    pub fn annotate(self) -> Annotated {
        let annotated = crate::annotate::annotate(&self.original, &self.detections);
        Annotated {
            config: self.config,
            preprocessed: self.preprocessed,
            color_mask: self.color_mask,
            texture_mask: self.texture_mask,
            edge_mask: self.edge_mask,
            combined_mask: self.combined_mask,
            detections: self.detections,
            annotated,
        }
    }
}

// ───────────────────────── Stage 6: Annotated ────────────────────────

/// Final pipeline state.
#[must_use = "call .into_result() or .into_staged() to take the output"]
pub struct Annotated {
    config: DetectionConfig,
    preprocessed: RgbImage,
    color_mask: GrayImage,
    texture_mask: GrayImage,
    edge_mask: GrayImage,
    combined_mask: GrayImage,
    detections: Vec<Detection>,
    annotated: RgbImage,
}

impl Annotated {
    /// The annotated image.
    #[must_use]
    pub const fn annotated(&self) -> &RgbImage {
        &self.annotated
    }

    /// Configuration the run used.
    #[must_use]
    pub const fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detections and annotated image, discarding intermediates.
    #[must_use]
    pub fn into_result(self) -> DetectionResult {
        DetectionResult {
            detections: self.detections,
            annotated: self.annotated,
        }
    }

    /// Detections plus every intermediate raster.
    #[must_use]
    pub fn into_staged(self) -> StagedResult {
        StagedResult {
            preprocessed: self.preprocessed,
            color_mask: self.color_mask,
            texture_mask: self.texture_mask,
            edge_mask: self.edge_mask,
            combined_mask: self.combined_mask,
            result: DetectionResult {
                detections: self.detections,
                annotated: self.annotated,
            },
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 7;

/// Trait implemented by every pipeline stage, enabling uniform iteration.
pub trait PipelineStage: Sized {
    /// Short name of this stage (e.g. `"source"`, `"fuse"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `6` for
    /// Annotated).
    const INDEX: usize;

    /// Metrics describing the work done to reach this state; `None` for
    /// [`Pending`].
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance one stage. The final stage returns itself.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] when preprocessing
    /// rejects the image.
    fn next(self) -> Result<Stage, PipelineError>;

    /// Run all remaining stages and return the [`StagedResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a remaining fallible stage fails.
    fn complete(self) -> Result<StagedResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Stage, PipelineError> {
        Ok(Stage::Preprocessed(self.preprocess()?))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.preprocess()?.complete()
    }
}

impl PipelineStage for Preprocessed {
    const NAME: &str = "preprocess";
    const INDEX: usize = 1;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Preprocess {
            width: self.preprocessed.width(),
            height: self.preprocessed.height(),
            mean_brightness_before: ImageStats::from_rgb(&self.original).mean_brightness,
            mean_brightness_after: ImageStats::from_rgb(&self.preprocessed).mean_brightness,
        })
    }

    fn next(self) -> Result<Stage, PipelineError> {
        Ok(Stage::ChannelsDetected(self.detect_channels()))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.detect_channels().complete()
    }
}

impl PipelineStage for ChannelsDetected {
    const NAME: &str = "detect_channels";
    const INDEX: usize = 2;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Channels {
            color_pixels: count_on(&self.color_mask),
            texture_pixels: count_on(&self.texture_mask),
            texture_threshold: acceptance_threshold(self.config.profile().texture_sensitivity),
            raw_edge_pixels: self.raw_edge_pixels,
            edge_pixels: count_on(&self.edge_mask),
            total_pixels: u64::from(self.color_mask.width()) * u64::from(self.color_mask.height()),
        })
    }

    fn next(self) -> Result<Stage, PipelineError> {
        Ok(Stage::Fused(self.fuse()))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.fuse().complete()
    }
}

impl PipelineStage for Fused {
    const NAME: &str = "fuse";
    const INDEX: usize = 3;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Fusion {
            sensitivity: self.config.sensitivity(),
            level: acceptance_level(self.config.sensitivity()),
            mask_pixels: count_on(&self.combined_mask),
            total_pixels: u64::from(self.combined_mask.width())
                * u64::from(self.combined_mask.height()),
        })
    }

    fn next(self) -> Result<Stage, PipelineError> {
        Ok(Stage::RegionsExtracted(self.extract_regions()))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.extract_regions().complete()
    }
}

impl PipelineStage for RegionsExtracted {
    const NAME: &str = "extract_regions";
    const INDEX: usize = 4;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::RegionExtraction {
            min_area: self.config.min_area(),
            traced: self.extraction.traced,
            kept: self.extraction.regions.len(),
            rejections: self.extraction.rejections,
        })
    }

    fn next(self) -> Result<Stage, PipelineError> {
        Ok(Stage::Scored(self.score()))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.score().complete()
    }
}

impl PipelineStage for Scored {
    const NAME: &str = "score";
    const INDEX: usize = 5;

    fn metrics(&self) -> Option<StageMetrics> {
        let summary = DetectionSummary::from_detections(&self.detections);
        Some(StageMetrics::Scoring {
            detection_count: summary.total,
            mean_confidence: summary.average_confidence,
            max_confidence: summary.max_confidence,
            by_severity: summary.by_severity,
        })
    }

    fn next(self) -> Result<Stage, PipelineError> {
        Ok(Stage::Annotated(self.annotate()))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.annotate().complete()
    }
}

impl PipelineStage for Annotated {
    const NAME: &str = "annotate";
    const INDEX: usize = 6;

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Annotation {
            drawn: self.detections.len(),
        })
    }

    fn next(self) -> Result<Stage, PipelineError> {
        Ok(Stage::Annotated(self))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.into_staged())
    }
}

/// Enum wrapping all pipeline stages for uniform, loopable access.
///
/// ```rust
/// # use corroscan_pipeline::{DetectionConfig, Pipeline, PipelineError, RgbImage};
/// # use corroscan_pipeline::pipeline::Stage;
/// # fn run(image: RgbImage) -> Result<(), PipelineError> {
/// let mut stage: Stage = Pipeline::new(image, DetectionConfig::default()).into();
/// while !stage.is_complete() {
///     stage = stage.advance()?;
///     println!("{} done", stage.name());
/// }
/// let staged = stage.complete()?;
/// # Ok(())
/// # }
/// ```
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Preprocessed`].
    Preprocessed(Preprocessed),
    /// See [`ChannelsDetected`].
    ChannelsDetected(ChannelsDetected),
    /// See [`Fused`].
    Fused(Fused),
    /// See [`RegionsExtracted`].
    RegionsExtracted(RegionsExtracted),
    /// See [`Scored`].
    Scored(Scored),
    /// See [`Annotated`].
    Annotated(Annotated),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident) => {
        match $self {
            Self::Pending(s) => s.$method(),
            Self::Preprocessed(s) => s.$method(),
            Self::ChannelsDetected(s) => s.$method(),
            Self::Fused(s) => s.$method(),
            Self::RegionsExtracted(s) => s.$method(),
            Self::Scored(s) => s.$method(),
            Self::Annotated(s) => s.$method(),
        }
    };
}

impl Stage {
    /// Short name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// Stage-specific metrics; `None` for `Pending`.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Annotated(_))
    }

    /// Advance one stage; the final stage is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the transition fails.
    pub fn advance(self) -> Result<Self, PipelineError> {
        delegate!(self, next)
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<StagedResult, PipelineError> {
        delegate!(self, complete)
    }
}

// The trait's associated constants are not reachable as `self.NAME`, so
// the macro goes through this helper.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

macro_rules! stage_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Stage {
                fn from(s: $variant) -> Self {
                    Self::$variant(s)
                }
            }
        )*
    };
}

stage_from!(
    Pending,
    Preprocessed,
    ChannelsDetected,
    Fused,
    RegionsExtracted,
    Scored,
    Annotated
);

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental detection pipeline.
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Store the image and config without processing anything.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image: RgbImage, config: DetectionConfig) -> Pending {
        Pending {
            config,
            original: image,
        }
    }
}
