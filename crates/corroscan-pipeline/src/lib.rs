//! corroscan-pipeline: Pure corrosion detection pipeline (sans-IO).
//!
//! Flags likely corrosion regions in an inspection photograph through:
//! blur + contrast enhancement -> color / texture / edge masks ->
//! weighted fusion -> region tracing and filtering -> scoring -> annotation.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images or byte slices and returns structured data. File handling and
//! logger installation live in `corroscan-bench`.

pub mod annotate;
pub mod border;
pub mod canny;
pub mod clahe;
pub mod color;
pub mod color_mask;
pub mod contour;
pub mod decode;
pub mod diagnostics;
pub mod downsample;
pub mod edge;
pub mod fusion;
pub mod mask;
pub mod pipeline;
pub mod preprocess;
pub mod profile;
pub mod scoring;
pub mod stats;
pub mod summary;
pub mod texture;
pub mod types;

pub use diagnostics::{Clock, PipelineDiagnostics};
pub use downsample::DownsampleFilter;
pub use image::DynamicImage;
pub use pipeline::Pipeline;
pub use stats::ImageStats;
pub use summary::DetectionSummary;
pub use types::{
    BoundingBox, Detection, DetectionConfig, DetectionResult, Dimensions, GrayImage,
    PipelineError, PipelineType, RgbImage, Severity, StagedResult,
};

use diagnostics::{PipelineSummary, StageDiagnostics};
use pipeline::{PipelineStage, Stage};

/// Run the full detection pipeline on an RGB image.
///
/// An empty detection list is a clean inspection; the returned image is
/// then an unmodified copy of the input.
///
/// # Pipeline steps
///
/// 1. Gaussian blur and CLAHE on lightness
/// 2. Rust-color, roughness and edge masks
/// 3. Weighted fusion against a sensitivity threshold
/// 4. Outer-border tracing and plausibility filtering
/// 5. Confidence and severity scoring, ranked by confidence
/// 6. Box and label annotation
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image has zero area.
pub fn detect(image: &RgbImage, config: &DetectionConfig) -> Result<DetectionResult, PipelineError> {
    Ok(Pipeline::new(image.clone(), *config)
        .preprocess()?
        .detect_channels()
        .fuse()
        .extract_regions()
        .score()
        .annotate()
        .into_result())
}

/// Run the pipeline and keep every intermediate raster.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image has zero area.
pub fn detect_staged(image: &RgbImage, config: &DetectionConfig) -> Result<StagedResult, PipelineError> {
    Pipeline::new(image.clone(), *config).complete()
}

/// Run the pipeline on a decoded image of any supported layout.
///
/// 8-bit RGBA is accepted with alpha discarded.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] for gray, 16-bit or float
/// layouts and for zero-area images.
pub fn detect_dynamic(
    image: &DynamicImage,
    config: &DetectionConfig,
) -> Result<DetectionResult, PipelineError> {
    detect(&decode::to_rgb(image)?, config)
}

/// Decode image bytes (PNG, JPEG, BMP, WebP) and run the pipeline.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the format is unrecognized.
/// Returns [`PipelineError::InvalidInput`] for unsupported layouts.
pub fn detect_bytes(
    image_bytes: &[u8],
    config: &DetectionConfig,
) -> Result<DetectionResult, PipelineError> {
    detect(&decode::decode_rgb(image_bytes)?, config)
}

/// Run the pipeline, timing each stage through `clock`.
///
/// Produces the same output as [`detect_staged`] together with
/// per-stage durations and metrics.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image has zero area.
pub fn detect_with_diagnostics<C: Clock>(
    image: &RgbImage,
    config: &DetectionConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let run_start = clock.now();
    let mut stages = Vec::with_capacity(pipeline::STAGE_COUNT - 1);
    let mut stage: Stage = Pipeline::new(image.clone(), *config).into();

    while !stage.is_complete() {
        let start = clock.now();
        stage = stage.advance()?;
        let duration = clock.elapsed(&start);
        if let Some(metrics) = stage.metrics() {
            stages.push(StageDiagnostics {
                name: stage.name().to_owned(),
                duration,
                metrics,
            });
        }
    }

    let staged = stage.complete()?;
    let total_duration = clock.elapsed(&run_start);
    let dims = Dimensions::of(image);
    let diagnostics = PipelineDiagnostics {
        stages,
        total_duration,
        summary: PipelineSummary {
            image_width: dims.width,
            image_height: dims.height,
            pixel_count: dims.pixel_count(),
            detection_count: staged.result.detections.len(),
            worst_severity: staged.result.summary().worst_severity(),
        },
    };
    log::debug!(
        "detection finished in {:.3}s with {} detections",
        total_duration.as_secs_f64(),
        diagnostics.summary.detection_count
    );
    Ok((staged, diagnostics))
}

/// An immutable detector bound to one validated configuration.
///
/// Construct one per request; nothing is shared between instances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detector {
    config: DetectionConfig,
}

impl Detector {
    /// Bind a detector to `config`.
    #[must_use]
    pub const fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// The configuration this detector runs with.
    #[must_use]
    pub const fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// See [`detect`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the image has zero area.
    pub fn run(&self, image: &RgbImage) -> Result<DetectionResult, PipelineError> {
        detect(image, &self.config)
    }

    /// See [`detect_staged`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the image has zero area.
    pub fn run_staged(&self, image: &RgbImage) -> Result<StagedResult, PipelineError> {
        detect_staged(image, &self.config)
    }
}
