//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! threshold tuning. [`detect_with_diagnostics`](crate::detect_with_diagnostics)
//! times every stage transition through a caller-supplied [`Clock`], so
//! this crate never reads the system time itself.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contour::RejectionCounts;
use crate::summary::SeverityCounts;
use crate::types::Severity;

/// Source of monotonic timestamps.
///
/// Native callers wrap `std::time::Instant`; other targets can supply
/// whatever high-resolution timer they have.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// One entry per executed stage, in execution order.
    pub stages: Vec<StageDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Headline numbers for the run.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Stage name, e.g. `"fuse"`.
    pub name: String,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Blur and contrast enhancement.
    Preprocess {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Mean luminance before enhancement.
        mean_brightness_before: f64,
        /// Mean luminance after enhancement.
        mean_brightness_after: f64,
    },
    /// Color, texture and edge channels.
    Channels {
        /// Foreground pixels in the cleaned color mask.
        color_pixels: u64,
        /// Foreground pixels in the texture mask.
        texture_pixels: u64,
        /// Byte threshold applied to the normalized roughness map.
        texture_threshold: u8,
        /// Raw Canny edge pixels before dilation.
        raw_edge_pixels: u64,
        /// Foreground pixels in the dilated edge mask.
        edge_pixels: u64,
        /// Pixels per mask.
        total_pixels: u64,
    },
    /// Weighted fusion and cleanup.
    Fusion {
        /// Configured sensitivity.
        sensitivity: f64,
        /// Minimum accepted evidence on the `0..=2550` scale.
        level: u16,
        /// Foreground pixels in the fused mask.
        mask_pixels: u64,
        /// Pixels in the mask.
        total_pixels: u64,
    },
    /// Outer-border tracing and plausibility filtering.
    RegionExtraction {
        /// Minimum area in effect.
        min_area: u32,
        /// Outer borders traced.
        traced: usize,
        /// Regions that passed the filter.
        kept: usize,
        /// Why the others were dropped.
        rejections: RejectionCounts,
    },
    /// Confidence and severity scoring.
    Scoring {
        /// Number of detections.
        detection_count: usize,
        /// Mean confidence (0 when empty).
        mean_confidence: f64,
        /// Highest confidence (0 when empty).
        max_confidence: f64,
        /// Detections per severity.
        by_severity: SeverityCounts,
    },
    /// Drawing boxes and labels.
    Annotation {
        /// Detections drawn.
        drawn: usize,
    },
}

/// High-level summary for the entire run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of detections.
    pub detection_count: usize,
    /// Most severe detection, if any.
    pub worst_severity: Option<Severity>,
}

impl PipelineDiagnostics {
    /// Look up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageDiagnostics> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Detection Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<20} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for stage in &self.stages {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&stage.metrics);
            lines.push(format!("{:<20} {ms:>8.3}ms {pct:>9.1}%  {details}", stage.name));
        }

        lines.push(String::new());
        let worst = self
            .summary
            .worst_severity
            .map_or_else(|| "none".to_owned(), |s| s.to_string());
        lines.push(format!(
            "Detections: {}  |  Worst severity: {worst}",
            self.summary.detection_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Share of `part` in `total` as a percentage.
#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Preprocess {
            width,
            height,
            mean_brightness_before,
            mean_brightness_after,
        } => format!(
            "{width}x{height} brightness {mean_brightness_before:.1}->{mean_brightness_after:.1}"
        ),
        StageMetrics::Channels {
            color_pixels,
            texture_pixels,
            texture_threshold,
            raw_edge_pixels,
            edge_pixels,
            total_pixels,
        } => format!(
            "color={:.1}% texture={:.1}% (t={texture_threshold}) edges={raw_edge_pixels}->{:.1}%",
            percent(*color_pixels, *total_pixels),
            percent(*texture_pixels, *total_pixels),
            percent(*edge_pixels, *total_pixels),
        ),
        StageMetrics::Fusion {
            sensitivity,
            level,
            mask_pixels,
            total_pixels,
        } => format!(
            "s={sensitivity:.2} level={level} mask={:.1}%",
            percent(*mask_pixels, *total_pixels),
        ),
        StageMetrics::RegionExtraction {
            min_area,
            traced,
            kept,
            rejections,
        } => format!(
            "{traced} traced, {kept} kept (min_area={min_area}; small={} elongated={} sparse={})",
            rejections.too_small, rejections.too_elongated, rejections.too_sparse,
        ),
        StageMetrics::Scoring {
            detection_count,
            mean_confidence,
            max_confidence,
            by_severity,
        } => format!(
            "{detection_count} detections, conf mean={mean_confidence:.3} max={max_confidence:.3} (C{} H{} M{} L{})",
            by_severity.critical, by_severity.high, by_severity.medium, by_severity.low,
        ),
        StageMetrics::Annotation { drawn } => format!("{drawn} drawn"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> PipelineDiagnostics {
        PipelineDiagnostics {
            stages: vec![
                StageDiagnostics {
                    name: "preprocess".to_owned(),
                    duration: Duration::from_millis(20),
                    metrics: StageMetrics::Preprocess {
                        width: 100,
                        height: 80,
                        mean_brightness_before: 110.0,
                        mean_brightness_after: 118.5,
                    },
                },
                StageDiagnostics {
                    name: "detect_channels".to_owned(),
                    duration: Duration::from_millis(50),
                    metrics: StageMetrics::Channels {
                        color_pixels: 800,
                        texture_pixels: 400,
                        texture_threshold: 89,
                        raw_edge_pixels: 120,
                        edge_pixels: 600,
                        total_pixels: 8000,
                    },
                },
                StageDiagnostics {
                    name: "extract_regions".to_owned(),
                    duration: Duration::from_millis(10),
                    metrics: StageMetrics::RegionExtraction {
                        min_area: 200,
                        traced: 5,
                        kept: 2,
                        rejections: RejectionCounts {
                            too_small: 3,
                            too_elongated: 0,
                            too_sparse: 0,
                        },
                    },
                },
            ],
            total_duration: Duration::from_millis(100),
            summary: PipelineSummary {
                image_width: 100,
                image_height: 80,
                pixel_count: 8000,
                detection_count: 2,
                worst_severity: Some(Severity::High),
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        assert!((duration_ms(Duration::from_millis(1234)) - 1234.0).abs() < 0.01);
    }

    #[test]
    fn percent_handles_empty_total() {
        assert!(percent(5, 0).abs() < f64::EPSILON);
        assert!((percent(1, 4) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn report_lists_every_stage() {
        let report = sample().report();
        assert!(report.contains("Detection Diagnostics Report"));
        assert!(report.contains("preprocess"));
        assert!(report.contains("color=10.0%"));
        assert!(report.contains("small=3"));
        assert!(report.contains("Worst severity: High"));
    }

    #[test]
    fn stage_lookup() {
        let diag = sample();
        assert!(diag.stage("extract_regions").is_some());
        assert!(diag.stage("annotate").is_none());
    }

    #[test]
    fn serde_uses_fractional_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.1).abs() < 1e-12);
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.stages.len(), 3);
        assert_eq!(back.summary, sample().summary);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["total_duration"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<PipelineDiagnostics>(json).is_err());
    }
}
