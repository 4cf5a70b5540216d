//! Aggregates and display strings for reporting collaborators.

use serde::{Deserialize, Serialize};

use crate::types::{Detection, Severity};

/// Per-severity detection counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Critical detections.
    pub critical: usize,
    /// High detections.
    pub high: usize,
    /// Medium detections.
    pub medium: usize,
    /// Low detections.
    pub low: usize,
}

impl SeverityCounts {
    /// Count for one severity.
    #[must_use]
    pub const fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    const fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

/// Headline numbers for one inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    /// Number of detections.
    pub total: usize,
    /// Sum of detection areas in pixels.
    pub total_area: u64,
    /// Mean confidence; 0 when there are no detections.
    pub average_confidence: f64,
    /// Highest confidence; 0 when there are no detections.
    pub max_confidence: f64,
    /// Detections per severity.
    pub by_severity: SeverityCounts,
}

impl DetectionSummary {
    /// Summarize a detection list.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut summary = Self {
            total: detections.len(),
            ..Self::default()
        };
        let mut confidence_sum = 0.0;
        for d in detections {
            summary.total_area += u64::from(d.area);
            summary.max_confidence = summary.max_confidence.max(d.confidence);
            summary.by_severity.add(d.severity);
            confidence_sum += d.confidence;
        }
        if !detections.is_empty() {
            summary.average_confidence = confidence_sum / detections.len() as f64;
        }
        summary
    }

    /// Highest severity present, if any.
    #[must_use]
    pub fn worst_severity(&self) -> Option<Severity> {
        Severity::ALL
            .into_iter()
            .rev()
            .find(|&s| self.by_severity.get(s) > 0)
    }
}

/// `0.873` → `"87.3%"`.
#[must_use]
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Pixel area with a `K` suffix from one thousand: `1500` → `"1.5K px²"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_area(area: u64) -> String {
    if area >= 1000 {
        format!("{:.1}K px²", area as f64 / 1000.0)
    } else {
        format!("{area} px²")
    }
}
