//! corroscan-bench: CLI tool for detection parameter tuning and diagnostics.
//!
//! Runs the corrosion detection pipeline on a given image file with
//! configurable parameters, printing the detections and per-stage
//! diagnostics. Useful for:
//!
//! - Tuning sensitivity and minimum area per pipeline type
//! - Inspecting what each channel mask contributed
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin corroscan-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use corroscan_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use corroscan_pipeline::summary::{format_area, format_confidence};
use corroscan_pipeline::{
    DetectionConfig, DetectionResult, DownsampleFilter, GrayImage, PipelineType, RgbImage,
    Severity, StagedResult,
};

/// Detection parameter tuning and diagnostics for corroscan.
///
/// Runs the detection pipeline on a given image with configurable
/// parameters and prints the detections plus per-stage timing and
/// coverage diagnostics.
#[derive(Parser)]
#[command(name = "corroscan-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Fusion sensitivity (0.1-1.0); higher flags more pixels.
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_SENSITIVITY)]
    sensitivity: f64,

    /// Minimum region area in pixels (50-10000).
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_MIN_AREA)]
    min_area: u32,

    /// Pipeline type (subsea, cross-country, unknown, ...); unrecognized
    /// values use the general profile.
    #[arg(long, default_value = "unknown")]
    pipeline_type: String,

    /// Full detection config as a JSON string.
    ///
    /// When provided, `--sensitivity`, `--min-area` and
    /// `--pipeline-type` are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Shrink the image to at most this width before detection.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_width: Option<u32>,

    /// Shrink the image to at most this height before detection.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_height: Option<u32>,

    /// Resampling filter used when shrinking.
    #[arg(long, value_enum, default_value_t = Filter::Triangle)]
    downsample_filter: Filter,

    /// Write the annotated image (PNG) to this path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write color/texture/edge/combined mask PNGs into this directory.
    #[arg(long)]
    masks_dir: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics and detections as JSON instead of a report.
    #[arg(long)]
    json: bool,
}

/// Downsample resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Filter> for DownsampleFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// Build a [`DetectionConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed (and validated)
/// directly and the individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<DetectionConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    DetectionConfig::try_new(
        cli.sensitivity,
        cli.min_area,
        PipelineType::from_label(&cli.pipeline_type),
    )
    .map_err(|e| e.to_string())
}

/// Decode the input and shrink it to the requested box, if any.
fn load_image(cli: &Cli) -> Result<RgbImage, String> {
    let bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;
    log::info!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        bytes.len()
    );
    let image = corroscan_pipeline::decode::decode_rgb(&bytes).map_err(|e| e.to_string())?;

    if cli.max_width.is_none() && cli.max_height.is_none() {
        return Ok(image);
    }
    let (resized, changed) = corroscan_pipeline::downsample::fit_within(
        &image,
        cli.max_width.unwrap_or(u32::MAX),
        cli.max_height.unwrap_or(u32::MAX),
        cli.downsample_filter.into(),
    );
    if changed {
        log::info!(
            "Downsampled {}x{} -> {}x{}",
            image.width(),
            image.height(),
            resized.width(),
            resized.height()
        );
    }
    Ok(resized)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image = match load_image(&cli) {
        Ok(image) => image,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    log::info!("Config: {config:?}");
    log::info!("Runs: {}", cli.runs);

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            log::info!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (staged, diagnostics) =
            match corroscan_pipeline::detect_with_diagnostics(&image, &config, &StdClock) {
                Ok(output) => output,
                Err(e) => {
                    eprintln!("Pipeline error: {e}");
                    return ExitCode::FAILURE;
                }
            };

        if cli.json {
            let value = serde_json::json!({
                "diagnostics": &diagnostics,
                "summary": staged.result.summary(),
                "detections": &staged.result.detections,
            });
            match serde_json::to_string_pretty(&value) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
            if run == 0 {
                println!();
                print_detections(&staged.result);
            }
        }

        // Write images on the first run only.
        if run == 0 {
            if let Some(ref path) = cli.output {
                write_rgb(path, &staged.result.annotated);
            }
            if let Some(ref dir) = cli.masks_dir {
                write_masks(dir, &staged);
            }
        }

        all_diagnostics.push(diagnostics);
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print the detection table and severity summary.
fn print_detections(result: &DetectionResult) {
    if result.is_clean() {
        println!("No corrosion detected.");
        return;
    }

    println!(
        "{:<6} {:<10} {:>8} {:>12} {:>20}",
        "ID", "Severity", "Conf", "Area", "Box (x,y,w,h)"
    );
    println!("{}", "-".repeat(60));
    for d in &result.detections {
        let b = d.bounding_box;
        println!(
            "C{:03}   {:<10} {:>8} {:>12} {:>20}",
            d.id,
            d.severity,
            format_confidence(d.confidence),
            format_area(u64::from(d.area)),
            format!("{},{},{},{}", b.x, b.y, b.width, b.height),
        );
    }

    let summary = result.summary();
    println!();
    println!(
        "Total: {}  |  Area: {}  |  Avg confidence: {}",
        summary.total,
        format_area(summary.total_area),
        format_confidence(summary.average_confidence),
    );
    let counts: Vec<String> = Severity::ALL
        .iter()
        .rev()
        .map(|&s| format!("{s}: {}", summary.by_severity.get(s)))
        .collect();
    println!("{}", counts.join("  "));
}

/// Save an RGB image, reporting failures without aborting.
fn write_rgb(path: &Path, image: &RgbImage) {
    match image.save(path) {
        Ok(()) => log::info!("Annotated image written to {}", path.display()),
        Err(e) => eprintln!("Error writing {}: {e}", path.display()),
    }
}

/// Save the four channel masks as PNGs inside `dir`.
fn write_masks(dir: &Path, staged: &StagedResult) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Error creating {}: {e}", dir.display());
        return;
    }
    let masks: [(&str, &GrayImage); 4] = [
        ("color", &staged.color_mask),
        ("texture", &staged.texture_mask),
        ("edge", &staged.edge_mask),
        ("combined", &staged.combined_mask),
    ];
    for (name, mask) in masks {
        let path = dir.join(format!("{name}.png"));
        match mask.save(&path) {
            Ok(()) => log::info!("Mask written to {}", path.display()),
            Err(e) => eprintln!("Error writing {}: {e}", path.display()),
        }
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means, in the order of the first run.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    for stage in &all_diagnostics[0].stages {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(|d| d.stage(&stage.name))
            .map(|s| s.duration.as_secs_f64() * 1000.0)
            .collect();

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{:<24} {stage_mean:>10.3}ms", stage.name);
    }
}
