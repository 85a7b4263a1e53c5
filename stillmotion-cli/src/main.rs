//! Stillmotion CLI Tool
//!
//! Turns every still image in a folder into its own Ken Burns video, and
//! optionally stitches the results into one combined video.

mod config_file;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stillmotion_batch::{format_duration, process_batch, stitch_outputs, BatchReport};
use stillmotion_core::{CodecChoice, JobStatus, PanDirection, RenderConfig, ZoomDirection};

#[derive(Parser, Debug)]
#[command(name = "stillmotion")]
#[command(about = "Turn still images into slowly zooming and panning videos")]
#[command(version)]
struct Cli {
    /// Directory containing the images (not searched recursively)
    #[arg(default_value = ".")]
    input_dir: PathBuf,

    /// Directory for generated videos (default: next to each image)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output width in pixels (even)
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels (even)
    #[arg(long)]
    height: Option<u32>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Video length in seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// Zoom increment per frame
    #[arg(long)]
    zoom: Option<f64>,

    /// Zoom out instead of in
    #[arg(long)]
    zoom_out: bool,

    /// Pan direction: none, left, right, up or down
    #[arg(long)]
    pan: Option<PanDirection>,

    /// Background blur kernel size (positive, odd)
    #[arg(long)]
    blur: Option<i64>,

    /// Four-character codec code, e.g. mp4v, avc1, XVID
    #[arg(long)]
    codec: Option<String>,

    /// Container extension, e.g. mp4, avi, mkv
    #[arg(long)]
    ext: Option<String>,

    /// Number of images rendered concurrently (default: cores - 1)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Re-render images whose video already exists
    #[arg(short, long)]
    force: bool,

    /// Join all videos into one after rendering
    #[arg(long)]
    stitch: bool,

    /// Path of the joined video (default: combined_video.<ext>)
    #[arg(long)]
    stitch_output: Option<PathBuf>,

    /// Switch to a verified codec when the requested one does not work
    #[arg(long)]
    auto_fallback: bool,

    /// Config file (default: ./.stillmotion.toml, then ~/.stillmotion.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// List the videos that would be written without rendering anything
    #[arg(long)]
    dry_run: bool,

    /// Only test whether the codec works, and suggest alternatives
    #[arg(long)]
    probe: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Writes every flag given on the command line over `config`
    fn apply_to(&self, config: &mut RenderConfig) {
        let effect = &mut config.effect;
        if let Some(width) = self.width {
            effect.target_width = width;
        }
        if let Some(height) = self.height {
            effect.target_height = height;
        }
        if let Some(fps) = self.fps {
            effect.fps = fps;
        }
        if let Some(duration) = self.duration {
            effect.duration_seconds = duration;
        }
        if let Some(zoom) = self.zoom {
            effect.zoom_rate_per_frame = zoom;
        }
        if self.zoom_out {
            effect.zoom_direction = ZoomDirection::Out;
        }
        if let Some(pan) = self.pan {
            effect.pan_direction = pan;
        }
        if let Some(blur) = self.blur {
            effect.blur_kernel_size = blur;
        }

        if self.codec.is_some() || self.ext.is_some() {
            config.codec = CodecChoice::new(
                self.codec.clone().unwrap_or_else(|| config.codec.fourcc.clone()),
                self.ext.clone().unwrap_or_else(|| config.codec.extension.clone()),
            );
        }
        if self.output_dir.is_some() {
            config.output_dir = self.output_dir.clone();
        }
        if self.workers.is_some() {
            config.worker_count = self.workers;
        }
        if self.stitch_output.is_some() {
            config.stitch_output = self.stitch_output.clone();
        }
        config.force |= self.force;
        config.stitch |= self.stitch;
        config.auto_fallback |= self.auto_fallback;
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = RenderConfig::default();
    config_file::load(cli.config.as_deref())?.apply_to(&mut config);
    cli.apply_to(&mut config);

    if cli.probe {
        return Ok(probe_codec(&config.codec));
    }

    let images = scan_images(&cli.input_dir)?;
    if images.is_empty() {
        println!("No images found in {}", cli.input_dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    if cli.dry_run {
        print_plan(&images, &config);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "Rendering {} image(s) at {}x{}, {} fps, {}s with {}",
        images.len(),
        config.effect.target_width,
        config.effect.target_height,
        config.effect.fps,
        config.effect.duration_seconds,
        config.codec
    );

    let started = std::time::Instant::now();
    let report = process_batch(&images, &config);
    print_report(&report);

    let mut failed = report.has_failures();
    if config.stitch {
        match stitch_outputs(&report, &config) {
            Some(result) if result.is_success() => {
                println!(
                    "Stitched {} frames into {}",
                    result.frames_written,
                    result.output_path.display()
                );
            }
            Some(result) => {
                failed = true;
                println!(
                    "Stitching failed: {}",
                    result.detail.as_deref().unwrap_or("unknown error")
                );
            }
            None => println!("Nothing to stitch"),
        }
    }

    println!("Done in {}", format_duration(started.elapsed().as_secs_f64()));
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Supported images directly inside `dir`, sorted by path
fn scan_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory {}", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .path();
        if path.is_file() && stillmotion_synth::is_supported_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn probe_codec(codec: &CodecChoice) -> ExitCode {
    let report = stillmotion_encoder::probe(codec);
    if report.ok {
        println!("{codec} works ({} bytes for a test frame)", report.output_bytes);
        return ExitCode::SUCCESS;
    }

    println!(
        "{codec} does not work: {}",
        report.failure.as_deref().unwrap_or("unknown error")
    );
    if !report.suggestions.is_empty() {
        println!("Try instead:");
        for suggestion in &report.suggestions {
            let mark = if suggestion.verified { "ok" } else { "??" };
            println!(
                "  [{mark}] --codec {} --ext {}  {}",
                suggestion.codec, suggestion.extension, suggestion.description
            );
        }
    }
    ExitCode::FAILURE
}

fn print_plan(images: &[PathBuf], config: &RenderConfig) {
    for image in images {
        let output = config.output_path_for(image);
        let note = if !config.force && output.exists() {
            " (exists, would skip)"
        } else {
            ""
        };
        println!("{} -> {}{note}", image.display(), output.display());
    }
    if config.stitch {
        if let Some(first) = images.first() {
            let dir = first.parent().unwrap_or_else(|| Path::new("."));
            println!("stitch -> {}", config.stitch_output_path(dir).display());
        }
    }
}

fn print_report(report: &BatchReport) {
    for result in &report.results {
        let source = result
            .source
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        match result.status {
            JobStatus::Success => println!("  ok      {source} -> {}", result.output_path.display()),
            JobStatus::Skipped => println!(
                "  skipped {source} ({})",
                result.detail.as_deref().unwrap_or("")
            ),
            JobStatus::Failed => println!(
                "  FAILED  {source}: {}",
                result.detail.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!(
        "{} succeeded, {} skipped, {} failed",
        report.tally.succeeded, report.tally.skipped, report.tally.failed
    );
}
