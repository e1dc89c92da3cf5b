use anyhow::{Context, Result};
use clap::Parser;
use image::{Rgb, RgbImage};
use pablo_vision::{
    BoundingBox, PerceptionResult, PerceptionSession, ReplayCamera, SnapOutcome, VisionConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CENTER_LINE: Rgb<u8> = Rgb([255, 255, 255]);
const PRIMARY_BOX: Rgb<u8> = Rgb([255, 0, 0]);
const SECONDARY_BOX: Rgb<u8> = Rgb([0, 255, 255]);

/// Runs still images through the perception core and writes annotated copies.
#[derive(Parser)]
#[command(name = "visual_tester")]
#[command(about = "Offline check of the blob perception pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Images to process, in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Directory for annotated PNGs
    #[arg(long, short, default_value = "annotated")]
    output_dir: PathBuf,

    /// Print results only, write no images
    #[arg(long)]
    no_images: bool,
}

fn main() -> Result<()> {
    // --- 1. Argument Parsing & Setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => VisionConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => VisionConfig::default(),
    };
    if !cli.no_images {
        fs::create_dir_all(&cli.output_dir)
            .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    }

    // --- 2. Session Initialization ---
    let camera = ReplayCamera::open(&cli.inputs).context("decoding input images")?;
    let mut session = PerceptionSession::new(camera, config)?;
    session.initialize()?;

    // --- 3. Main Processing Loop ---
    for input in &cli.inputs {
        match session.snap() {
            Ok(outcome) => {
                if let SnapOutcome::Degraded(failures) = &outcome {
                    for failure in failures {
                        warn!("{}: {} color skipped: {}", input.display(), failure.role, failure.error);
                    }
                }
                let result = session.result();
                print_result(input, &result);

                // --- 4. Visualization ---
                if !cli.no_images {
                    if let Some(frame) = session.raw_frame() {
                        let mut canvas = frame.to_rgb_image();
                        annotate(&mut canvas, &result);
                        let out = output_path(&cli.output_dir, input);
                        canvas
                            .save(&out)
                            .with_context(|| format!("writing {}", out.display()))?;
                        info!("Wrote {}", out.display());
                    }
                }
                session.release();
            }
            Err(e) => error!("{}: {}", input.display(), e),
        }
    }

    println!("Processed {} frames", session.frame_number());
    Ok(())
}

fn print_result(input: &Path, result: &PerceptionResult) {
    println!("{}", input.display());
    println!(
        "  primary:   found={} offset={} area={}",
        result.is_primary_found(),
        result.primary_offset(),
        result.primary_area()
    );
    println!("  secondary: count={}", result.secondary_count());
    for index in 0..result.secondary_count() {
        println!(
            "    [{}] offset={} area={}",
            index,
            result.secondary_offset(index),
            result.secondary_area(index)
        );
    }
    println!(
        "  frame={} time={:?}{}",
        result.frame_number(),
        result.process_time(),
        if result.is_degraded() { " DEGRADED" } else { "" }
    );
}

fn output_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    dir.join(format!("{stem}_annotated.png"))
}

/// Draws the center line, the primary box and the secondary boxes.
fn annotate(canvas: &mut RgbImage, result: &PerceptionResult) {
    let center = canvas.width() / 2;
    for y in 0..canvas.height() {
        canvas.put_pixel(center, y, CENTER_LINE);
    }

    if let Some(blob) = result.primary.blob.as_ref().filter(|_| result.primary.found) {
        draw_box(canvas, &blob.bounding_box, PRIMARY_BOX);
    }
    for blob in result.secondary.blobs.iter().flatten() {
        draw_box(canvas, &blob.bounding_box, SECONDARY_BOX);
    }
}

fn draw_box(canvas: &mut RgbImage, bounds: &BoundingBox, color: Rgb<u8>) {
    let x_max = bounds.x_max.min(canvas.width() - 1);
    let y_max = bounds.y_max.min(canvas.height() - 1);
    for x in bounds.x_min..=x_max {
        canvas.put_pixel(x, bounds.y_min, color);
        canvas.put_pixel(x, y_max, color);
    }
    for y in bounds.y_min..=y_max {
        canvas.put_pixel(bounds.x_min, y, color);
        canvas.put_pixel(x_max, y, color);
    }
}
