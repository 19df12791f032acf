use anyhow::Context;
use clap::Parser;
use diff_vision::service::render_message;
use diff_vision::{ComparisonService, ServiceConfig, Upload};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Compares a candidate image against a reference and writes the annotated artifacts.
#[derive(Debug, Parser)]
#[command(name = "visual_tester", version)]
struct Args {
    /// The reference image (read only).
    reference: PathBuf,
    /// The candidate image to check against the reference.
    candidate: PathBuf,
    /// Directory that receives the four generated images.
    #[arg(long, default_value = "static/generated")]
    out_dir: PathBuf,
    /// Give up waiting for the comparison after this many milliseconds.
    #[arg(long)]
    deadline_ms: Option<u64>,
    /// Side of the square similarity window (odd, >= 3).
    #[arg(long, default_value_t = diff_vision::pipeline::DEFAULT_WINDOW_SIZE)]
    window_size: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // --- 1. Argument Parsing & Setup ---
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // --- 2. Service Initialization ---
    let mut config = ServiceConfig::new(&args.reference, &args.out_dir);
    config.deadline = args.deadline_ms.map(Duration::from_millis);
    config.pipeline.window_size = args.window_size;
    let service = ComparisonService::new(config).context("invalid comparison settings")?;

    // --- 3. Candidate Upload ---
    let bytes = tokio::fs::read(&args.candidate)
        .await
        .with_context(|| format!("could not read candidate {}", args.candidate.display()))?;
    let filename = args
        .candidate
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("comparing {} against {}", args.candidate.display(), args.reference.display());

    // --- 4. Comparison & Report ---
    let outcome = service.submit(Upload::new(filename, bytes)).await;
    let message = render_message(&outcome);
    match outcome {
        Ok(outcome) => {
            println!("{message}");
            if outcome.result.is_identical() {
                println!("no differences found");
            } else {
                println!("regions: {}", outcome.result.regions.len());
                for region in &outcome.result.regions {
                    println!(
                        "  x={} y={} w={} h={} area={}",
                        region.x,
                        region.y,
                        region.width,
                        region.height,
                        region.area()
                    );
                }
            }
            println!("original with boxes:  {}", outcome.artifacts.original_with_boxes.display());
            println!("candidate with boxes: {}", outcome.artifacts.candidate_with_boxes.display());
            println!("raw difference:       {}", outcome.artifacts.raw_difference.display());
            println!("threshold mask:       {}", outcome.artifacts.threshold_mask.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{message}");
            log::debug!("comparison failed with {:?}", err.kind());
            Ok(ExitCode::FAILURE)
        }
    }
}
