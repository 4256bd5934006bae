// THEORY:
// The batch analyzer is the command-line front end of the linking engine. It
// walks an input directory of exported measurement tables, analyzes every
// DIC/RG pair through a worker pool, and leaves behind the per-image report
// set, the centroid maps, and the batch-level summaries.
//
// One bad pair never stops the run. The process exits non-zero only when
// nothing could be analyzed at all.

use anyhow::{Context, Result, bail};
use chrono::Local;
use globulink::pipeline::LinkerConfig;
use log::info;
use std::env;
use std::path::PathBuf;

mod analysis;
mod discovery;
mod measurements;
mod pool;
mod reports;
mod summary;

use analysis::RunContext;
use pool::WorkerPool;
use summary::{BatchSummary, PairOutcome};

const DEFAULT_INPUT_DIR: &str = "Workflows/Inputs";
const DEFAULT_OUTPUT_DIR: &str = "Results";
const DEFAULT_IMAGE_WIDTH: u32 = 1000;
const DEFAULT_IMAGE_HEIGHT: u32 = 1000;

struct CliArgs {
    input_dir: PathBuf,
    output_dir: PathBuf,
    image_width: u32,
    image_height: u32,
    render_maps: bool,
}

fn parse_args(args: &[String]) -> Option<CliArgs> {
    let mut cli = CliArgs {
        input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
        output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        image_width: DEFAULT_IMAGE_WIDTH,
        image_height: DEFAULT_IMAGE_HEIGHT,
        render_maps: true,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" | "-i" => {
                i += 1;
                cli.input_dir = PathBuf::from(args.get(i)?);
            }
            "--output" | "-o" => {
                i += 1;
                cli.output_dir = PathBuf::from(args.get(i)?);
            }
            "--width" => {
                i += 1;
                cli.image_width = args.get(i)?.parse().ok()?;
            }
            "--height" => {
                i += 1;
                cli.image_height = args.get(i)?.parse().ok()?;
            }
            "--no-viz" => cli.render_maps = false,
            _ => return None,
        }
        i += 1;
    }
    Some(cli)
}

fn print_usage() {
    println!(
        "Usage: batch_analyzer [--input <dir>] [--output <dir>] [--width <px>] [--height <px>] [--no-viz]"
    );
    println!();
    println!("  --input <dir>    Directory of DIC_/RG_ measurement tables (default: {DEFAULT_INPUT_DIR})");
    println!("  --output <dir>   Directory for reports and maps (default: {DEFAULT_OUTPUT_DIR})");
    println!("  --width <px>     Source image width in pixels (default: {DEFAULT_IMAGE_WIDTH})");
    println!("  --height <px>    Source image height in pixels (default: {DEFAULT_IMAGE_HEIGHT})");
    println!("  --no-viz         Skip centroid map rendering");
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    let Some(cli) = parse_args(&args) else {
        print_usage();
        return Ok(());
    };

    let start = Local::now();
    println!("Globulink Batch Analyzer");
    println!("Input directory: {}", cli.input_dir.display());
    println!("Output directory: {}", cli.output_dir.display());

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating output directory {}", cli.output_dir.display()))?;

    // --- 2. Pair Discovery ---
    let pairs = discovery::find_measurement_pairs(&cli.input_dir)?;
    if pairs.is_empty() {
        bail!(
            "no DIC_/RG_ measurement pairs found in {}",
            cli.input_dir.display()
        );
    }
    println!("Found {} measurement pairs to process", pairs.len());

    // --- 3. Worker Pool Dispatch ---
    let context = RunContext {
        output_dir: cli.output_dir.clone(),
        image_width: cli.image_width,
        image_height: cli.image_height,
        config: LinkerConfig::default(),
        render_maps: cli.render_maps,
    };
    let pool = WorkerPool::new(context);
    info!(
        "dispatching {} pairs across {} workers",
        pairs.len(),
        pool.size()
    );

    let submissions: Vec<_> = pairs
        .iter()
        .map(|pair| pool.process_pair(pair.clone()))
        .collect();
    let replies = futures::future::join_all(submissions).await;
    pool.shutdown().await;

    let mut outcomes = Vec::with_capacity(replies.len());
    for (pair, reply) in pairs.iter().zip(replies) {
        match reply {
            Ok(outcome) => outcomes.push(outcome),
            Err(reason) => {
                outcomes.push(PairOutcome::failure(
                    pair.base_name.clone(),
                    reason.to_string(),
                    0.0,
                ));
            }
        }
    }

    // --- 4. Summary Reports ---
    summary::write_summary_report(&cli.output_dir, &outcomes)?;
    let batch = BatchSummary::new(outcomes, start, Local::now());
    let json_path = summary::write_batch_summary(&cli.output_dir, &batch)?;

    // --- 5. Final Accounting ---
    println!("Batch analysis complete");
    println!("Total pairs processed: {}", batch.total_pairs);
    println!("Successful: {}", batch.successful);
    println!("Failed: {}", batch.failed);
    println!("Summary saved to: {}", json_path.display());

    if batch.successful == 0 {
        bail!("no measurement pair analyzed successfully");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("batch_analyzer")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_apply_when_no_flags_are_given() {
        let cli = parse_args(&args(&[])).unwrap();
        assert_eq!(cli.input_dir, PathBuf::from(DEFAULT_INPUT_DIR));
        assert_eq!(cli.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(cli.image_width, DEFAULT_IMAGE_WIDTH);
        assert!(cli.render_maps);
    }

    #[test]
    fn flags_override_the_defaults() {
        let cli = parse_args(&args(&[
            "-i", "slides", "-o", "out", "--width", "2048", "--height", "1536", "--no-viz",
        ]))
        .unwrap();
        assert_eq!(cli.input_dir, PathBuf::from("slides"));
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.image_width, 2048);
        assert_eq!(cli.image_height, 1536);
        assert!(!cli.render_maps);
    }

    #[test]
    fn bad_invocations_are_rejected() {
        assert!(parse_args(&args(&["--width"])).is_none());
        assert!(parse_args(&args(&["--width", "abc"])).is_none());
        assert!(parse_args(&args(&["--frobnicate"])).is_none());
        assert!(parse_args(&args(&["--help"])).is_none());
    }
}
