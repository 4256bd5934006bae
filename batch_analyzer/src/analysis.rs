// THEORY:
// The `analysis` module runs the full workflow for a single measurement pair:
// ingest the particle tables, link crescents to globules, derive statistics,
// and write the report set and centroid maps. It is the unit of work the
// worker pool schedules.
//
// `run_pair` never returns an error. Whatever goes wrong with one pair is
// folded into a failed `PairOutcome` so the batch can keep moving.

use anyhow::{Context, Result};
use globulink::pipeline::{Assignment, LinkPipeline, LinkerConfig, Particle};
use globulink_visualizer::{
    CRESCENT_COLOR, GLOBULE_COLOR, render_composite_map, render_link_map, render_particle_map,
};
use log::{error, info};
use std::path::PathBuf;
use std::time::Instant;

use crate::discovery::MeasurementPair;
use crate::measurements::read_particle_table;
use crate::reports::write_pair_reports;
use crate::summary::{PairOutcome, PairStats};

/// Settings shared by every pair in one batch run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub output_dir: PathBuf,
    /// Width of the source images in pixels. The measurement tables carry no
    /// dimensions of their own.
    pub image_width: u32,
    /// Height of the source images in pixels.
    pub image_height: u32,
    pub config: LinkerConfig,
    /// When false, report files are still written but no maps are rendered.
    pub render_maps: bool,
}

/// Analyzes one pair, folding any failure into the returned outcome.
pub fn run_pair(context: &RunContext, pair: &MeasurementPair) -> PairOutcome {
    let started = Instant::now();
    match analyze_pair(context, pair) {
        Ok(stats) => {
            PairOutcome::success(pair.base_name.clone(), stats, started.elapsed().as_secs_f64())
        }
        Err(error) => {
            error!("analysis of {} failed: {error:#}", pair.base_name);
            PairOutcome::failure(
                pair.base_name.clone(),
                format!("{error:#}"),
                started.elapsed().as_secs_f64(),
            )
        }
    }
}

fn analyze_pair(context: &RunContext, pair: &MeasurementPair) -> Result<PairStats> {
    let base = &pair.base_name;

    // --- 1. Ingestion ---
    let globules = read_particle_table(&pair.globule_table)?;
    let crescents = read_particle_table(&pair.crescent_table)?;
    let contamination = match &pair.contamination_table {
        Some(path) => read_particle_table(path)?,
        None => Vec::new(),
    };
    info!(
        "{base}: read {} globules, {} crescents, {} contamination particles",
        globules.len(),
        crescents.len(),
        contamination.len()
    );

    // --- 2. Linking ---
    let pipeline = LinkPipeline::new(context.config.clone())?;
    let assignment = pipeline.link(
        &crescents,
        &globules,
        context.image_width,
        context.image_height,
    )?;

    // --- 3. Statistics ---
    let stats = pipeline.summarize(&assignment, globules.len(), crescents.len());
    info!(
        "{base}: {} linked pairs, {:.2}% nucleation",
        stats.linked_pairs, stats.nucleation_percent
    );

    // --- 4. Reports ---
    write_pair_reports(
        &context.output_dir,
        pair,
        &globules,
        &crescents,
        &contamination,
        &assignment,
        &stats,
    )?;

    // --- 5. Maps ---
    if context.render_maps {
        render_pair_maps(context, base, &globules, &crescents, &contamination, &assignment)?;
    }

    Ok(PairStats {
        contamination: contamination.len(),
        statistics: stats,
    })
}

fn render_pair_maps(
    context: &RunContext,
    base: &str,
    globules: &[Particle],
    crescents: &[Particle],
    contamination: &[Particle],
    assignment: &Assignment,
) -> Result<()> {
    let width = context.image_width;
    let height = context.image_height;
    let dir = &context.output_dir;

    render_particle_map(globules, width, height, GLOBULE_COLOR)
        .save(&dir.join(format!("{base}_globules_map.png")))
        .context("rendering globule map")?;
    render_particle_map(crescents, width, height, CRESCENT_COLOR)
        .save(&dir.join(format!("{base}_crescents_map.png")))
        .context("rendering crescent map")?;
    render_link_map(&assignment.pairs, width, height)
        .save(&dir.join(format!("{base}_linked_pairs_map.png")))
        .context("rendering linked pairs map")?;
    render_composite_map(assignment, contamination, width, height)
        .save(&dir.join(format!("{base}_composite_map.png")))
        .context("rendering composite map")?;

    Ok(())
}
