// THEORY:
// The `reports` module owns every per-image output file. The formats are the
// lab's long-standing tab-separated conventions: the raw particle tables echo
// the ImageJ export they were ingested from, and the derived tables (linked
// pairs, leftovers, statistics) use plain headered columns. All floats are
// written with three decimals.
//
// Formatting and file I/O are split: the `format_*` functions are pure
// string builders, and `write_pair_reports` is the one thin wrapper that
// touches the filesystem.

use anyhow::{Context, Result};
use chrono::Local;
use globulink::pipeline::{Ambiguous, Assignment, LinkStatistics, Particle, ParticleRole};
use std::fmt::Write as _;
use std::path::Path;

use crate::discovery::MeasurementPair;

fn particle_row(particle: &Particle) -> String {
    format!(
        "{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}",
        particle.area, particle.x, particle.y, particle.perimeter, particle.circularity
    )
}

/// ImageJ-style table: two preamble lines, then unheadered particle rows.
/// Used for the raw DIC/RG/CONT echoes.
pub fn format_measurement_table(particles: &[Particle]) -> String {
    let mut out = String::from("  \t\n \tArea\tX\tY\tPerim.\tCirc.\n");
    for particle in particles {
        let _ = writeln!(out, "{}", particle_row(particle));
    }
    out
}

/// Plain headered particle table, used for the derived particle lists.
pub fn format_particle_table<'a>(particles: impl IntoIterator<Item = &'a Particle>) -> String {
    let mut out = String::from("Area\tX\tY\tPerim.\tCirc.\n");
    for particle in particles {
        let _ = writeln!(out, "{}", particle_row(particle));
    }
    out
}

/// One row per accepted pair: crescent geometry, globule geometry, distance.
pub fn format_link_table(assignment: &Assignment) -> String {
    let mut out = String::from("Cres_area\tCres_x\tCres_y\tGlob_area\tGlob_x\tGlob_y\tDistance\n");
    for pair in &assignment.pairs {
        let _ = writeln!(
            out,
            "{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}",
            pair.crescent.area,
            pair.crescent.x,
            pair.crescent.y,
            pair.globule.area,
            pair.globule.x,
            pair.globule.y,
            pair.distance
        );
    }
    out
}

/// Unmatched particles of both roles, labeled.
pub fn format_ambiguous_table(ambiguous: &[Ambiguous]) -> String {
    let mut out = String::from("Type\tArea\tX\tY\tPerim.\tCirc.\n");
    for entry in ambiguous {
        let _ = writeln!(out, "{}\t{}", entry.role, particle_row(&entry.particle));
    }
    out
}

/// Human-readable statistics block for one image pair.
pub fn format_statistics(stats: &LinkStatistics, base_name: &str, analysis_date: &str) -> String {
    format!(
        "Globulink Analysis Statistics\n\
         Filename: {base_name}\n\
         Analysis Date: {analysis_date}\n\
         \n\
         Total Globules: {}\n\
         Total Crescents: {}\n\
         Linked Pairs: {}\n\
         Globules with Crescents (%): {:.2}\n\
         Average Crescent Area: {:.3}\n\
         Average Globule Area: {:.3}\n",
        stats.total_globules,
        stats.total_crescents,
        stats.linked_pairs,
        stats.nucleation_percent,
        stats.avg_crescent_area,
        stats.avg_globule_area,
    )
}

fn write_file(output_dir: &Path, name: &str, content: &str) -> Result<()> {
    let path = output_dir.join(name);
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))
}

/// Writes the full per-image report set for one analyzed pair.
pub fn write_pair_reports(
    output_dir: &Path,
    pair: &MeasurementPair,
    globules: &[Particle],
    crescents: &[Particle],
    contamination: &[Particle],
    assignment: &Assignment,
    stats: &LinkStatistics,
) -> Result<()> {
    let base = &pair.base_name;

    // Raw particle echoes, in the same shape they were ingested.
    write_file(
        output_dir,
        &format!("DIC_{base}.txt"),
        &format_measurement_table(globules),
    )?;
    write_file(
        output_dir,
        &format!("RG_{base}.txt"),
        &format_measurement_table(crescents),
    )?;
    write_file(
        output_dir,
        &format!("RG_{base}CONT.txt"),
        &format_measurement_table(contamination),
    )?;

    // Derived particle lists.
    write_file(
        output_dir,
        &format!("NUCLEATED_{base}.txt"),
        &format_particle_table(assignment.pairs.iter().map(|pair| &pair.globule)),
    )?;
    write_file(
        output_dir,
        &format!("GLOB_{base}.txt"),
        &format_particle_table(assignment.ambiguous_of(ParticleRole::Globule)),
    )?;
    write_file(
        output_dir,
        &format!("CRES_{base}.txt"),
        &format_particle_table(assignment.ambiguous_of(ParticleRole::Crescent)),
    )?;

    // Pairing outcome and statistics.
    write_file(
        output_dir,
        &format!("LINK_{base}.txt"),
        &format_link_table(assignment),
    )?;
    write_file(
        output_dir,
        &format!("AMB_{base}.txt"),
        &format_ambiguous_table(&assignment.ambiguous),
    )?;
    let analysis_date = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    write_file(
        output_dir,
        &format!("STAT_{base}.txt"),
        &format_statistics(stats, base, &analysis_date),
    )?;

    Ok(())
}
