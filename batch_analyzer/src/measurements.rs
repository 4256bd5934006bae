// THEORY:
// The `measurements` module parses detector measurement tables into the
// engine's `Particle` records. The format is the ImageJ "Analyze Particles"
// export: tab-separated columns `Area X Y Perim. Circ.`, sometimes preceded
// by a blank preamble line, sometimes carrying a leading row-index column.
// Stored circularity is ignored; it is derived geometry and `Particle`
// recomputes it from area and perimeter.
//
// A malformed row fails the whole file. Half-parsed particle lists would
// produce plausible-looking but wrong statistics, which is worse than a
// skipped image pair.

use anyhow::{Context, Result, bail};
use globulink::pipeline::Particle;
use std::path::Path;

/// Reads and parses one measurement table from disk.
pub fn read_particle_table(path: &Path) -> Result<Vec<Particle>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading measurement table {}", path.display()))?;
    parse_particle_table(&content)
        .with_context(|| format!("parsing measurement table {}", path.display()))
}

/// Parses measurement table text. Blank lines and header rows are tolerated
/// anywhere; every remaining line must be a well-formed particle row.
pub fn parse_particle_table(content: &str) -> Result<Vec<Particle>> {
    let mut particles = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line_number = index + 1;
        let fields: Vec<&str> = raw_line
            .split('\t')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .collect();

        if fields.is_empty() {
            continue;
        }
        if fields.iter().any(|field| field.eq_ignore_ascii_case("area")) {
            // Column header row, in whichever variant the writer used.
            continue;
        }

        let (area, x, y, perimeter) = parse_row(&fields)
            .with_context(|| format!("line {line_number}: {raw_line:?}"))?;
        let particle = Particle::new(area, x, y, perimeter)
            .with_context(|| format!("line {line_number}: {raw_line:?}"))?;
        particles.push(particle);
    }

    Ok(particles)
}

/// Extracts `(area, x, y, perimeter)` from one data row.
fn parse_row(fields: &[&str]) -> Result<(f64, f64, f64, f64)> {
    let numbers = fields
        .iter()
        .map(|field| {
            field
                .parse::<f64>()
                .with_context(|| format!("not a number: {field:?}"))
        })
        .collect::<Result<Vec<f64>>>()?;

    let values = match numbers.len() {
        // Area X Y Perim. [Circ.]
        4 | 5 => &numbers[0..4],
        // Row index first, as ImageJ writes it.
        6 => &numbers[1..5],
        n => bail!("expected 4 to 6 columns, found {n}"),
    };

    Ok((values[0], values[1], values[2], values[3]))
}
