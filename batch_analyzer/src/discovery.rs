// THEORY:
// The `discovery` module maps a directory of detector measurement tables onto
// the image pairs the analyzer will process. The naming convention comes from
// the lab workflow: `DIC_<name>.txt` holds the globule measurements taken
// from the DIC micrograph, `RG_<name>.txt` the crescent measurements from the
// fluorescence image, and `RG_<name>CONT.txt` the contamination particles
// flagged in the same image. Prefixes and extensions are matched
// case-insensitively; pairing is by the shared `<name>`.

use anyhow::{Result, bail};
use log::warn;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One image's worth of measurement tables, keyed by the shared base name.
#[derive(Debug, Clone)]
pub struct MeasurementPair {
    pub base_name: String,
    /// `DIC_<name>.txt`, the globule table.
    pub globule_table: PathBuf,
    /// `RG_<name>.txt`, the crescent table.
    pub crescent_table: PathBuf,
    /// `RG_<name>CONT.txt` when present; a missing table means a clean image.
    pub contamination_table: Option<PathBuf>,
}

/// How one file name classifies under the naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TableKind {
    Globules(String),
    Crescents(String),
    Contamination(String),
    Unrelated,
}

fn classify(path: &Path) -> TableKind {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return TableKind::Unrelated;
    };
    let is_txt = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    if !is_txt {
        return TableKind::Unrelated;
    }

    let stem = stem.to_ascii_lowercase();
    if let Some(base) = stem.strip_prefix("dic_") {
        return TableKind::Globules(base.to_string());
    }
    if let Some(base) = stem.strip_prefix("rg_") {
        if let Some(base) = base.strip_suffix("cont") {
            return TableKind::Contamination(base.to_string());
        }
        return TableKind::Crescents(base.to_string());
    }
    TableKind::Unrelated
}

/// Scans `input_dir` and assembles the DIC/RG pairs found there, sorted by
/// base name. A globule table without a crescent partner is skipped with a
/// warning. Returns an empty list (not an error) when nothing matches.
pub fn find_measurement_pairs(input_dir: &Path) -> Result<Vec<MeasurementPair>> {
    if !input_dir.is_dir() {
        bail!("input directory not found: {}", input_dir.display());
    }

    let mut globule_tables: HashMap<String, PathBuf> = HashMap::new();
    let mut crescent_tables: HashMap<String, PathBuf> = HashMap::new();
    let mut contamination_tables: HashMap<String, PathBuf> = HashMap::new();

    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        match classify(&path) {
            TableKind::Globules(base) => {
                globule_tables.insert(base, path);
            }
            TableKind::Crescents(base) => {
                crescent_tables.insert(base, path);
            }
            TableKind::Contamination(base) => {
                contamination_tables.insert(base, path);
            }
            TableKind::Unrelated => {}
        }
    }

    let mut bases: Vec<String> = globule_tables.keys().cloned().collect();
    bases.sort();

    let mut pairs = Vec::new();
    for base in bases {
        let globule_table = globule_tables[&base].clone();
        match crescent_tables.get(&base) {
            Some(crescent_table) => pairs.push(MeasurementPair {
                base_name: base.clone(),
                globule_table,
                crescent_table: crescent_table.clone(),
                contamination_table: contamination_tables.get(&base).cloned(),
            }),
            None => {
                warn!(
                    "no crescent table for {}, skipping {}",
                    base,
                    globule_table.display()
                );
            }
        }
    }

    Ok(pairs)
}
