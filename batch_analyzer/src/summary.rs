// THEORY:
// The `summary` module is the batch-level bookkeeping layer. Each analyzed
// pair produces one `PairOutcome`, success or failure, and the batch keeps
// going either way. At the end of a run the outcomes are rolled up three
// ways: a per-image summary table, an aggregate statistics block, and a
// machine-readable JSON record of the whole run.
//
// Key architectural principles:
// 1.  **Failure Isolation**: A failed pair is a row in the summary, not a
//     crashed batch. The error text travels with the outcome.
// 2.  **In-Memory Aggregation**: The roll-ups are computed from the outcomes
//     held in memory, never by re-parsing the report files on disk.
// 3.  **One Timestamp per Run**: The run's start time names the JSON file and
//     stamps its contents, so repeated runs never overwrite each other.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use globulink::pipeline::LinkStatistics;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Per-pair numbers carried into the batch summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairStats {
    /// Contamination particles read alongside the crescents.
    pub contamination: usize,
    #[serde(flatten)]
    pub statistics: LinkStatistics,
}

/// The result of analyzing one measurement pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairOutcome {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PairStats>,
    pub elapsed_seconds: f64,
}

impl PairOutcome {
    pub fn success(filename: String, stats: PairStats, elapsed_seconds: f64) -> Self {
        Self {
            filename,
            success: true,
            error: None,
            stats: Some(stats),
            elapsed_seconds,
        }
    }

    pub fn failure(filename: String, error: String, elapsed_seconds: f64) -> Self {
        Self {
            filename,
            success: false,
            error: Some(error),
            stats: None,
            elapsed_seconds,
        }
    }
}

/// Machine-readable record of a whole batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub success: bool,
    pub timestamp: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: f64,
    pub total_pairs: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<PairOutcome>,
}

impl BatchSummary {
    pub fn new(
        results: Vec<PairOutcome>,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Self {
        let successful = results.iter().filter(|outcome| outcome.success).count();
        let failed = results.len() - successful;
        Self {
            success: true,
            timestamp: start.format("%Y_%m_%d_%H_%M").to_string(),
            start_time: start.to_rfc3339(),
            end_time: end.to_rfc3339(),
            duration_seconds: (end - start).num_milliseconds() as f64 / 1000.0,
            total_pairs: results.len(),
            successful,
            failed,
            results,
        }
    }
}

/// Tab-separated per-image table, one row per successfully analyzed pair.
pub fn format_summary_table(outcomes: &[PairOutcome]) -> String {
    let mut out = String::from(
        "Filename\tTotal Globules\tTotal Crescents\tLinked Pairs\t\
         Globules with Crescents (%)\tAverage Crescent Area\tAverage Globule Area\n",
    );
    for outcome in outcomes {
        let Some(stats) = &outcome.stats else { continue };
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{:.3}\t{:.3}\t{:.3}",
            outcome.filename,
            stats.statistics.total_globules,
            stats.statistics.total_crescents,
            stats.statistics.linked_pairs,
            stats.statistics.nucleation_percent,
            stats.statistics.avg_crescent_area,
            stats.statistics.avg_globule_area,
        );
    }
    out
}

/// Aggregate statistics block over the successfully analyzed pairs.
pub fn format_summary_stats(outcomes: &[PairOutcome], generated: &str) -> String {
    let analyzed: Vec<&PairStats> = outcomes
        .iter()
        .filter_map(|outcome| outcome.stats.as_ref())
        .collect();

    let mut out = format!(
        "GLOBULINK BATCH SUMMARY STATISTICS\n\
         Generated: {generated}\n\
         Total Files Analyzed: {}\n\
         \n",
        analyzed.len()
    );

    if analyzed.is_empty() {
        return out;
    }

    let count = analyzed.len() as f64;
    let total_globules: usize = analyzed.iter().map(|s| s.statistics.total_globules).sum();
    let total_crescents: usize = analyzed.iter().map(|s| s.statistics.total_crescents).sum();
    let total_linked: usize = analyzed.iter().map(|s| s.statistics.linked_pairs).sum();
    let avg_nucleation: f64 = analyzed
        .iter()
        .map(|s| s.statistics.nucleation_percent)
        .sum::<f64>()
        / count;

    let _ = writeln!(out, "Total Globules (all files): {total_globules}");
    let _ = writeln!(
        out,
        "Average Globules per file: {:.2}",
        total_globules as f64 / count
    );
    let _ = writeln!(out, "Total Crescents (all files): {total_crescents}");
    let _ = writeln!(
        out,
        "Average Crescents per file: {:.2}",
        total_crescents as f64 / count
    );
    let _ = writeln!(out, "Total Linked Pairs (all files): {total_linked}");
    let _ = writeln!(
        out,
        "Average Linked Pairs per file: {:.2}",
        total_linked as f64 / count
    );
    let _ = writeln!(out, "Average Nucleation Rate: {avg_nucleation:.2}%");
    out
}

/// Writes `<dirname>_summary.txt` and `<dirname>_summary_stats.txt` next to
/// the per-image reports.
pub fn write_summary_report(output_dir: &Path, outcomes: &[PairOutcome]) -> Result<()> {
    let dir_name = output_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());

    let table_path = output_dir.join(format!("{dir_name}_summary.txt"));
    std::fs::write(&table_path, format_summary_table(outcomes))
        .with_context(|| format!("writing {}", table_path.display()))?;

    let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let stats_path = output_dir.join(format!("{dir_name}_summary_stats.txt"));
    std::fs::write(&stats_path, format_summary_stats(outcomes, &generated))
        .with_context(|| format!("writing {}", stats_path.display()))?;

    Ok(())
}

/// Writes the timestamped JSON record of the run and returns its path.
pub fn write_batch_summary(output_dir: &Path, summary: &BatchSummary) -> Result<PathBuf> {
    let path = output_dir.join(format!("batch_summary_{}.json", summary.timestamp));
    let json = serde_json::to_string_pretty(summary).context("serializing batch summary")?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_stats(globules: usize, crescents: usize, linked: usize) -> PairStats {
        PairStats {
            contamination: 1,
            statistics: LinkStatistics {
                total_globules: globules,
                total_crescents: crescents,
                linked_pairs: linked,
                nucleation_percent: if globules > 0 {
                    100.0 * linked as f64 / globules as f64
                } else {
                    0.0
                },
                avg_crescent_area: 100.0,
                avg_globule_area: 400.0,
            },
        }
    }

    #[test]
    fn failure_outcomes_serialize_without_stats() {
        let outcome = PairOutcome::failure("slide_b".into(), "no such file".into(), 0.25);
        let json = serde_json::to_string(&outcome).unwrap();

        assert!(json.contains("\"error\":\"no such file\""));
        assert!(!json.contains("stats"));
    }

    #[test]
    fn success_outcomes_flatten_the_statistics() {
        let outcome = PairOutcome::success("slide_a".into(), sample_stats(4, 3, 2), 1.5);
        let json = serde_json::to_string(&outcome).unwrap();

        assert!(json.contains("\"contamination\":1"));
        assert!(json.contains("\"total_globules\":4"));
        assert!(!json.contains("error"));

        let parsed: PairOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, outcome);
    }

    #[test]
    fn summary_table_skips_failed_pairs() {
        let outcomes = vec![
            PairOutcome::success("slide_a".into(), sample_stats(4, 3, 2), 1.0),
            PairOutcome::failure("slide_b".into(), "bad row".into(), 0.1),
        ];
        let table = format_summary_table(&outcomes);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Filename\tTotal Globules"));
        assert_eq!(lines[1], "slide_a\t4\t3\t2\t50.000\t100.000\t400.000");
    }

    #[test]
    fn summary_stats_aggregate_over_successes_only() {
        let outcomes = vec![
            PairOutcome::success("slide_a".into(), sample_stats(4, 3, 2), 1.0),
            PairOutcome::success("slide_c".into(), sample_stats(6, 5, 4), 1.0),
            PairOutcome::failure("slide_b".into(), "bad row".into(), 0.1),
        ];
        let block = format_summary_stats(&outcomes, "2026-08-25 12:00:00");

        assert!(block.contains("Total Files Analyzed: 2\n"));
        assert!(block.contains("Total Globules (all files): 10\n"));
        assert!(block.contains("Average Globules per file: 5.00\n"));
        assert!(block.contains("Total Linked Pairs (all files): 6\n"));
        // Mean of 50% and 66.67% nucleation.
        assert!(block.contains("Average Nucleation Rate: 58.33%\n"));
    }

    #[test]
    fn summary_stats_for_an_empty_batch_stop_at_the_header() {
        let block = format_summary_stats(&[], "2026-08-25 12:00:00");
        assert!(block.ends_with("Total Files Analyzed: 0\n\n"));
        assert!(!block.contains("Total Globules"));
    }

    #[test]
    fn batch_summary_counts_and_stamps_the_run() {
        let start = Local.with_ymd_and_hms(2026, 8, 25, 9, 30, 0).unwrap();
        let end = Local.with_ymd_and_hms(2026, 8, 25, 9, 30, 42).unwrap();
        let summary = BatchSummary::new(
            vec![
                PairOutcome::success("slide_a".into(), sample_stats(4, 3, 2), 1.0),
                PairOutcome::failure("slide_b".into(), "bad row".into(), 0.1),
            ],
            start,
            end,
        );

        assert_eq!(summary.timestamp, "2026_08_25_09_30");
        assert_eq!(summary.total_pairs, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert!((summary.duration_seconds - 42.0).abs() < 1e-9);
    }

    #[test]
    fn writes_both_summary_files_and_the_json_record() {
        let dir = std::env::temp_dir().join(format!("globulink_summary_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let outcomes = vec![PairOutcome::success(
            "slide_a".into(),
            sample_stats(4, 3, 2),
            1.0,
        )];
        write_summary_report(&dir, &outcomes).unwrap();

        let dir_name = dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(dir.join(format!("{dir_name}_summary.txt")).is_file());
        assert!(dir.join(format!("{dir_name}_summary_stats.txt")).is_file());

        let start = Local.with_ymd_and_hms(2026, 8, 25, 9, 30, 0).unwrap();
        let summary = BatchSummary::new(outcomes, start, start);
        let json_path = write_batch_summary(&dir, &summary).unwrap();
        assert!(json_path.is_file());
        assert_eq!(
            json_path.file_name().unwrap().to_string_lossy(),
            "batch_summary_2026_08_25_09_30.json"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
