// THEORY:
// The `statistics` module condenses an `Assignment` into the handful of
// numbers the downstream reports care about. It is a pure projection: derived
// fresh from a result every time, never stored alongside one, and safe to
// recompute at will.

use crate::core_modules::linker::Assignment;
use serde::{Deserialize, Serialize};

/// Summary metrics for one image pair's linking result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkStatistics {
    /// Number of globules the detector reported for this image.
    pub total_globules: usize,
    /// Number of crescents the detector reported for this image.
    pub total_crescents: usize,
    /// Number of crescent-globule pairs the linker accepted.
    pub linked_pairs: usize,
    /// Percentage of globules that host a crescent. 0.0 when there are no
    /// globules at all.
    pub nucleation_percent: f64,
    /// Mean crescent area over the linked pairs only. 0.0 with no pairs.
    pub avg_crescent_area: f64,
    /// Mean globule area over the linked pairs only. 0.0 with no pairs.
    pub avg_globule_area: f64,
}

/// Computes summary metrics from a linking result and the input totals.
///
/// The totals are passed in rather than recovered from the assignment so the
/// caller cannot accidentally fold contamination or filtered particles into
/// the denominator.
pub fn summarize(
    assignment: &Assignment,
    total_globules: usize,
    total_crescents: usize,
) -> LinkStatistics {
    let linked_pairs = assignment.pairs.len();

    let nucleation_percent = if total_globules > 0 {
        100.0 * linked_pairs as f64 / total_globules as f64
    } else {
        0.0
    };

    let (avg_crescent_area, avg_globule_area) = if linked_pairs > 0 {
        let count = linked_pairs as f64;
        let crescent_total: f64 = assignment.pairs.iter().map(|p| p.crescent.area).sum();
        let globule_total: f64 = assignment.pairs.iter().map(|p| p.globule.area).sum();
        (crescent_total / count, globule_total / count)
    } else {
        (0.0, 0.0)
    };

    LinkStatistics {
        total_globules,
        total_crescents,
        linked_pairs,
        nucleation_percent,
        avg_crescent_area,
        avg_globule_area,
    }
}
