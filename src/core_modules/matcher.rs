// THEORY:
// The `matcher` implements the per-crescent decision rule: out of the nearby
// globules the grid produced, which one (if any) does this crescent belong to?
//
// The rule is deliberately size-first, not proximity-first. A crescent is a
// marker sitting on a globule's surface, so the physically plausible host is
// the largest compatible globule in range, not merely the closest bright spot.
//
// Key architectural principles & algorithm steps:
// 1.  **Radius Cutoff**: the crescent's equivalent circle radius
//     (sqrt(area/π)) scaled by a configurable multiplier bounds how far a
//     host can be. Bigger crescents may look further.
// 2.  **Area Floor**: a host must be at least a configurable fraction of the
//     crescent's own area. A marker larger than its host is a detection
//     artifact, not a nucleation event.
// 3.  **Largest Survivor Wins**: among candidates passing both cutoffs, the
//     one with the greatest area is selected. Area ties keep the candidate
//     encountered first; callers hand candidates over sorted by ascending
//     distance, so in practice a tie resolves to the nearest of the tied.
//     That ordering is a property of the caller, not a guarantee made here.
// 4.  **Stateless Utility**: the matcher judges one crescent against one
//     candidate list and remembers nothing. Exclusivity across crescents is
//     the orchestrator's job.

use crate::core_modules::particle::Particle;

pub mod matcher {
    use super::*; // Make structs from parent module available.

    /// Picks the accepted globule for one crescent, if any.
    ///
    /// `candidates` pairs each globule's distance from the crescent with its
    /// slot index into `globules`. Returns the chosen slot and its distance.
    pub fn select_globule(
        crescent: &Particle,
        candidates: &[(f64, usize)],
        globules: &[Particle],
        radius_multiplier: f64,
        min_area_ratio: f64,
    ) -> Option<(usize, f64)> {
        let radius_limit = radius_multiplier * crescent.equivalent_radius();
        let area_floor = min_area_ratio * crescent.area;

        let mut best: Option<(usize, f64)> = None;
        let mut best_area = f64::NEG_INFINITY;

        for &(distance, slot) in candidates {
            if distance > radius_limit {
                continue;
            }
            let area = globules[slot].area;
            if area < area_floor {
                continue;
            }
            // Strict comparison keeps the first-encountered candidate on ties.
            if area > best_area {
                best_area = area;
                best = Some((slot, distance));
            }
        }

        best
    }
}
