// THEORY:
// The `linker` module is the orchestrator of the engine. It owns the one piece
// of mutable state in a linking run (which globules have been claimed) and
// drives the per-crescent loop: query the grid, rank the candidates, ask the
// matcher for a verdict, record the outcome.
//
// This module solves the assignment's exclusivity problem.
//
// Key architectural principles:
// 1.  **Input Order Is the Tie-Break**: crescents are processed in the order
//     they were supplied. When two crescents contest one globule, the earlier
//     crescent claims it and the claim is final. Reordering the input can
//     change the result; that sensitivity is part of the algorithm's
//     contract, not an accident to engineer away.
// 2.  **Slot-Indexed Exclusivity**: the claimed set is a `HashSet` of slot
//     indices into the globule slice. Particles are plain values that may be
//     copied or serialized freely; positions are the only stable identity.
// 3.  **Greedy, Locally Optimal**: each crescent takes the best globule
//     available *at its turn*. No backtracking, no global optimization: the
//     result is deterministic and cheap, not globally optimal.
// 4.  **Total Accounting**: every input particle ends up in the result
//     exactly once, as half of a linked pair or as an ambiguous leftover.
//     Unclaimed globules are swept into the ambiguous list after the
//     crescent loop, in their input order.

use crate::core_modules::matcher::matcher;
use crate::core_modules::particle::{Particle, ParticleRole};
use crate::core_modules::spatial_grid::SpatialGrid;
use crate::pipeline::LinkerConfig;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// A crescent successfully assigned to a globule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedPair {
    pub crescent: Particle,
    pub globule: Particle,
    /// Euclidean distance between the two centroids, in pixels.
    pub distance: f64,
}

/// A particle left unassigned after matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ambiguous {
    pub particle: Particle,
    pub role: ParticleRole,
}

/// The complete outcome of one linking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub pairs: Vec<LinkedPair>,
    pub ambiguous: Vec<Ambiguous>,
}

impl Assignment {
    /// The ambiguous particles of one role, in the order they were emitted.
    pub fn ambiguous_of(&self, role: ParticleRole) -> impl Iterator<Item = &Particle> + '_ {
        self.ambiguous
            .iter()
            .filter(move |entry| entry.role == role)
            .map(|entry| &entry.particle)
    }
}

/// Runs one complete linking pass over validated particle lists.
///
/// Pure and total: any well-formed input, including empty lists and zero
/// image dimensions, produces a well-formed `Assignment`.
pub fn link(
    crescents: &[Particle],
    globules: &[Particle],
    image_width: u32,
    image_height: u32,
    config: &LinkerConfig,
) -> Assignment {
    let grid = SpatialGrid::build(
        globules,
        image_width,
        image_height,
        config.cell_width,
        config.cell_height,
    );

    let mut used_globules: HashSet<usize> = HashSet::new();
    let mut pairs: Vec<LinkedPair> = Vec::new();
    let mut ambiguous: Vec<Ambiguous> = Vec::new();

    // --- 1. Per-crescent matching ---
    // Earlier crescents claim first; a claimed globule is gone for good.
    for crescent in crescents {
        let mut candidates: Vec<(f64, usize)> = grid
            .neighborhood(crescent.x, crescent.y, config.search_radius_cells)
            .into_iter()
            .filter(|slot| !used_globules.contains(slot))
            .map(|slot| (crescent.distance_to(&globules[slot]), slot))
            .collect();
        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        match matcher::select_globule(
            crescent,
            &candidates,
            globules,
            config.radius_multiplier,
            config.min_area_ratio,
        ) {
            Some((slot, distance)) => {
                used_globules.insert(slot);
                pairs.push(LinkedPair {
                    crescent: *crescent,
                    globule: globules[slot],
                    distance,
                });
            }
            None => ambiguous.push(Ambiguous {
                particle: *crescent,
                role: ParticleRole::Crescent,
            }),
        }
    }

    // --- 2. Free globule sweep ---
    for (slot, globule) in globules.iter().enumerate() {
        if !used_globules.contains(&slot) {
            ambiguous.push(Ambiguous {
                particle: *globule,
                role: ParticleRole::Globule,
            });
        }
    }

    debug!(
        "linked {} of {} crescents against {} globules ({} ambiguous)",
        pairs.len(),
        crescents.len(),
        globules.len(),
        ambiguous.len()
    );

    Assignment { pairs, ambiguous }
}
