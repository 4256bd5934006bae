// THEORY:
// The `pipeline` module is the final, top-level API for the linking engine.
// It encapsulates the full stack (grid index, matcher, orchestrator,
// statistics) behind a single validated entry point. Consumers construct a
// `LinkPipeline` once, then feed it one image pair's particle lists at a time
// and receive a complete `Assignment` plus derived statistics.
//
// Configuration is checked when the pipeline is built, and particle geometry
// is checked when it enters `link`, so the core algorithm itself never sees a
// value it cannot do arithmetic on.

use crate::core_modules::linker;
use crate::core_modules::statistics;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export key data structures for the public API.
pub use crate::core_modules::linker::{Ambiguous, Assignment, LinkedPair};
pub use crate::core_modules::particle::{GeometryError, Particle, ParticleRole};
pub use crate::core_modules::statistics::{LinkStatistics, summarize};

const DEFAULT_CELL_WIDTH: u32 = 50;
const DEFAULT_CELL_HEIGHT: u32 = 50;
const DEFAULT_SEARCH_RADIUS_CELLS: u32 = 1;
const DEFAULT_RADIUS_MULTIPLIER: f64 = 3.0;
const DEFAULT_MIN_AREA_RATIO: f64 = 0.25;

/// Configuration for the LinkPipeline, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Width of one spatial grid cell in pixels.
    pub cell_width: u32,
    /// Height of one spatial grid cell in pixels.
    pub cell_height: u32,
    /// Neighborhood reach of a grid query, in cells. The default of 1 scans
    /// the 3x3 block around the crescent's cell; candidates beyond that block
    /// are invisible regardless of the radius multiplier.
    pub search_radius_cells: u32,
    /// Scales a crescent's equivalent circle radius into its maximum host
    /// distance.
    pub radius_multiplier: f64,
    /// Minimum globule area as a fraction of the crescent's area.
    pub min_area_ratio: f64,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            cell_width: DEFAULT_CELL_WIDTH,
            cell_height: DEFAULT_CELL_HEIGHT,
            search_radius_cells: DEFAULT_SEARCH_RADIUS_CELLS,
            radius_multiplier: DEFAULT_RADIUS_MULTIPLIER,
            min_area_ratio: DEFAULT_MIN_AREA_RATIO,
        }
    }
}

impl LinkerConfig {
    /// Fail-fast configuration check, run once at pipeline construction.
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(LinkError::InvalidCellSize {
                width: self.cell_width,
                height: self.cell_height,
            });
        }
        if !self.radius_multiplier.is_finite() || self.radius_multiplier <= 0.0 {
            return Err(LinkError::InvalidRadiusMultiplier(self.radius_multiplier));
        }
        if !self.min_area_ratio.is_finite() || self.min_area_ratio < 0.0 {
            return Err(LinkError::InvalidAreaRatio(self.min_area_ratio));
        }
        Ok(())
    }
}

/// Errors surfaced by pipeline construction and ingestion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("grid cell dimensions must be non-zero, got {width}x{height}")]
    InvalidCellSize { width: u32, height: u32 },
    #[error("radius multiplier must be finite and positive, got {0}")]
    InvalidRadiusMultiplier(f64),
    #[error("minimum area ratio must be finite and non-negative, got {0}")]
    InvalidAreaRatio(f64),
    #[error("{role} at slot {slot} is malformed: {source}")]
    InvalidParticle {
        role: ParticleRole,
        slot: usize,
        #[source]
        source: GeometryError,
    },
}

/// The main, top-level struct for the linking engine.
pub struct LinkPipeline {
    config: LinkerConfig,
}

impl LinkPipeline {
    /// Builds a pipeline from a validated configuration.
    pub fn new(config: LinkerConfig) -> Result<Self, LinkError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    /// Runs one linking pass: validates both particle lists, builds the grid
    /// over the globules, and assigns crescents in input order.
    pub fn link(
        &self,
        crescents: &[Particle],
        globules: &[Particle],
        image_width: u32,
        image_height: u32,
    ) -> Result<Assignment, LinkError> {
        validate_particles(crescents, ParticleRole::Crescent)?;
        validate_particles(globules, ParticleRole::Globule)?;

        Ok(linker::link(
            crescents,
            globules,
            image_width,
            image_height,
            &self.config,
        ))
    }

    /// Convenience forward to the statistics aggregator.
    pub fn summarize(
        &self,
        assignment: &Assignment,
        total_globules: usize,
        total_crescents: usize,
    ) -> LinkStatistics {
        statistics::summarize(assignment, total_globules, total_crescents)
    }
}

fn validate_particles(particles: &[Particle], role: ParticleRole) -> Result<(), LinkError> {
    for (slot, particle) in particles.iter().enumerate() {
        particle
            .validate()
            .map_err(|source| LinkError::InvalidParticle { role, slot, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_particle(area: f64, x: f64, y: f64) -> Particle {
        Particle::new(area, x, y, 20.0).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(LinkPipeline::new(LinkerConfig::default()).is_ok());
    }

    #[test]
    fn zero_cell_dimensions_fail_fast() {
        let config = LinkerConfig {
            cell_width: 0,
            ..LinkerConfig::default()
        };
        assert_eq!(
            LinkPipeline::new(config).err(),
            Some(LinkError::InvalidCellSize {
                width: 0,
                height: 50
            })
        );
    }

    #[test]
    fn non_positive_radius_multiplier_fails_fast() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = LinkerConfig {
                radius_multiplier: bad,
                ..LinkerConfig::default()
            };
            assert!(matches!(
                LinkPipeline::new(config),
                Err(LinkError::InvalidRadiusMultiplier(_))
            ));
        }
    }

    #[test]
    fn negative_area_ratio_fails_fast() {
        let config = LinkerConfig {
            min_area_ratio: -0.1,
            ..LinkerConfig::default()
        };
        assert!(matches!(
            LinkPipeline::new(config),
            Err(LinkError::InvalidAreaRatio(_))
        ));
    }

    #[test]
    fn link_names_the_slot_and_role_of_a_malformed_particle() {
        let pipeline = LinkPipeline::new(LinkerConfig::default()).unwrap();
        let good = make_particle(100.0, 10.0, 10.0);
        let mut bad = good;
        bad.x = f64::NAN;

        let err = pipeline
            .link(&[good, bad], &[], 1000, 1000)
            .expect_err("NaN centroid must be rejected");
        assert!(matches!(
            err,
            LinkError::InvalidParticle {
                role: ParticleRole::Crescent,
                slot: 1,
                ..
            }
        ));
    }

    #[test]
    fn end_to_end_link_and_summarize() {
        let pipeline = LinkPipeline::new(LinkerConfig::default()).unwrap();
        let crescents = vec![make_particle(100.0, 200.0, 200.0)];
        let globules = vec![
            make_particle(400.0, 205.0, 200.0),
            make_particle(400.0, 600.0, 600.0),
        ];

        let assignment = pipeline.link(&crescents, &globules, 1000, 1000).unwrap();
        assert_eq!(assignment.pairs.len(), 1);

        let stats = pipeline.summarize(&assignment, globules.len(), crescents.len());
        assert_eq!(stats.nucleation_percent, 50.0);
        assert_eq!(stats.total_globules, 2);
        assert_eq!(stats.total_crescents, 1);
    }
}
