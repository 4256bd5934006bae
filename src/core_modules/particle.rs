// THEORY:
// The `particle` module is the shared data model of the linking engine. A
// `Particle` is the immutable geometric record of one detected region as an
// external detector measured it: its area, its centroid, and its perimeter,
// all in pixel units. Everything downstream (the grid index, the matcher, the
// statistics) operates on these records and nothing else.
//
// Key architectural principles:
// 1.  **Dumb Data Container**: A `Particle` carries measurements and derived
//     geometry only. It has no behavior beyond simple geometric accessors and
//     no knowledge of the linking algorithm that consumes it.
// 2.  **Validated at the Boundary**: Malformed measurements (negative areas,
//     NaN centroids) are rejected when a `Particle` enters the system, so the
//     matching code never has to reason about non-finite arithmetic.
// 3.  **Slot Identity**: Two particles may coincide in every field. Identity
//     is therefore the particle's position in the input slice (its "slot"),
//     never its value. The structs here deliberately carry no id field.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use thiserror::Error;

/// The side of the linking problem a particle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleRole {
    Globule,
    Crescent,
}

impl fmt::Display for ParticleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticleRole::Globule => write!(f, "globule"),
            ParticleRole::Crescent => write!(f, "crescent"),
        }
    }
}

/// A malformed geometric measurement, rejected before it reaches the matcher.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("area must be finite and non-negative, got {0}")]
    InvalidArea(f64),
    #[error("perimeter must be finite and non-negative, got {0}")]
    InvalidPerimeter(f64),
    #[error("centroid must be finite, got ({0}, {1})")]
    InvalidCentroid(f64, f64),
}

/// The geometric record of a single detected region.
/// This is a "dumb" data container; it is immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Measured area of the region in square pixels.
    pub area: f64,
    /// X coordinate of the region's centroid, in pixels.
    pub x: f64,
    /// Y coordinate of the region's centroid, in pixels.
    pub y: f64,
    /// Measured perimeter of the region outline, in pixels.
    pub perimeter: f64,
    /// Shape descriptor `4π·area / perimeter²`: 1.0 for a perfect circle,
    /// approaching 0.0 for elongated shapes. 0.0 when the perimeter is zero.
    pub circularity: f64,
}

impl Particle {
    /// Builds a particle from raw detector measurements, deriving circularity.
    /// Rejects non-finite or negative geometry.
    pub fn new(area: f64, x: f64, y: f64, perimeter: f64) -> Result<Self, GeometryError> {
        if !area.is_finite() || area < 0.0 {
            return Err(GeometryError::InvalidArea(area));
        }
        if !perimeter.is_finite() || perimeter < 0.0 {
            return Err(GeometryError::InvalidPerimeter(perimeter));
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::InvalidCentroid(x, y));
        }

        let circularity = if perimeter > 0.0 {
            4.0 * PI * area / (perimeter * perimeter)
        } else {
            0.0
        };

        Ok(Self {
            area,
            x,
            y,
            perimeter,
            circularity,
        })
    }

    /// Re-checks the geometric fields. `Particle` fields are public, so a
    /// record built by hand can still be vetted at the linking boundary.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !self.area.is_finite() || self.area < 0.0 {
            return Err(GeometryError::InvalidArea(self.area));
        }
        if !self.perimeter.is_finite() || self.perimeter < 0.0 {
            return Err(GeometryError::InvalidPerimeter(self.perimeter));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(GeometryError::InvalidCentroid(self.x, self.y));
        }
        Ok(())
    }

    /// Radius of the circle with the same area as this particle.
    pub fn equivalent_radius(&self) -> f64 {
        (self.area / PI).sqrt()
    }

    /// Euclidean distance between this particle's centroid and another's.
    pub fn distance_to(&self, other: &Particle) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circularity_of_a_perfect_circle_is_one() {
        let radius = 10.0_f64;
        let area = PI * radius * radius;
        let perimeter = 2.0 * PI * radius;
        let particle = Particle::new(area, 0.0, 0.0, perimeter).unwrap();
        assert!((particle.circularity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn circularity_is_zero_when_perimeter_is_zero() {
        let particle = Particle::new(50.0, 5.0, 5.0, 0.0).unwrap();
        assert_eq!(particle.circularity, 0.0);
    }

    #[test]
    fn equivalent_radius_inverts_the_area_formula() {
        let particle = Particle::new(PI * 16.0, 0.0, 0.0, 10.0).unwrap();
        assert!((particle.equivalent_radius() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Particle::new(1.0, 0.0, 0.0, 1.0).unwrap();
        let b = Particle::new(1.0, 3.0, 4.0, 1.0).unwrap();
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_negative_area() {
        assert_eq!(
            Particle::new(-1.0, 0.0, 0.0, 1.0),
            Err(GeometryError::InvalidArea(-1.0))
        );
    }

    #[test]
    fn rejects_non_finite_measurements() {
        assert!(matches!(
            Particle::new(f64::NAN, 0.0, 0.0, 1.0),
            Err(GeometryError::InvalidArea(_))
        ));
        assert!(matches!(
            Particle::new(1.0, f64::INFINITY, 0.0, 1.0),
            Err(GeometryError::InvalidCentroid(_, _))
        ));
        assert!(matches!(
            Particle::new(1.0, 0.0, 0.0, f64::NEG_INFINITY),
            Err(GeometryError::InvalidPerimeter(_))
        ));
    }

    #[test]
    fn validate_catches_hand_built_records() {
        let mut particle = Particle::new(10.0, 1.0, 2.0, 3.0).unwrap();
        assert!(particle.validate().is_ok());
        particle.area = f64::NAN;
        assert!(matches!(
            particle.validate(),
            Err(GeometryError::InvalidArea(_))
        ));
    }
}
