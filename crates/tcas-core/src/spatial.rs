//! Spatial math for flight paths and closest-approach geometry.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Tolerance for treating two coordinates as the same point, in meters.
/// Airports are matched against flight destinations with this epsilon.
pub const COORD_EPSILON_M: f64 = 0.1;

// Squared-length threshold below which a segment degenerates to a point,
// and the denominator threshold for the near-parallel branch.
const PARALLEL_EPSILON: f64 = 1e-6;

/// A position in simulation space, in meters. Airports sit at z = 0;
/// aircraft cruise at a fixed positive z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinate {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product of two coordinates treated as 3D vectors.
    pub fn dot(self, other: Coordinate) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Euclidean distance to another coordinate.
    pub fn distance(self, other: Coordinate) -> f64 {
        let d = self - other;
        d.dot(d).sqrt()
    }

    /// Approximate equality within [`COORD_EPSILON_M`].
    pub fn approx_eq(self, other: Coordinate) -> bool {
        self.distance(other) < COORD_EPSILON_M
    }
}

impl Add for Coordinate {
    type Output = Coordinate;

    fn add(self, other: Coordinate) -> Coordinate {
        Coordinate::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Coordinate {
    type Output = Coordinate;

    fn sub(self, other: Coordinate) -> Coordinate {
        Coordinate::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Coordinate {
    type Output = Coordinate;

    fn mul(self, s: f64) -> Coordinate {
        Coordinate::new(self.x * s, self.y * s, self.z * s)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.0}, {:.0}, {:.0})", self.x, self.y, self.z)
    }
}

/// Closest pair of points between two 3D line segments.
///
/// Segment 1 runs from `p1` to `q1`, segment 2 from `p2` to `q2`. Returns
/// one point on each segment minimizing the distance between them.
/// Degenerate (point-like) segments and near-parallel segments are handled
/// explicitly; in the near-parallel case the parameter on segment 2 is
/// pinned to its start.
pub fn closest_points_between_segments(
    p1: Coordinate,
    q1: Coordinate,
    p2: Coordinate,
    q2: Coordinate,
) -> (Coordinate, Coordinate) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;

    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    if a <= PARALLEL_EPSILON && e <= PARALLEL_EPSILON {
        // Both segments are points.
        return (p1, p2);
    }
    if a <= PARALLEL_EPSILON {
        // First segment is a point; project it onto segment 2.
        let s2 = (f / e).clamp(0.0, 1.0);
        return (p1, p2 + d2 * s2);
    }
    if e <= PARALLEL_EPSILON {
        // Second segment is a point; project it onto segment 1.
        let s1 = (-r.dot(d1) / a).clamp(0.0, 1.0);
        return (p1 + d1 * s1, p2);
    }

    let b = d1.dot(d2);
    let c = d1.dot(r);
    let denom = a * e - b * b;

    let mut s1;
    let mut s2;
    if denom < PARALLEL_EPSILON {
        // Near-parallel: pin segment 2 at its start and solve segment 1.
        s2 = 0.0;
        s1 = (-c / a).clamp(0.0, 1.0);
    } else {
        s1 = ((b * f - c * e) / denom).clamp(0.0, 1.0);
        s2 = (b * s1 + f) / e;
    }

    // Clamping s2 to the segment requires recomputing s1 against the pinned
    // endpoint.
    if s2 < 0.0 {
        s2 = 0.0;
        s1 = (-c / a).clamp(0.0, 1.0);
    } else if s2 > 1.0 {
        s2 = 1.0;
        s1 = ((b - c) / a).clamp(0.0, 1.0);
    }

    (p1 + d1 * s1, p2 + d2 * s2)
}
