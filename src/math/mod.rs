//! Spherical geometry on the navigation sphere.
//!
//! All angles are radians and all positions are `(lat, lon)` pairs in
//! radians, unless a function name says otherwise. Distances are unit-sphere
//! arc lengths internally and are scaled by [`EARTH_RAD`] only at the
//! boundaries.

/// The 3-vector the kernel computes with
pub mod vector;

/// Tangents, courses, intercepts and distances on the sphere
pub mod spherical;

/// Turning circles and the arc solvers built on them
pub mod turns;

/// Small dense linear algebra
pub mod linear;

/// Earth radius in nautical miles (spherical model)
pub const EARTH_RAD: f64 = 3443.9184665;

/// Nautical miles to feet
pub const NM_TO_FT: f64 = 6076.12;

/// Unit-sphere magnitude below which a direction is considered degenerate
/// (about 0.3 nm when scaled back to the earth)
pub const TOLERANCE: f64 = 0.3 / EARTH_RAD;

/// How far a point may be off a circle and still count as lying on it
pub const RF_TOLERANCE: f64 = 0.3 / EARTH_RAD;

/// One vertex of a built flight path.
///
/// The course is the *inbound* true course at the point. The altitude is
/// in feet, and stays at `-inf` until the vertical profile solver has
/// visited the point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub lat: f64,
    pub lon: f64,
    pub course: f64,
    pub altitude: f64,
}

impl PathPoint {
    /// A path point with the altitude left for the vertical profile solver
    #[must_use]
    pub fn new(latlon: (f64, f64), course: f64) -> PathPoint {
        PathPoint {
            lat: latlon.0,
            lon: latlon.1,
            course,
            altitude: f64::NEG_INFINITY,
        }
    }

    /// A path point with a known altitude in feet
    #[must_use]
    pub fn with_altitude(latlon: (f64, f64), course: f64, altitude: f64) -> PathPoint {
        PathPoint {
            lat: latlon.0,
            lon: latlon.1,
            course,
            altitude,
        }
    }

    #[must_use]
    pub fn latlon(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}
