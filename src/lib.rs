#![doc = include_str!("../README.md")]

/// The bread-and-butter, shrink-wrapped and ready to use
pub mod prelude {
    pub use crate::Error;
    pub use crate::geom::*;
    pub use crate::mag::*;
    pub use crate::mesh::*;
    pub use crate::nav::*;
    pub use crate::route::*;
}

/// Spherical geometry kernel
pub mod geom {
    pub use crate::math::linear::solve3;
    pub use crate::math::spherical::angle_between;
    pub use crate::math::spherical::circle_distance;
    pub use crate::math::spherical::course_between;
    pub use crate::math::spherical::course_from_tangent;
    pub use crate::math::spherical::earth_distance;
    pub use crate::math::spherical::go_dist_from;
    pub use crate::math::spherical::go_to_dme;
    pub use crate::math::spherical::intersection;
    pub use crate::math::spherical::point_bisect_line;
    pub use crate::math::spherical::point_dist_to_line;
    pub use crate::math::spherical::sphere_tangent;
    pub use crate::math::spherical::to_latlon;
    pub use crate::math::spherical::to_xyz;
    pub use crate::math::spherical::to_xyz_earth;
    pub use crate::math::turns::arc_between_points;
    pub use crate::math::turns::arc_points;
    pub use crate::math::turns::turn_from;
    pub use crate::math::turns::turn_to_course_towards;
    pub use crate::math::turns::turn_towards;
    pub use crate::math::turns::TurningCircle;
    pub use crate::math::vector::Vec3;
    pub use crate::math::PathPoint;
    pub use crate::math::EARTH_RAD;
    pub use crate::math::NM_TO_FT;
    pub use crate::math::RF_TOLERANCE;
    pub use crate::math::TOLERANCE;
}

/// Magnetic declination adapter
pub mod mag {
    pub use crate::magvar::install_magnetic_model;
    pub use crate::magvar::true_course;
    pub use crate::magvar::MagneticModel;
}

/// Navigation database: fixes, airports, runways and coded procedures
pub mod nav {
    pub use crate::navdata::leg::Approach;
    pub use crate::navdata::leg::Leg;
    pub use crate::navdata::leg::LegInfo;
    pub use crate::navdata::leg::ProcKind;
    pub use crate::navdata::leg::Sid;
    pub use crate::navdata::leg::Star;
    pub use crate::navdata::leg::TurnDir;
    pub use crate::navdata::types::AirportInfo;
    pub use crate::navdata::types::AltitudeRestriction;
    pub use crate::navdata::types::Course;
    pub use crate::navdata::types::DistOrTime;
    pub use crate::navdata::types::Radial;
    pub use crate::navdata::types::RadialDme;
    pub use crate::navdata::types::SpeedRestriction;
    pub use crate::navdata::types::Waypoint;
    pub use crate::navdata::AirportData;
    pub use crate::navdata::NavDatabase;
}

/// Path builder: leg lists to flight path points
pub mod route {
    pub use crate::path::altitude_envelopes;
    pub use crate::path::build_approach;
    pub use crate::path::build_points;
    pub use crate::path::build_sid;
    pub use crate::path::build_star;
    pub use crate::path::AircraftConfig;
    pub use crate::path::BuiltPath;
    pub use crate::path::DEFAULT_APPROACH_ALT;
}

/// Ribbon extruder: flight path points to corridor meshes
pub mod mesh {
    pub use crate::ribbon::build_ribbon;
    pub use crate::ribbon::Mesh;
    pub use crate::ribbon::RibbonConfig;
}

use thiserror::Error;
/// The *Flightpath* error messaging enumeration
#[derive(Error, Debug)]
pub enum Error {
    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("{path}: malformed record '{record}': {message}")]
    Parse {
        path: String,
        record: String,
        message: String,
    },

    #[error("Reference to unknown {0} '{1}'")]
    ReferenceMissing(&'static str, String),

    #[error("Degenerate geometry: {0}")]
    Degenerate(&'static str),

    #[error("Singular matrix")]
    Singular,

    #[error("Leg type {0} is not implemented")]
    Unimplemented(&'static str),

    #[error("Intercept {0:.1} nm away exceeds the intercept range")]
    InterceptTooFar(f64),

    #[error("Leg type {0} may not follow an intercept leg")]
    BadSequence(&'static str),

    #[error("'{0}' not found{1}")]
    NotFound(String, String),

    #[error("Invalid: {0}")]
    Invalid(String),
}

mod magvar;
mod math;
mod navdata;
mod path;
mod ribbon;

/// Some shared test fixtures
#[cfg(test)]
mod test_data {
    use crate::navdata::types::Waypoint;
    use std::sync::Arc;

    pub fn waypoint(name: &str, lat: f64, lon: f64) -> Arc<Waypoint> {
        Arc::new(Waypoint {
            name: name.to_string(),
            lat,
            lon,
            region: "ZZ".to_string(),
            airport: None,
        })
    }
}
