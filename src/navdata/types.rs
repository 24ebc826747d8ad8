use std::fmt;
use std::sync::Arc;

/// A named geographic point: a fix, a navaid, or a runway threshold.
/// Coordinates are decimal degrees, as they come from the data files.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub region: String,
    /// Set for runway thresholds and airport reference points
    pub airport: Option<String>,
}

impl Waypoint {
    /// Position in radians, the way the geometry kernel wants it
    #[must_use]
    pub fn latlon_rad(&self) -> (f64, f64) {
        (self.lat.to_radians(), self.lon.to_radians())
    }
}

/// A course over the ground, referenced to magnetic north unless flagged
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Course {
    pub degrees: f64,
    pub is_true: bool,
}

impl Course {
    #[must_use]
    pub fn magnetic(degrees: f64) -> Course {
        Course {
            degrees,
            is_true: false,
        }
    }

    #[must_use]
    pub fn true_north(degrees: f64) -> Course {
        Course {
            degrees,
            is_true: true,
        }
    }

    #[must_use]
    pub fn as_rad(&self) -> f64 {
        self.degrees.to_radians()
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let suffix = if self.is_true { "°T" } else { "°" };
        write!(f, "{}{suffix}", self.degrees.round())
    }
}

/// A leg length given either as a distance or as a time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistOrTime {
    Nm(f64),
    Minutes(f64),
}

/// An outbound bearing from a station
#[derive(Debug, Clone)]
pub struct Radial {
    pub fix: Arc<Waypoint>,
    pub bearing: Course,
}

/// An outbound bearing plus a DME distance from a station
#[derive(Debug, Clone)]
pub struct RadialDme {
    pub fix: Arc<Waypoint>,
    pub bearing: Course,
    pub dist_nm: f64,
}

/// An altitude restriction attached to a leg, feet MSL.
///
/// The glideslope and step-down variants carry a secondary (vertical
/// guidance) altitude next to the restriction proper; the constraint
/// solver only ever reads the restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltitudeRestriction {
    At(i32),
    AtOrAbove(i32),
    AtOrBelow(i32),
    Between { above: i32, below: i32 },
    GlideslopeAt { msl: i32, alt: i32, above: bool },
    GlideslopeIntercept { intercept: i32, alt: i32, above: bool },
    StepDownAt { alt: i32, secondary: i32 },
    StepDownAbove { alt: i32, secondary: i32 },
    StepDownBelow { alt: i32, secondary: i32 },
}

impl fmt::Display for AltitudeRestriction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use AltitudeRestriction::*;
        match *self {
            At(alt) => write!(f, "At {alt}"),
            AtOrAbove(alt) => write!(f, "A{alt}"),
            AtOrBelow(alt) => write!(f, "B{alt}"),
            Between { above, below } => write!(f, "A{above}B{below}"),
            GlideslopeAt { msl, alt, above } => {
                let qual = if above { "A" } else { "At " };
                write!(f, "{qual}{alt}, GS{msl}")
            }
            GlideslopeIntercept {
                intercept,
                alt,
                above,
            } => {
                let qual = if above { "A" } else { "At " };
                write!(f, "{qual}{alt}, GS Intercept {intercept}")
            }
            StepDownAt { alt, secondary } => write!(f, "At {alt}, Glide {secondary}"),
            StepDownAbove { alt, secondary } => write!(f, "A{alt}, Glide {secondary}"),
            StepDownBelow { alt, secondary } => write!(f, "B{alt}, Glide {secondary}"),
        }
    }
}

/// A speed restriction attached to a leg, knots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedRestriction {
    At(u16),
    AtOrAbove(u16),
    AtOrBelow(u16),
}

impl fmt::Display for SpeedRestriction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SpeedRestriction::At(kt) => write!(f, "At {kt}kt"),
            SpeedRestriction::AtOrAbove(kt) => write!(f, "A{kt}kt"),
            SpeedRestriction::AtOrBelow(kt) => write!(f, "B{kt}kt"),
        }
    }
}

/// Airport metadata from `earth_aptmeta.dat`, plus the runway list
/// accumulated from the airport's CIFP file
#[derive(Debug, Clone)]
pub struct AirportInfo {
    pub icao: String,
    pub region: String,
    pub lat: f64,
    pub lon: f64,
    pub elevation: i32,
    pub transition_altitude: i32,
    pub transition_level: i32,
    pub runways: Vec<String>,
}

impl AirportInfo {
    /// The airport reference point as a waypoint
    #[must_use]
    pub fn as_waypoint(&self) -> Arc<Waypoint> {
        Arc::new(Waypoint {
            name: self.icao.clone(),
            lat: self.lat,
            lon: self.lon,
            region: self.region.clone(),
            airport: Some(self.icao.clone()),
        })
    }
}

// ----- T E S T S ---------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_display() {
        assert_eq!(Course::magnetic(272.4).to_string(), "272°");
        assert_eq!(Course::true_north(90.).to_string(), "90°T");
    }

    #[test]
    fn restriction_display() {
        assert_eq!(AltitudeRestriction::At(4000).to_string(), "At 4000");
        assert_eq!(
            AltitudeRestriction::Between {
                above: 3000,
                below: 5000
            }
            .to_string(),
            "A3000B5000"
        );
        assert_eq!(SpeedRestriction::AtOrBelow(250).to_string(), "B250kt");
    }
}
