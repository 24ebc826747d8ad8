use crate::navdata::types::{
    AltitudeRestriction, Course, DistOrTime, Radial, RadialDme, SpeedRestriction, Waypoint,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The three families of coded procedures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcKind {
    Sid,
    Star,
    Approach,
}

/// The direction turned to *enter* a leg (not the direction turned off
/// the previous one). Unspecified means the builder picks the shorter way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnDir {
    Left,
    Right,
    #[default]
    Unspecified,
}

/// Metadata shared by every leg kind
#[derive(Debug, Clone)]
pub struct LegInfo {
    pub seq: u32,
    pub kind: ProcKind,
    pub qualifier: String,
    pub proc: String,
    pub trans: String,
    pub turn_dir: TurnDir,
    /// The terminator must be flown over before turning
    pub overfly: bool,
    /// First leg of the missed approach
    pub first_missed: bool,
    pub missed_approach_point: bool,
    pub initial_approach_fix: bool,
    pub final_approach_fix: bool,
    pub alt: Option<AltitudeRestriction>,
    pub speed: Option<SpeedRestriction>,
    /// Vertical guidance angle, degrees
    pub glide_angle: Option<f64>,
}

/// One path-terminator leg of a coded procedure.
///
/// There is exactly one variant per ARINC-424 path terminator this crate
/// understands, and every dispatch over `Leg` is exhaustive: a new leg
/// kind must be handled everywhere or the build fails.
#[derive(Debug, Clone)]
pub enum Leg {
    /// IF
    InitialFix { info: LegInfo, fix: Arc<Waypoint> },
    /// TF
    TrackToFix { info: LegInfo, fix: Arc<Waypoint> },
    /// CF
    CourseToFix {
        info: LegInfo,
        fix: Arc<Waypoint>,
        course: Course,
        rcmd: Option<RadialDme>,
    },
    /// DF
    DirectToFix {
        info: LegInfo,
        fix: Arc<Waypoint>,
        rcmd: Option<RadialDme>,
    },
    /// FA
    FixToAltitude {
        info: LegInfo,
        start: Arc<Waypoint>,
        course: Course,
        alt: i32,
        rcmd: Option<RadialDme>,
    },
    /// FC
    FixToDistance {
        info: LegInfo,
        start: Arc<Waypoint>,
        course: Course,
        dist_nm: f64,
    },
    /// FD
    FixToDme {
        info: LegInfo,
        start: Arc<Waypoint>,
        course: Course,
        station: Arc<Waypoint>,
        dme_nm: f64,
    },
    /// FM
    FixToManual {
        info: LegInfo,
        start: Arc<Waypoint>,
        course: Course,
        rcmd: Option<RadialDme>,
    },
    /// CA
    CourseToAltitude {
        info: LegInfo,
        course: Course,
        alt: i32,
    },
    /// CD
    CourseToDme {
        info: LegInfo,
        course: Course,
        station: Arc<Waypoint>,
        dme_nm: f64,
    },
    /// CI
    CourseToIntercept {
        info: LegInfo,
        course: Course,
        rcmd: Option<Arc<Waypoint>>,
    },
    /// CR
    CourseToRadial {
        info: LegInfo,
        course: Course,
        radial: Radial,
    },
    /// RF
    RadiusArc {
        info: LegInfo,
        fix: Arc<Waypoint>,
        center: Arc<Waypoint>,
        /// Track distance along the arc, not the radius
        dist_nm: f64,
    },
    /// AF
    ArcToFix {
        info: LegInfo,
        fix: Arc<Waypoint>,
        /// Redundant with the geometry, but always provided by the data
        radial: RadialDme,
    },
    /// VA
    HeadingToAltitude {
        info: LegInfo,
        heading: Course,
        alt: i32,
    },
    /// VD
    HeadingToDme {
        info: LegInfo,
        heading: Course,
        station: Arc<Waypoint>,
        dme_nm: f64,
    },
    /// VI
    HeadingToIntercept {
        info: LegInfo,
        heading: Course,
        rcmd: Option<Arc<Waypoint>>,
    },
    /// VM. A STAR ending in a vector heading names the airport itself
    /// in the waypoint field.
    HeadingToManual {
        info: LegInfo,
        fix: Option<Arc<Waypoint>>,
        heading: Course,
    },
    /// VR
    HeadingToRadial {
        info: LegInfo,
        heading: Course,
        radial: Radial,
    },
    /// PI, a course reversal
    ProcedureTurn {
        info: LegInfo,
        fix: Arc<Waypoint>,
        course: Course,
        /// Stay within this distance of the fix
        max_dist_nm: f64,
        alt: i32,
    },
    /// HA, a hold terminating at an altitude
    HoldToAltitude {
        info: LegInfo,
        fix: Arc<Waypoint>,
        course: Course,
        leg_time: DistOrTime,
        alt: i32,
    },
    /// HF, a single orbit
    HoldToFix {
        info: LegInfo,
        fix: Arc<Waypoint>,
        course: Course,
        leg_time: DistOrTime,
    },
    /// HM, hold until released
    HoldToManual {
        info: LegInfo,
        fix: Arc<Waypoint>,
        course: Course,
        leg_time: DistOrTime,
    },
}

impl Leg {
    /// The shared metadata of any leg kind
    #[must_use]
    pub fn info(&self) -> &LegInfo {
        use Leg::*;
        match self {
            InitialFix { info, .. }
            | TrackToFix { info, .. }
            | CourseToFix { info, .. }
            | DirectToFix { info, .. }
            | FixToAltitude { info, .. }
            | FixToDistance { info, .. }
            | FixToDme { info, .. }
            | FixToManual { info, .. }
            | CourseToAltitude { info, .. }
            | CourseToDme { info, .. }
            | CourseToIntercept { info, .. }
            | CourseToRadial { info, .. }
            | RadiusArc { info, .. }
            | ArcToFix { info, .. }
            | HeadingToAltitude { info, .. }
            | HeadingToDme { info, .. }
            | HeadingToIntercept { info, .. }
            | HeadingToManual { info, .. }
            | HeadingToRadial { info, .. }
            | ProcedureTurn { info, .. }
            | HoldToAltitude { info, .. }
            | HoldToFix { info, .. }
            | HoldToManual { info, .. } => info,
        }
    }

    /// The two-letter ARINC-424 path terminator
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        use Leg::*;
        match self {
            InitialFix { .. } => "IF",
            TrackToFix { .. } => "TF",
            CourseToFix { .. } => "CF",
            DirectToFix { .. } => "DF",
            FixToAltitude { .. } => "FA",
            FixToDistance { .. } => "FC",
            FixToDme { .. } => "FD",
            FixToManual { .. } => "FM",
            CourseToAltitude { .. } => "CA",
            CourseToDme { .. } => "CD",
            CourseToIntercept { .. } => "CI",
            CourseToRadial { .. } => "CR",
            RadiusArc { .. } => "RF",
            ArcToFix { .. } => "AF",
            HeadingToAltitude { .. } => "VA",
            HeadingToDme { .. } => "VD",
            HeadingToIntercept { .. } => "VI",
            HeadingToManual { .. } => "VM",
            HeadingToRadial { .. } => "VR",
            ProcedureTurn { .. } => "PI",
            HoldToAltitude { .. } => "HA",
            HoldToFix { .. } => "HF",
            HoldToManual { .. } => "HM",
        }
    }

    /// A short human readable title, e.g. for procedure listings
    #[must_use]
    pub fn title(&self) -> String {
        use Leg::*;
        match self {
            InitialFix { .. } => "Initial Fix".to_string(),
            TrackToFix { .. } => "Track to Fix".to_string(),
            CourseToFix { course, .. } => format!("Course {course} to Fix"),
            DirectToFix { .. } => "Direct to Fix".to_string(),
            FixToAltitude { .. } => "Fix to Altitude".to_string(),
            FixToDistance { .. } => "Fix to Distance".to_string(),
            FixToDme { .. } => "Fix to DME".to_string(),
            FixToManual { .. } => "Fix to Manual".to_string(),
            CourseToAltitude { course, .. } => format!("Course {course} to Altitude"),
            CourseToDme { course, .. } => format!("Course {course} to DME"),
            CourseToIntercept { course, .. } => format!("Course {course} to Intercept"),
            CourseToRadial { course, .. } => format!("Course {course} to Radial"),
            RadiusArc { .. } => "Constant Radius Arc".to_string(),
            ArcToFix { .. } => "Arc to Fix".to_string(),
            HeadingToAltitude { heading, .. } => format!("Heading {heading} to Altitude"),
            HeadingToDme { heading, .. } => format!("Heading {heading} to DME"),
            HeadingToIntercept { heading, .. } => format!("Heading {heading} to Intercept"),
            HeadingToManual { heading, .. } => format!("Heading {heading} to Manual"),
            HeadingToRadial { .. } => "Heading to Radial".to_string(),
            ProcedureTurn { .. } => "Procedure Turn".to_string(),
            HoldToAltitude { .. } => "Hold to Altitude".to_string(),
            HoldToFix { .. } => "Hold Once".to_string(),
            HoldToManual { .. } => "Hold".to_string(),
        }
    }

    /// What to label the leg's terminator with on a chart
    #[must_use]
    pub fn fix_name(&self) -> String {
        use Leg::*;
        match self {
            InitialFix { fix, .. }
            | TrackToFix { fix, .. }
            | CourseToFix { fix, .. }
            | DirectToFix { fix, .. }
            | RadiusArc { fix, .. }
            | ArcToFix { fix, .. }
            | HoldToAltitude { fix, .. }
            | HoldToFix { fix, .. }
            | HoldToManual { fix, .. } => fix.name.clone(),
            FixToAltitude { alt, .. } | CourseToAltitude { alt, .. }
            | HeadingToAltitude { alt, .. } => format!("({alt}ft)"),
            FixToDistance {
                start,
                course,
                dist_nm,
                ..
            } => format!("{}/{dist_nm}NM/{course}", start.name),
            FixToDme {
                station, dme_nm, ..
            } => format!("D{dme_nm}{}", station.name),
            CourseToDme {
                station, dme_nm, ..
            }
            | HeadingToDme {
                station, dme_nm, ..
            } => format!("{}/{dme_nm}DME", station.name),
            CourseToIntercept { .. } | HeadingToIntercept { .. } => "(Intercept)".to_string(),
            CourseToRadial { radial, .. } | HeadingToRadial { radial, .. } => {
                format!("{}/{}", radial.fix.name, radial.bearing)
            }
            FixToManual { .. } | HeadingToManual { .. } => String::new(),
            ProcedureTurn { .. } => "(Proc turn)".to_string(),
        }
    }
}

/// A standard instrument departure: per-runway leg lists plus enroute
/// transitions
#[derive(Debug, Clone, Default)]
pub struct Sid {
    pub ident: String,
    pub airport: String,
    pub rwys: BTreeMap<String, Vec<Leg>>,
    pub is_all_rwys: bool,
    pub transitions: BTreeMap<String, Vec<Leg>>,
}

impl Sid {
    #[must_use]
    pub fn new(ident: &str, airport: &str) -> Sid {
        Sid {
            ident: ident.to_string(),
            airport: airport.to_string(),
            ..Default::default()
        }
    }
}

/// A standard terminal arrival; same shape as a [`Sid`]
#[derive(Debug, Clone, Default)]
pub struct Star {
    pub ident: String,
    pub airport: String,
    pub rwys: BTreeMap<String, Vec<Leg>>,
    pub is_all_rwys: bool,
    pub transitions: BTreeMap<String, Vec<Leg>>,
}

impl Star {
    #[must_use]
    pub fn new(ident: &str, airport: &str) -> Star {
        Star {
            ident: ident.to_string(),
            airport: airport.to_string(),
            ..Default::default()
        }
    }
}

/// An instrument approach: one final leg list, approach transitions, and
/// the runway carried in the procedure identifier
#[derive(Debug, Clone, Default)]
pub struct Approach {
    pub ident: String,
    pub airport: String,
    pub runway: Option<String>,
    pub legs: Vec<Leg>,
    pub transitions: BTreeMap<String, Vec<Leg>>,
}

impl Approach {
    #[must_use]
    pub fn new(ident: &str, airport: &str) -> Approach {
        Approach {
            ident: ident.to_string(),
            airport: airport.to_string(),
            ..Default::default()
        }
    }
}
