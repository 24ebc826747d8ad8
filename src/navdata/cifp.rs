//! Parsing of per-airport CIFP records.
//!
//! A CIFP file is a sequence of `KIND:payload` records separated by `;\n`.
//! Procedure records (`SID`, `STAR`, `APPCH`) carry about 29 comma
//! separated fields; only the columns named below are read. `RWY` records
//! populate the runway threshold table before any leg is parsed.

use crate::navdata::leg::{Leg, LegInfo, ProcKind, TurnDir};
use crate::navdata::types::{
    AirportInfo, AltitudeRestriction, Course, DistOrTime, Radial, RadialDme, SpeedRestriction,
    Waypoint,
};
use crate::navdata::NavDatabase;
use crate::Error;
use log::warn;
use std::collections::BTreeMap;
use std::sync::Arc;

// Field assignments within a procedure record
const COL_SEQ: usize = 0;
const COL_QUALIFIER: usize = 1;
const COL_PROC: usize = 2;
const COL_TRANS: usize = 3;
const COL_FIX: usize = 4;
const COL_DESCRIPTOR: usize = 8;
const COL_TURN_DIR: usize = 9;
const COL_LEG_TYPE: usize = 11;
const COL_RCMD: usize = 13;
const COL_THETA: usize = 18;
const COL_RHO: usize = 19;
const COL_COURSE: usize = 20;
const COL_DIST: usize = 21;
const COL_ALT_DESC: usize = 22;
const COL_ALT1: usize = 23;
const COL_ALT2: usize = 24;
const COL_SPEED_DESC: usize = 26;
const COL_SPEED: usize = 27;
const COL_GLIDE_ANGLE: usize = 28;
const COL_CENTER_FIX: usize = 30;

/// Feet, or a flight level when prefixed `FL`
pub(crate) fn parse_alt(data: &str) -> Option<i32> {
    if let Some(fl) = data.strip_prefix("FL") {
        return fl.parse::<i32>().ok().map(|fl| fl * 100);
    }
    data.parse().ok()
}

/// Tenths of a degree; a trailing `T` marks a true course
pub(crate) fn parse_course(data: &str) -> Option<Course> {
    if let Some(t) = data.strip_suffix('T') {
        return t.parse::<i32>().ok().map(|c| Course::true_north(f64::from(c) / 10.));
    }
    data.parse::<i32>()
        .ok()
        .map(|c| Course::magnetic(f64::from(c) / 10.))
}

/// One comma-split procedure record. Fields are trimmed, except the
/// descriptor whose padding is significant.
pub(crate) struct LegRecord<'a> {
    path: &'a str,
    raw: &'a str,
    fields: Vec<&'a str>,
    descriptor: String,
}

impl<'a> LegRecord<'a> {
    pub fn new(path: &'a str, raw: &'a str) -> LegRecord<'a> {
        let untrimmed: Vec<&str> = raw.split(',').collect();
        let mut descriptor = untrimmed
            .get(COL_DESCRIPTOR)
            .copied()
            .unwrap_or("")
            .to_string();
        while descriptor.len() < 4 {
            descriptor.push(' ');
        }
        let fields = untrimmed.into_iter().map(str::trim).collect();
        LegRecord {
            path,
            raw,
            fields,
            descriptor,
        }
    }

    pub fn field(&self, i: usize) -> &str {
        self.fields.get(i).copied().unwrap_or("")
    }

    pub fn err(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            path: self.path.to_string(),
            record: self.raw.to_string(),
            message: message.into(),
        }
    }

    fn descriptor_char(&self, i: usize) -> char {
        self.descriptor.as_bytes()[i] as char
    }

    fn course(&self) -> Result<Course, Error> {
        parse_course(self.field(COL_COURSE)).ok_or_else(|| self.err("bad course"))
    }

    fn dist(&self) -> Result<f64, Error> {
        let raw = self.field(COL_DIST);
        let tenths: i32 = raw.parse().map_err(|_| self.err("bad distance"))?;
        Ok(f64::from(tenths) / 10.)
    }

    fn dist_or_time(&self) -> Result<DistOrTime, Error> {
        let raw = self.field(COL_DIST);
        if let Some(t) = raw.strip_prefix('T') {
            let tenths: i32 = t.parse().map_err(|_| self.err("bad leg time"))?;
            return Ok(DistOrTime::Minutes(f64::from(tenths) / 10.));
        }
        let tenths: i32 = raw.parse().map_err(|_| self.err("bad leg distance"))?;
        Ok(DistOrTime::Nm(f64::from(tenths) / 10.))
    }

    fn alt1(&self) -> Result<i32, Error> {
        parse_alt(self.field(COL_ALT1)).ok_or_else(|| self.err("bad altitude"))
    }
}

/// Per-airport context for turning records into legs
pub(crate) struct LegParser<'a> {
    pub db: &'a NavDatabase,
    pub info: &'a AirportInfo,
    pub runway_waypoints: &'a BTreeMap<String, Arc<Waypoint>>,
    pub path: &'a str,
}

impl LegParser<'_> {
    /// Resolve the fix named at field `idx`. For the primary fix column,
    /// the descriptor may redirect the lookup to an airport (`A`/`H`) or a
    /// runway threshold (`G`); a missing threshold degrades to the airport
    /// reference point.
    fn resolve_fix(&self, rec: &LegRecord, idx: usize) -> Result<Arc<Waypoint>, Error> {
        let name = rec.field(idx);
        let region = rec.field(idx + 1);

        if idx == COL_FIX {
            match rec.descriptor_char(0) {
                'A' | 'H' => {
                    let Some(airport) = self.db.airport_info(name) else {
                        return Err(Error::ReferenceMissing("airport", name.to_string()));
                    };
                    return Ok(airport.as_waypoint());
                }
                'G' => {
                    if let Some(wp) = self.runway_waypoints.get(name) {
                        return Ok(wp.clone());
                    }
                    // Recover with the airport reference point
                    warn!(
                        "{}: no threshold for '{name}' at {}; using the airport position",
                        self.path, self.info.icao
                    );
                    return Ok(self.info.as_waypoint());
                }
                _ => (),
            }
        }

        self.db.waypoint(name, region)
    }

    fn radial_dme(&self, rec: &LegRecord, idx: usize) -> Result<Option<RadialDme>, Error> {
        if rec.field(idx).is_empty() {
            return Ok(None);
        }
        let fix = self.resolve_fix(rec, idx)?;
        if rec.field(COL_THETA).is_empty() || rec.field(COL_RHO).is_empty() {
            return Ok(None);
        }
        let bearing =
            parse_course(rec.field(COL_THETA)).ok_or_else(|| rec.err("bad radial bearing"))?;
        let rho: i32 = rec
            .field(COL_RHO)
            .parse()
            .map_err(|_| rec.err("bad radial distance"))?;
        Ok(Some(RadialDme {
            fix,
            bearing,
            dist_nm: f64::from(rho) / 10.,
        }))
    }

    fn radial(&self, rec: &LegRecord, idx: usize) -> Result<Option<Radial>, Error> {
        if rec.field(idx).is_empty() {
            return Ok(None);
        }
        let fix = self.resolve_fix(rec, idx)?;
        if rec.field(COL_THETA).is_empty() {
            return Ok(None);
        }
        let bearing =
            parse_course(rec.field(COL_THETA)).ok_or_else(|| rec.err("bad radial bearing"))?;
        Ok(Some(Radial { fix, bearing }))
    }

    fn required_radial(&self, rec: &LegRecord, idx: usize) -> Result<Radial, Error> {
        self.radial(rec, idx)?
            .ok_or_else(|| rec.err("leg needs a radial"))
    }

    fn alt_restriction(&self, rec: &LegRecord) -> Result<Option<AltitudeRestriction>, Error> {
        let kind = rec.field(COL_ALT_DESC);
        let alt1 = rec.field(COL_ALT1);
        let alt2 = rec.field(COL_ALT2);

        if alt1.is_empty() && alt2.is_empty() {
            return Ok(None);
        }

        let a1 = || parse_alt(alt1).ok_or_else(|| rec.err("bad altitude"));
        let a2 = || parse_alt(alt2).ok_or_else(|| rec.err("bad altitude"));

        use AltitudeRestriction::*;
        let restriction = match kind {
            "" => At(a1()?),
            "+" | "=+" => AtOrAbove(a1()?),
            "-" => AtOrBelow(a1()?),
            "B" => Between {
                above: a1()?,
                below: a2()?,
            },
            "C" => AtOrBelow(a2()?),
            "G" => GlideslopeAt {
                msl: a2()?,
                alt: a1()?,
                above: false,
            },
            "H" => GlideslopeAt {
                msl: a2()?,
                alt: a1()?,
                above: true,
            },
            "I" => GlideslopeIntercept {
                intercept: a2()?,
                alt: a1()?,
                above: false,
            },
            "J" => GlideslopeIntercept {
                intercept: a2()?,
                alt: a1()?,
                above: true,
            },
            "V" => StepDownAbove {
                alt: a1()?,
                secondary: a2()?,
            },
            "X" => StepDownAt {
                alt: a1()?,
                secondary: a2()?,
            },
            "Y" => StepDownBelow {
                alt: a1()?,
                secondary: a2()?,
            },
            other => {
                return Err(rec.err(format!("altitude descriptor '{other}' not recognized")))
            }
        };
        Ok(Some(restriction))
    }

    fn speed_restriction(&self, rec: &LegRecord) -> Result<Option<SpeedRestriction>, Error> {
        let kind = rec.field(COL_SPEED_DESC);
        let speed = rec.field(COL_SPEED);
        if speed.is_empty() {
            return Ok(None);
        }
        let speed: u16 = speed.parse().map_err(|_| rec.err("bad speed"))?;
        match kind {
            "" => Ok(Some(SpeedRestriction::At(speed))),
            "+" => Ok(Some(SpeedRestriction::AtOrAbove(speed))),
            "-" => Ok(Some(SpeedRestriction::AtOrBelow(speed))),
            other => Err(rec.err(format!("speed descriptor '{other}' not recognized"))),
        }
    }

    fn leg_info(&self, rec: &LegRecord, kind: ProcKind) -> Result<LegInfo, Error> {
        let seq: u32 = rec
            .field(COL_SEQ)
            .parse()
            .map_err(|_| rec.err("bad sequence number"))?;

        let overfly = rec.descriptor_char(1) == 'Y';
        let first_missed = rec.descriptor_char(2) == 'M';
        let role = rec.descriptor_char(3);
        let initial_approach_fix = matches!(role, 'C' | 'A' | 'D');
        let final_approach_fix = matches!(role, 'D' | 'I' | 'F');
        let missed_approach_point = role == 'M';

        let turn_dir = match rec.field(COL_TURN_DIR) {
            "" => TurnDir::Unspecified,
            "L" => TurnDir::Left,
            "R" => TurnDir::Right,
            other => {
                warn!("{}: turn direction '{other}' not recognized", self.path);
                TurnDir::Unspecified
            }
        };

        let glide_angle = match rec.field(COL_GLIDE_ANGLE) {
            "" => None,
            raw => {
                let hundredths: i32 = raw.parse().map_err(|_| rec.err("bad glide angle"))?;
                Some(f64::from(hundredths) / 100.)
            }
        };

        Ok(LegInfo {
            seq,
            kind,
            qualifier: rec.field(COL_QUALIFIER).to_string(),
            proc: rec.field(COL_PROC).to_string(),
            trans: rec.field(COL_TRANS).to_string(),
            turn_dir,
            overfly,
            first_missed,
            missed_approach_point,
            initial_approach_fix,
            final_approach_fix,
            alt: self.alt_restriction(rec)?,
            speed: self.speed_restriction(rec)?,
            glide_angle,
        })
    }

    /// Turn one procedure record into a leg
    pub fn parse(&self, kind: ProcKind, raw: &str) -> Result<Leg, Error> {
        let rec = LegRecord::new(self.path, raw);
        let info = self.leg_info(&rec, kind)?;

        let leg = match rec.field(COL_LEG_TYPE) {
            "IF" => Leg::InitialFix {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
            },
            "TF" => Leg::TrackToFix {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
            },
            "CF" => Leg::CourseToFix {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
                course: rec.course()?,
                rcmd: self.radial_dme(&rec, COL_RCMD)?,
            },
            "DF" => Leg::DirectToFix {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
                rcmd: self.radial_dme(&rec, COL_RCMD)?,
            },
            "FA" => Leg::FixToAltitude {
                info,
                start: self.resolve_fix(&rec, COL_FIX)?,
                course: rec.course()?,
                alt: rec.alt1()?,
                rcmd: self.radial_dme(&rec, COL_RCMD)?,
            },
            "FC" => Leg::FixToDistance {
                info,
                start: self.resolve_fix(&rec, COL_FIX)?,
                course: rec.course()?,
                dist_nm: rec.dist()?,
            },
            "FD" => Leg::FixToDme {
                info,
                start: self.resolve_fix(&rec, COL_FIX)?,
                course: rec.course()?,
                station: self.resolve_fix(&rec, COL_RCMD)?,
                dme_nm: rec.dist()?,
            },
            "FM" => Leg::FixToManual {
                info,
                start: self.resolve_fix(&rec, COL_FIX)?,
                course: rec.course()?,
                rcmd: self.radial_dme(&rec, COL_RCMD)?,
            },
            "CA" => Leg::CourseToAltitude {
                info,
                course: rec.course()?,
                alt: rec.alt1()?,
            },
            "CD" => Leg::CourseToDme {
                info,
                course: rec.course()?,
                station: self.resolve_fix(&rec, COL_RCMD)?,
                dme_nm: rec.dist()?,
            },
            "CI" => Leg::CourseToIntercept {
                info,
                course: rec.course()?,
                rcmd: match rec.field(COL_RCMD) {
                    "" => None,
                    _ => Some(self.resolve_fix(&rec, COL_RCMD)?),
                },
            },
            "CR" => Leg::CourseToRadial {
                info,
                course: rec.course()?,
                radial: self.required_radial(&rec, COL_RCMD)?,
            },
            "RF" => Leg::RadiusArc {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
                center: self.resolve_fix(&rec, COL_CENTER_FIX)?,
                dist_nm: rec.dist()?,
            },
            "AF" => Leg::ArcToFix {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
                radial: self
                    .radial_dme(&rec, COL_RCMD)?
                    .ok_or_else(|| rec.err("arc leg needs a radial and distance"))?,
            },
            "VA" => Leg::HeadingToAltitude {
                info,
                heading: rec.course()?,
                alt: rec.alt1()?,
            },
            "VD" => Leg::HeadingToDme {
                info,
                heading: rec.course()?,
                station: self.resolve_fix(&rec, COL_RCMD)?,
                dme_nm: rec.dist()?,
            },
            "VI" => Leg::HeadingToIntercept {
                info,
                heading: rec.course()?,
                rcmd: match rec.field(COL_RCMD) {
                    "" => None,
                    _ => Some(self.resolve_fix(&rec, COL_RCMD)?),
                },
            },
            "VM" => Leg::HeadingToManual {
                info,
                fix: match rec.field(COL_FIX) {
                    "" => None,
                    _ => Some(self.resolve_fix(&rec, COL_FIX)?),
                },
                heading: rec.course()?,
            },
            "VR" => Leg::HeadingToRadial {
                info,
                heading: rec.course()?,
                radial: self.required_radial(&rec, COL_RCMD)?,
            },
            "PI" => Leg::ProcedureTurn {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
                course: rec.course()?,
                max_dist_nm: rec.dist()?,
                alt: rec.alt1()?,
            },
            "HA" => Leg::HoldToAltitude {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
                course: rec.course()?,
                leg_time: rec.dist_or_time()?,
                alt: rec.alt1()?,
            },
            "HF" => Leg::HoldToFix {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
                course: rec.course()?,
                leg_time: rec.dist_or_time()?,
            },
            "HM" => Leg::HoldToManual {
                info,
                fix: self.resolve_fix(&rec, COL_FIX)?,
                course: rec.course()?,
                leg_time: rec.dist_or_time()?,
            },
            other => return Err(rec.err(format!("leg type '{other}' not recognized"))),
        };
        Ok(leg)
    }
}

/// A parsed `RWY` record
pub(crate) enum RunwayRecord {
    /// Designator with a threshold position, decimal degrees
    Threshold { rwy: String, lat: f64, lon: f64 },
    /// Coordinates were missing; recover through the named ILS waypoint
    IlsRecovery { rwy: String, ils: String },
}

/// Parse the payload of a `RWY:` record. The payload holds one or two
/// `;`-separated clauses: the runway fields, and optionally the threshold
/// position as `N`/`S` and `E`/`W` prefixed microdegrees.
pub(crate) fn parse_rwy_record(path: &str, payload: &str) -> Result<RunwayRecord, Error> {
    let err = |message: &str| Error::Parse {
        path: path.to_string(),
        record: payload.to_string(),
        message: message.to_string(),
    };

    let mut clauses = payload.split(';');
    let parts: Vec<&str> = clauses.next().unwrap_or("").split(',').collect();
    let rwy = parts.first().map(|p| p.trim()).unwrap_or("");
    if rwy.is_empty() {
        return Err(err("empty runway designator"));
    }

    let Some(position) = clauses.next() else {
        // No position clause; field 5 names the associated ILS
        let ils = parts.get(5).map(|p| p.trim()).unwrap_or("");
        return Ok(RunwayRecord::IlsRecovery {
            rwy: rwy.to_string(),
            ils: ils.to_string(),
        });
    };

    let opt: Vec<&str> = position.split(',').collect();
    let (lat_raw, lon_raw) = match (opt.first(), opt.get(1)) {
        (Some(lat), Some(lon)) if !lat.is_empty() && !lon.is_empty() => (*lat, *lon),
        _ => return Err(err("bad threshold position")),
    };

    let lat_sign = if lat_raw.starts_with('N') { 1. } else { -1. };
    let lon_sign = if lon_raw.starts_with('E') { 1. } else { -1. };
    let lat: i64 = lat_raw[1..]
        .parse()
        .map_err(|_| err("bad threshold latitude"))?;
    let lon: i64 = lon_raw[1..]
        .parse()
        .map_err(|_| err("bad threshold longitude"))?;

    Ok(RunwayRecord::Threshold {
        rwy: rwy.to_string(),
        lat: lat_sign * lat as f64 / 1_000_000.,
        lon: lon_sign * lon as f64 / 1_000_000.,
    })
}

/// Expand the runway named in a procedure's transition field: `ALL` means
/// every runway, a trailing `B` both parallels, anything else itself.
pub(crate) fn expand_runway_transition(trans: &str, runways: &[String]) -> Vec<String> {
    if trans == "ALL" {
        return runways.to_vec();
    }
    if !trans.starts_with("RW") {
        return Vec::new();
    }
    if let Some(both) = trans.strip_suffix('B') {
        return runways
            .iter()
            .filter(|r| r.starts_with(both))
            .cloned()
            .collect();
    }
    vec![trans.to_string()]
}

/// The runway encoded in an approach identifier, e.g. `I08L` carries `8L`
pub(crate) fn runway_from_ident(ident: &str) -> Option<String> {
    let num = ident.get(1..3)?;
    if !num.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match ident.as_bytes().get(3).copied() {
        None | Some(b'-') => Some(num.to_string()),
        Some(side) => Some(format!(
            "{}{}",
            num.trim_start_matches('0'),
            side as char
        )),
    }
}

// ----- T E S T S ---------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alt_and_course_fields() {
        assert_eq!(parse_alt("4000"), Some(4000));
        assert_eq!(parse_alt("FL120"), Some(12000));
        assert_eq!(parse_alt("FL95"), Some(9500));
        assert_eq!(parse_alt("12a"), None);

        let c = parse_course("2550").unwrap();
        assert_eq!(c.degrees, 255.);
        assert!(!c.is_true);

        let c = parse_course("0900T").unwrap();
        assert_eq!(c.degrees, 90.);
        assert!(c.is_true);
    }

    #[test]
    fn rwy_record_with_position() {
        let rec = parse_rwy_record("t", "RW25C,,,00262,25012,IDE ;N50032569,E008345678,").unwrap();
        match rec {
            RunwayRecord::Threshold { rwy, lat, lon } => {
                assert_eq!(rwy, "RW25C");
                assert!((lat - 50.032569).abs() < 1e-9);
                assert!((lon - 8.345678).abs() < 1e-9);
            }
            RunwayRecord::IlsRecovery { .. } => panic!("expected a threshold"),
        }
    }

    #[test]
    fn rwy_record_without_position() {
        let rec = parse_rwy_record("t", "RW07,,,00262,25012,IDE ").unwrap();
        match rec {
            RunwayRecord::IlsRecovery { rwy, ils } => {
                assert_eq!(rwy, "RW07");
                assert_eq!(ils, "IDE");
            }
            RunwayRecord::Threshold { .. } => panic!("expected an ILS recovery"),
        }
    }

    #[test]
    fn runway_expansion() {
        let runways = vec![
            "RW07L".to_string(),
            "RW07R".to_string(),
            "RW25C".to_string(),
        ];
        assert_eq!(expand_runway_transition("ALL", &runways), runways);
        assert_eq!(
            expand_runway_transition("RW07B", &runways),
            vec!["RW07L".to_string(), "RW07R".to_string()]
        );
        assert_eq!(
            expand_runway_transition("RW25C", &runways),
            vec!["RW25C".to_string()]
        );
        assert!(expand_runway_transition("MARUN", &runways).is_empty());
    }

    #[test]
    fn approach_ident_runway() {
        assert_eq!(runway_from_ident("I08L").as_deref(), Some("8L"));
        assert_eq!(runway_from_ident("R25").as_deref(), Some("25"));
        assert_eq!(runway_from_ident("D07-Y").as_deref(), Some("07"));
        assert_eq!(runway_from_ident("VDM").as_deref(), None);
    }
}
