//! The navigation database.
//!
//! Four record streams live in one data directory: `earth_fix.dat`,
//! `earth_nav.dat`, `earth_aptmeta.dat`, and one `CIFP/<ICAO>.dat` per
//! airport. The first three are loaded once by [`NavDatabase::open`] and
//! are read-only afterwards; procedures are parsed per airport on demand
//! by [`NavDatabase::airport`], which returns a self-contained
//! [`AirportData`], so builds may run on parallel threads against the
//! same `&NavDatabase`.

pub mod leg;
pub mod types;

mod cifp;

use crate::navdata::cifp::{LegParser, RunwayRecord};
use crate::navdata::leg::{Approach, Leg, ProcKind, Sid, Star};
use crate::navdata::types::{AirportInfo, Waypoint};
use crate::Error;
use log::warn;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything known about one airport: metadata, runway thresholds, and
/// the coded procedures, each indexed by identifier
#[derive(Debug, Clone)]
pub struct AirportData {
    pub info: AirportInfo,
    pub runway_waypoints: BTreeMap<String, Arc<Waypoint>>,
    pub sids: BTreeMap<String, Sid>,
    pub stars: BTreeMap<String, Star>,
    pub approaches: BTreeMap<String, Approach>,
}

impl AirportData {
    /// Threshold waypoint for a runway, accepting `07L` as well as `RW07L`
    #[must_use]
    pub fn runway_waypoint(&self, designator: &str) -> Option<&Arc<Waypoint>> {
        let key = runway_key(designator);
        self.runway_waypoints.get(&key)
    }
}

/// `07L` and `RW07L` both mean the `RW07L` threshold
pub(crate) fn runway_key(designator: &str) -> String {
    if designator.starts_with("RW") {
        designator.to_string()
    } else {
        format!("RW{designator}")
    }
}

/// Fixes, navaids and airports, loaded once from a data directory
#[derive(Debug)]
pub struct NavDatabase {
    dir: PathBuf,
    /// region → name → waypoint
    waypoints: BTreeMap<String, BTreeMap<String, Arc<Waypoint>>>,
    /// airport → threshold name → waypoint
    runway_waypoints: BTreeMap<String, BTreeMap<String, Arc<Waypoint>>>,
    airports: BTreeMap<String, AirportInfo>,
}

impl NavDatabase {
    /// Load the fix, navaid and airport streams from `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<NavDatabase, Error> {
        let dir = dir.as_ref().to_path_buf();
        let mut db = NavDatabase {
            dir: dir.clone(),
            waypoints: BTreeMap::new(),
            runway_waypoints: BTreeMap::new(),
            airports: BTreeMap::new(),
        };

        let path = dir.join("earth_fix.dat");
        db.load_fixes(&std::fs::read_to_string(&path)?, &path.display().to_string())?;

        let path = dir.join("earth_nav.dat");
        db.load_navaids(&std::fs::read_to_string(&path)?, &path.display().to_string())?;

        let path = dir.join("earth_aptmeta.dat");
        db.load_airports(&std::fs::read_to_string(&path)?, &path.display().to_string())?;

        Ok(db)
    }

    /// Look a waypoint up by name within its region
    pub fn waypoint(&self, name: &str, region: &str) -> Result<Arc<Waypoint>, Error> {
        self.waypoints
            .get(region)
            .and_then(|r| r.get(name))
            .cloned()
            .ok_or_else(|| Error::ReferenceMissing("waypoint", format!("{name} ({region})")))
    }

    /// Airport metadata, if the airport is known
    #[must_use]
    pub fn airport_info(&self, icao: &str) -> Option<&AirportInfo> {
        self.airports.get(icao)
    }

    /// All known airports
    #[must_use]
    pub fn airports(&self) -> &BTreeMap<String, AirportInfo> {
        &self.airports
    }

    // The three global streams share a frame: three header lines, then
    // whitespace separated records until a line holding the single token 99.
    fn data_lines(text: &str) -> impl Iterator<Item = &str> {
        text.lines()
            .skip(3)
            .map(str::trim)
            .take_while(|line| *line != "99")
            .filter(|line| !line.is_empty())
    }

    fn parse_err(path: &str, record: &str, message: &str) -> Error {
        Error::Parse {
            path: path.to_string(),
            record: record.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn load_fixes(&mut self, text: &str, path: &str) -> Result<(), Error> {
        for line in Self::data_lines(text) {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let (Some(lat), Some(lon), Some(name), Some(region)) =
                (cols.first(), cols.get(1), cols.get(2), cols.get(4))
            else {
                return Err(Self::parse_err(path, line, "short fix record"));
            };
            let lat: f64 = lat
                .parse()
                .map_err(|_| Self::parse_err(path, line, "bad latitude"))?;
            let lon: f64 = lon
                .parse()
                .map_err(|_| Self::parse_err(path, line, "bad longitude"))?;

            self.insert_waypoint(name, lat, lon, region, None);
        }
        Ok(())
    }

    pub(crate) fn load_navaids(&mut self, text: &str, path: &str) -> Result<(), Error> {
        for line in Self::data_lines(text) {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let Some(kind) = cols.first() else { continue };
            // NDB, VOR, localizer, glideslope, DME
            if !matches!(*kind, "2" | "3" | "4" | "5" | "12" | "13") {
                continue;
            }
            let (Some(lat), Some(lon), Some(name), Some(airport), Some(region)) = (
                cols.get(1),
                cols.get(2),
                cols.get(7),
                cols.get(8),
                cols.get(9),
            ) else {
                return Err(Self::parse_err(path, line, "short navaid record"));
            };
            let lat: f64 = lat
                .parse()
                .map_err(|_| Self::parse_err(path, line, "bad latitude"))?;
            let lon: f64 = lon
                .parse()
                .map_err(|_| Self::parse_err(path, line, "bad longitude"))?;

            // Localizers double as runway thresholds for their airport
            if *kind == "4" {
                let wp = Arc::new(Waypoint {
                    name: name.to_string(),
                    lat,
                    lon,
                    region: region.to_string(),
                    airport: Some(airport.to_string()),
                });
                self.runway_waypoints
                    .entry(airport.to_string())
                    .or_default()
                    .insert(name.to_string(), wp);
            }

            self.insert_waypoint(name, lat, lon, region, Some(airport));
        }
        Ok(())
    }

    pub(crate) fn load_airports(&mut self, text: &str, path: &str) -> Result<(), Error> {
        for line in Self::data_lines(text) {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 10 {
                return Err(Self::parse_err(path, line, "short airport record"));
            }
            let icao = cols[0];
            let region = cols[1];
            let lat: f64 = cols[2]
                .parse()
                .map_err(|_| Self::parse_err(path, line, "bad latitude"))?;
            let lon: f64 = cols[3]
                .parse()
                .map_err(|_| Self::parse_err(path, line, "bad longitude"))?;
            let elevation: i32 = cols[4]
                .parse()
                .map_err(|_| Self::parse_err(path, line, "bad elevation"))?;
            let ta: i32 = cols[8]
                .parse()
                .map_err(|_| Self::parse_err(path, line, "bad transition altitude"))?;
            let tl = cifp::parse_alt(cols[9])
                .ok_or_else(|| Self::parse_err(path, line, "bad transition level"))?;

            self.airports.insert(
                icao.to_string(),
                AirportInfo {
                    icao: icao.to_string(),
                    region: region.to_string(),
                    lat,
                    lon,
                    elevation,
                    transition_altitude: ta,
                    transition_level: tl,
                    runways: Vec::new(),
                },
            );
        }
        Ok(())
    }

    fn insert_waypoint(&mut self, name: &str, lat: f64, lon: f64, region: &str, airport: Option<&str>) {
        let wp = Arc::new(Waypoint {
            name: name.to_string(),
            lat,
            lon,
            region: region.to_string(),
            airport: airport.map(str::to_string),
        });
        self.waypoints
            .entry(region.to_string())
            .or_default()
            .insert(name.to_string(), wp);
    }

    /// Parse the airport's CIFP file into its procedures.
    ///
    /// A malformed record or a dangling reference aborts this airport's
    /// load only; the database itself is untouched and other airports
    /// remain loadable.
    pub fn airport(&self, icao: &str) -> Result<AirportData, Error> {
        let Some(info) = self.airports.get(icao) else {
            return Err(Error::ReferenceMissing("airport", icao.to_string()));
        };

        let path = self.dir.join("CIFP").join(format!("{icao}.dat"));
        let text = std::fs::read_to_string(&path)?;
        let path = path.display().to_string();

        self.parse_airport(info, &text, &path)
    }

    pub(crate) fn parse_airport(
        &self,
        info: &AirportInfo,
        text: &str,
        path: &str,
    ) -> Result<AirportData, Error> {
        let mut info = info.clone();
        let mut runway_waypoints = self
            .runway_waypoints
            .get(&info.icao)
            .cloned()
            .unwrap_or_default();

        // Runway records first: legs may reference the thresholds
        for record in text.split(";\n") {
            let record = record.trim();
            let Some(("RWY", payload)) = record.split_once(':') else {
                continue;
            };
            match cifp::parse_rwy_record(path, payload)? {
                RunwayRecord::Threshold { rwy, lat, lon } => {
                    info.runways.push(rwy.clone());
                    let wp = Arc::new(Waypoint {
                        name: rwy.clone(),
                        lat,
                        lon,
                        region: info.region.clone(),
                        airport: Some(info.icao.clone()),
                    });
                    runway_waypoints.insert(rwy, wp);
                }
                RunwayRecord::IlsRecovery { rwy, ils } => {
                    info.runways.push(rwy.clone());
                    // Threshold position missing; fall back to the ILS fix
                    match runway_waypoints.get(&ils).cloned() {
                        Some(wp) => {
                            runway_waypoints.insert(rwy, wp);
                        }
                        None => warn!("{path}: no position for runway {rwy}"),
                    }
                }
            }
        }

        let parser = LegParser {
            db: self,
            info: &info,
            runway_waypoints: &runway_waypoints,
            path,
        };

        // (kind, qualifier, procedure, transition) → legs
        let mut groups: BTreeMap<(ProcKind, String, String, String), Vec<Leg>> = BTreeMap::new();
        for record in text.split(";\n") {
            let record = record.trim();
            if record.is_empty() {
                continue;
            }
            let Some((kind, payload)) = record.split_once(':') else {
                return Err(Self::parse_err(path, record, "record without a kind"));
            };
            let kind = match kind {
                "RWY" | "PRDAT" => continue,
                "SID" => ProcKind::Sid,
                "STAR" => ProcKind::Star,
                "APPCH" => ProcKind::Approach,
                other => {
                    return Err(Self::parse_err(
                        path,
                        record,
                        &format!("record kind '{other}' not recognized"),
                    ))
                }
            };

            let leg = parser.parse(kind, payload)?;
            let info = leg.info();
            groups
                .entry((
                    kind,
                    info.qualifier.clone(),
                    info.proc.clone(),
                    info.trans.clone(),
                ))
                .or_default()
                .push(leg);
        }

        for legs in groups.values_mut() {
            legs.sort_by_key(|leg| leg.info().seq);
        }

        Ok(Self::sort_procedures(groups, info, runway_waypoints))
    }

    /// Sort the grouped legs into procedure containers. The qualifier
    /// column decides whether a group is a runway body or an enroute
    /// transition.
    fn sort_procedures(
        groups: BTreeMap<(ProcKind, String, String, String), Vec<Leg>>,
        info: AirportInfo,
        runway_waypoints: BTreeMap<String, Arc<Waypoint>>,
    ) -> AirportData {
        let mut sids: BTreeMap<String, Sid> = BTreeMap::new();
        let mut stars: BTreeMap<String, Star> = BTreeMap::new();
        let mut approaches: BTreeMap<String, Approach> = BTreeMap::new();

        for ((kind, qual, proc_id, trans_id), legs) in groups {
            match kind {
                ProcKind::Sid => {
                    let sid = sids
                        .entry(proc_id.clone())
                        .or_insert_with(|| Sid::new(&proc_id, &info.icao));
                    if matches!(qual.as_str(), "3" | "6" | "S") {
                        sid.transitions.insert(trans_id, legs);
                    } else {
                        if !matches!(
                            qual.as_str(),
                            "0" | "1" | "2" | "4" | "F" | "M" | "T" | "V"
                        ) {
                            warn!("SID {proc_id}: unusual qualifier '{qual}', treated as a runway body");
                        }
                        insert_runway_body(
                            &mut sid.rwys,
                            &mut sid.is_all_rwys,
                            &trans_id,
                            legs,
                            &info.runways,
                        );
                    }
                }
                ProcKind::Star => {
                    let star = stars
                        .entry(proc_id.clone())
                        .or_insert_with(|| Star::new(&proc_id, &info.icao));
                    if matches!(qual.as_str(), "1" | "4" | "7" | "F") {
                        star.transitions.insert(trans_id, legs);
                    } else {
                        if !matches!(
                            qual.as_str(),
                            "2" | "5" | "3" | "6" | "8" | "9" | "M" | "S"
                        ) {
                            warn!("STAR {proc_id}: unusual qualifier '{qual}', treated as a runway body");
                        }
                        insert_runway_body(
                            &mut star.rwys,
                            &mut star.is_all_rwys,
                            &trans_id,
                            legs,
                            &info.runways,
                        );
                    }
                }
                ProcKind::Approach => {
                    let appch = approaches
                        .entry(proc_id.clone())
                        .or_insert_with(|| Approach::new(&proc_id, &info.icao));
                    appch.runway = cifp::runway_from_ident(&proc_id);
                    if qual == "A" {
                        appch.transitions.insert(trans_id, legs);
                    } else {
                        appch.legs = legs;
                    }
                }
            }
        }

        AirportData {
            info,
            runway_waypoints,
            sids,
            stars,
            approaches,
        }
    }
}

/// Register a runway body under every runway it applies to. An empty or
/// `ALL` transition field means the body serves the whole airport.
fn insert_runway_body(
    rwys: &mut BTreeMap<String, Vec<Leg>>,
    is_all_rwys: &mut bool,
    trans_id: &str,
    legs: Vec<Leg>,
    runways: &[String],
) {
    let targets = if trans_id.is_empty() {
        *is_all_rwys = true;
        runways.to_vec()
    } else {
        if trans_id == "ALL" {
            *is_all_rwys = true;
        }
        cifp::expand_runway_transition(trans_id, runways)
    };
    for rwy in targets {
        rwys.insert(rwy, legs.clone());
    }
}

// ----- T E S T S ---------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn db_from_strings() -> NavDatabase {
        let mut db = NavDatabase {
            dir: PathBuf::new(),
            waypoints: BTreeMap::new(),
            runway_waypoints: BTreeMap::new(),
            airports: BTreeMap::new(),
        };

        let fixes = "\
I
1100 Version
cycle 2403

 50.100000  008.200000 MARUN ENRT ED
 50.200000  008.400000 KULUM ENRT ED
99
";
        db.load_fixes(fixes, "earth_fix.dat").unwrap();

        let navaids = "\
I
1100 Version
cycle 2403

3  50.050000   008.100000 350 11630 130 -2.0 FFM EDDF ED FRANKFURT VOR
4  50.032000   008.534000 364 11010  18 253.0 IFEE EDDF ED FRANKFURT LOC
99
";
        db.load_navaids(navaids, "earth_nav.dat").unwrap();

        let airports = "\
I
1100 Version
cycle 2403

EDDF ED 50.033 8.570 364 1 0 0 5000 FL70
99
";
        db.load_airports(airports, "earth_aptmeta.dat").unwrap();
        db
    }

    #[test]
    fn global_streams() {
        let db = db_from_strings();

        let marun = db.waypoint("MARUN", "ED").unwrap();
        assert_eq!(marun.lat, 50.1);

        let ffm = db.waypoint("FFM", "ED").unwrap();
        assert_eq!(ffm.airport.as_deref(), Some("EDDF"));

        let apt = db.airport_info("EDDF").unwrap();
        assert_eq!(apt.elevation, 364);
        assert_eq!(apt.transition_altitude, 5000);
        assert_eq!(apt.transition_level, 7000);

        // The localizer registered a threshold for its airport
        assert!(db.runway_waypoints["EDDF"].contains_key("IFEE"));

        assert!(db.waypoint("MARUN", "LF").is_err());
    }

    #[test]
    fn airport_procedures() {
        let db = db_from_strings();
        let info = db.airport_info("EDDF").unwrap().clone();

        #[allow(clippy::too_many_arguments)]
        fn leg_cols(
            seq: &str,
            qual: &str,
            proc: &str,
            trans: &str,
            fix: &str,
            desc: &str,
            leg: &str,
            course: &str,
            alt: &str,
        ) -> String {
            let mut cols = vec![String::new(); 31];
            cols[0] = seq.to_string();
            cols[1] = qual.to_string();
            cols[2] = proc.to_string();
            cols[3] = trans.to_string();
            cols[4] = fix.to_string();
            cols[5] = "ED".to_string();
            cols[8] = desc.to_string();
            cols[11] = leg.to_string();
            cols[20] = course.to_string();
            cols[22] = if alt.is_empty() { "" } else { "+" }.to_string();
            cols[23] = alt.to_string();
            cols.join(",")
        }

        let mut text = String::new();
        text += "RWY:RW25C,,,00262,25012,IFEE;N50045000,E008600000,;\n";
        text += &format!(
            "SID:{};\n",
            leg_cols("010", "2", "MARU1X", "RW25C", "", "V   ", "VA", "2490", "1300")
        );
        text += &format!(
            "SID:{};\n",
            leg_cols("020", "2", "MARU1X", "RW25C", "MARUN", "E   ", "TF", "", "")
        );
        text += &format!(
            "SID:{};\n",
            leg_cols("010", "3", "MARU1X", "KULUM", "KULUM", "E   ", "TF", "", "")
        );

        let data = db.parse_airport(&info, &text, "CIFP/EDDF.dat").unwrap();

        assert_eq!(data.info.runways, vec!["RW25C".to_string()]);
        assert!(data.runway_waypoints.contains_key("RW25C"));
        assert!(data.runway_waypoint("25C").is_some());

        let sid = &data.sids["MARU1X"];
        assert_eq!(sid.rwys["RW25C"].len(), 2);
        assert_eq!(sid.rwys["RW25C"][0].mnemonic(), "VA");
        assert_eq!(sid.rwys["RW25C"][1].mnemonic(), "TF");
        assert_eq!(sid.transitions["KULUM"].len(), 1);
        assert!(!sid.is_all_rwys);
    }

    #[test]
    fn unknown_leg_kind_aborts_the_airport() {
        let db = db_from_strings();
        let info = db.airport_info("EDDF").unwrap().clone();

        let mut cols = vec![""; 31].into_iter().map(str::to_string).collect::<Vec<_>>();
        cols[0] = "010".to_string();
        cols[11] = "QQ".to_string();
        let text = format!("SID:{};\n", cols.join(","));

        assert!(db.parse_airport(&info, &text, "CIFP/EDDF.dat").is_err());
    }
}
