//! The path builder: an ordered leg list in, flight path points out.
//!
//! Each leg kind has its own termination rule (a fix, an altitude, a DME
//! ring, a radial, a manual release); the builder materialises them one by
//! one, splicing legs together through turns or intercepts, and finally
//! runs a vertical profile over every leg whose points still lack an
//! altitude. Two latent flags thread through the walk: `overfly` (the
//! previous terminator must be crossed before turning) and `intercepting`
//! (a CI/VI leg is pending and the next leg absorbs it).

mod constraints;

pub use constraints::altitude_envelopes;

use crate::magvar::true_course;
use crate::math::spherical::{
    angle_between, course_between, earth_distance, go_dist_from, go_to_dme, intersection,
    point_bisect_line, point_dist_to_line,
};
use crate::math::turns::{arc_between_points, turn_from, turn_to_course_towards, turn_towards};
use crate::math::{PathPoint, EARTH_RAD, NM_TO_FT, RF_TOLERANCE, TOLERANCE};
use crate::navdata::leg::{Approach, Leg, Sid, Star, TurnDir};
use crate::navdata::types::{Course, Radial, Waypoint};
use crate::navdata::{runway_key, AirportData};
use crate::Error;
use log::warn;
use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};

/// Points per revolution per nautical mile of turn radius
const POINT_DENSITY: f64 = 32.;

/// Maximum acceptable distance to an intercepted radial or course, nm
const MAX_INTC_DISTANCE: f64 = 128.;

/// Turn radius used when swinging onto a new course, nm
const CI_RADIUS: f64 = 2.;

/// Starting altitude for approaches when the caller knows no better.
/// A placeholder: real use probably wants the transition altitude or the
/// published procedure altitude.
pub const DEFAULT_APPROACH_ALT: f64 = 10_000.;

/// Aircraft performance assumptions for path construction
#[derive(Debug, Clone, Copy)]
pub struct AircraftConfig {
    /// Smallest turn radius flown, nautical miles
    pub min_turn_radius: f64,
    /// Climb gradient, feet per foot of ground track
    pub climb_grad: f64,
    /// Descent gradient, positive, feet per foot of ground track
    pub descent_grad: f64,
}

impl Default for AircraftConfig {
    fn default() -> AircraftConfig {
        AircraftConfig {
            min_turn_radius: 1.,
            climb_grad: 0.1,
            // A standard three degree descent
            descent_grad: 3f64.to_radians().tan(),
        }
    }
}

/// The result of one build: the points grouped per leg, and the same
/// points as one flat stream
#[derive(Debug, Clone, Default)]
pub struct BuiltPath {
    pub legs: Vec<(Leg, Vec<PathPoint>)>,
    pub points: Vec<PathPoint>,
}

impl BuiltPath {
    fn chain(mut self, other: BuiltPath) -> BuiltPath {
        self.legs.extend(other.legs);
        self.points.extend(other.points);
        self
    }
}

fn points_dist(points: &[PathPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| earth_distance(w[0].latlon(), w[1].latlon()))
        .sum()
}

fn course_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

/// Build the flight path for an ordered leg list.
///
/// `start_point`/`start_course` seed the walk when the caller knows where
/// the path begins (a runway threshold, the end of a preceding segment);
/// without them, a leg with an explicit start fix may seed itself.
/// `ascending` selects the vertical profile direction: climbs for
/// departures, descents for arrivals and approaches.
pub fn build_points(
    legs: &[Leg],
    config: &AircraftConfig,
    start_point: Option<(f64, f64)>,
    start_course: Option<f64>,
    start_alt: f64,
    ascending: bool,
) -> Result<BuiltPath, Error> {
    if legs.is_empty() {
        return Ok(BuiltPath::default());
    }

    let mut builder = PathBuilder {
        legs,
        config,
        ascending,
        envelopes: altitude_envelopes(legs, ascending),
        built: Vec::new(),
        all_points: Vec::new(),
        points: Vec::new(),
        cur_course: start_course,
        cur_alt: start_alt,
        overfly: false,
        intercepting: false,
    };
    builder.seed(start_point, start_course, start_alt);
    builder.build()
}

struct PathBuilder<'a> {
    legs: &'a [Leg],
    config: &'a AircraftConfig,
    ascending: bool,
    envelopes: Vec<(f64, f64)>,
    built: Vec<(Leg, Vec<PathPoint>)>,
    all_points: Vec<PathPoint>,
    /// Points of the leg (or pending intercept run) under construction
    points: Vec<PathPoint>,
    cur_course: Option<f64>,
    cur_alt: f64,
    overfly: bool,
    intercepting: bool,
}

impl PathBuilder<'_> {
    fn seed(&mut self, start_point: Option<(f64, f64)>, start_course: Option<f64>, start_alt: f64) {
        if let Some(latlon) = start_point {
            let crs = start_course.unwrap_or(0.);
            self.points.push(PathPoint::with_altitude(latlon, crs, start_alt));
            return;
        }

        // Some procedures do not open with a fix; seed from the first
        // leg's start when it names one
        match &self.legs[0] {
            Leg::FixToDistance { start, course, .. }
            | Leg::FixToAltitude { start, course, .. }
            | Leg::FixToDme { start, course, .. } => {
                let crs = true_course(start.latlon_rad(), course, 0.);
                self.points
                    .push(PathPoint::with_altitude(start.latlon_rad(), crs, start_alt));
                self.cur_course = Some(crs);
            }
            Leg::HoldToFix { fix, course, .. } | Leg::ProcedureTurn { fix, course, .. } => {
                let crs = true_course(fix.latlon_rad(), course, 0.);
                self.points
                    .push(PathPoint::with_altitude(fix.latlon_rad(), crs, start_alt));
                self.cur_course = Some(crs);
            }
            _ => (),
        }
    }

    fn last_point(&self) -> Option<PathPoint> {
        self.points.last().or_else(|| self.all_points.last()).copied()
    }

    fn require_last(&self) -> Result<PathPoint, Error> {
        self.last_point()
            .ok_or_else(|| Error::Invalid("no current position to continue from".to_string()))
    }

    fn cur_latlon(&self) -> Option<(f64, f64)> {
        self.last_point().map(|p| p.latlon())
    }

    /// Where to evaluate declination: the current position, or `fallback`
    /// before any point exists
    fn decl_latlon(&self, fallback: (f64, f64)) -> (f64, f64) {
        self.cur_latlon().unwrap_or(fallback)
    }

    fn course_to(&self, fix: &Waypoint) -> Option<f64> {
        let cur = self.cur_latlon()?;
        course_between(cur, fix.latlon_rad()).ok()
    }

    /// Recompute the current course from the two newest points
    fn auto_course(&mut self) {
        let (p2, p1) = if self.points.len() == 1 {
            let Some(prev) = self.all_points.last() else { return };
            (*prev, self.points[0])
        } else if self.points.len() >= 2 {
            (
                self.points[self.points.len() - 2],
                self.points[self.points.len() - 1],
            )
        } else if self.all_points.len() >= 2 {
            (
                self.all_points[self.all_points.len() - 2],
                self.all_points[self.all_points.len() - 1],
            )
        } else {
            return;
        };

        if let Ok(crs) = course_between(p2.latlon(), p1.latlon()) {
            self.cur_course = Some(crs);
        }
    }

    /// The direction to turn towards `target`: the coded one, or the
    /// shorter way when the data leaves it open
    fn turn_dir(&self, leg: &Leg, target: f64) -> bool {
        match leg.info().turn_dir {
            TurnDir::Right => true,
            TurnDir::Left => false,
            TurnDir::Unspecified => {
                let cur = self.cur_course.unwrap_or(target);
                angle_between(cur, target, true) < PI
            }
        }
    }

    /// Last resort when a radial cannot be joined: the shortest way onto
    /// it, but only when the previous terminator must be overflown
    fn splice_fallback(&self, start: (f64, f64), crs: f64) -> Result<Vec<PathPoint>, Error> {
        if !self.overfly {
            return Ok(Vec::new());
        }
        let Some(cur) = self.cur_latlon() else {
            return Ok(Vec::new());
        };
        let foot = point_bisect_line(cur, start, crs)?;
        let req = course_between(cur, foot).unwrap_or(crs);
        Ok(vec![PathPoint::new(foot, req)])
    }

    /// Splice the path onto the radial through `start` along `crs`:
    /// nothing when already riding it, a straight line to the intersection
    /// when reasonable, otherwise a turning arc (either direction), and
    /// the perpendicular foot as a last resort.
    fn to_fix_track(&self, leg: &Leg, start: &Waypoint, crs: f64) -> Result<Vec<PathPoint>, Error> {
        let start_rad = start.latlon_rad();
        let Some(cur_course) = self.cur_course else {
            return self.splice_fallback(start_rad, crs);
        };
        let Some(cur) = self.cur_latlon() else {
            return self.splice_fallback(start_rad, crs);
        };

        let diff = course_diff(cur_course, crs);

        // A turn of less than two degrees is not worth flying
        let dist_to = point_dist_to_line(cur, start_rad, crs);
        if dist_to <= TOLERANCE && (!self.overfly || diff <= 2f64.to_radians()) {
            return Ok(Vec::new());
        }

        let intc = intersection(cur, cur_course, start_rad, crs);
        let mut can_intc = true;
        if self.overfly && diff >= 5f64.to_radians() {
            can_intc = false;
        }
        if earth_distance(start_rad, intc) > MAX_INTC_DISTANCE {
            can_intc = false;
        }
        if can_intc {
            return Ok(vec![PathPoint::new(intc, cur_course)]);
        }

        let td = self.turn_dir(leg, crs);
        let last = self.require_last()?;
        match turn_to_course_towards(
            &last,
            cur_course,
            start_rad,
            crs,
            self.config.min_turn_radius,
            POINT_DENSITY,
            td,
        ) {
            Ok(points) => Ok(points),
            Err(_) if leg.info().turn_dir != TurnDir::Unspecified => {
                self.splice_fallback(start_rad, crs)
            }
            Err(_) => {
                // The coded data left the direction open: try the other way
                match turn_to_course_towards(
                    &last,
                    cur_course,
                    start_rad,
                    crs,
                    self.config.min_turn_radius,
                    POINT_DENSITY,
                    !td,
                ) {
                    Ok(points) => Ok(points),
                    Err(_) => self.splice_fallback(start_rad, crs),
                }
            }
        }
    }

    /// Swing onto a new course at [`CI_RADIUS`]; skipped below two degrees
    fn turn_to_crs(&self, leg: &Leg, crs: f64) -> Result<Vec<PathPoint>, Error> {
        let Some(cur_course) = self.cur_course else {
            return Ok(Vec::new());
        };
        if course_diff(cur_course, crs) < 2f64.to_radians() {
            return Ok(Vec::new());
        }
        let td = self.turn_dir(leg, crs);
        let last = self.require_last()?;
        turn_from(&last, cur_course, crs, CI_RADIUS, POINT_DENSITY, td)
    }

    /// Commit the points gathered for leg `idx`, running the vertical
    /// profile over any point still lacking an altitude
    fn commit_leg(&mut self, idx: usize) {
        let leg = &self.legs[idx];

        if self
            .points
            .last()
            .map_or(false, |p| p.altitude == f64::NEG_INFINITY)
        {
            let (above, below) = self.envelopes[idx];
            let grad = match leg.info().glide_angle {
                Some(angle) => angle.to_radians().tan(),
                None if self.ascending => self.config.climb_grad,
                None => -self.config.descent_grad,
            };

            // The gap between the last committed point and this leg's
            // first point counts towards the climb or descent
            let initial_dist = match (self.all_points.last(), self.points.first()) {
                (Some(prev), Some(first)) => earth_distance(prev.latlon(), first.latlon()),
                _ => 0.,
            };
            let total = points_dist(&self.points) + initial_dist;
            let target = (self.cur_alt + grad * total * NM_TO_FT).max(above).min(below);

            // Rescale so the altitude meets the target exactly at the last
            // point, without turning an ascent into a descent or vice versa
            let achieved = if total > 0. {
                (target - self.cur_alt) / (total * NM_TO_FT)
            } else {
                grad
            };
            let grad = if self.ascending {
                grad.max(achieved)
            } else {
                grad.min(achieved)
            };

            let mut dist = initial_dist;
            for i in 0..self.points.len() {
                if i > 0 {
                    dist += earth_distance(self.points[i - 1].latlon(), self.points[i].latlon());
                }
                let alt = self.cur_alt + grad * dist * NM_TO_FT;
                self.points[i].altitude = if self.ascending {
                    alt.min(below)
                } else {
                    alt.max(above)
                };
            }
            self.cur_alt = target;
        }

        let points = std::mem::take(&mut self.points);
        self.all_points.extend(points.iter().copied());
        self.built.push((leg.clone(), points));
    }

    fn flush_intercept(&mut self, idx: usize) {
        if self.intercepting {
            self.intercepting = false;
            self.commit_leg(idx - 1);
        }
    }

    /// CA and VA: turn onto the course, then climb to the altitude
    fn altitude_leg(&mut self, leg: &Leg, course: &Course, alt: i32) -> Result<(), Error> {
        if !self.ascending {
            return Err(Error::Invalid(
                "altitude-terminated leg in a descending procedure".to_string(),
            ));
        }
        let cur = self.require_last()?;
        let crs = true_course(cur.latlon(), course, 0.);

        let diff = f64::from(alt) - self.cur_alt;
        if diff < 0. {
            return Ok(());
        }

        let mut prev = cur;
        let mut total_dist = 0.;
        if self.overfly {
            let new_p = self.turn_to_crs(leg, crs)?;
            if let (Some(first), Some(last)) = (new_p.first(), new_p.last()) {
                total_dist = earth_distance(cur.latlon(), first.latlon()) + points_dist(&new_p);
                prev = *last;
            }
            self.points.extend(new_p);
        }

        let req_dist = diff / (self.config.climb_grad * NM_TO_FT);
        let dist = req_dist - total_dist;

        self.cur_course = Some(crs);
        if dist >= 0. {
            let dest = go_dist_from(prev.latlon(), crs, dist);
            self.points.push(PathPoint::new(dest, crs));
        }
        self.overfly = true;
        Ok(())
    }

    /// CD and VD: turn onto the course, then run out to the DME ring
    fn dme_leg(&mut self, leg: &Leg, course: &Course, station: &Waypoint, dme: f64) -> Result<(), Error> {
        let crs = true_course(self.decl_latlon(station.latlon_rad()), course, 0.);
        let new_p = self.turn_to_crs(leg, crs)?;
        self.points.extend(new_p);
        self.cur_course = Some(crs);

        let last = self.require_last()?;
        let dest = go_to_dme(last.latlon(), crs, station.latlon_rad(), dme, self.cur_alt)?;
        self.points.push(PathPoint::new(dest, crs));
        self.overfly = true;
        Ok(())
    }

    /// CI and VI: turn onto the intercept course and leave the rest to the
    /// next leg, which must be able to absorb an intercept
    fn intercept_leg(&mut self, leg: &Leg, idx: usize, course: &Course) -> Result<(), Error> {
        let crs = true_course(self.decl_latlon((0., 0.)), course, 0.);
        if self.overfly {
            let new_p = self.turn_to_crs(leg, crs)?;
            self.points.extend(new_p);
        }
        self.cur_course = Some(crs);

        let Some(next) = self.legs.get(idx + 1) else {
            return Err(Error::Invalid(
                "an intercept leg cannot end the procedure".to_string(),
            ));
        };
        match next {
            Leg::ArcToFix { .. }
            | Leg::CourseToFix { .. }
            | Leg::FixToAltitude { .. }
            | Leg::FixToDistance { .. }
            | Leg::FixToDme { .. }
            | Leg::FixToManual { .. }
            | Leg::InitialFix { .. } => (),
            other => return Err(Error::BadSequence(other.mnemonic())),
        }

        self.overfly = false;
        self.intercepting = true;
        Ok(())
    }

    /// CR and VR: turn onto the course, then cut the radial
    fn radial_leg(&mut self, leg: &Leg, course: &Course, radial: &Radial) -> Result<(), Error> {
        let crs = true_course(self.decl_latlon(radial.fix.latlon_rad()), course, 0.);
        let new_p = self.turn_to_crs(leg, crs)?;
        self.points.extend(new_p);
        self.cur_course = Some(crs);

        let origin = radial.fix.latlon_rad();
        let rad = true_course(origin, &radial.bearing, 0.);

        let last = self.require_last()?;
        let intc = intersection(last.latlon(), crs, origin, rad);
        let dist = earth_distance(last.latlon(), intc);
        if dist > MAX_INTC_DISTANCE {
            return Err(Error::InterceptTooFar(dist));
        }
        self.points.push(PathPoint::new(intc, crs));
        self.overfly = true;
        Ok(())
    }

    fn required_clockwise(leg: &Leg) -> Result<bool, Error> {
        match leg.info().turn_dir {
            TurnDir::Right => Ok(true),
            TurnDir::Left => Ok(false),
            TurnDir::Unspecified => Err(Error::Invalid(format!(
                "{} leg without a turn direction",
                leg.mnemonic()
            ))),
        }
    }

    fn build(mut self) -> Result<BuiltPath, Error> {
        for i in 0..self.legs.len() {
            let leg = self.legs[i].clone();
            match &leg {
                Leg::InitialFix { fix, .. } => {
                    // An in-progress intercept consumes the fix instead
                    if !self.intercepting {
                        let crs = self.cur_course.unwrap_or(0.);
                        self.points
                            .push(PathPoint::with_altitude(fix.latlon_rad(), crs, self.cur_alt));
                        self.auto_course();
                    }
                }

                Leg::TrackToFix { info, fix } => {
                    if let Some(req) = self.course_to(fix) {
                        let new_p = self.to_fix_track(&leg, fix, req)?;
                        self.points.extend(new_p);
                        self.cur_course = Some(req);
                    }
                    let inbound = self.course_to(fix).or(self.cur_course).unwrap_or(0.);
                    self.points.push(PathPoint::new(fix.latlon_rad(), inbound));
                    self.overfly = info.overfly;
                }

                Leg::CourseToFix { info, fix, course, .. } => {
                    let crs = true_course(self.decl_latlon(fix.latlon_rad()), course, 0.);
                    let new_p = self.to_fix_track(&leg, fix, crs)?;
                    self.points.extend(new_p);

                    self.flush_intercept(i);

                    let inbound = self.course_to(fix).unwrap_or(crs);
                    self.points.push(PathPoint::new(fix.latlon_rad(), inbound));
                    self.overfly = info.overfly;
                    self.cur_course = Some(crs);
                }

                Leg::DirectToFix { info, fix, .. } => {
                    let req = self.course_to(fix);
                    if self.overfly {
                        if let (Some(cur_course), Some(req)) = (self.cur_course, req) {
                            let td = self.turn_dir(&leg, req);
                            let last = self.require_last()?;
                            let new_p = turn_towards(
                                &last,
                                cur_course,
                                fix.latlon_rad(),
                                self.config.min_turn_radius,
                                POINT_DENSITY,
                                td,
                            )?;
                            self.points.extend(new_p);
                        }
                    }
                    let inbound = self.course_to(fix).or(self.cur_course).unwrap_or(0.);
                    self.points.push(PathPoint::new(fix.latlon_rad(), inbound));
                    self.auto_course();
                    self.overfly = info.overfly;
                }

                Leg::FixToAltitude { info, start, course, alt, .. } => {
                    if !self.ascending {
                        return Err(Error::Invalid(
                            "fix-to-altitude leg in a descending procedure".to_string(),
                        ));
                    }
                    let crs = true_course(self.decl_latlon(start.latlon_rad()), course, 0.);
                    let new_p = self.to_fix_track(&leg, start, crs)?;
                    self.points.extend(new_p);

                    self.flush_intercept(i);

                    let diff = f64::from(*alt) - self.cur_alt;
                    self.cur_course = Some(crs);
                    self.overfly = info.overfly;

                    if diff >= 0. {
                        let prev = self.require_last()?;
                        let dist = diff / (self.config.climb_grad * NM_TO_FT);
                        let dest = go_dist_from(prev.latlon(), crs, dist);
                        self.points.push(PathPoint::new(dest, crs));
                        self.overfly = true;
                    }
                }

                Leg::FixToDistance { start, course, dist_nm, .. } => {
                    let crs = true_course(self.decl_latlon(start.latlon_rad()), course, 0.);
                    let new_p = self.to_fix_track(&leg, start, crs)?;
                    self.points.extend(new_p);

                    self.flush_intercept(i);

                    let dest = go_dist_from(start.latlon_rad(), crs, *dist_nm);
                    self.points.push(PathPoint::new(dest, crs));
                    self.overfly = true;
                    self.cur_course = Some(crs);
                }

                Leg::FixToDme { start, course, station, dme_nm, .. } => {
                    let crs = true_course(self.decl_latlon(start.latlon_rad()), course, 0.);
                    let new_p = self.to_fix_track(&leg, start, crs)?;
                    self.points.extend(new_p);

                    self.flush_intercept(i);

                    let dest = go_to_dme(
                        start.latlon_rad(),
                        crs,
                        station.latlon_rad(),
                        *dme_nm,
                        self.cur_alt,
                    )?;
                    self.points.push(PathPoint::new(dest, crs));
                    self.overfly = true;
                    self.cur_course = Some(crs);
                }

                Leg::FixToManual { start, course, .. } => {
                    let crs = true_course(self.decl_latlon(start.latlon_rad()), course, 0.);
                    let new_p = self.to_fix_track(&leg, start, crs)?;
                    self.points.extend(new_p);

                    self.flush_intercept(i);

                    self.overfly = false;
                    self.cur_course = Some(crs);
                }

                Leg::HeadingToManual { fix, heading, .. } => {
                    let fallback = fix
                        .as_ref()
                        .map(|f| f.latlon_rad())
                        .unwrap_or((0., 0.));
                    let crs = true_course(self.decl_latlon(fallback), heading, 0.);
                    let new_p = match fix {
                        Some(f) => self.to_fix_track(&leg, f, crs)?,
                        None => self.turn_to_crs(&leg, crs)?,
                    };
                    self.points.extend(new_p);

                    self.flush_intercept(i);

                    self.overfly = false;
                    self.cur_course = Some(crs);
                }

                Leg::CourseToAltitude { course, alt, .. } => {
                    self.altitude_leg(&leg, course, *alt)?;
                }
                Leg::HeadingToAltitude { heading, alt, .. } => {
                    self.altitude_leg(&leg, heading, *alt)?;
                }

                Leg::CourseToDme { course, station, dme_nm, .. } => {
                    self.dme_leg(&leg, course, station, *dme_nm)?;
                }
                Leg::HeadingToDme { heading, station, dme_nm, .. } => {
                    self.dme_leg(&leg, heading, station, *dme_nm)?;
                }

                Leg::CourseToIntercept { course, .. } => {
                    self.intercept_leg(&leg, i, course)?;
                }
                Leg::HeadingToIntercept { heading, .. } => {
                    self.intercept_leg(&leg, i, heading)?;
                }

                Leg::CourseToRadial { course, radial, .. } => {
                    self.radial_leg(&leg, course, radial)?;
                }
                Leg::HeadingToRadial { heading, radial, .. } => {
                    self.radial_leg(&leg, heading, radial)?;
                }

                Leg::RadiusArc { fix, center, .. } => {
                    let clockwise = Self::required_clockwise(&leg)?;
                    let last = self.require_last()?;
                    let new_p = arc_between_points(
                        center.latlon_rad(),
                        &last,
                        fix.latlon_rad(),
                        POINT_DENSITY,
                        clockwise,
                    )?;
                    if let Some(p) = new_p.last() {
                        self.cur_course = Some(p.course);
                    }
                    self.points.extend(new_p);
                    self.overfly = true;
                }

                Leg::ArcToFix { info, fix, radial } => {
                    let clockwise = Self::required_clockwise(&leg)?;
                    let origin = radial.fix.latlon_rad();
                    let ring = earth_distance(fix.latlon_rad(), origin);

                    let last = self.require_last()?;
                    if (earth_distance(last.latlon(), origin) - ring).abs()
                        > RF_TOLERANCE * EARTH_RAD
                    {
                        // Off the arc: run along the current course until
                        // the ring is met
                        let crs = self.cur_course.ok_or_else(|| {
                            Error::Invalid("no course to intercept the arc from".to_string())
                        })?;
                        let intc = go_to_dme(last.latlon(), crs, origin, ring, 0.)?;
                        self.points.push(PathPoint::new(intc, crs));
                    }

                    self.flush_intercept(i);

                    let last = self.require_last()?;
                    let new_p = arc_between_points(
                        origin,
                        &last,
                        fix.latlon_rad(),
                        POINT_DENSITY,
                        clockwise,
                    )?;
                    if let Some(p) = new_p.last() {
                        self.cur_course = Some(p.course);
                    }
                    self.points.extend(new_p);
                    self.overfly = info.overfly;
                }

                Leg::HoldToFix { fix, .. } => {
                    // A single orbit collapses to its fix on the chart
                    let crs = self.cur_course.unwrap_or(0.);
                    self.points
                        .push(PathPoint::with_altitude(fix.latlon_rad(), crs, self.cur_alt));
                    self.auto_course();
                }

                Leg::ProcedureTurn { .. } | Leg::HoldToAltitude { .. } | Leg::HoldToManual { .. } => {
                    return Err(Error::Unimplemented(leg.mnemonic()));
                }
            }

            if !self.intercepting {
                self.commit_leg(i);
            }
        }

        Ok(BuiltPath {
            legs: self.built,
            points: self.all_points,
        })
    }
}

// ----- P R O C E D U R E   A S S E M B L Y ----------------------------------------

fn transition_legs<'a>(
    transitions: &'a BTreeMap<String, Vec<Leg>>,
    ident: &str,
) -> Result<&'a Vec<Leg>, Error> {
    transitions.get(ident).ok_or_else(|| {
        let known: Vec<&str> = transitions.keys().map(String::as_str).collect();
        Error::NotFound(
            ident.to_string(),
            format!(": possible transitions are {}", known.join(",")),
        )
    })
}

fn runway_body<'a>(
    rwys: &'a BTreeMap<String, Vec<Leg>>,
    runway: &str,
) -> Result<&'a Vec<Leg>, Error> {
    rwys.get(&runway_key(runway)).ok_or_else(|| {
        let known: Vec<&str> = rwys.keys().map(String::as_str).collect();
        Error::NotFound(
            runway.to_string(),
            format!(": possible runways are {}", known.join(",")),
        )
    })
}

/// Build a departure: from the runway threshold at airport elevation,
/// through the runway body, into the optional enroute transition
pub fn build_sid(
    airport: &AirportData,
    sid: &Sid,
    config: &AircraftConfig,
    runway: &str,
    transition: Option<&str>,
) -> Result<BuiltPath, Error> {
    let body = runway_body(&sid.rwys, runway)?;

    let start = match airport.runway_waypoint(runway) {
        Some(wp) => wp.clone(),
        None => {
            warn!(
                "{}: no threshold for {runway}; departing from the airport position",
                airport.info.icao
            );
            airport.info.as_waypoint()
        }
    };

    let mut legs = body.clone();
    if let Some(t) = transition {
        legs.extend(transition_legs(&sid.transitions, t)?.iter().cloned());
    }

    build_points(
        &legs,
        config,
        Some(start.latlon_rad()),
        None,
        f64::from(airport.info.elevation),
        true,
    )
}

/// Build an arrival: the optional enroute transition into the runway body,
/// descending from `start_alt`
pub fn build_star(
    star: &Star,
    config: &AircraftConfig,
    runway: &str,
    transition: Option<&str>,
    start_alt: f64,
) -> Result<BuiltPath, Error> {
    let body = runway_body(&star.rwys, runway)?;

    let mut legs = Vec::new();
    if let Some(t) = transition {
        legs.extend(transition_legs(&star.transitions, t)?.iter().cloned());
    }
    legs.extend(body.iter().cloned());

    build_points(&legs, config, None, None, start_alt, false)
}

fn normalized_rwy(designator: &str) -> String {
    designator
        .trim_start_matches("RW")
        .trim_start_matches('0')
        .to_string()
}

/// Build an approach: transition plus final descending from `start_alt`
/// (see [`DEFAULT_APPROACH_ALT`]), then the missed approach climbing away
/// from wherever the final ended
pub fn build_approach(
    appch: &Approach,
    config: &AircraftConfig,
    runway: &str,
    transition: Option<&str>,
    start_alt: f64,
) -> Result<BuiltPath, Error> {
    let serves = appch
        .runway
        .as_deref()
        .map_or(false, |r| normalized_rwy(r) == normalized_rwy(runway));
    if !serves {
        return Err(Error::NotFound(
            runway.to_string(),
            format!(
                ": this approach serves runway {}",
                appch.runway.as_deref().unwrap_or("?")
            ),
        ));
    }

    let mut final_legs = appch.legs.clone();
    let missed = match final_legs.iter().position(|l| l.info().first_missed) {
        Some(pos) => final_legs.split_off(pos),
        None => Vec::new(),
    };

    if let Some(t) = transition {
        let mut with_trans = transition_legs(&appch.transitions, t)?.clone();
        with_trans.extend(final_legs);
        final_legs = with_trans;
    }

    let final_path = build_points(&final_legs, config, None, None, start_alt, false)?;
    let Some(end) = final_path.points.last().copied() else {
        return Err(Error::Invalid("approach produced no points".to_string()));
    };

    let missed_path = build_points(
        &missed,
        config,
        Some(end.latlon()),
        Some(end.course),
        end.altitude,
        true,
    )?;

    Ok(final_path.chain(missed_path))
}

// ----- T E S T S ---------------------------------------------------
