use crate::math::spherical::{
    circle_distance, course_from_tangent, point_dist_to_line, sphere_tangent, to_latlon, to_xyz,
};
use crate::math::vector::Vec3;
use crate::math::{PathPoint, EARTH_RAD, RF_TOLERANCE, TOLERANCE};
use crate::Error;
use std::f64::consts::{PI, TAU};

/// Orthonormal frame of a turning circle.
///
/// Any circle on the sphere is a plain circle in Cartesian space. `l` is
/// the foot of the circle's center on its plane, `v1` the unit vector from
/// the origin towards the center, `v2` the unit vector from `l` towards
/// the starting point, and `v3 = v1 × v2` (negated for a clockwise turn),
/// so that points on the circle are `l + r(v2 cos θ + v3 sin θ)`.
#[derive(Debug, Clone, Copy)]
pub struct TurningCircle {
    pub l: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub v3: Vec3,
}

impl TurningCircle {
    pub fn new(center: (f64, f64), start: (f64, f64), clockwise: bool) -> Result<Self, Error> {
        let center_xyz = to_xyz(center.0, center.1);
        let s = to_xyz(start.0, start.1);

        // Depress the center onto the circle's plane
        let l = center_xyz * center_xyz.dot(s);

        let v1 = center_xyz;
        let v2 = (s - l).normalize()?;
        let mut v3 = v1.cross(v2);
        if clockwise {
            v3 = -v3;
        }

        debug_assert!(v1.dot(v2).abs() < TOLERANCE);
        debug_assert!(v1.dot(v3).abs() < TOLERANCE);
        debug_assert!(v2.dot(v3).abs() < TOLERANCE);

        Ok(TurningCircle { l, v1, v2, v3 })
    }
}

/// Points along the arc from `start`, turning by `angle` radians of arc
/// parameter about `center`.
///
/// The starting point is *not* emitted; the endpoint is. The number of
/// intermediate points scales with `density` (points per revolution per
/// nautical mile of radius).
pub fn arc_points(
    center: (f64, f64),
    start: &PathPoint,
    angle: f64,
    density: f64,
    clockwise: bool,
    frame: Option<&TurningCircle>,
) -> Result<Vec<PathPoint>, Error> {
    let s = to_xyz(start.lat, start.lon);

    let owned;
    let frame = match frame {
        Some(frame) => frame,
        None => {
            owned = TurningCircle::new(center, start.latlon(), clockwise)?;
            &owned
        }
    };

    let dist = (s - frame.l).mag2().sqrt();
    let radius = circle_distance(start.latlon(), center);

    let v2d = frame.v2 * dist;
    let v3d = frame.v3 * dist;

    let num_points = (density * (angle / TAU) * radius * EARTH_RAD).ceil() as usize;
    if num_points == 0 {
        return Ok(Vec::new());
    }
    let step = angle / num_points as f64;

    let mut points = Vec::with_capacity(num_points);
    for i in 1..=num_points {
        let ang = step * i as f64;
        let latlon = to_latlon(v2d * ang.cos() + v3d * ang.sin() + frame.l);
        let tangent = -frame.v2 * ang.sin() + frame.v3 * ang.cos();
        points.push(PathPoint::new(latlon, course_from_tangent(latlon, tangent)));
    }
    Ok(points)
}

/// Arc from `start` to `end` on the circle about `center`.
/// Both endpoints must actually lie on that circle, to [`RF_TOLERANCE`].
pub fn arc_between_points(
    center: (f64, f64),
    start: &PathPoint,
    end: (f64, f64),
    density: f64,
    clockwise: bool,
) -> Result<Vec<PathPoint>, Error> {
    let center_xyz = to_xyz(center.0, center.1);
    let s = to_xyz(start.lat, start.lon);
    let e = to_xyz(end.0, end.1);

    let r_start = (center_xyz - s).mag2().sqrt();
    let r_end = (center_xyz - e).mag2().sqrt();
    if (r_start - r_end).abs() >= RF_TOLERANCE {
        return Err(Error::Invalid(
            "start and end do not lie on a circle about the center".to_string(),
        ));
    }

    let frame = TurningCircle::new(center, start.latlon(), clockwise)?;

    let e_del = (e - frame.l).normalize()?;
    let mut e_ang = e_del.dot(frame.v3).atan2(e_del.dot(frame.v2));
    if e_ang < 0. {
        e_ang += TAU;
    }

    arc_points(center, start, e_ang, density, clockwise, Some(&frame))
}

/// Turn from the inbound onto the outbound course at the given radius.
///
/// The circle is tangent to the inbound course at `start`; its center sits
/// one radius away, perpendicular to the current tangent. The arc length is
/// then bisected: `shift_angle` lifts the course into a monotone increasing
/// continuous function of the arc parameter, which makes the bisection
/// well defined.
pub fn turn_from(
    start: &PathPoint,
    inbd_crs: f64,
    outbd_crs: f64,
    turn_radius: f64,
    density: f64,
    turn_right: bool,
) -> Result<Vec<PathPoint>, Error> {
    let to_point = to_xyz(start.lat, start.lon);
    let tangent = sphere_tangent(start.latlon(), inbd_crs);
    let mut v3 = to_point.cross(tangent);
    if turn_right {
        v3 = -v3;
    }

    // The center lies in v3's direction, one radius along the circle
    // defined by (to_point, v3)
    let angle = turn_radius / EARTH_RAD;
    let center = to_latlon(to_point * angle.cos() + v3 * angle.sin());

    let frame = TurningCircle::new(center, start.latlon(), turn_right)?;
    let dist = (to_point - frame.l).mag2().sqrt();

    // For right turns, courses short of the inbound get lifted a full turn;
    // for left turns, courses beyond it get depressed and the whole map is
    // mirrored. Either way the course becomes monotone in the arc parameter.
    let shift_angle = |mut angle: f64| -> f64 {
        if turn_right && (0. ..inbd_crs).contains(&angle) {
            angle += TAU;
        }
        if !turn_right && angle > inbd_crs && angle <= TAU {
            angle -= TAU;
        }
        if !turn_right {
            angle = -angle;
        }
        angle
    };

    let course_after = |turn_ang: f64| -> f64 {
        let e = frame.v2 * (turn_ang.cos() * dist) + frame.v3 * (turn_ang.sin() * dist) + frame.l;
        let end = to_latlon(e);
        let tangent = -frame.v2 * turn_ang.sin() + frame.v3 * turn_ang.cos();
        shift_angle(course_from_tangent(end, tangent))
    };

    const ITERATIONS: usize = 50;
    const TOL: f64 = 1e-13;
    let target = shift_angle(outbd_crs);
    let mut low = 0.;
    let mut high = TAU;
    let mut ans = None;
    for _ in 0..ITERATIONS {
        let mid = 0.5 * (low + high);
        let crs = course_after(mid);
        if (crs - target).abs() < TOL {
            ans = Some(mid);
            break;
        }
        if target < crs {
            high = mid;
        } else {
            low = mid;
        }
    }
    let ans = ans.unwrap_or(0.5 * (low + high));

    arc_points(center, start, ans, density, turn_right, Some(&frame))
}

/// Turn from the inbound course until facing `dest`, then stop.
///
/// No monotone transform of the outbound-course error exists here, so the
/// arc parameter is scanned in 720 steps and the argmin kept. A best error
/// above one degree means no usable arc: the result is empty and the
/// caller degrades to a straight line.
pub fn turn_towards(
    start: &PathPoint,
    inbd_crs: f64,
    dest: (f64, f64),
    turn_radius: f64,
    density: f64,
    turn_right: bool,
) -> Result<Vec<PathPoint>, Error> {
    use crate::math::spherical::course_between;

    let to_point = to_xyz(start.lat, start.lon);
    if (to_point - to_xyz(dest.0, dest.1)).mag2() < TOLERANCE * TOLERANCE {
        return Ok(Vec::new());
    }

    // Shrink the radius when the destination is very close
    let circ_dist = circle_distance(start.latlon(), dest);
    let turn_radius = if circ_dist < 2. * turn_radius / EARTH_RAD {
        circ_dist * EARTH_RAD / 4.
    } else {
        turn_radius
    };

    let tangent = sphere_tangent(start.latlon(), inbd_crs);
    let mut v3 = to_point.cross(tangent);
    if turn_right {
        v3 = -v3;
    }

    let angle = turn_radius / EARTH_RAD;
    let center = to_latlon(to_point * angle.cos() + v3 * angle.sin());
    let frame = TurningCircle::new(center, start.latlon(), turn_right)?;
    let dist = (to_point - frame.l).mag2().sqrt();

    let course_gap = |a: f64, b: f64| -> f64 {
        (b - a).abs().min((TAU - (b - a)).abs()).min((TAU - (a - b)).abs())
    };

    // Error between the course after turning this much and the course
    // needed to face the destination. None: the arc endpoint *is* dest.
    let error_at = |turn_ang: f64| -> Option<f64> {
        let e = frame.v2 * (turn_ang.cos() * dist) + frame.v3 * (turn_ang.sin() * dist) + frame.l;
        let end = to_latlon(e);
        let tangent = -frame.v2 * turn_ang.sin() + frame.v3 * turn_ang.cos();
        let course = course_from_tangent(end, tangent);
        let req_crs = course_between(end, dest).ok()?;
        Some(course_gap(course, req_crs))
    };

    const SAMPLES: usize = 720;
    let step = TAU / SAMPLES as f64;
    let mut best = f64::INFINITY;
    let mut best_ang = None;
    for i in 0..SAMPLES {
        let turn = i as f64 * step;
        match error_at(turn) {
            None => {
                best = 0.;
                best_ang = Some(turn);
                break;
            }
            Some(err) => {
                if err < best {
                    best = err;
                    best_ang = Some(turn);
                }
            }
        }
    }

    // One degree of tolerance; otherwise give up and fly direct
    let Some(best_ang) = best_ang else { return Ok(Vec::new()) };
    if best > TAU / 360. {
        return Ok(Vec::new());
    }

    arc_points(center, start, best_ang, density, turn_right, Some(&frame))
}

/// Turning arc that terminates on a radial (the great circle through
/// `dest` along `course`).
///
/// The turning circle intersects the radial if and only if the distance
/// from its center to the radial does not exceed its radius, and that
/// margin grows with the radius. So: double the trial radius until the
/// circle reaches, bisect the smallest sufficient radius, then either
/// delegate to [`turn_from`] (tangent case) or solve the crossing
/// analytically via `k sin(θ + c) = -l·n`.
pub fn turn_to_course_towards(
    start: &PathPoint,
    inbd_crs: f64,
    dest: (f64, f64),
    course: f64,
    min_radius: f64,
    density: f64,
    turn_right: bool,
) -> Result<Vec<PathPoint>, Error> {
    let to_point = to_xyz(start.lat, start.lon);
    let tangent = sphere_tangent(start.latlon(), inbd_crs);
    let mut v3 = to_point.cross(tangent);
    if turn_right {
        v3 = -v3;
    }

    let center_at = |radius: f64| -> (f64, f64) {
        to_latlon(to_point * radius.cos() + v3 * radius.sin())
    };
    let reach = |radius: f64| -> f64 {
        radius - point_dist_to_line(center_at(radius), dest, course)
    };

    // Double the trial radius until the circle reaches the radial;
    // 1024 nautical miles should be more than enough
    let mut low = min_radius.min(4.) / EARTH_RAD;
    let step = 1. / EARTH_RAD;
    let mut high = None;
    for i in 0..10u32 {
        let radius = low + step * f64::from(1u32 << i);
        if reach(radius) >= 0. {
            high = Some(radius);
            low = radius / 2.;
            break;
        }
    }
    let Some(mut high) = high else {
        return Err(Error::Degenerate("no turning circle reaches the radial"));
    };

    const ITERATIONS: usize = 60;
    const TOL: f64 = 1e-13;
    for _ in 0..ITERATIONS {
        let radius = 0.5 * (low + high);
        let diff = reach(radius);
        if diff.abs() < TOL {
            break;
        }
        if diff < 0. {
            // No intersection: the radius must grow
            low = radius;
        } else {
            high = radius;
        }
    }
    let ans = 0.5 * (low + high);

    let center_xyz = to_point * ans.cos() + v3 * ans.sin();
    let center = to_latlon(center_xyz);
    let frame = TurningCircle::new(center, start.latlon(), turn_right)?;
    let circ_dist = (to_point - center_xyz).mag2().sqrt();
    let v2d = frame.v2 * circ_dist;
    let v3d = frame.v3 * circ_dist;

    let diff = reach(ans);
    if diff.abs() <= 2. * TOL {
        // The circle is the perfect size: terminate at the radial's course
        return turn_from(start, inbd_crs, course, ans * EARTH_RAD, density, turn_right);
    }

    if diff > 0. {
        // The circle is larger than needed but still crosses the radial.
        // A point f(θ) = v2d cos θ + v3d sin θ + l lies on the radial iff
        // f(θ)·n = 0 for the radial's plane normal n, i.e.
        // (v2d·n) cos θ + (v3d·n) sin θ = -l·n, solved as k sin(θ+c) = -l·n.
        let dest_xyz = to_xyz(dest.0, dest.1);
        let dest_tan = sphere_tangent(dest, course);
        let norm = dest_xyz.cross(dest_tan);

        let v2n = v2d.dot(norm);
        let v3n = v3d.dot(norm);

        let c = v2n.atan2(v3n);
        let k = v2n.hypot(v3n);
        let rhs = (-frame.l.dot(norm) / k).clamp(-1., 1.).asin();

        let ans1 = (rhs - c).rem_euclid(TAU);
        let ans2 = (PI - rhs - c).rem_euclid(TAU);

        return arc_points(center, start, ans1.min(ans2), density, turn_right, Some(&frame));
    }

    // Already across the radial: fly direct
    Ok(Vec::new())
}

// ----- T E S T S ---------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::spherical::{course_between, earth_distance};
    use float_eq::assert_float_eq;

    const DEG: f64 = PI / 180.;
    const DENSITY: f64 = 32.;

    #[test]
    fn frame_is_orthonormal() {
        for &cw in &[false, true] {
            let tc = TurningCircle::new((0., 1. * DEG), (1. * DEG, 1. * DEG), cw).unwrap();
            assert!(tc.v1.dot(tc.v2).abs() < TOLERANCE);
            assert!(tc.v1.dot(tc.v3).abs() < TOLERANCE);
            assert!(tc.v2.dot(tc.v3).abs() < TOLERANCE);
            assert_float_eq!(tc.v2.mag2(), 1., abs <= 1e-12);
            assert_float_eq!(tc.v3.mag2(), 1., abs <= 1e-12);
        }
    }

    #[test]
    fn arc_endpoint_stays_on_the_circle() {
        let center = (0., 1. * DEG);
        let start = PathPoint::new((1. * DEG, 1. * DEG), PI / 2.);
        let tc = TurningCircle::new(center, start.latlon(), true).unwrap();
        let r = (to_xyz(start.lat, start.lon) - tc.l).mag2().sqrt();

        let points = arc_points(center, &start, PI / 2., DENSITY, true, Some(&tc)).unwrap();
        assert!(!points.is_empty());
        let last = points.last().unwrap();
        let r_last = (to_xyz(last.lat, last.lon) - tc.l).mag2().sqrt();
        assert_float_eq!(r_last, r, abs <= 1e-10);
    }

    #[test]
    fn quarter_arc_between_points() {
        // Start due north of the center, end due east, clockwise:
        // a quarter of a one-degree-radius circle
        let center = (0., 1. * DEG);
        let start = PathPoint::new((1. * DEG, 1. * DEG), PI / 2.);
        let end = (0., 2. * DEG);

        let points = arc_between_points(center, &start, end, DENSITY, true).unwrap();
        assert!(points.len() > 100);

        let last = points.last().unwrap();
        assert_float_eq!(last.lat, end.0, abs <= 1e-9);
        assert_float_eq!(last.lon, end.1, abs <= 1e-9);

        // The midpoint is as far from the center as the start
        let mid = points[points.len() / 2];
        assert_float_eq!(
            earth_distance(mid.latlon(), center),
            earth_distance(start.latlon(), center),
            abs <= 0.05
        );
    }

    #[test]
    fn arc_between_rejects_off_circle_endpoints() {
        let center = (0., 1. * DEG);
        let start = PathPoint::new((1. * DEG, 1. * DEG), PI / 2.);
        let end = (0., 3. * DEG);
        assert!(arc_between_points(center, &start, end, DENSITY, true).is_err());
    }

    #[test]
    fn turn_from_reaches_the_outbound_course() {
        let start = PathPoint::new((0., 0.), PI / 2.);
        // Flying east, left turn onto north
        let points = turn_from(&start, PI / 2., 0., 2., DENSITY, false).unwrap();
        assert!(!points.is_empty());
        let last = points.last().unwrap();
        let crs = last.course.rem_euclid(TAU);
        assert!(crs < 1e-3 || TAU - crs < 1e-3, "ended at course {crs}");

        // A quarter turn at 2 nm radius is about π nm of track
        let mut track = earth_distance(start.latlon(), points[0].latlon());
        for w in points.windows(2) {
            track += earth_distance(w[0].latlon(), w[1].latlon());
        }
        assert_float_eq!(track, PI, abs <= 0.05);
    }

    #[test]
    fn turn_towards_faces_the_destination() {
        let start = PathPoint::new((0., 0.), 0.);
        let dest = (0., 0.02 * DEG);
        // Flying north, destination due east: right turn
        let points = turn_towards(&start, 0., dest, 1., DENSITY, true).unwrap();
        assert!(!points.is_empty());
        let last = points.last().unwrap();
        let req = course_between(last.latlon(), dest).unwrap();
        let gap = (last.course - req).abs().min(TAU - (last.course - req).abs());
        assert!(gap < 2. * DEG, "still {gap} rad off the destination");
    }

    #[test]
    fn turn_onto_a_radial() {
        // Flying north on the prime meridian; the radial is the meridian
        // half a degree east, flown southbound. A right turnabout ends on it.
        let start = PathPoint::new((0., 0.), 0.);
        let origin = (0.3 * DEG, 0.5 * DEG);
        let points =
            turn_to_course_towards(&start, 0., origin, PI, 2., DENSITY, true).unwrap();
        assert!(!points.is_empty());

        let last = points.last().unwrap();
        let off = point_dist_to_line(last.latlon(), origin, PI) * EARTH_RAD;
        assert!(off < 0.1, "ended {off} nm off the radial");
        let crs_gap = (last.course - PI).abs();
        assert!(crs_gap < 5. * DEG, "ended at course {}", last.course);
    }
}
