use crate::math::vector::Vec3;
use crate::math::{EARTH_RAD, NM_TO_FT, TOLERANCE};
use crate::Error;
use std::f64::consts::{PI, TAU};

/// Unit vector for a `(lat, lon)` position, both in radians
#[must_use]
pub fn to_xyz(lat: f64, lon: f64) -> Vec3 {
    Vec3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// `(lat, lon)` in radians for a unit vector
#[must_use]
pub fn to_latlon(v: Vec3) -> (f64, f64) {
    (v.z().clamp(-1., 1.).asin(), v.y().atan2(v.x()))
}

/// Earth-frame position at altitude, in nautical miles.
///
/// The axis order and sign differ from [`to_xyz`]: the frame is left-handed
/// (y up, z towards the viewer) so a renderer can consume it directly.
#[must_use]
pub fn to_xyz_earth(lat: f64, lon: f64, altitude_ft: f64) -> Vec3 {
    let radius = EARTH_RAD + altitude_ft / NM_TO_FT;
    Vec3::new(
        radius * lat.cos() * lon.cos(),
        radius * lat.sin(),
        -radius * lat.cos() * lon.sin(),
    )
}

/// Unit tangent at `latlon` heading along the true course
#[must_use]
pub fn sphere_tangent(latlon: (f64, f64), course: f64) -> Vec3 {
    let outward = to_xyz(latlon.0, latlon.1);
    let north = Vec3::new(0., 0., 1.);
    let eq_pt = to_xyz(0., latlon.1);
    let to_north = north * latlon.0.cos() - eq_pt * latlon.0.sin();
    let east = to_north.cross(outward);
    to_north * course.cos() + east * course.sin()
}

/// True course in `[0, 2π)` for a unit tangent at `latlon`
#[must_use]
pub fn course_from_tangent(latlon: (f64, f64), tangent: Vec3) -> f64 {
    let outward = to_xyz(latlon.0, latlon.1);
    let north = Vec3::new(0., 0., 1.);
    let eq_pt = to_xyz(0., latlon.1);
    let to_north = north * latlon.0.cos() - eq_pt * latlon.0.sin();

    let mut crs = to_north.dot(tangent).clamp(-1., 1.).acos();
    // The cross product tells apart clockwise from counterclockwise of north
    if to_north.cross(tangent).dot(outward) > 0. {
        crs = TAU - crs;
    }
    crs
}

/// The course to fly from `a` to reach `b` along the great circle.
/// Fails when the two points are too close to define a direction.
pub fn course_between(a: (f64, f64), b: (f64, f64)) -> Result<f64, Error> {
    let a_xyz = to_xyz(a.0, a.1);
    let b_xyz = to_xyz(b.0, b.1);
    // The difference can be tiny; rescale before projecting it onto the
    // tangent plane at a
    let diff = (b_xyz - a_xyz) * EARTH_RAD;
    let diff = diff - a_xyz * a_xyz.dot(diff);
    if diff.mag2() <= TOLERANCE {
        return Err(Error::Degenerate("points too close for a course"));
    }
    Ok(course_from_tangent(a, diff.normalize()?))
}

/// Shortest great circle distance (radians) from `point` to the great
/// circle through `start` along `course`
#[must_use]
pub fn point_dist_to_line(point: (f64, f64), start: (f64, f64), course: f64) -> f64 {
    let tangent = sphere_tangent(start, course);
    let plane_normal = to_xyz(start.0, start.1).cross(tangent);
    to_xyz(point.0, point.1)
        .dot(plane_normal)
        .clamp(-1., 1.)
        .asin()
        .abs()
}

/// Foot of the perpendicular from `point` onto the great circle through
/// `start` along `course`
pub fn point_bisect_line(
    point: (f64, f64),
    start: (f64, f64),
    course: f64,
) -> Result<(f64, f64), Error> {
    let tangent = sphere_tangent(start, course);
    let plane_normal = to_xyz(start.0, start.1).cross(tangent);
    let point_xyz = to_xyz(point.0, point.1);
    let foot = (point_xyz - plane_normal * point_xyz.dot(plane_normal)).normalize()?;
    Ok(to_latlon(foot))
}

/// Central angle between two positions, radians
#[must_use]
pub fn circle_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let arg = to_xyz(a.0, a.1).dot(to_xyz(b.0, b.1));
    arg.clamp(-1., 1.).acos().abs()
}

/// Great circle distance between two positions, nautical miles
#[must_use]
pub fn earth_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    EARTH_RAD * circle_distance(a, b)
}

/// Oriented difference from `course` to `target_course` in `[0, 2π)`,
/// measured in the given turn direction
#[must_use]
pub fn angle_between(course: f64, target_course: f64, turn_right: bool) -> f64 {
    let diff = course - target_course;
    if turn_right {
        (-diff).rem_euclid(TAU)
    } else {
        diff.rem_euclid(TAU)
    }
}

/// First point reached when flying from `a` along `a_crs` that also lies on
/// the great circle through `b` along `b_crs`.
///
/// The two circle planes meet in two antipodal points; the one reached
/// first from `a` wins. Near-parallel circles degenerate to `a` itself.
#[must_use]
pub fn intersection(a: (f64, f64), a_crs: f64, b: (f64, f64), b_crs: f64) -> (f64, f64) {
    let a_xyz = to_xyz(a.0, a.1);
    let b_xyz = to_xyz(b.0, b.1);
    let a_tan = sphere_tangent(a, a_crs);
    let b_tan = sphere_tangent(b, b_crs);

    let a_norm = a_xyz.cross(a_tan);
    let b_norm = b_xyz.cross(b_tan);

    // Rescale: the cross product of near-parallel planes is tiny
    let res = a_norm.cross(b_norm) * EARTH_RAD;
    let Ok(res) = res.normalize() else { return a };

    // point = cos(dist) * a_xyz + sin(dist) * a_tan
    let dist1 = res.dot(a_tan).atan2(res.dot(a_xyz)).rem_euclid(TAU);
    let dist2 = (-res.dot(a_tan)).atan2(-res.dot(a_xyz)).rem_euclid(TAU);

    let ans = if dist1 < dist2 { res } else { -res };
    to_latlon(ans)
}

/// Position after flying `dist` nautical miles from `start` along `course`
#[must_use]
pub fn go_dist_from(start: (f64, f64), course: f64, dist: f64) -> (f64, f64) {
    let dist = dist / EARTH_RAD;
    let start_xyz = to_xyz(start.0, start.1);
    let tangent = sphere_tangent(start, course);
    to_latlon(start_xyz * dist.cos() + tangent * dist.sin())
}

/// First position along `course` from `start` at the given DME distance
/// from `station`.
///
/// DME is a slant range; the ground distance is recovered from the current
/// altitude before solving. On the ray `f(a) = v1 cos a + v2 sin a` the
/// condition `f(a)·w = cos d` collapses to `k sin(a + c) = cos d`, which
/// has no solution when the ring is out of reach.
pub fn go_to_dme(
    start: (f64, f64),
    course: f64,
    station: (f64, f64),
    dme: f64,
    alt: f64,
) -> Result<(f64, f64), Error> {
    let dme_ft = dme * NM_TO_FT;
    if alt > dme_ft {
        return Err(Error::Invalid(format!(
            "altitude {alt} ft exceeds the {dme} nm slant range"
        )));
    }

    let w = to_xyz(station.0, station.1);
    let d = (dme_ft * dme_ft - alt * alt).sqrt() / NM_TO_FT / EARTH_RAD;

    let v1 = to_xyz(start.0, start.1);
    let v2 = sphere_tangent(start, course);

    let v1r = v1.dot(w);
    let v2r = v2.dot(w);
    let k = v1r.hypot(v2r);
    let c = v1r.atan2(v2r);

    if d.cos().abs() > k {
        return Err(Error::Degenerate("DME ring out of reach"));
    }
    let rhs = (d.cos() / k).asin();
    let a1 = (rhs - c).rem_euclid(TAU);
    let a2 = (PI - rhs - c).rem_euclid(TAU);

    let ans = a1.min(a2);
    Ok(to_latlon(v1 * ans.cos() + v2 * ans.sin()))
}

// ----- T E S T S ---------------------------------------------------
