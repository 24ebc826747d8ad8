//! The ribbon extruder: flight path points to corridor meshes.
//!
//! Each consecutive point pair becomes a rectangular section in a parallel
//! transport frame (tangent forward, normal up, binormal right).
//! Neighbouring sections are welded with mitred joints: every joint corner
//! is the meet of three planes, solved as a 3×3 system, with the unmitred
//! corner as the fallback when the sections are parallel.

use crate::math::linear::solve3;
use crate::math::spherical::to_xyz_earth;
use crate::math::vector::Vec3;
use crate::math::{PathPoint, NM_TO_FT};
use crate::navdata::leg::Leg;
use crate::Error;
use std::io::Write;

/// Corridor cross-section dimensions
#[derive(Debug, Clone, Copy)]
pub struct RibbonConfig {
    pub width_ft: f64,
    pub height_ft: f64,
}

impl Default for RibbonConfig {
    fn default() -> RibbonConfig {
        RibbonConfig {
            width_ft: 500.,
            height_ft: 250.,
        }
    }
}

/// A polygon soup of quads; vertex positions are nautical miles in the
/// left-handed earth frame of
/// [`to_xyz_earth`](crate::geom::to_xyz_earth)
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    /// Quads, 0-based indices into `vertices`
    pub polygons: Vec<[usize; 4]>,
}

impl Mesh {
    /// Write the mesh as Wavefront OBJ (1-based indices)
    pub fn write_obj(&self, mut out: impl Write) -> Result<(), Error> {
        for v in &self.vertices {
            writeln!(out, "v {:.5} {:.5} {:.5}", v.x(), v.y(), v.z())?;
        }
        for p in &self.polygons {
            writeln!(out, "f {} {} {} {}", p[0] + 1, p[1] + 1, p[2] + 1, p[3] + 1)?;
        }
        Ok(())
    }
}

// The four corners of one cross-section rectangle
#[derive(Debug, Clone, Copy)]
struct Rect3 {
    top_left: Vec3,
    top_right: Vec3,
    bottom_right: Vec3,
    bottom_left: Vec3,
}

// One extruded segment between two path points, with its frame and the
// signed offsets of its four side planes
#[derive(Debug, Clone, Copy)]
struct Section {
    end: Vec3,
    normal: Vec3,
    binormal: Vec3,
    top: f64,
    left: f64,
    bottom: f64,
    right: f64,
    start_rect: Rect3,
}

/// The corner on the current section's two planes `(a, x)` and `(b, y)`,
/// welded to the previous section's matching side plane: `(c, z)` first,
/// `(d, w)` when that pairing is parallel, `default` when both are.
fn mitred_corner(
    a: Vec3,
    b: Vec3,
    c: Vec3,
    d: Vec3,
    x: f64,
    y: f64,
    z: f64,
    w: f64,
    default: Vec3,
) -> Vec3 {
    match solve3([a, b, c], [x, y, z]) {
        Ok(corner) => corner,
        Err(_) => solve3([a, b, d], [x, y, w]).unwrap_or(default),
    }
}

fn make_section(
    prev: Option<&Section>,
    p1: Vec3,
    p2: Vec3,
    width: f64,
    height: f64,
) -> Result<Section, Error> {
    let tangent = (p2 - p1).normalize()?;
    let normal = (p1 + p2).normalize()?;
    // Gram-Schmidt the up direction against the direction of travel
    let normal = normal - tangent * tangent.dot(normal);
    let binormal = tangent.cross(normal);

    let top_left = p1 - binormal * width + normal * height;
    let top_right = p1 + binormal * width + normal * height;
    let bottom_right = p1 + binormal * width - normal * height;
    let bottom_left = p1 - binormal * width - normal * height;

    let top = top_left.dot(normal);
    let left = top_left.dot(binormal);
    let right = bottom_right.dot(binormal);
    let bottom = bottom_right.dot(normal);

    let start_rect = match prev {
        None => Rect3 {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        },
        Some(prev) => Rect3 {
            top_left: mitred_corner(
                normal,
                binormal,
                prev.normal,
                prev.binormal,
                top,
                left,
                prev.top,
                prev.left,
                top_left,
            ),
            top_right: mitred_corner(
                normal,
                binormal,
                prev.normal,
                prev.binormal,
                top,
                right,
                prev.top,
                prev.right,
                top_right,
            ),
            bottom_right: mitred_corner(
                normal,
                binormal,
                prev.normal,
                prev.binormal,
                bottom,
                right,
                prev.bottom,
                prev.right,
                bottom_right,
            ),
            bottom_left: mitred_corner(
                normal,
                binormal,
                prev.normal,
                prev.binormal,
                bottom,
                left,
                prev.bottom,
                prev.left,
                bottom_left,
            ),
        },
    };

    Ok(Section {
        end: p2,
        normal,
        binormal,
        top,
        left,
        bottom,
        right,
        start_rect,
    })
}

// Points closer than this (squared nm) produce no section
const MIN_SECTION_MAG2: f64 = 1e-6;

/// Extrude each leg's points into a corridor mesh.
///
/// Legs with fewer than two distinct points yield an empty mesh. The
/// previous point carries across leg boundaries, so the corridor stays
/// continuous; mitring happens within a leg.
#[must_use]
pub fn build_ribbon(leg_points: &[(Leg, Vec<PathPoint>)], config: &RibbonConfig) -> Vec<(Leg, Mesh)> {
    let width = config.width_ft / NM_TO_FT;
    let height = config.height_ft / NM_TO_FT;

    let mut meshes = Vec::with_capacity(leg_points.len());
    let mut prev: Option<PathPoint> = None;

    for (leg, points) in leg_points {
        let mut sections: Vec<Section> = Vec::new();

        for p in points {
            let Some(prev_point) = prev else {
                prev = Some(*p);
                continue;
            };

            let p1 = to_xyz_earth(prev_point.lat, prev_point.lon, prev_point.altitude);
            let p2 = to_xyz_earth(p.lat, p.lon, p.altitude);
            if (p1 - p2).mag2() < MIN_SECTION_MAG2 {
                prev = Some(*p);
                continue;
            }

            let Ok(section) = make_section(sections.last(), p1, p2, width, height) else {
                prev = Some(*p);
                continue;
            };
            sections.push(section);
            prev = Some(*p);
        }

        meshes.push((leg.clone(), assemble(&sections, width, height)));
    }

    meshes
}

fn assemble(sections: &[Section], width: f64, height: f64) -> Mesh {
    let Some(last) = sections.last() else {
        return Mesh::default();
    };

    let mut mesh = Mesh {
        vertices: Vec::with_capacity(4 * (sections.len() + 1)),
        polygons: Vec::with_capacity(4 * sections.len() + 2),
    };

    for (i, s) in sections.iter().enumerate() {
        let r = s.start_rect;
        mesh.vertices
            .extend([r.top_left, r.bottom_left, r.bottom_right, r.top_right]);

        let (tl, bl, br, tr) = (4 * i, 4 * i + 1, 4 * i + 2, 4 * i + 3);
        let (tln, bln, brn, trn) = (tl + 4, bl + 4, br + 4, tr + 4);

        if i == 0 {
            // Front cap
            mesh.polygons.push([tl, bl, br, tr]);
        }
        mesh.polygons.push([tln, tl, tr, trn]); // top
        mesh.polygons.push([tln, bln, bl, tl]); // left
        mesh.polygons.push([bln, brn, br, bl]); // bottom
        mesh.polygons.push([tr, br, brn, trn]); // right
    }

    // Closing rectangle at the last section's endpoint
    let end_rect = Rect3 {
        top_left: last.end - last.binormal * width + last.normal * height,
        top_right: last.end + last.binormal * width + last.normal * height,
        bottom_right: last.end + last.binormal * width - last.normal * height,
        bottom_left: last.end - last.binormal * width - last.normal * height,
    };
    mesh.vertices.extend([
        end_rect.top_left,
        end_rect.bottom_left,
        end_rect.bottom_right,
        end_rect.top_right,
    ]);

    let n = sections.len();
    let (tl, bl, br, tr) = (4 * n, 4 * n + 1, 4 * n + 2, 4 * n + 3);
    mesh.polygons.push([tl, tr, br, bl]);

    mesh
}

// ----- T E S T S ---------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::leg::{Leg, LegInfo, ProcKind, TurnDir};
    use crate::test_data::waypoint;
    use float_eq::assert_float_eq;
    use std::f64::consts::PI;

    fn leg() -> Leg {
        Leg::TrackToFix {
            info: LegInfo {
                seq: 10,
                kind: ProcKind::Sid,
                qualifier: String::new(),
                proc: String::new(),
                trans: String::new(),
                turn_dir: TurnDir::Unspecified,
                overfly: false,
                first_missed: false,
                missed_approach_point: false,
                initial_approach_fix: false,
                final_approach_fix: false,
                alt: None,
                speed: None,
                glide_angle: None,
            },
            fix: waypoint("FIX", 0., 0.),
        }
    }

    fn pt(lat: f64, lon: f64, alt: f64) -> PathPoint {
        PathPoint::with_altitude((lat, lon), PI / 2., alt)
    }

    #[test]
    fn straight_run() {
        const DEG: f64 = PI / 180.;
        let points = vec![
            pt(0., 0., 1000.),
            pt(0., 0.2 * DEG, 1000.),
            pt(0., 0.4 * DEG, 1000.),
        ];
        let meshes = build_ribbon(&[(leg(), points)], &RibbonConfig::default());
        assert_eq!(meshes.len(), 1);

        let mesh = &meshes[0].1;
        // Two sections: 3 rect sets of 4 vertices
        assert_eq!(mesh.vertices.len(), 12);
        // Front cap + 2×4 side quads + end cap
        assert_eq!(mesh.polygons.len(), 10);

        // The first rectangle is centered on the first point
        let p0 = to_xyz_earth(0., 0., 1000.);
        let center = (mesh.vertices[0] + mesh.vertices[2]) * 0.5;
        assert_float_eq!((center - p0).mag2().sqrt(), 0., abs <= 1e-9);

        // Corridor width and height match the configuration
        let w = (mesh.vertices[3] - mesh.vertices[0]).mag2().sqrt();
        assert_float_eq!(w, 2. * 500. / NM_TO_FT, abs <= 1e-9);
        let h = (mesh.vertices[0] - mesh.vertices[1]).mag2().sqrt();
        assert_float_eq!(h, 2. * 250. / NM_TO_FT, abs <= 1e-9);
    }

    #[test]
    fn mitred_joint_lies_on_both_sections() {
        const DEG: f64 = PI / 180.;
        // A bend: east, then turning north
        let points = vec![
            pt(0., 0., 1000.),
            pt(0., 0.2 * DEG, 1000.),
            pt(0.2 * DEG, 0.4 * DEG, 1000.),
        ];
        let meshes = build_ribbon(&[(leg(), points.clone())], &RibbonConfig::default());
        let mesh = &meshes[0].1;
        assert_eq!(mesh.vertices.len(), 12);

        // Rebuild the two section frames the extruder used
        let frame = |a: PathPoint, b: PathPoint| {
            let p1 = to_xyz_earth(a.lat, a.lon, a.altitude);
            let p2 = to_xyz_earth(b.lat, b.lon, b.altitude);
            let tangent = (p2 - p1).normalize().unwrap();
            let normal = (p1 + p2).normalize().unwrap();
            let normal = normal - tangent * tangent.dot(normal);
            (p1, normal, tangent.cross(normal))
        };
        let w = 500. / NM_TO_FT;
        let h = 250. / NM_TO_FT;
        let (p0, n1, b1) = frame(points[0], points[1]);
        let (p1, n2, b2) = frame(points[1], points[2]);

        // The second section's start top-left corner sits on its own top
        // and left planes, and on a matching side plane of section one:
        // the joint is welded, not butted
        let joint_tl = mesh.vertices[4];
        let top2 = (p1 - b2 * w + n2 * h).dot(n2);
        let left2 = (p1 - b2 * w + n2 * h).dot(b2);
        assert_float_eq!(joint_tl.dot(n2), top2, abs <= 1e-9);
        assert_float_eq!(joint_tl.dot(b2), left2, abs <= 1e-9);

        let top1 = (p0 - b1 * w + n1 * h).dot(n1);
        let left1 = (p0 - b1 * w + n1 * h).dot(b1);
        let weld = (joint_tl.dot(n1) - top1)
            .abs()
            .min((joint_tl.dot(b1) - left1).abs());
        assert!(weld < 1e-9, "joint corner {weld} off the previous section");
    }

    #[test]
    fn empty_and_single_point_legs() {
        let meshes = build_ribbon(
            &[(leg(), vec![]), (leg(), vec![pt(0., 0., 0.)])],
            &RibbonConfig::default(),
        );
        assert_eq!(meshes.len(), 2);
        assert!(meshes[0].1.vertices.is_empty());
        assert!(meshes[1].1.vertices.is_empty());
    }

    #[test]
    fn obj_export() {
        const DEG: f64 = PI / 180.;
        let points = vec![pt(0., 0., 1000.), pt(0., 0.2 * DEG, 1000.)];
        let meshes = build_ribbon(&[(leg(), points)], &RibbonConfig::default());

        let mut out = Vec::new();
        meshes[0].1.write_obj(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 8);
        // Indices are 1-based
        assert!(text.lines().any(|l| l.starts_with("f 1 ")));
        assert!(!text.contains(" 0 "));
    }
}
