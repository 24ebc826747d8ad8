use crate::math::vector::Vec3;
use crate::math::TOLERANCE;
use crate::Error;

/// Solve the 3×3 system `M x = rhs`, the rows of `M` given as vectors.
///
/// Cramer's rule on an explicit determinant expansion: three unknowns is
/// as big as this crate ever gets, so no elimination machinery is needed.
pub fn solve3(m: [Vec3; 3], rhs: [f64; 3]) -> Result<Vec3, Error> {
    let det = m[0].dot(m[1].cross(m[2]));
    if det.abs() < TOLERANCE {
        return Err(Error::Singular);
    }

    // Reciprocal basis of the rows
    let x = m[1].cross(m[2]) * rhs[0] + m[2].cross(m[0]) * rhs[1] + m[0].cross(m[1]) * rhs[2];
    Ok(x * (1. / det))
}

// ----- T E S T S ---------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn identity() {
        let m = [
            Vec3::new(1., 0., 0.),
            Vec3::new(0., 1., 0.),
            Vec3::new(0., 0., 1.),
        ];
        let x = solve3(m, [4., 5., 6.]).unwrap();
        assert_eq!(x, Vec3::new(4., 5., 6.));
    }

    #[test]
    fn general_system() {
        let m = [
            Vec3::new(2., 1., -1.),
            Vec3::new(-3., -1., 2.),
            Vec3::new(-2., 1., 2.),
        ];
        let x = solve3(m, [8., -11., -3.]).unwrap();
        assert_float_eq!(x.x(), 2., abs <= 1e-12);
        assert_float_eq!(x.y(), 3., abs <= 1e-12);
        assert_float_eq!(x.z(), -1., abs <= 1e-12);
    }

    #[test]
    fn singular_system() {
        let m = [
            Vec3::new(1., 2., 3.),
            Vec3::new(2., 4., 6.),
            Vec3::new(0., 1., 0.),
        ];
        assert!(solve3(m, [1., 2., 0.]).is_err());
    }
}
