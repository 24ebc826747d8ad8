use crate::math::TOLERANCE;
use crate::Error;
use std::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

/// Cartesian 3-vector, with no fixed interpretation of the frame
#[derive(Debug, Default, PartialEq, Copy, Clone)]
pub struct Vec3(pub [f64; 3]);

// ----- O P E R A T O R   T R A I T S -------------------------------------------------

impl Index<usize> for Vec3 {
    type Output = f64;
    fn index(&self, i: usize) -> &Self::Output {
        &self.0[i]
    }
}

impl IndexMut<usize> for Vec3 {
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        &mut self.0[i]
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Vec3([
            self.0[0] + other.0[0],
            self.0[1] + other.0[1],
            self.0[2] + other.0[2],
        ])
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Vec3([
            self.0[0] - other.0[0],
            self.0[1] - other.0[1],
            self.0[2] - other.0[2],
        ])
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, factor: f64) -> Self {
        Vec3([self.0[0] * factor, self.0[1] * factor, self.0[2] * factor])
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Vec3([-self.0[0], -self.0[1], -self.0[2]])
    }
}

// ----- C O N S T R U C T O R S   A N D   M E T H O D S -------------------------------

impl Vec3 {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Vec3 {
        Vec3([x, y, z])
    }

    /// A `Vec3` consisting of 3 `0`s
    #[must_use]
    pub fn origin() -> Vec3 {
        Vec3([0., 0., 0.])
    }

    #[must_use]
    pub fn x(&self) -> f64 {
        self.0[0]
    }

    #[must_use]
    pub fn y(&self) -> f64 {
        self.0[1]
    }

    #[must_use]
    pub fn z(&self) -> f64 {
        self.0[2]
    }

    /// Scalar product
    #[must_use]
    pub fn dot(&self, other: Vec3) -> f64 {
        self.0[0] * other.0[0] + self.0[1] * other.0[1] + self.0[2] * other.0[2]
    }

    /// Vector product
    #[must_use]
    pub fn cross(&self, other: Vec3) -> Vec3 {
        Vec3([
            self.0[1] * other.0[2] - self.0[2] * other.0[1],
            self.0[2] * other.0[0] - self.0[0] * other.0[2],
            self.0[0] * other.0[1] - self.0[1] * other.0[0],
        ])
    }

    /// Squared magnitude
    #[must_use]
    pub fn mag2(&self) -> f64 {
        self.dot(*self)
    }

    /// Scale to unit length. Directions shorter than [`TOLERANCE`]
    /// (sub-nautical-mile on the unit sphere) carry no usable information
    /// and are refused.
    pub fn normalize(&self) -> Result<Vec3, Error> {
        let m2 = self.mag2();
        if m2 < TOLERANCE * TOLERANCE {
            return Err(Error::Degenerate("direction below tolerance"));
        }
        Ok(*self * (1. / m2.sqrt()))
    }
}

// ----- T E S T S ---------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn arithmetic() {
        let a = Vec3([1., 2., 3.]);
        let b = Vec3([4., 3., 2.]);

        assert_eq!(a + b, Vec3([5., 5., 5.]));
        assert_eq!(a - b, Vec3([-3., -1., 1.]));
        assert_eq!(a * 2., Vec3([2., 4., 6.]));
        assert_eq!(-a, Vec3([-1., -2., -3.]));
        assert_eq!(a.dot(b), 16.);
        assert_eq!(a[2], 3.);
    }

    #[test]
    fn cross_follows_the_right_hand_rule() {
        let x = Vec3::new(1., 0., 0.);
        let y = Vec3::new(0., 1., 0.);
        assert_eq!(x.cross(y), Vec3::new(0., 0., 1.));
        assert_eq!(y.cross(x), Vec3::new(0., 0., -1.));
    }

    #[test]
    fn normalize() {
        let v = Vec3::new(3., 0., 4.).normalize().unwrap();
        assert_float_eq!(v.mag2(), 1., abs <= 1e-15);
        assert_float_eq!(v.x(), 0.6, abs <= 1e-15);

        // A sub-tolerance direction is refused
        assert!(Vec3::new(1e-6, 0., 0.).normalize().is_err());
        assert!(Vec3::origin().normalize().is_err());
    }
}
