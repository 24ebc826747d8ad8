//! Magnetic declination adapter.
//!
//! Coded procedures mostly reference magnetic north; the geometry kernel
//! works in true courses only. The conversion needs a magnetic model, which
//! is an external capability: this crate never sees the coefficient file
//! format, only a [`MagneticModel`] implementation installed once at
//! process start. Without one, declination is taken as zero.

use crate::navdata::types::Course;
use crate::Error;
use log::warn;
use once_cell::sync::OnceCell;

/// An external magnetic model, e.g. a WMM evaluation
pub trait MagneticModel: Send + Sync {
    /// Declination in degrees east of true north
    fn declination(&self, lat_deg: f64, lon_deg: f64, alt_ft: f64, year: f64) -> f64;
}

static MODEL: OnceCell<(Box<dyn MagneticModel>, f64)> = OnceCell::new();

/// Install the process-wide magnetic model and its evaluation epoch
/// (a decimal year). May be called once; the model is read-only afterwards.
pub fn install_magnetic_model(model: Box<dyn MagneticModel>, epoch: f64) -> Result<(), Error> {
    MODEL
        .set((model, epoch))
        .map_err(|_| Error::Invalid("magnetic model already installed".to_string()))
}

/// The true course, in radians, of `course` at a position (radians)
/// and altitude (feet)
#[must_use]
pub fn true_course(latlon: (f64, f64), course: &Course, alt_ft: f64) -> f64 {
    if course.is_true {
        return course.as_rad();
    }
    let Some((model, epoch)) = MODEL.get() else {
        return course.as_rad();
    };
    let decl = model.declination(
        latlon.0.to_degrees(),
        latlon.1.to_degrees(),
        alt_ft,
        *epoch,
    );
    if !decl.is_finite() {
        warn!("magnetic model returned {decl} at {latlon:?}; ignoring");
        return course.as_rad();
    }
    course.as_rad() + decl.to_radians()
}

// ----- T E S T S ---------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use std::f64::consts::PI;

    // The process-wide model is deliberately left uninstalled here: tests
    // share one process, and an installed model would leak into every
    // other test's courses.

    #[test]
    fn true_course_passes_through() {
        let crs = Course::true_north(90.);
        assert_float_eq!(true_course((0., 0.), &crs, 0.), PI / 2., abs <= 1e-12);
    }

    #[test]
    fn magnetic_without_model_is_true() {
        let crs = Course::magnetic(180.);
        assert_float_eq!(true_course((0.5, 0.5), &crs, 0.), PI, abs <= 1e-12);
    }
}
