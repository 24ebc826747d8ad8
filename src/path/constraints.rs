use crate::navdata::leg::Leg;
use crate::navdata::types::AltitudeRestriction;
use log::warn;

/// Per-leg altitude envelopes `(above, below)` in feet, built from the
/// scattered restrictions of a leg list.
///
/// Lower bounds propagate along the direction of flight (forward for a
/// departure, backward for an arrival), upper bounds the other way; each
/// leg inherits the most recent bound seen. Unbounded sides stay at ±∞.
///
/// Some procedures are authored with an ascending leg inside a descent,
/// leaving `above > below`. The lower bound wins there; this is a data
/// defect, so it is logged rather than silently accepted.
#[must_use]
pub fn altitude_envelopes(legs: &[Leg], ascending: bool) -> Vec<(f64, f64)> {
    use AltitudeRestriction::*;

    let n = legs.len();
    let mut aboves = vec![f64::NEG_INFINITY; n];
    let mut belows = vec![f64::INFINITY; n];

    let order: Vec<usize> = if ascending {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };

    let mut cur_min = f64::NEG_INFINITY;
    for &i in &order {
        match legs[i].info().alt {
            Some(At(alt)) | Some(StepDownAt { alt, .. }) => cur_min = f64::from(alt),
            Some(AtOrAbove(alt)) | Some(Between { above: alt, .. }) => cur_min = f64::from(alt),
            Some(GlideslopeAt { alt, .. }) | Some(GlideslopeIntercept { alt, .. }) => {
                cur_min = f64::from(alt)
            }
            Some(StepDownAbove { alt, .. }) => cur_min = f64::from(alt),
            Some(AtOrBelow(_)) | Some(StepDownBelow { .. }) | None => (),
        }
        aboves[i] = cur_min;
    }

    let mut cur_max = f64::INFINITY;
    for &i in order.iter().rev() {
        match legs[i].info().alt {
            Some(At(alt)) | Some(StepDownAt { alt, .. }) => cur_max = f64::from(alt),
            Some(AtOrBelow(alt)) | Some(Between { below: alt, .. }) => cur_max = f64::from(alt),
            Some(StepDownBelow { alt, .. }) => cur_max = f64::from(alt),
            Some(AtOrAbove(_))
            | Some(GlideslopeAt { .. })
            | Some(GlideslopeIntercept { .. })
            | Some(StepDownAbove { .. })
            | None => (),
        }
        belows[i] = cur_max;
    }

    aboves
        .into_iter()
        .zip(belows)
        .enumerate()
        .map(|(i, (above, below))| {
            if above > below {
                warn!(
                    "leg {}: altitude envelope inverted ({above} > {below}); the lower bound wins",
                    legs[i].info().seq
                );
                (above, above.max(below))
            } else {
                (above, below)
            }
        })
        .collect()
}

// ----- T E S T S ---------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::leg::{LegInfo, ProcKind, TurnDir};
    use crate::test_data::waypoint;

    fn leg(alt: Option<AltitudeRestriction>) -> Leg {
        Leg::TrackToFix {
            info: LegInfo {
                seq: 10,
                kind: ProcKind::Star,
                qualifier: String::new(),
                proc: String::new(),
                trans: String::new(),
                turn_dir: TurnDir::Unspecified,
                overfly: false,
                first_missed: false,
                missed_approach_point: false,
                initial_approach_fix: false,
                final_approach_fix: false,
                alt,
                speed: None,
                glide_angle: None,
            },
            fix: waypoint("FIX", 0., 0.),
        }
    }

    #[test]
    fn ascending_envelope() {
        use AltitudeRestriction::*;
        let legs = vec![
            leg(None),
            leg(Some(AtOrAbove(3000))),
            leg(None),
            leg(Some(At(6000))),
            leg(None),
        ];
        let env = altitude_envelopes(&legs, true);

        // Lower bounds carry forward
        assert_eq!(env[0].0, f64::NEG_INFINITY);
        assert_eq!(env[1].0, 3000.);
        assert_eq!(env[2].0, 3000.);
        assert_eq!(env[3].0, 6000.);
        assert_eq!(env[4].0, 6000.);

        // Upper bounds carry backward: the At(6000) caps everything before it
        assert_eq!(env[0].1, 6000.);
        assert_eq!(env[3].1, 6000.);
        assert_eq!(env[4].1, f64::INFINITY);
    }

    #[test]
    fn descending_envelope() {
        use AltitudeRestriction::*;
        let legs = vec![
            leg(Some(AtOrBelow(12000))),
            leg(None),
            leg(Some(AtOrAbove(4000))),
            leg(None),
        ];
        let env = altitude_envelopes(&legs, false);

        // Flying the list forward while descending: lower bounds propagate
        // backward through the walk, so earlier legs inherit the 4000
        assert_eq!(env[0].0, 4000.);
        assert_eq!(env[1].0, 4000.);
        assert_eq!(env[2].0, 4000.);
        assert_eq!(env[3].0, f64::NEG_INFINITY);

        assert_eq!(env[0].1, 12000.);
        assert_eq!(env[1].1, 12000.);
        assert_eq!(env[3].1, 12000.);
    }

    #[test]
    fn inverted_envelope_clamps_to_the_lower_bound() {
        use AltitudeRestriction::*;
        let legs = vec![leg(Some(AtOrAbove(5000))), leg(Some(AtOrBelow(3000)))];
        let env = altitude_envelopes(&legs, true);
        // The floor of 5000 carries into a leg capped at 3000
        assert_eq!(env[0], (5000., 5000.));
        assert_eq!(env[1], (5000., 5000.));
    }
}
