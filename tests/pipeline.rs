//! End-to-end: a synthetic navigation data directory is parsed into a
//! database, procedures are built into flight paths, and the paths are
//! extruded into corridor meshes.

use anyhow::Result;
use flightpath::prelude::*;
use std::fs;
use std::path::PathBuf;

/// 31 comma separated fields with the handful of columns a record needs
fn record(assignments: &[(usize, &str)]) -> String {
    let mut cols = vec![String::new(); 31];
    for (idx, value) in assignments {
        cols[*idx] = (*value).to_string();
    }
    cols.join(",")
}

fn write_data_dir(label: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!(
        "flightpath-{label}-{}",
        std::process::id()
    ));
    fs::create_dir_all(dir.join("CIFP"))?;

    fs::write(
        dir.join("earth_fix.dat"),
        "\
I
1100 Version - data cycle 2403
earth_fix.dat

 50.500000  008.000000 MARUN ENRT ED
 50.200000  008.400000 KULUM ENRT ED
 51.000000  009.000000 BOMBA ENRT ED
99
",
    )?;

    fs::write(
        dir.join("earth_nav.dat"),
        "\
I
1100 Version - data cycle 2403
earth_nav.dat

3  50.050000   008.050000 350 11630 130 -2.0 XTV XTST ED TEST VOR
99
",
    )?;

    fs::write(
        dir.join("earth_aptmeta.dat"),
        "\
I
1100 Version - data cycle 2403
earth_aptmeta.dat

XTST ED 50.000 8.000 300 1 0 0 5000 FL70
XBAD ED 52.000 9.000 100 1 0 0 5000 FL70
99
",
    )?;

    // One SID (runway body plus an enroute transition), one STAR, and one
    // approach with a missed segment
    let mut cifp = String::new();
    cifp += "RWY:RW25,,,00262,25012,XTV ;N50000000,E008100000,;\n";

    // SID MARU1, runway 25: climb runway heading to 1300, then to MARUN
    cifp += &format!(
        "SID:{};\n",
        record(&[
            (0, "010"),
            (1, "2"),
            (2, "MARU1"),
            (3, "RW25"),
            (8, "V   "),
            (11, "VA"),
            (20, "0900"),
            (22, "+"),
            (23, "1300"),
        ])
    );
    cifp += &format!(
        "SID:{};\n",
        record(&[
            (0, "020"),
            (1, "2"),
            (2, "MARU1"),
            (3, "RW25"),
            (4, "MARUN"),
            (5, "ED"),
            (8, "E   "),
            (11, "TF"),
        ])
    );
    cifp += &format!(
        "SID:{};\n",
        record(&[
            (0, "010"),
            (1, "3"),
            (2, "MARU1"),
            (3, "BOMBA"),
            (4, "BOMBA"),
            (5, "ED"),
            (8, "E   "),
            (11, "TF"),
        ])
    );

    // STAR KULU1, runway 25
    cifp += &format!(
        "STAR:{};\n",
        record(&[
            (0, "010"),
            (1, "5"),
            (2, "KULU1"),
            (3, "RW25"),
            (4, "KULUM"),
            (5, "ED"),
            (8, "E   "),
            (11, "TF"),
            (22, "-"),
            (23, "8000"),
        ])
    );
    cifp += &format!(
        "STAR:{};\n",
        record(&[
            (0, "020"),
            (1, "5"),
            (2, "KULU1"),
            (3, "RW25"),
            (4, "MARUN"),
            (5, "ED"),
            (8, "E   "),
            (11, "TF"),
        ])
    );

    // Approach R25: transition from KULUM, final to the threshold, then a
    // climbing missed approach
    cifp += &format!(
        "APPCH:{};\n",
        record(&[
            (0, "010"),
            (1, "A"),
            (2, "R25"),
            (3, "KULUM"),
            (4, "KULUM"),
            (5, "ED"),
            (8, "E   "),
            (11, "IF"),
        ])
    );
    cifp += &format!(
        "APPCH:{};\n",
        record(&[
            (0, "010"),
            (1, "R"),
            (2, "R25"),
            (4, "RW25"),
            (8, "G   "),
            (11, "CF"),
            (20, "2500"),
            (23, "1000"),
        ])
    );
    cifp += &format!(
        "APPCH:{};\n",
        record(&[
            (0, "020"),
            (1, "R"),
            (2, "R25"),
            (8, "EYM "),
            (11, "CA"),
            (20, "2500"),
            (22, "+"),
            (23, "5000"),
        ])
    );
    fs::write(dir.join("CIFP").join("XTST.dat"), cifp)?;

    fs::write(dir.join("CIFP").join("XBAD.dat"), "SID:junk;\n")?;

    Ok(dir)
}

#[test]
fn database_to_ribbon() -> Result<()> {
    let dir = write_data_dir("ribbon")?;
    let db = NavDatabase::open(&dir)?;

    let airport = db.airport("XTST")?;
    assert_eq!(airport.info.runways, vec!["RW25".to_string()]);
    assert!(airport.sids.contains_key("MARU1"));
    assert!(airport.stars.contains_key("KULU1"));
    assert!(airport.approaches.contains_key("R25"));

    // ----- SID --------------------------------------------------------
    let sid = &airport.sids["MARU1"];
    assert_eq!(sid.transitions["BOMBA"].len(), 1);

    let config = AircraftConfig::default();
    let built = build_sid(&airport, sid, &config, "25", Some("BOMBA"))?;

    // Departs the threshold at field elevation
    let first = built.points.first().unwrap();
    assert!((first.lat.to_degrees() - 50.0).abs() < 1e-9);
    assert!((first.lon.to_degrees() - 8.1).abs() < 1e-9);
    assert_eq!(first.altitude, 300.);

    // The climb leg tops out exactly at its coded altitude
    let (va_leg, va_points) = &built.legs[0];
    assert_eq!(va_leg.mnemonic(), "VA");
    assert!((va_points.last().unwrap().altitude - 1300.).abs() < 1e-6);

    // Ends at the transition fix, having climbed monotonically
    let last = built.points.last().unwrap();
    assert!((last.lat.to_degrees() - 51.0).abs() < 1e-9);
    assert!((last.lon.to_degrees() - 9.0).abs() < 1e-9);
    for w in built.points.windows(2) {
        assert!(w[1].altitude >= w[0].altitude - 1e-9);
    }

    // Identical inputs, identical output
    let again = build_sid(&airport, sid, &config, "25", Some("BOMBA"))?;
    assert_eq!(built.points, again.points);

    // ----- STAR -------------------------------------------------------
    let star = &airport.stars["KULU1"];
    let arrival = build_star(star, &config, "25", None, 10_000.)?;
    assert!(!arrival.points.is_empty());
    for w in arrival.points.windows(2) {
        assert!(w[1].altitude <= w[0].altitude + 1e-9);
    }

    // ----- Approach ---------------------------------------------------
    let appch = &airport.approaches["R25"];
    assert_eq!(appch.runway.as_deref(), Some("25"));

    let path = build_approach(appch, &config, "25", Some("KULUM"), DEFAULT_APPROACH_ALT)?;
    assert!(!path.points.is_empty());

    // The missed approach climbs away from where the final ended
    let (missed_leg, missed_points) = path.legs.last().unwrap();
    assert_eq!(missed_leg.mnemonic(), "CA");
    assert!((missed_points.last().unwrap().altitude - 5000.).abs() < 1e-6);

    // Wrong runway is refused
    assert!(build_approach(appch, &config, "07", None, DEFAULT_APPROACH_ALT).is_err());

    // ----- Ribbon -----------------------------------------------------
    let meshes = build_ribbon(&built.legs, &RibbonConfig::default());
    assert_eq!(meshes.len(), built.legs.len());
    let total_quads: usize = meshes.iter().map(|(_, m)| m.polygons.len()).sum();
    assert!(total_quads > 0);

    // Every quad indexes a real vertex
    for (_, mesh) in &meshes {
        for quad in &mesh.polygons {
            for &idx in quad {
                assert!(idx < mesh.vertices.len());
            }
        }
    }

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}

#[test]
fn one_bad_airport_does_not_poison_the_rest() -> Result<()> {
    let dir = write_data_dir("isolation")?;
    let db = NavDatabase::open(&dir)?;

    assert!(db.airport("XBAD").is_err());
    assert!(db.airport("XTST").is_ok());
    assert!(db.airport("XNONE").is_err());

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}
