//! `fpt`: load a navigation database, list an airport's coded procedures,
//! build their flight paths, and export extruded corridors as OBJ.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flightpath::prelude::*;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fpt", version, about)]
struct Cli {
    /// Navigation data directory, holding earth_fix.dat, earth_nav.dat,
    /// earth_aptmeta.dat and CIFP/
    #[arg(long, short)]
    data: Option<PathBuf>,

    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the coded procedures of an airport
    List {
        /// Airport identifier, e.g. EDDF
        icao: String,
    },
    /// Build a procedure's flight path
    Build {
        /// Airport identifier, e.g. EDDF
        icao: String,

        /// Departure identifier
        #[arg(long, conflicts_with_all = ["star", "approach"])]
        sid: Option<String>,

        /// Arrival identifier
        #[arg(long, conflicts_with = "approach")]
        star: Option<String>,

        /// Approach identifier
        #[arg(long)]
        approach: Option<String>,

        /// Runway, e.g. 25C
        #[arg(long, short)]
        runway: String,

        /// Transition identifier
        #[arg(long, short)]
        transition: Option<String>,

        /// Starting altitude in feet, for arrivals and approaches
        #[arg(long)]
        altitude: Option<f64>,

        /// Print every path point, not just the per-leg summary
        #[arg(long)]
        points: bool,

        /// Write the extruded corridor to this Wavefront OBJ file
        #[arg(long)]
        obj: Option<PathBuf>,
    },
}

fn data_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.data {
        return Ok(dir.clone());
    }
    if let Some(mut dir) = dirs::data_local_dir() {
        dir.push("flightpath");
        if dir.exists() {
            return Ok(dir);
        }
    }
    bail!("no navigation data directory found; pass --data");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let dir = data_dir(&cli)?;
    let db = NavDatabase::open(&dir).with_context(|| format!("loading {}", dir.display()))?;

    match &cli.command {
        Command::List { icao } => list(&db, icao),
        Command::Build {
            icao,
            sid,
            star,
            approach,
            runway,
            transition,
            altitude,
            points,
            obj,
        } => {
            let airport = db.airport(icao)?;
            let config = AircraftConfig::default();
            let transition = transition.as_deref();
            let start_alt = altitude.unwrap_or(DEFAULT_APPROACH_ALT);

            let built = if let Some(ident) = sid {
                let proc = airport
                    .sids
                    .get(ident)
                    .with_context(|| format!("{icao} has no SID {ident}"))?;
                build_sid(&airport, proc, &config, runway, transition)?
            } else if let Some(ident) = star {
                let proc = airport
                    .stars
                    .get(ident)
                    .with_context(|| format!("{icao} has no STAR {ident}"))?;
                build_star(proc, &config, runway, transition, start_alt)?
            } else if let Some(ident) = approach {
                let proc = airport
                    .approaches
                    .get(ident)
                    .with_context(|| format!("{icao} has no approach {ident}"))?;
                build_approach(proc, &config, runway, transition, start_alt)?
            } else {
                bail!("pick one of --sid, --star or --approach");
            };

            print_path(&built, *points);

            if let Some(path) = obj {
                let meshes = build_ribbon(&built.legs, &RibbonConfig::default());
                export_obj(path, &meshes)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("wrote {}", path.display());
            }
            Ok(())
        }
    }
}

fn list(db: &NavDatabase, icao: &str) -> Result<()> {
    let airport = db.airport(icao)?;
    println!(
        "{icao}: elevation {} ft, runways {}",
        airport.info.elevation,
        airport.info.runways.join(",")
    );

    for (ident, sid) in &airport.sids {
        let rwys: Vec<&str> = sid.rwys.keys().map(String::as_str).collect();
        let trans: Vec<&str> = sid.transitions.keys().map(String::as_str).collect();
        println!("SID   {ident:<8} rwys [{}] transitions [{}]", rwys.join(","), trans.join(","));
    }
    for (ident, star) in &airport.stars {
        let rwys: Vec<&str> = star.rwys.keys().map(String::as_str).collect();
        let trans: Vec<&str> = star.transitions.keys().map(String::as_str).collect();
        println!("STAR  {ident:<8} rwys [{}] transitions [{}]", rwys.join(","), trans.join(","));
    }
    for (ident, appch) in &airport.approaches {
        let trans: Vec<&str> = appch.transitions.keys().map(String::as_str).collect();
        println!(
            "APPCH {ident:<8} rwy {} transitions [{}]",
            appch.runway.as_deref().unwrap_or("?"),
            trans.join(",")
        );
    }
    Ok(())
}

fn print_path(built: &BuiltPath, all_points: bool) {
    for (leg, points) in &built.legs {
        let info = leg.info();
        println!(
            "{:>3} {} {:<28} {:<12} {} point(s)",
            info.seq,
            leg.mnemonic(),
            leg.title(),
            leg.fix_name(),
            points.len()
        );
        if all_points {
            for p in points {
                println!(
                    "      {:>10.5} {:>11.5}  crs {:>5.1}  {:>7.0} ft",
                    p.lat.to_degrees(),
                    p.lon.to_degrees(),
                    p.course.to_degrees(),
                    p.altitude
                );
            }
        }
    }
    println!("{} points total", built.points.len());
}

fn export_obj(path: &PathBuf, meshes: &[(Leg, Mesh)]) -> Result<()> {
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    let mut offset = 1usize;
    for (i, (leg, mesh)) in meshes.iter().enumerate() {
        if mesh.vertices.is_empty() {
            continue;
        }
        writeln!(out, "o leg{:02}_{}", i, leg.mnemonic())?;
        for v in &mesh.vertices {
            writeln!(out, "v {:.5} {:.5} {:.5}", v.x(), v.y(), v.z())?;
        }
        for p in &mesh.polygons {
            writeln!(
                out,
                "f {} {} {} {}",
                p[0] + offset,
                p[1] + offset,
                p[2] + offset,
                p[3] + offset
            )?;
        }
        offset += mesh.vertices.len();
    }
    Ok(())
}
