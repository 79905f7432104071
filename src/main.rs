use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::error;

use fdm_sim::io::{write_summary_file, write_trajectory_file, FlightSummary};
use fdm_sim::sim::{simulate, Sample, SimConfig};
use fdm_sim::vehicle::presets;
use fdm_sim::{FdmError, Result};

#[derive(Parser, Debug)]
#[command(name = "fdm-sim", version, about = "Trim a preset airplane and fly it from a JSON run description")]
struct Args {
    /// Run description (JSON); a full-throttle jet takeoff when omitted
    config: Option<PathBuf>,
    /// Write the trajectory as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Write trim and performance summary as JSON
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    match path {
        Some(p) => Ok(serde_json::from_reader(std::fs::File::open(p)?)?),
        None => Ok(SimConfig {
            controls: vec![fdm_sim::vehicle::ControlInput::new("throttle", 1.0)],
            max_time: 40.0,
            ..SimConfig::default()
        }),
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let build = presets::by_name(&config.preset).ok_or(FdmError::MissingParameter("preset"))?;
    let mut plane = build()?;
    let trim = *plane.trim();

    let samples = simulate(&mut plane, &config)?;
    let summary = FlightSummary::from_samples(&samples);

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    println!();
    println!("====================================================================");
    println!("  FLIGHT DYNAMICS RUN: {}", config.preset);
    println!("====================================================================");
    println!();
    println!("  Trim");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Cruise AoA:    {:>8.2} deg   Tail incidence: {:>7.2} deg",
        trim.cruise_aoa.to_degrees(),
        trim.tail_incidence.to_degrees()
    );
    println!(
        "  Drag factor:   {:>8.4}       Lift ratio:     {:>7.3}",
        trim.drag_factor, trim.lift_ratio
    );
    println!(
        "  App. elevator: {:>8.3}       Iterations:     {:>7}",
        trim.approach_elevator, trim.iterations
    );
    println!();

    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>9}  {:>7}  {:>7}  {:>9}  {:>8}",
        "t (s)", "x (m)", "alt (m)", "TAS", "AoA", "thrust(N)", "fuel(kg)"
    );
    println!("  {}", "─".repeat(66));
    let interval = (samples.len() / 30).max(1);
    for (i, s) in samples.iter().enumerate() {
        if i % interval == 0 || i == samples.len() - 1 {
            print_row(s);
        }
    }
    println!();

    println!("  Performance Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    match (summary.liftoff_time, summary.liftoff_distance) {
        (Some(t), Some(d)) => println!("  Liftoff:       {t:>8.1} s     ground roll {d:.0} m"),
        _ => println!("  Liftoff:       {:>8}", "none"),
    }
    println!("  Max altitude:  {:>8.0} m", summary.max_altitude);
    println!("  Max airspeed:  {:>8.1} m/s", summary.max_airspeed);
    println!("  Fuel used:     {:>8.1} kg", summary.fuel_used);
    println!();
    println!("  Simulation: {} samples, dt={:.4} s", samples.len(), config.dt);
    println!("====================================================================");
    println!();

    if let Some(path) = &args.csv {
        write_trajectory_file(path, &samples)?;
    }
    if let Some(path) = &args.summary {
        write_summary_file(path, &config.preset, Some(&trim), &summary)?;
    }
    Ok(())
}

fn print_row(s: &Sample) {
    println!(
        "  {:>7.2}  {:>9.1}  {:>9.1}  {:>7.1}  {:>7.2}  {:>9.0}  {:>8.1}",
        s.time, s.x, s.altitude, s.airspeed, s.aoa_deg, s.thrust, s.fuel
    );
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_and_outputs() {
        let args = Args::try_parse_from(["fdm-sim", "run.json", "--csv", "out.csv", "--summary", "s.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("run.json")));
        assert_eq!(args.csv, Some(PathBuf::from("out.csv")));
        assert_eq!(args.summary, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn rejects_unknown_or_incomplete_options() {
        assert!(Args::try_parse_from(["fdm-sim", "--foo"]).is_err());
        assert!(Args::try_parse_from(["fdm-sim", "--csv"]).is_err());
        let args = Args::try_parse_from(["fdm-sim"]).unwrap();
        assert!(args.config.is_none() && args.csv.is_none());
    }
}
