use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::sim::Sample;
use crate::vehicle::Trim;

/// Summary statistics computed from a recorded run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlightSummary {
    pub duration: f64,       // s
    pub max_altitude: f64,   // m
    pub max_airspeed: f64,   // m/s
    pub max_aoa_deg: f64,
    pub fuel_used: f64,      // kg
    pub final_airspeed: f64, // m/s
    /// First time every gear is unloaded after starting on the ground.
    pub liftoff_time: Option<f64>,
    /// Horizontal distance covered up to liftoff, m.
    pub liftoff_distance: Option<f64>,
}

impl FlightSummary {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Self::default();
        };
        let max = |f: fn(&Sample) -> f64| samples.iter().map(f).fold(f64::NEG_INFINITY, f64::max);

        let liftoff = if first.gear_load > 0.0 {
            samples.iter().find(|s| s.gear_load <= 0.0)
        } else {
            None
        };

        FlightSummary {
            duration: last.time - first.time,
            max_altitude: max(|s| s.altitude),
            max_airspeed: max(|s| s.airspeed),
            max_aoa_deg: max(|s| s.aoa_deg),
            fuel_used: first.fuel - last.fuel,
            final_airspeed: last.airspeed,
            liftoff_time: liftoff.map(|s| s.time),
            liftoff_distance: liftoff.map(|s| (s.x - first.x).hypot(s.y - first.y)),
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    airplane: &'a str,
    trim: Option<&'a Trim>,
    performance: &'a FlightSummary,
}

/// Write the summary, with the trim result if there is one, as pretty JSON.
pub fn write_summary<W: Write>(writer: W, airplane: &str, trim: Option<&Trim>, summary: &FlightSummary) -> Result<()> {
    let report = Report {
        airplane,
        trim,
        performance: summary,
    };
    serde_json::to_writer_pretty(writer, &report)?;
    Ok(())
}

pub fn write_summary_file(path: impl AsRef<Path>, airplane: &str, trim: Option<&Trim>, summary: &FlightSummary) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_summary(file, airplane, trim, summary)
}
