use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::sim::Sample;

/// Write samples as CSV, one header row named after the `Sample` fields.
pub fn write_trajectory<W: Write>(writer: W, samples: &[Sample]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    for s in samples {
        w.serialize(s)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_trajectory_file(path: impl AsRef<Path>, samples: &[Sample]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_trajectory(file, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_output_has_header_and_rows() {
        let samples = vec![
            Sample::default(),
            Sample {
                time: 0.5,
                altitude: 12.0,
                airspeed: 40.0,
                ..Sample::default()
            },
        ];

        let mut buf = Vec::new();
        write_trajectory(&mut buf, &samples).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("time,x,y,altitude,"));
        assert!(lines[0].ends_with(",gear_load"));
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert!(lines[2].starts_with("0.5,0.0,0.0,12.0,"));
    }
}
