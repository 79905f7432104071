use serde::{Deserialize, Serialize};

use crate::error::{FdmError, Result};
use crate::vehicle::ControlInput;

/// Where the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartCondition {
    /// Rest on the gear at `ground_elevation`; speed and altitude are ignored.
    pub on_ground: bool,
    pub altitude: f64, // m
    pub speed: f64,    // m/s along the body x axis
    pub pitch: f64,    // rad
    pub heading: f64,  // rad
}

impl Default for StartCondition {
    fn default() -> Self {
        Self {
            on_ground: true,
            altitude: 0.0,
            speed: 0.0,
            pitch: 0.0,
            heading: 0.0,
        }
    }
}

/// Run description, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub preset: String,
    pub dt: f64,       // s
    pub max_time: f64, // s
    pub start: StartCondition,
    /// Flat ground at this elevation; `None` flies with no terrain.
    pub ground_elevation: Option<f64>,
    pub wind: [f64; 3], // m/s world
    /// Axis values held for the whole run.
    pub controls: Vec<ControlInput>,
    /// Record every n-th step.
    pub sample_every: usize,
    pub drain_fuel: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            preset: "jet".to_string(),
            dt: 1.0 / 120.0,
            max_time: 60.0,
            start: StartCondition::default(),
            ground_elevation: Some(0.0),
            wind: [0.0; 3],
            controls: Vec::new(),
            sample_every: 12,
            drain_fuel: true,
        }
    }
}

impl SimConfig {
    /// Rejects step sizes and durations the run loop cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(FdmError::invalid("dt", format!("{} must be positive and finite", self.dt)));
        }
        if !(self.max_time >= 0.0 && self.max_time.is_finite()) {
            return Err(FdmError::invalid(
                "max_time",
                format!("{} must be non-negative and finite", self.max_time),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: SimConfig = serde_json::from_str(
            r#"{ "preset": "trainer", "max_time": 5.0,
                 "controls": [ { "axis": "throttle", "value": 1.0 } ],
                 "start": { "on_ground": false, "altitude": 1500.0, "speed": 50.0 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.preset, "trainer");
        assert_eq!(cfg.controls.len(), 1);
        assert!(!cfg.start.on_ground);
        assert_eq!(cfg.start.pitch, 0.0);
        assert_eq!(cfg.dt, SimConfig::default().dt);
        assert_eq!(cfg.ground_elevation, Some(0.0));
    }

    #[test]
    fn rejects_degenerate_steps() {
        for dt in [0.0, -0.01, f64::NAN, f64::INFINITY] {
            let cfg = SimConfig { dt, ..SimConfig::default() };
            assert!(cfg.validate().is_err(), "dt = {dt} accepted");
        }
        let cfg = SimConfig { max_time: f64::NAN, ..SimConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = SimConfig { max_time: -1.0, ..SimConfig::default() };
        assert!(cfg.validate().is_err());
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_step_from_json_is_rejected() {
        let cfg: SimConfig = serde_json::from_str(r#"{ "dt": 0.0 }"#).unwrap();
        assert!(matches!(cfg.validate(), Err(FdmError::InvalidParameter { name: "dt", .. })));
    }
}
