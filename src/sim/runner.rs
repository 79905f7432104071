use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::Serialize;

use crate::dynamics::state::{heading_matrix, pitch_matrix};
use crate::dynamics::State;
use crate::error::Result;
use crate::ground::FlatGround;
use crate::physics::Atmo;
use crate::vehicle::{Airplane, AxisId, ControlInput, ControlMap};
use super::config::SimConfig;

// ---------------------------------------------------------------------------
// Host capabilities
// ---------------------------------------------------------------------------

/// Writes axis values once per outer step; they are held across the RK4
/// stages of that step.
pub trait ControlSource {
    fn update(&mut self, time: f64, state: &State, controls: &mut ControlMap);
}

/// Ambient air and world wind for the coming step.
pub trait AirSource {
    fn sample(&mut self, time: f64, state: &State) -> (Atmo, Vector3<f64>);
}

/// Per-step observer.
pub trait OutputSink {
    fn record(&mut self, time: f64, plane: &Airplane);
}

/// Constant axis values, resolved to handles up front.
#[derive(Debug, Clone, Default)]
pub struct FixedControls {
    inputs: Vec<(AxisId, f64)>,
}

impl FixedControls {
    pub fn new(plane: &Airplane, inputs: &[ControlInput]) -> Result<Self> {
        let inputs = inputs
            .iter()
            .map(|c| Ok((plane.axis(&c.axis)?, c.value)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { inputs })
    }
}

impl ControlSource for FixedControls {
    fn update(&mut self, _time: f64, _state: &State, controls: &mut ControlMap) {
        for &(axis, value) in &self.inputs {
            controls.set_input(axis, value);
        }
    }
}

/// ISA by altitude plus a constant wind.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAir {
    pub wind: Vector3<f64>, // m/s world
}

impl AirSource for StandardAir {
    fn sample(&mut self, _time: f64, state: &State) -> (Atmo, Vector3<f64>) {
        (Atmo::standard(state.pos.z), self.wind)
    }
}

// ---------------------------------------------------------------------------
// Trajectory samples
// ---------------------------------------------------------------------------

/// One recorded row of a run, SI units except the angles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sample {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub altitude: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub heading_deg: f64,
    pub airspeed: f64,
    pub aoa_deg: f64,
    pub thrust: f64,
    pub engine_rpm: f64,
    pub fuel: f64,
    pub fuel_flow: f64,
    pub gear_load: f64, // N, sum over all gear
}

impl Sample {
    pub fn capture(time: f64, plane: &Airplane) -> Self {
        let s = plane.state();
        let air = s.local_vector(&(s.vel - plane.model().wind()));
        let engines = plane.engine_readouts();
        Self {
            time,
            x: s.pos.x,
            y: s.pos.y,
            altitude: s.pos.z,
            vx: s.vel.x,
            vy: s.vel.y,
            vz: s.vel.z,
            roll_deg: s.roll().to_degrees(),
            pitch_deg: s.pitch().to_degrees(),
            heading_deg: s.heading().to_degrees(),
            airspeed: air.norm(),
            aoa_deg: if air.x.abs() > 1e-3 { (-air.z).atan2(air.x).to_degrees() } else { 0.0 },
            thrust: engines.iter().map(|e| e.thrust).sum(),
            engine_rpm: engines.first().map_or(0.0, |e| e.omega * 30.0 / std::f64::consts::PI),
            fuel: plane.fuel(),
            fuel_flow: plane.fuel_flow(),
            gear_load: plane.gear_readouts().iter().map(|g| g.wow).sum(),
        }
    }
}

/// Keeps every n-th sample.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub samples: Vec<Sample>,
}

impl OutputSink for Recorder {
    fn record(&mut self, time: f64, plane: &Airplane) {
        self.samples.push(Sample::capture(time, plane));
    }
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

/// Initial state for `config.start`. On the ground the lowest gear tip just
/// touches the surface.
pub fn initial_state(plane: &Airplane, config: &SimConfig) -> State {
    let start = &config.start;
    let orient = heading_matrix(start.heading) * pitch_matrix(start.pitch);
    let mut s = State {
        orient,
        ..State::default()
    };
    if start.on_ground {
        let elevation = config.ground_elevation.unwrap_or(0.0);
        let lowest = plane
            .model()
            .parts()
            .gears
            .iter()
            .map(|g| (orient * g.position()).z)
            .fold(0.0_f64, f64::min);
        s.pos = Vector3::new(0.0, 0.0, elevation - lowest);
    } else {
        s.pos = Vector3::new(0.0, 0.0, start.altitude);
        s.vel = orient * Vector3::new(start.speed, 0.0, 0.0);
    }
    s
}

/// Run `plane` for `config.max_time` seconds with injected host
/// capabilities. Stops early if the state stops being finite.
pub fn simulate_with(
    plane: &mut Airplane,
    config: &SimConfig,
    controls: &mut dyn ControlSource,
    air: &mut dyn AirSource,
    sink: &mut dyn OutputSink,
) -> Result<()> {
    config.validate()?;
    let steps = (config.max_time / config.dt).round() as usize;
    let every = config.sample_every.max(1);
    let mut time = 0.0;
    sink.record(time, plane);

    for i in 1..=steps {
        let state = plane.state().clone();
        controls.update(time, &state, plane.controls_mut());
        let (atmo, wind) = air.sample(time, plane.state());
        plane.set_air(atmo);
        plane.set_wind(wind);
        plane.step(config.dt);
        if config.drain_fuel {
            plane.drain_fuel(config.dt)?;
        }
        time = i as f64 * config.dt;

        let s = plane.state();
        if !(s.pos.iter().chain(s.vel.iter()).all(|v| v.is_finite())) {
            warn!("state diverged at t={time:.3}s, stopping");
            break;
        }
        if i % every == 0 {
            sink.record(time, plane);
        }
    }
    debug!("run finished at t={time:.2}s after {steps} steps");
    Ok(())
}

/// Run with the configured ground, fixed controls and standard air,
/// returning the recorded samples.
pub fn simulate(plane: &mut Airplane, config: &SimConfig) -> Result<Vec<Sample>> {
    config.validate()?;
    if let Some(elevation) = config.ground_elevation {
        plane.set_ground(Box::new(FlatGround::new(elevation)));
    }
    plane.set_state(initial_state(plane, config));

    let mut controls = FixedControls::new(plane, &config.controls)?;
    let mut air = StandardAir {
        wind: Vector3::from(config.wind),
    };
    let mut rec = Recorder::default();
    info!("simulating {:.1}s at dt={}s", config.max_time, config.dt);
    simulate_with(plane, config, &mut controls, &mut air, &mut rec)?;
    Ok(rec.samples)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::presets;
    use approx::assert_abs_diff_eq;

    fn untrimmed_jet() -> Airplane {
        presets::jet_builder().unwrap().solve(false).build().unwrap()
    }

    #[test]
    fn ground_start_touches_the_surface() {
        let plane = untrimmed_jet();
        let cfg = SimConfig::default();
        let s = initial_state(&plane, &cfg);
        let lowest = plane
            .model()
            .parts()
            .gears
            .iter()
            .map(|g| s.global_point(&g.position()).z)
            .fold(f64::INFINITY, f64::min);
        assert_abs_diff_eq!(lowest, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn parked_jet_stays_put() {
        let mut plane = untrimmed_jet();
        let cfg = SimConfig {
            max_time: 3.0,
            ..SimConfig::default()
        };
        let samples = simulate(&mut plane, &cfg).unwrap();
        let last = samples.last().unwrap();
        assert!(last.gear_load > 0.0);
        assert!(last.vx.hypot(last.vy) < 0.2, "creeping at {} m/s", last.vx);
        assert!(last.altitude > 0.0 && last.altitude < samples[0].altitude + 0.05);
        assert_eq!(samples.len(), 1 + (360 / cfg.sample_every));
    }

    #[test]
    fn throttle_accelerates_down_the_runway() {
        let mut plane = untrimmed_jet();
        let cfg = SimConfig {
            max_time: 5.0,
            controls: vec![ControlInput::new("throttle", 1.0)],
            ..SimConfig::default()
        };
        let samples = simulate(&mut plane, &cfg).unwrap();
        let last = samples.last().unwrap();
        assert!(last.vx > 5.0, "only reached {} m/s", last.vx);
        assert!(last.fuel < samples[0].fuel);
    }

    #[test]
    fn unknown_control_axis_fails_the_run() {
        let mut plane = untrimmed_jet();
        let cfg = SimConfig {
            controls: vec![ControlInput::new("collective", 1.0)],
            ..SimConfig::default()
        };
        assert!(simulate(&mut plane, &cfg).is_err());
    }

    /// Throttle ramps from idle to full over the first two seconds.
    struct ThrottleRamp {
        axis: AxisId,
        calls: usize,
    }

    impl ControlSource for ThrottleRamp {
        fn update(&mut self, time: f64, state: &State, controls: &mut ControlMap) {
            assert!(state.pos.iter().all(|v| v.is_finite()));
            controls.set_input(self.axis, (time / 2.0).min(1.0));
            self.calls += 1;
        }
    }

    #[test]
    fn injected_control_source_drives_the_run() {
        let mut plane = untrimmed_jet();
        let cfg = SimConfig {
            max_time: 4.0,
            ..SimConfig::default()
        };
        plane.set_ground(Box::new(FlatGround::new(0.0)));
        plane.set_state(initial_state(&plane, &cfg));
        let mut ramp = ThrottleRamp {
            axis: plane.axis("throttle").unwrap(),
            calls: 0,
        };
        let mut rec = Recorder::default();
        simulate_with(&mut plane, &cfg, &mut ramp, &mut StandardAir::default(), &mut rec).unwrap();

        assert_eq!(ramp.calls, 480);
        let last = rec.samples.last().unwrap();
        assert!(last.thrust > 0.0);
        assert!(last.vx > 0.5, "only reached {} m/s", last.vx);
    }

    #[test]
    fn zero_step_fails_before_running() {
        let mut plane = untrimmed_jet();
        let cfg = SimConfig {
            dt: 0.0,
            max_time: 1.0,
            ..SimConfig::default()
        };
        assert!(simulate(&mut plane, &cfg).is_err());
        let mut rec = Recorder::default();
        let res = simulate_with(
            &mut plane,
            &cfg,
            &mut FixedControls::default(),
            &mut StandardAir::default(),
            &mut rec,
        );
        assert!(res.is_err());
        assert!(rec.samples.is_empty());
    }
}
