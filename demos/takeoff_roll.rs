use fdm_sim::dynamics::State;
use fdm_sim::io::FlightSummary;
use fdm_sim::sim::{self, ControlSource, Recorder, SimConfig, StandardAir};
use fdm_sim::vehicle::{presets, AxisId, ControlMap};

/// Full throttle from brake release, a fixed elevator pull once the
/// airplane passes the rotation speed, and the gear raised 5 s later.
struct Rotate {
    throttle: AxisId,
    elevator: AxisId,
    gear_up: AxisId,
    vr: f64,   // m/s
    pull: f64, // elevator axis value
    rotated_at: Option<f64>,
}

impl ControlSource for Rotate {
    fn update(&mut self, time: f64, state: &State, controls: &mut ControlMap) {
        controls.set_input(self.throttle, 1.0);
        if self.rotated_at.is_none() && state.vel.norm() > self.vr {
            self.rotated_at = Some(time);
        }
        if let Some(t0) = self.rotated_at {
            controls.set_input(self.elevator, self.pull);
            if time - t0 > 5.0 {
                controls.set_input(self.gear_up, 1.0);
            }
        }
    }
}

fn main() -> fdm_sim::Result<()> {
    env_logger::init();
    let mut plane = presets::jet()?;
    let config = SimConfig {
        max_time: 45.0,
        ..SimConfig::default()
    };
    plane.set_ground(Box::new(fdm_sim::ground::FlatGround::new(0.0)));
    plane.set_state(sim::initial_state(&plane, &config));

    let mut pilot = Rotate {
        throttle: plane.axis("throttle")?,
        elevator: plane.axis("elevator")?,
        gear_up: plane.axis("gear-up")?,
        vr: 60.0,
        pull: 0.35,
        rotated_at: None,
    };
    let mut air = StandardAir::default();
    let mut rec = Recorder::default();
    sim::simulate_with(&mut plane, &config, &mut pilot, &mut air, &mut rec)?;

    let summary = FlightSummary::from_samples(&rec.samples);
    println!("Rotation at: {:?} s", pilot.rotated_at);
    match (summary.liftoff_time, summary.liftoff_distance) {
        (Some(t), Some(d)) => println!("Liftoff at {t:.1} s after {d:.0} m"),
        _ => println!("No liftoff"),
    }
    println!("Max altitude {:.0} m, max speed {:.1} m/s", summary.max_altitude, summary.max_airspeed);

    println!("\n{:>6}  {:>8}  {:>7}  {:>6}  {:>6}  {:>9}", "t", "x", "alt", "TAS", "pitch", "gear N");
    for s in rec.samples.iter().step_by(30) {
        println!(
            "{:>6.1}  {:>8.0}  {:>7.1}  {:>6.1}  {:>6.1}  {:>9.0}",
            s.time, s.x, s.altitude, s.airspeed, s.pitch_deg, s.gear_load
        );
    }
    Ok(())
}
