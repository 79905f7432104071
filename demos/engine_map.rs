use nalgebra::Vector3;

use fdm_sim::physics::Atmo;
use fdm_sim::propulsion::{MountedThruster, PistonEngine, PropEngineBuilder, Propeller, TurbineEngine};
use fdm_sim::units::{HP2W, RPM2RAD};

/// Equilibrium thrust over a throttle/airspeed grid.
fn sweep(name: &str, mut unit: MountedThruster, altitude: f64) -> fdm_sim::Result<()> {
    println!("{name} at {altitude:.0} m");
    print!("{:>8}", "thr\\v");
    let speeds = [0.0, 20.0, 40.0, 60.0, 80.0];
    for v in speeds {
        print!("{:>16}", format!("{v:.0} m/s"));
    }
    println!();

    unit.set_air(Atmo::standard(altitude));
    for throttle in [0.25, 0.5, 0.75, 1.0] {
        print!("{throttle:>8.2}");
        for v in speeds {
            unit.controls_mut().throttle = throttle;
            unit.set_wind(Vector3::new(-v, 0.0, 0.0));
            unit.stabilize()?;
            let r = unit.readout();
            print!("{:>16}", format!("{:.0} N/{:.0} rpm", r.thrust, r.omega / RPM2RAD));
        }
        println!();
    }
    println!();
    Ok(())
}

fn main() -> fdm_sim::Result<()> {
    env_logger::init();

    let mut prop = Propeller::new(0.95, 55.0, 2400.0 * RPM2RAD, 0.96, 120.0 * HP2W);
    prop.set_takeoff(2700.0 * RPM2RAD, 160.0 * HP2W);
    let piston = PistonEngine::new(160.0 * HP2W, 2700.0 * RPM2RAD);
    let fixed = PropEngineBuilder::new(prop, piston, 1.5).build()?;
    sweep("160 hp piston, fixed pitch", MountedThruster::new(fixed, Vector3::zeros(), Vector3::x()), 0.0)?;

    let prop = Propeller::new(1.3, 120.0, 2000.0 * RPM2RAD, 0.91, 600.0 * HP2W);
    let turbine = TurbineEngine::new(750.0 * HP2W, 2000.0 * RPM2RAD, 3000.0, 650.0 * HP2W);
    let governed = PropEngineBuilder::new(prop, turbine, 4.0)
        .variable_prop(1200.0 * RPM2RAD, 2000.0 * RPM2RAD)
        .build()?;
    sweep("750 shp turboprop, constant speed", MountedThruster::new(governed, Vector3::zeros(), Vector3::x()), 3000.0)?;
    Ok(())
}
