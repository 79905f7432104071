use nalgebra::Vector3;

use crate::aero::{ControlSpan, FuselageBuilder, Stall, WingBuilder};
use crate::error::Result;
use crate::ground::{GearBuilder, Hook, Launchbar};
use crate::physics::atmosphere::std_density;
use crate::propulsion::{MountedThruster, PistonEngine, PropEngineBuilder, Propeller, SimpleJet};
use crate::units::{CIN2CM, DEG2RAD, HP2W, RPM2RAD};
use super::airplane::{Airplane, AirplaneBuilder, Approach, ControlInput, Cruise};
use super::control::{ControlKind, ControlOptions, ControlTarget};
use super::mass::{Payload, Tank, JET_FUEL_DENSITY};

// ---------------------------------------------------------------------------
// Preset airframes
// ---------------------------------------------------------------------------
//
// Axes shared by both presets: throttle, elevator (positive is nose up),
// aileron (positive rolls right), rudder, flaps, brake-left, brake-right.

fn stall(aoa_deg: f64, width_deg: f64, peak: f64) -> Stall {
    Stall {
        aoa: aoa_deg * DEG2RAD,
        width: width_deg * DEG2RAD,
        peak,
    }
}

fn plain() -> ControlOptions {
    ControlOptions::default()
}

/// Primary flight controls and brakes common to both presets. Gear 0 is
/// the steerable nose wheel, gears 1 and 2 the left and right mains.
fn flight_controls(b: AirplaneBuilder) -> AirplaneBuilder {
    b.map("throttle", ControlKind::Throttle, ControlTarget::Thruster(0), plain())
        .map("elevator", ControlKind::Flap0, ControlTarget::Tail, ControlOptions::inverted())
        .map("aileron", ControlKind::Flap1, ControlTarget::Wing, ControlOptions::split())
        .map("rudder", ControlKind::Flap0, ControlTarget::Vstab(0), plain())
        .map("rudder", ControlKind::Steer, ControlTarget::Gear(0), ControlOptions::remap([-1.0, 1.0], [-0.35, 0.35]))
        .map("flaps", ControlKind::Flap0, ControlTarget::Wing, plain())
        .map("brake-left", ControlKind::Brake, ControlTarget::Gear(1), plain())
        .map("brake-right", ControlKind::Brake, ControlTarget::Gear(2), plain())
        .transition(ControlKind::Flap0, ControlTarget::Wing, 5.0)
}

/// High-wing four-seat single ("Trainer"): 160 hp piston, fixed-pitch prop.
pub fn trainer_builder() -> Result<AirplaneBuilder> {
    let mut engine = PistonEngine::new(160.0 * HP2W, 2700.0 * RPM2RAD);
    engine.set_displacement(320.0 * CIN2CM);
    engine.set_compression(8.5);

    let cruise_alt = 2438.0;
    let mut prop = Propeller::new(0.95, 55.0, 2400.0 * RPM2RAD, std_density(cruise_alt), 120.0 * HP2W);
    prop.set_takeoff(2700.0 * RPM2RAD, 160.0 * HP2W);
    let prop_engine = PropEngineBuilder::new(prop, engine, 1.5).build()?;

    let wing = WingBuilder::new(Vector3::new(-0.3, 0.5, 0.9), 5.3, 1.6)
        .taper(0.7)
        .dihedral(1.5 * DEG2RAD)
        .incidence(1.5 * DEG2RAD)
        .twist(-2.0 * DEG2RAD)
        .camber(0.06)
        .stall(stall(16.0, 3.0, 1.5))
        .flap0(ControlSpan::new(0.0, 0.5, 1.5, 1.6))
        .flap1(ControlSpan::new(0.5, 1.0, 1.2, 1.1))
        .build()?;
    let tail = WingBuilder::new(Vector3::new(-4.5, 0.1, 0.0), 1.7, 1.1)
        .taper(0.6)
        .stall(stall(16.0, 3.0, 1.5))
        .flap0(ControlSpan::new(0.0, 1.0, 1.7, 1.2))
        .effectiveness(1.5)
        .build()?;
    let fin = WingBuilder::vertical(Vector3::new(-4.6, 0.0, 0.2), 1.5, 1.4)
        .taper(0.5)
        .sweep(25.0 * DEG2RAD)
        .stall(stall(16.0, 3.0, 1.5))
        .flap0(ControlSpan::new(0.0, 1.0, 1.3, 1.2))
        .build()?;
    let fuselage = FuselageBuilder::new(Vector3::new(1.9, 0.0, 0.0), Vector3::new(-5.2, 0.0, 0.2), 1.1)
        .taper(0.3)
        .midpoint(0.3)
        .build()?;

    let nose = GearBuilder::new(Vector3::new(1.2, 0.0, -1.0), 0.2).spring(0.8).damp(1.2).build()?;
    let main = |y: f64| GearBuilder::new(Vector3::new(-0.6, y, -1.0), 0.15).spring(0.6).sfric(0.9).build();

    let cruise = Cruise {
        speed: 61.0,
        altitude: cruise_alt,
        fuel: 0.5,
        glide: 0.0,
        controls: vec![ControlInput::new("throttle", 1.0), ControlInput::new("mixture", 1.0)],
    };
    let approach = Approach {
        speed: 24.0,
        aoa: 3.0 * DEG2RAD,
        altitude: 0.0,
        fuel: 0.2,
        glide: 0.0,
        controls: vec![
            ControlInput::new("throttle", 0.2),
            ControlInput::new("mixture", 1.0),
            ControlInput::new("flaps", 1.0),
        ],
    };

    let b = AirplaneBuilder::new(680.0)
        .wing(wing)
        .tail(tail)
        .vstab(fin)
        .fuselage(fuselage)
        .thruster(MountedThruster::new(prop_engine, Vector3::new(1.6, 0.0, 0.1), Vector3::x()), 136.0)
        .gear(nose)
        .gear(main(1.2)?)
        .gear(main(-1.2)?)
        .tank(Tank::new(Vector3::new(-0.2, 1.5, 0.9), 72.0))
        .tank(Tank::new(Vector3::new(-0.2, -1.5, 0.9), 72.0))
        .payload(Payload::new("pilot", Vector3::new(-0.1, 0.3, 0.0), 80.0))
        .payload(Payload::new("passenger", Vector3::new(-0.1, -0.3, 0.0), 0.0).solve_weights(80.0, 0.0))
        .cruise(cruise)
        .approach(approach);
    Ok(flight_controls(b)
        .map("mixture", ControlKind::Mixture, ControlTarget::Thruster(0), plain())
        .map("starter", ControlKind::Starter, ControlTarget::Thruster(0), plain()))
}

pub fn trainer() -> Result<Airplane> {
    trainer_builder()?.build()
}

/// Carrier-capable jet trainer ("Jet"): one 16 kN turbojet, tail hook
/// and nose-tow launch bar.
pub fn jet_builder() -> Result<AirplaneBuilder> {
    let wing = WingBuilder::new(Vector3::new(-0.9, 0.7, -0.3), 4.6, 2.6)
        .taper(0.45)
        .sweep(12.0 * DEG2RAD)
        .dihedral(3.0 * DEG2RAD)
        .incidence(1.5 * DEG2RAD)
        .camber(0.04)
        .stall(stall(15.0, 3.0, 1.5))
        .flap0(ControlSpan::new(0.0, 0.55, 1.5, 1.7))
        .flap1(ControlSpan::new(0.55, 0.95, 1.2, 1.1))
        .spoiler(ControlSpan::new(0.2, 0.55, 0.0, 3.0))
        .build()?;
    let tail = WingBuilder::new(Vector3::new(-5.6, 0.4, 0.4), 2.2, 1.5)
        .taper(0.5)
        .sweep(20.0 * DEG2RAD)
        .stall(stall(16.0, 3.0, 1.5))
        .flap0(ControlSpan::new(0.0, 1.0, 2.4, 1.3))
        .effectiveness(1.5)
        .build()?;
    let fin = WingBuilder::vertical(Vector3::new(-5.4, 0.0, 0.8), 2.2, 2.2)
        .taper(0.4)
        .sweep(35.0 * DEG2RAD)
        .stall(stall(16.0, 3.0, 1.5))
        .flap0(ControlSpan::new(0.0, 1.0, 1.3, 1.2))
        .build()?;
    let fuselage = FuselageBuilder::new(Vector3::new(5.0, 0.0, 0.0), Vector3::new(-6.5, 0.0, 0.3), 1.4)
        .taper(0.35)
        .midpoint(0.55)
        .build()?;

    let nose = GearBuilder::new(Vector3::new(3.4, 0.0, -1.6), 0.3).damp(1.2).build()?;
    let main = |y: f64| GearBuilder::new(Vector3::new(-2.4, y, -1.6), 0.3).sfric(0.9).build();

    let cruise = Cruise {
        speed: 190.0,
        altitude: 6000.0,
        fuel: 0.5,
        glide: 0.0,
        controls: vec![ControlInput::new("throttle", 1.0)],
    };
    let approach = Approach {
        speed: 64.0,
        aoa: 7.0 * DEG2RAD,
        altitude: 0.0,
        fuel: 0.2,
        glide: 0.0,
        controls: vec![ControlInput::new("throttle", 0.35), ControlInput::new("flaps", 1.0)],
    };

    let b = AirplaneBuilder::new(3200.0)
        .wing(wing)
        .tail(tail)
        .vstab(fin)
        .fuselage(fuselage)
        .thruster(MountedThruster::new(SimpleJet::new(16_000.0), Vector3::new(-1.5, 0.0, 0.0), Vector3::x()), 450.0)
        .gear(nose)
        .gear(main(1.6)?)
        .gear(main(-1.6)?)
        .hook(Hook::new(Vector3::new(-5.8, 0.0, -0.5), 1.5)?)
        .launchbar(Launchbar::new(Vector3::new(3.2, 0.0, -1.3), 1.0)?)
        .tank(Tank::new(Vector3::new(-1.2, 0.0, 0.0), 1100.0).with_density(JET_FUEL_DENSITY))
        .payload(Payload::new("pilot", Vector3::new(2.5, 0.0, 0.3), 90.0))
        .cruise(cruise)
        .approach(approach);
    Ok(flight_controls(b)
        .map("spoilers", ControlKind::Spoiler, ControlTarget::Wing, plain())
        .map("gear-up", ControlKind::Extend, ControlTarget::Gear(0), ControlOptions::remap([0.0, 1.0], [1.0, 0.0]))
        .map("gear-up", ControlKind::Extend, ControlTarget::Gear(1), ControlOptions::remap([0.0, 1.0], [1.0, 0.0]))
        .map("gear-up", ControlKind::Extend, ControlTarget::Gear(2), ControlOptions::remap([0.0, 1.0], [1.0, 0.0]))
        .map("hook", ControlKind::HookExtend, ControlTarget::Hook(0), plain())
        .map("launchbar", ControlKind::LaunchbarExtend, ControlTarget::Launchbar(0), plain())
        .map("catapult", ControlKind::LaunchbarAccel, ControlTarget::Launchbar(0), plain())
        .transition(ControlKind::Extend, ControlTarget::Gear(0), 6.0)
        .transition(ControlKind::Extend, ControlTarget::Gear(1), 6.0)
        .transition(ControlKind::Extend, ControlTarget::Gear(2), 6.0))
}

pub fn jet() -> Result<Airplane> {
    jet_builder()?.build()
}

/// Look up a preset by name.
pub fn by_name(name: &str) -> Option<fn() -> Result<Airplane>> {
    let build: fn() -> Result<Airplane> = match name.to_ascii_lowercase().as_str() {
        "trainer" => trainer,
        "jet" => jet,
        _ => return None,
    };
    Some(build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_build_untrimmed() {
        let plane = trainer_builder().unwrap().solve(false).build().unwrap();
        assert_eq!(plane.model().parts().gears.len(), 3);
        assert!(plane.axis("mixture").is_ok());
        let plane = jet_builder().unwrap().solve(false).build().unwrap();
        assert_eq!(plane.model().parts().hooks.len(), 1);
        assert!(plane.axis("catapult").is_ok());
    }

    #[test]
    fn jet_cg_sits_between_the_gear() {
        let plane = jet_builder().unwrap().solve(false).build().unwrap();
        let cg = plane.model().body().cg();
        let gears = &plane.model().parts().gears;
        assert!(cg.x < gears[0].position().x);
        assert!(cg.x > gears[1].position().x);
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(by_name("Jet").is_some());
        assert!(by_name("glider").is_none());
    }
}
