use log::{info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::aero::{Fuselage, Wing};
use crate::dynamics::{RigidBody, State};
use crate::error::{FdmError, Result, SolveError};
use crate::ground::{Gear, GearReadout, GroundQuery, Hook, Launchbar};
use crate::physics::Atmo;
use crate::propulsion::{EngineReadout, MountedThruster};
use super::control::{AxisId, ControlKind, ControlMap, ControlOptions, ControlTarget};
use super::mass::{MassModel, Payload, Tank};
use super::model::{Model, Parts};
use super::solver::{solve_gear, Trim, DEFAULT_APPROACH_SPEED};

// ---------------------------------------------------------------------------
// Trim conditions
// ---------------------------------------------------------------------------

/// A fixed axis value applied while trimming a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    pub axis: String,
    pub value: f64,
}

impl ControlInput {
    pub fn new(axis: &str, value: f64) -> Self {
        Self { axis: axis.to_string(), value }
    }
}

fn half() -> f64 {
    0.5
}

fn fifth() -> f64 {
    0.2
}

/// Level cruise: the solver finds the AoA and tail incidence for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cruise {
    pub speed: f64,    // m/s
    pub altitude: f64, // m
    #[serde(default = "half")]
    pub fuel: f64,     // fraction of capacity
    #[serde(default)]
    pub glide: f64,    // rad below the horizon
    #[serde(default)]
    pub controls: Vec<ControlInput>,
}

/// Approach at a given AoA: the solver finds the lift ratio and elevator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approach {
    pub speed: f64, // m/s
    pub aoa: f64,   // rad
    #[serde(default)]
    pub altitude: f64,
    #[serde(default = "fifth")]
    pub fuel: f64,
    #[serde(default)]
    pub glide: f64,
    #[serde(default)]
    pub controls: Vec<ControlInput>,
}

// ---------------------------------------------------------------------------
// Airplane: model + controls + masses + trim
// ---------------------------------------------------------------------------

pub struct Airplane {
    pub(super) model: Model,
    pub(super) controls: ControlMap,
    pub(super) mass: MassModel,
    pub(super) cruise: Option<Cruise>,
    pub(super) approach: Option<Approach>,
    pub(super) cruise_inputs: Vec<(AxisId, f64)>,
    pub(super) approach_inputs: Vec<(AxisId, f64)>,
    pub(super) elevator: Option<AxisId>,
    pub(super) trim: Trim,
    pub(super) failure: Option<SolveError>,
    fuel_out: bool,
}

impl Airplane {
    pub fn model(&self) -> &Model { &self.model }
    pub fn model_mut(&mut self) -> &mut Model { &mut self.model }
    pub fn controls(&self) -> &ControlMap { &self.controls }
    pub fn controls_mut(&mut self) -> &mut ControlMap { &mut self.controls }
    pub fn state(&self) -> &State { self.model.state() }
    pub fn set_state(&mut self, s: State) { self.model.set_state(s); }
    pub fn set_air(&mut self, air: Atmo) { self.model.set_air(air); }
    pub fn set_wind(&mut self, wind: Vector3<f64>) { self.model.set_wind(wind); }
    pub fn set_ground(&mut self, ground: Box<dyn GroundQuery>) { self.model.set_ground(ground); }

    pub fn trim(&self) -> &Trim { &self.trim }

    /// Why the last solve failed, if it did.
    pub fn failure(&self) -> Option<&SolveError> {
        self.failure.as_ref()
    }

    pub fn axis(&self, name: &str) -> Result<AxisId> {
        self.controls.find_axis(name)
    }

    pub fn set_input(&mut self, axis: AxisId, value: f64) {
        self.controls.set_input(axis, value);
    }

    /// Set an axis by name.
    pub fn set_control(&mut self, name: &str, value: f64) -> Result<()> {
        let axis = self.controls.find_axis(name)?;
        self.controls.set_input(axis, value);
        Ok(())
    }

    pub(super) fn push_controls(&mut self) {
        let parts = self.model.parts_mut();
        for s in self.controls.settings() {
            parts.apply_control(&s);
        }
    }

    /// Advance controls, engines and the rigid body by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.controls.apply(dt);
        self.push_controls();
        self.model.step(dt);
    }

    /// Cold-start every engine.
    pub fn init_engines(&mut self) {
        for t in &mut self.model.parts_mut().thrusters {
            t.init();
        }
    }

    pub fn engine_readouts(&self) -> Vec<EngineReadout> {
        self.model.parts().thrusters.iter().map(|t| t.readout()).collect()
    }

    pub fn gear_readouts(&self) -> Vec<GearReadout> {
        self.model.parts().gears.iter().map(|g| g.readout()).collect()
    }

    // -----------------------------------------------------------------------
    // Fuel and payload
    // -----------------------------------------------------------------------

    /// Fuel on board, kg.
    pub fn fuel(&self) -> f64 {
        self.mass.fuel()
    }

    /// Combined fuel flow of every thruster, kg/s.
    pub fn fuel_flow(&self) -> f64 {
        self.model.parts().thrusters.iter().map(|t| t.fuel_flow()).sum()
    }

    /// Burn `dt` seconds of the current fuel flow. Engines are starved
    /// once the tanks run dry.
    pub fn drain_fuel(&mut self, dt: f64) -> Result<()> {
        let burnt = self.mass.drain(self.fuel_flow() * dt);
        if self.mass.fuel() <= 0.0 && self.mass.capacity() > 0.0 {
            self.set_engine_fuel(false);
        }
        if burnt > 0.0 {
            self.mass.apply(self.model.body_mut());
            self.model.sync_body()?;
        }
        Ok(())
    }

    pub fn set_tank_fill(&mut self, tank: usize, fill: f64) -> Result<()> {
        self.mass.set_tank_fill(tank, fill)?;
        if self.mass.fuel() > 0.0 {
            self.set_engine_fuel(true);
        }
        self.mass.apply(self.model.body_mut());
        self.model.sync_body()
    }

    /// Load payload station `name` with `mass` kg.
    pub fn set_weight(&mut self, name: &str, mass: f64) -> Result<()> {
        self.mass.set_payload(name, mass)?;
        self.mass.apply(self.model.body_mut());
        self.model.sync_body()
    }

    pub fn mass_model(&self) -> &MassModel {
        &self.mass
    }

    fn set_engine_fuel(&mut self, on: bool) {
        if self.fuel_out == !on {
            return;
        }
        self.fuel_out = !on;
        if !on {
            warn!("fuel exhausted, engines starved");
        }
        for t in &mut self.model.parts_mut().thrusters {
            t.controls_mut().fuel = on;
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Mapping {
    axis: String,
    kind: ControlKind,
    target: ControlTarget,
    opts: ControlOptions,
}

pub struct AirplaneBuilder {
    empty_weight: f64, // kg
    wing: Option<Wing>,
    tail: Option<Wing>,
    vstabs: Vec<Wing>,
    fuselages: Vec<Fuselage>,
    thrusters: Vec<(MountedThruster, f64)>,
    gears: Vec<Gear>,
    hooks: Vec<Hook>,
    launchbars: Vec<Launchbar>,
    ballast: Vec<(Vector3<f64>, f64)>,
    tanks: Vec<Tank>,
    payloads: Vec<Payload>,
    mappings: Vec<Mapping>,
    transitions: Vec<(ControlKind, ControlTarget, f64)>,
    cruise: Option<Cruise>,
    approach: Option<Approach>,
    elevator_axis: String,
    solve: bool,
}

impl AirplaneBuilder {
    pub fn new(empty_weight: f64) -> Self {
        Self {
            empty_weight,
            wing: None,
            tail: None,
            vstabs: Vec::new(),
            fuselages: Vec::new(),
            thrusters: Vec::new(),
            gears: Vec::new(),
            hooks: Vec::new(),
            launchbars: Vec::new(),
            ballast: Vec::new(),
            tanks: Vec::new(),
            payloads: Vec::new(),
            mappings: Vec::new(),
            transitions: Vec::new(),
            cruise: None,
            approach: None,
            elevator_axis: "elevator".to_string(),
            solve: true,
        }
    }

    pub fn wing(mut self, w: Wing) -> Self { self.wing = Some(w); self }
    pub fn tail(mut self, w: Wing) -> Self { self.tail = Some(w); self }
    pub fn vstab(mut self, w: Wing) -> Self { self.vstabs.push(w); self }
    pub fn fuselage(mut self, f: Fuselage) -> Self { self.fuselages.push(f); self }
    /// `mass` kg is carved out of the empty weight at the thruster mount.
    pub fn thruster(mut self, t: MountedThruster, mass: f64) -> Self { self.thrusters.push((t, mass)); self }
    pub fn gear(mut self, g: Gear) -> Self { self.gears.push(g); self }
    pub fn hook(mut self, h: Hook) -> Self { self.hooks.push(h); self }
    pub fn launchbar(mut self, l: Launchbar) -> Self { self.launchbars.push(l); self }
    /// Extra point mass on top of the empty weight.
    pub fn ballast(mut self, pos: Vector3<f64>, mass: f64) -> Self { self.ballast.push((pos, mass)); self }
    pub fn tank(mut self, t: Tank) -> Self { self.tanks.push(t); self }
    pub fn payload(mut self, p: Payload) -> Self { self.payloads.push(p); self }
    pub fn cruise(mut self, c: Cruise) -> Self { self.cruise = Some(c); self }
    pub fn approach(mut self, a: Approach) -> Self { self.approach = Some(a); self }
    pub fn elevator_axis(mut self, name: &str) -> Self { self.elevator_axis = name.to_string(); self }
    /// Skip the trim solve; the airplane flies with untrimmed coefficients.
    pub fn solve(mut self, v: bool) -> Self { self.solve = v; self }

    pub fn map(mut self, axis: &str, kind: ControlKind, target: ControlTarget, opts: ControlOptions) -> Self {
        self.mappings.push(Mapping {
            axis: axis.to_string(),
            kind,
            target,
            opts,
        });
        self
    }

    pub fn transition(mut self, kind: ControlKind, target: ControlTarget, secs: f64) -> Self {
        self.transitions.push((kind, target, secs));
        self
    }

    pub fn build(self) -> Result<Airplane> {
        if !(self.empty_weight > 0.0) {
            return Err(FdmError::invalid("empty_weight", format!("{} must be positive", self.empty_weight)));
        }
        let wing = self.wing.ok_or(FdmError::MissingParameter("wing"))?;
        if self.solve {
            if self.cruise.is_none() {
                return Err(FdmError::MissingParameter("cruise"));
            }
            if self.approach.is_none() {
                return Err(FdmError::MissingParameter("approach"));
            }
        }

        // Mass distribution: engines, then structure scaled to the empty
        // weight, then ballast, tanks and payload on top.
        let mut body = RigidBody::new();
        let mut engine_mass = 0.0;
        for (t, m) in &self.thrusters {
            if *m < 0.0 {
                return Err(FdmError::invalid("thruster.mass", "must not be negative"));
            }
            body.add_mass(*m, t.position());
            engine_mass += m;
        }
        let first_struct = body.num_masses();
        let mut structure = 0.0;
        let surfaces = std::iter::once(&wing)
            .chain(self.tail.iter())
            .chain(self.vstabs.iter())
            .flat_map(|w| w.mass_points());
        for (m, p) in surfaces.chain(self.fuselages.iter().flat_map(|f| f.mass_points())) {
            body.add_mass(m, p);
            structure += m;
        }
        let struct_mass = self.empty_weight - engine_mass;
        if !(struct_mass > 0.0) {
            return Err(FdmError::invalid("empty_weight", "must exceed the thruster masses"));
        }
        if !(structure > 0.0) {
            return Err(FdmError::invalid("wing", "airframe has no area to carry the structural mass"));
        }
        body.scale_masses_from(first_struct, struct_mass / structure);
        for (pos, m) in &self.ballast {
            body.add_mass(*m, *pos);
        }
        let mut mass = MassModel::new(self.tanks, self.payloads)?;
        mass.attach(&mut body);
        body.recalc()?;

        let mut parts = Parts {
            wing: Some(wing),
            tail: self.tail,
            vstabs: self.vstabs,
            fuselages: self.fuselages,
            thrusters: self.thrusters.into_iter().map(|(t, _)| t).collect(),
            gears: self.gears,
            hooks: self.hooks,
            launchbars: self.launchbars,
        };

        // Controls
        let mut controls = ControlMap::new();
        for m in &self.mappings {
            if !parts.has_target(m.target) {
                return Err(FdmError::ControlTarget {
                    kind: m.kind.to_string(),
                    target: m.target.to_string(),
                });
            }
            let axis = controls.axis(&m.axis);
            controls.add_mapping(axis, m.kind, m.target, m.opts)?;
        }
        for &(kind, target, secs) in &self.transitions {
            controls.set_transition_time(kind, target, secs)?;
        }
        let resolve = |inputs: &[ControlInput]| -> Result<Vec<(AxisId, f64)>> {
            inputs.iter().map(|c| Ok((controls.find_axis(&c.axis)?, c.value))).collect()
        };
        let cruise_inputs = resolve(self.cruise.as_ref().map_or(&[][..], |c| c.controls.as_slice()))?;
        let approach_inputs = resolve(self.approach.as_ref().map_or(&[][..], |a| a.controls.as_slice()))?;
        let elevator = if self.solve {
            Some(controls.find_axis(&self.elevator_axis)?)
        } else {
            controls.find_axis(&self.elevator_axis).ok()
        };

        let vapp = self.approach.as_ref().map_or(DEFAULT_APPROACH_SPEED, |a| a.speed);
        solve_gear(&mut parts.gears, &body, vapp);

        let mut plane = Airplane {
            model: Model::new(body, parts),
            controls,
            mass,
            cruise: self.cruise,
            approach: self.approach,
            cruise_inputs,
            approach_inputs,
            elevator,
            trim: Trim::default(),
            failure: None,
            fuel_out: false,
        };
        plane.controls.apply(1.0e6);
        plane.push_controls();
        if self.solve {
            plane.solve()?;
        }

        let body = plane.model.body();
        info!(
            "airplane built: {:.0} kg, CG {:.3?}, {} thrusters, {} gear",
            body.total_mass(),
            body.cg().as_slice(),
            plane.model.parts().thrusters.len(),
            plane.model.parts().gears.len()
        );
        Ok(plane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aero::{FuselageBuilder, WingBuilder};
    use crate::ground::{FlatGround, GearBuilder};
    use crate::propulsion::SimpleJet;
    use approx::assert_relative_eq;

    fn glider() -> AirplaneBuilder {
        let wing = WingBuilder::new(Vector3::new(0.0, 0.3, 0.0), 5.0, 1.2).build().unwrap();
        let body = FuselageBuilder::new(Vector3::new(2.0, 0.0, 0.0), Vector3::new(-4.0, 0.0, 0.0), 0.8)
            .build()
            .unwrap();
        AirplaneBuilder::new(500.0).wing(wing).fuselage(body).solve(false)
    }

    #[test]
    fn structure_is_scaled_to_empty_weight() {
        let jet = MountedThruster::new(SimpleJet::new(1000.0), Vector3::new(2.0, 0.0, 0.0), Vector3::x());
        let plane = glider()
            .thruster(jet, 100.0)
            .ballast(Vector3::new(1.0, 0.0, 0.0), 20.0)
            .tank(Tank::new(Vector3::zeros(), 50.0))
            .build()
            .unwrap();
        assert_relative_eq!(plane.model().body().total_mass(), 500.0 + 20.0 + 50.0, max_relative = 1e-12);
        assert_relative_eq!(plane.fuel(), 50.0);
    }

    #[test]
    fn thrusters_heavier_than_empty_weight_are_rejected() {
        let jet = MountedThruster::new(SimpleJet::new(1000.0), Vector3::zeros(), Vector3::x());
        assert!(glider().thruster(jet, 600.0).build().is_err());
    }

    #[test]
    fn mapping_to_missing_part_is_rejected() {
        let err = glider()
            .map("throttle", ControlKind::Throttle, ControlTarget::Thruster(0), ControlOptions::default())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, FdmError::ControlTarget { .. }));
    }

    #[test]
    fn solving_needs_both_conditions() {
        let err = glider().solve(true).build().err().unwrap();
        assert!(matches!(err, FdmError::MissingParameter("cruise")));
    }

    #[test]
    fn unknown_condition_axis_is_rejected() {
        let cruise = Cruise {
            speed: 50.0,
            altitude: 1000.0,
            fuel: 0.5,
            glide: 0.0,
            controls: vec![ControlInput::new("throttle", 1.0)],
        };
        let err = glider().cruise(cruise).build().err().unwrap();
        assert!(matches!(err, FdmError::UnknownAxis(_)));
    }

    #[test]
    fn drained_tanks_starve_the_engine() {
        let jet = MountedThruster::new(SimpleJet::new(10_000.0), Vector3::zeros(), Vector3::x());
        let mut plane = glider()
            .thruster(jet, 50.0)
            .tank(Tank::new(Vector3::zeros(), 1.0))
            .map("throttle", ControlKind::Throttle, ControlTarget::Thruster(0), ControlOptions::default())
            .build()
            .unwrap();
        plane.set_control("throttle", 1.0).unwrap();
        plane.step(0.01);
        assert!(plane.fuel_flow() > 0.0);
        for _ in 0..20 {
            plane.drain_fuel(1.0).unwrap();
            plane.step(0.01);
        }
        assert_relative_eq!(plane.fuel(), 0.0);
        assert!(!plane.engine_readouts()[0].running);
        assert_relative_eq!(plane.engine_readouts()[0].thrust, 0.0);

        plane.set_tank_fill(0, 1.0).unwrap();
        plane.step(0.01);
        assert!(plane.engine_readouts()[0].thrust > 0.0);
    }

    #[test]
    fn gear_is_sized_at_build() {
        let g = GearBuilder::new(Vector3::new(0.0, 0.0, -1.0), 0.2).build().unwrap();
        let mut plane = glider().gear(g).build().unwrap();
        assert!(plane.model().parts().gears[0].spring() > 1000.0);
        plane.set_ground(Box::new(FlatGround::new(0.0)));
        assert_eq!(plane.gear_readouts().len(), 1);
    }
}
