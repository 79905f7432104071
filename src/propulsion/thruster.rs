use nalgebra::Vector3;
use serde::Serialize;

use crate::dynamics::{ForceContext, ForceContributor, ForceSum, State};
use crate::error::SolveError;
use crate::physics::Atmo;
use super::engine::{Engine, EngineControls};
use super::prop_engine::PropEngine;

// ---------------------------------------------------------------------------
// Fixed-thrust jet
// ---------------------------------------------------------------------------

/// Thrust-specific fuel consumption of a generic turbojet, kg/(N·s).
const DEFAULT_TSFC: f64 = 2.0e-5;

/// Thrust proportional to throttle, no spool or altitude effects.
#[derive(Debug, Clone)]
pub struct SimpleJet {
    max_thrust: f64, // N
    tsfc: f64,       // kg/(N·s)
    controls: EngineControls,
    thrust: f64,
    fuel_flow: f64,
}

impl SimpleJet {
    pub fn new(max_thrust: f64) -> Self {
        Self {
            max_thrust,
            tsfc: DEFAULT_TSFC,
            controls: EngineControls::default(),
            thrust: 0.0,
            fuel_flow: 0.0,
        }
    }

    pub fn with_tsfc(mut self, tsfc: f64) -> Self {
        self.tsfc = tsfc;
        self
    }

    pub fn max_thrust(&self) -> f64 {
        self.max_thrust
    }

    fn integrate(&mut self) {
        self.thrust = if self.controls.fuel {
            self.controls.throttle.clamp(0.0, 1.0) * self.max_thrust
        } else {
            0.0
        };
        self.fuel_flow = self.tsfc * self.thrust;
    }
}

// ---------------------------------------------------------------------------
// Thrusters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Thruster {
    Prop(PropEngine),
    Jet(SimpleJet),
}

impl From<PropEngine> for Thruster {
    fn from(p: PropEngine) -> Self {
        Thruster::Prop(p)
    }
}

impl From<SimpleJet> for Thruster {
    fn from(j: SimpleJet) -> Self {
        Thruster::Jet(j)
    }
}

/// Snapshot of one thruster's gauges, SI units.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineReadout {
    pub thrust: f64,
    pub torque: f64,
    pub fuel_flow: f64,
    pub running: bool,
    pub cranking: bool,
    pub omega: f64,
    pub mp: Option<f64>,
    pub egt: Option<f64>,
    pub oil_temp: Option<f64>,
    pub n1: Option<f64>,
    pub n2: Option<f64>,
}

/// A thruster fixed to the airframe at `pos`, pushing along `dir`.
///
/// Outputs are refreshed by `integrate` once per outer step and held
/// for every force evaluation in that step.
#[derive(Debug, Clone)]
pub struct MountedThruster {
    pos: Vector3<f64>,  // m body
    dir: Vector3<f64>,  // unit, body
    wind: Vector3<f64>, // air velocity at the mount, body
    air: Atmo,
    thruster: Thruster,
}

impl MountedThruster {
    pub fn new(thruster: impl Into<Thruster>, pos: Vector3<f64>, dir: Vector3<f64>) -> Self {
        let n = dir.norm();
        let dir = if n > 0.0 { dir / n } else { Vector3::x() };
        Self {
            pos,
            dir,
            wind: Vector3::zeros(),
            air: Atmo::standard(0.0),
            thruster: thruster.into(),
        }
    }

    pub fn position(&self) -> Vector3<f64> { self.pos }
    pub fn direction(&self) -> Vector3<f64> { self.dir }
    pub fn thruster(&self) -> &Thruster { &self.thruster }
    pub fn thruster_mut(&mut self) -> &mut Thruster { &mut self.thruster }

    pub fn set_wind(&mut self, wind: Vector3<f64>) { self.wind = wind; }
    pub fn set_air(&mut self, air: Atmo) { self.air = air; }

    pub fn controls_mut(&mut self) -> &mut EngineControls {
        match &mut self.thruster {
            Thruster::Prop(p) => p.controls_mut(),
            Thruster::Jet(j) => &mut j.controls,
        }
    }

    /// Airspeed along the thrust axis.
    fn axial_speed(&self) -> f64 {
        -self.wind.dot(&self.dir)
    }

    pub fn integrate(&mut self, dt: f64) {
        let speed = self.axial_speed();
        match &mut self.thruster {
            Thruster::Prop(p) => p.integrate(dt, &self.air, speed),
            Thruster::Jet(j) => j.integrate(),
        }
    }

    pub fn stabilize(&mut self) -> Result<(), SolveError> {
        let speed = self.axial_speed();
        match &mut self.thruster {
            Thruster::Prop(p) => p.stabilize(&self.air, speed),
            Thruster::Jet(j) => {
                j.integrate();
                Ok(())
            }
        }
    }

    pub fn init(&mut self) {
        if let Thruster::Prop(p) = &mut self.thruster {
            p.init();
        }
    }

    pub fn thrust(&self) -> Vector3<f64> {
        let t = match &self.thruster {
            Thruster::Prop(p) => p.thrust(),
            Thruster::Jet(j) => j.thrust,
        };
        self.dir * t
    }

    pub fn torque(&self) -> Vector3<f64> {
        match &self.thruster {
            Thruster::Prop(p) => self.dir * p.axial_torque(),
            Thruster::Jet(_) => Vector3::zeros(),
        }
    }

    pub fn gyro(&self) -> Vector3<f64> {
        match &self.thruster {
            Thruster::Prop(p) => self.dir * p.angular_momentum(),
            Thruster::Jet(_) => Vector3::zeros(),
        }
    }

    pub fn fuel_flow(&self) -> f64 {
        match &self.thruster {
            Thruster::Prop(p) => p.fuel_flow(),
            Thruster::Jet(j) => j.fuel_flow,
        }
    }

    pub fn is_running(&self) -> bool {
        match &self.thruster {
            Thruster::Prop(p) => p.is_running(),
            Thruster::Jet(j) => j.controls.fuel,
        }
    }

    pub fn is_cranking(&self) -> bool {
        match &self.thruster {
            Thruster::Prop(p) => p.is_cranking(),
            Thruster::Jet(_) => false,
        }
    }

    pub fn omega(&self) -> f64 {
        match &self.thruster {
            Thruster::Prop(p) => p.omega(),
            Thruster::Jet(_) => 0.0,
        }
    }

    pub fn readout(&self) -> EngineReadout {
        let mut r = EngineReadout {
            thrust: self.thrust().dot(&self.dir),
            torque: self.torque().dot(&self.dir),
            fuel_flow: self.fuel_flow(),
            running: self.is_running(),
            cranking: self.is_cranking(),
            omega: self.omega(),
            ..EngineReadout::default()
        };
        if let Thruster::Prop(p) = &self.thruster {
            match p.engine() {
                Engine::Piston(e) => {
                    r.mp = Some(e.mp());
                    r.egt = Some(e.egt());
                    r.oil_temp = Some(e.oil_temp());
                }
                Engine::Turbine(e) => {
                    r.n1 = Some(e.n1());
                    r.n2 = Some(e.n2());
                }
            }
        }
        r
    }
}

impl ForceContributor for MountedThruster {
    fn add_forces(&self, _ctx: &ForceContext<'_>, _state: &State, sum: &mut ForceSum) {
        sum.add_force_at(&self.pos, &self.thrust());
        sum.add_torque(&self.torque());
        sum.add_gyro(&self.gyro());
    }
}
