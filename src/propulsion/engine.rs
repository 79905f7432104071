use serde::{Deserialize, Serialize};

use crate::physics::Atmo;
use super::piston::PistonEngine;
use super::turbine::TurbineEngine;

// ---------------------------------------------------------------------------
// Engine controls and the closed set of shaft engines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineControls {
    pub throttle: f64,
    pub mixture: f64,
    pub magnetos: u8,
    pub starter: bool,
    pub boost: f64,
    pub cond_lever: f64,
    pub fuel: bool,
}

impl Default for EngineControls {
    fn default() -> Self {
        Self {
            throttle: 0.0,
            mixture: 1.0,
            magnetos: 3,
            starter: false,
            boost: 1.0,
            cond_lever: 1.0,
            fuel: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Engine {
    Piston(PistonEngine),
    Turbine(TurbineEngine),
}

impl Engine {
    pub fn apply_controls(&mut self, c: &EngineControls) {
        match self {
            Engine::Piston(e) => {
                e.set_throttle(c.throttle);
                e.set_mixture(c.mixture);
                e.set_magnetos(c.magnetos);
                e.set_starter(c.starter);
                e.set_boost(c.boost);
                e.set_fuel(c.fuel);
            }
            Engine::Turbine(e) => {
                e.set_throttle(c.throttle);
                e.set_cond_lever(c.cond_lever);
                e.set_starter(c.starter);
                e.set_fuel(c.fuel);
            }
        }
    }

    pub fn calc(&mut self, air: &Atmo, omega: f64) {
        match self {
            Engine::Piston(e) => e.calc(air.pressure, air.temperature, omega),
            Engine::Turbine(e) => e.calc(air.density, omega),
        }
    }

    pub fn integrate(&mut self, dt: f64) {
        match self {
            Engine::Piston(e) => e.integrate(dt),
            Engine::Turbine(e) => e.integrate(dt),
        }
    }

    pub fn stabilize(&mut self) {
        match self {
            Engine::Piston(e) => e.stabilize(),
            Engine::Turbine(e) => e.stabilize(),
        }
    }

    pub fn torque(&self) -> f64 {
        match self {
            Engine::Piston(e) => e.torque(),
            Engine::Turbine(e) => e.torque(),
        }
    }

    pub fn fuel_flow(&self) -> f64 {
        match self {
            Engine::Piston(e) => e.fuel_flow(),
            Engine::Turbine(e) => e.fuel_flow(),
        }
    }

    pub fn is_running(&self) -> bool {
        match self {
            Engine::Piston(e) => e.is_running(),
            Engine::Turbine(e) => e.is_running(),
        }
    }

    pub fn is_cranking(&self) -> bool {
        match self {
            Engine::Piston(e) => e.is_cranking(),
            Engine::Turbine(e) => e.is_cranking(),
        }
    }

    pub fn as_piston(&self) -> Option<&PistonEngine> {
        match self {
            Engine::Piston(e) => Some(e),
            Engine::Turbine(_) => None,
        }
    }

    pub fn as_turbine(&self) -> Option<&TurbineEngine> {
        match self {
            Engine::Turbine(e) => Some(e),
            Engine::Piston(_) => None,
        }
    }
}

impl From<PistonEngine> for Engine {
    fn from(e: PistonEngine) -> Self {
        Engine::Piston(e)
    }
}

impl From<TurbineEngine> for Engine {
    fn from(e: TurbineEngine) -> Self {
        Engine::Turbine(e)
    }
}
