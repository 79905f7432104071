use log::{debug, warn};

use crate::error::{FdmError, Result, SolveError};
use crate::physics::Atmo;
use crate::units::RPM2RAD;
use super::engine::{Engine, EngineControls};
use super::propeller::Propeller;

// ---------------------------------------------------------------------------
// Engine + propeller on a common shaft
// ---------------------------------------------------------------------------

/// Shaft speed at construction, about 500 rpm.
const INITIAL_OMEGA: f64 = 52.3;
/// Fixed-pitch equilibrium search starts here and works upward.
const SEARCH_START_OMEGA: f64 = 52.0;
/// Cold-start shaft speed after `init`.
const COLD_OMEGA: f64 = 0.01;
/// Lowest shaft speed a fixed-pitch equilibrium search will go.
const MIN_STABLE_OMEGA: f64 = 60.0 * RPM2RAD;
const MAX_STABILIZE_ITERS: usize = 10_000;
/// Governor pitch change per step when far from the target torque.
const GOVERNOR_RATE: f64 = 1.04;

#[derive(Debug, Clone)]
pub struct PropEngine {
    prop: Propeller,
    engine: Engine,
    moment: f64,          // kg·m^2, sign gives rotation direction
    gear_ratio: f64,      // prop speed / engine speed
    contra: bool,
    governor: Option<(f64, f64)>, // min/max target shaft speed, rad/s
    controls: EngineControls,
    advance: f64,
    omega: f64,           // rad/s

    // Outputs of the last integrate
    thrust: f64,          // N along the thrust axis
    engine_torque: f64,   // N·m
    prop_torque: f64,     // N·m at the engine shaft
    fuel_flow: f64,       // kg/s
}

impl PropEngine {
    pub fn omega(&self) -> f64 { self.omega }
    pub fn set_omega(&mut self, omega: f64) { self.omega = omega; }
    pub fn thrust(&self) -> f64 { self.thrust }
    pub fn fuel_flow(&self) -> f64 { self.fuel_flow }
    pub fn engine(&self) -> &Engine { &self.engine }
    pub fn propeller(&self) -> &Propeller { &self.prop }
    pub fn propeller_mut(&mut self) -> &mut Propeller { &mut self.prop }
    pub fn controls(&self) -> &EngineControls { &self.controls }
    pub fn controls_mut(&mut self) -> &mut EngineControls { &mut self.controls }
    pub fn is_running(&self) -> bool { self.engine.is_running() }
    pub fn is_cranking(&self) -> bool { self.engine.is_cranking() }
    pub fn is_variable(&self) -> bool { self.governor.is_some() }

    /// Governor setting, 0 (min rpm) to 1 (max rpm).
    pub fn set_advance(&mut self, advance: f64) {
        self.advance = advance.clamp(0.0, 1.0);
    }

    /// Manual pitch lever, 0..1. Ignored unless the propeller is in
    /// manual mode.
    pub fn set_prop_pitch(&mut self, pitch: f64) {
        if self.prop.is_manual() {
            self.prop.set_prop_pitch(pitch);
        }
    }

    /// Reaction torque on the airframe along the thrust axis. The engine,
    /// not the propeller, is what pushes on the mount.
    pub fn axial_torque(&self) -> f64 {
        if self.contra {
            0.0
        } else if self.moment < 0.0 {
            self.engine_torque
        } else {
            -self.engine_torque
        }
    }

    /// Angular momentum of the rotating parts along the thrust axis.
    pub fn angular_momentum(&self) -> f64 {
        if self.contra {
            0.0
        } else {
            self.omega * self.moment
        }
    }

    /// Cold and dark: shaft nearly stopped, starter and magnetos off.
    pub fn init(&mut self) {
        self.omega = COLD_OMEGA;
        self.controls.starter = false;
        self.controls.magnetos = 0;
        self.engine.apply_controls(&self.controls);
    }

    fn target_omega(&self) -> Option<f64> {
        self.governor
            .map(|(min, max)| min + self.advance * (max - min))
    }

    /// Shaft torque absorbed by the propeller, referred to the engine.
    fn prop_load(&self, air: &Atmo, speed: f64) -> (f64, f64) {
        let (thrust, torque) = self.prop.calc(air.density, speed, self.omega * self.gear_ratio);
        (thrust, torque * self.gear_ratio)
    }

    /// Advance the shaft by one explicit Euler step of `dt` at axial
    /// airspeed `speed`.
    pub fn integrate(&mut self, dt: f64, air: &Atmo, speed: f64) {
        self.engine.apply_controls(&self.controls);

        let (thrust, prop_torque) = self.prop_load(air, speed);
        self.engine.calc(air, self.omega);
        self.engine.integrate(dt);
        let engine_torque = self.engine.torque();

        self.thrust = thrust;
        self.engine_torque = engine_torque;
        self.prop_torque = prop_torque;
        self.fuel_flow = self.engine.fuel_flow();

        self.omega += dt * (engine_torque - prop_torque) / self.moment.abs();
        // Windmilling is not modelled; a reversed shaft just spins forward.
        if self.omega < 0.0 {
            self.omega = -self.omega;
        }

        // Governor: assume torque goes as rpm squared and seek the pitch
        // that balances engine torque at the target speed.
        if let Some(target) = self.target_omega() {
            if dt > 0.0 && !self.prop.is_manual() {
                let ratio2 = (self.omega * self.omega) / (target * target);
                let target_torque = engine_torque * ratio2;
                let mut factor = if prop_torque < target_torque {
                    GOVERNOR_RATE
                } else {
                    1.0 / GOVERNOR_RATE
                };
                // Scale as an acceleration so big props seek no faster
                let diff = ((prop_torque - target_torque) / self.moment).abs();
                if diff < 10.0 {
                    factor = 1.0 + (factor - 1.0) * (0.1 * diff);
                }
                self.prop.mod_pitch(factor);
            }
        }
    }

    /// Find the equilibrium shaft speed (fixed pitch) or pitch (governed)
    /// with both magnetos live.
    pub fn stabilize(&mut self, air: &Atmo, speed: f64) -> std::result::Result<(), SolveError> {
        let saved = self.controls;
        self.controls.magnetos = 3;
        self.engine.apply_controls(&self.controls);

        let target = self.target_omega();
        match target {
            Some(t) => {
                self.omega = t;
                self.prop.mod_pitch(1e6);
            }
            None => self.omega = SEARCH_START_OMEGA,
        }

        let result = self.seek_equilibrium(air, speed, target.is_some());
        self.controls = saved;
        self.engine.apply_controls(&self.controls);
        result
    }

    fn seek_equilibrium(&mut self, air: &Atmo, speed: f64, governed: bool) -> std::result::Result<(), SolveError> {
        let mut going_up = false;
        let mut step = 10.0;
        for iter in 0..MAX_STABILIZE_ITERS {
            let (thrust, prop_torque) = self.prop_load(air, speed);
            // Slow engine states (spool, boost) settle before reading torque
            self.engine.calc(air, self.omega);
            self.engine.stabilize();
            self.engine.calc(air, self.omega);
            let engine_torque = self.engine.torque();
            let tdiff = engine_torque - prop_torque;

            self.thrust = thrust;
            self.engine_torque = engine_torque;
            self.prop_torque = prop_torque;
            self.fuel_flow = self.engine.fuel_flow();

            if (tdiff / self.moment).abs() < 0.1 {
                debug!(
                    "prop stabilized in {iter} iterations: omega={:.1} rad/s j0={:.4}",
                    self.omega,
                    self.prop.j0()
                );
                return Ok(());
            }

            if tdiff > 0.0 {
                if !going_up {
                    step *= 0.5;
                }
                going_up = true;
                if governed {
                    self.prop.mod_pitch(1.0 + step * 0.005);
                } else {
                    self.omega += step;
                }
            } else {
                if going_up {
                    step *= 0.5;
                }
                going_up = false;
                if governed {
                    self.prop.mod_pitch(1.0 - step * 0.005);
                } else {
                    self.omega -= step;
                    if self.omega < MIN_STABLE_OMEGA {
                        warn!("prop equilibrium below {:.1} rad/s, holding at the floor", MIN_STABLE_OMEGA);
                        self.omega = MIN_STABLE_OMEGA;
                        return Ok(());
                    }
                }
            }
        }
        Err(SolveError::Stabilize(MAX_STABILIZE_ITERS))
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct PropEngineBuilder {
    prop: Propeller,
    engine: Engine,
    moment: f64,
    gear_ratio: f64,
    contra: bool,
    governor: Option<(f64, f64)>,
    manual_pitch: bool,
}

impl PropEngineBuilder {
    pub fn new(prop: Propeller, engine: impl Into<Engine>, moment: f64) -> Self {
        Self {
            prop,
            engine: engine.into(),
            moment,
            gear_ratio: 1.0,
            contra: false,
            governor: None,
            manual_pitch: false,
        }
    }

    pub fn gear_ratio(mut self, v: f64) -> Self { self.gear_ratio = v; self }
    pub fn contra(mut self, v: bool) -> Self { self.contra = v; self }
    pub fn manual_pitch(mut self) -> Self { self.manual_pitch = true; self }

    /// Constant-speed propeller governed between `min` and `max` rad/s.
    pub fn variable_prop(mut self, min: f64, max: f64) -> Self {
        self.governor = Some((min, max));
        self
    }

    pub fn build(mut self) -> Result<PropEngine> {
        if self.moment == 0.0 || !self.moment.is_finite() {
            return Err(FdmError::invalid("propeller.moment", "moment of inertia must be non-zero"));
        }
        if !(self.gear_ratio > 0.0) {
            return Err(FdmError::invalid("propeller.gear-ratio", format!("{} must be positive", self.gear_ratio)));
        }
        if let Some((min, max)) = self.governor {
            if min >= max {
                return Err(FdmError::invalid("propeller.governor", format!("min {min} >= max {max}")));
            }
        }
        if self.manual_pitch {
            self.prop.set_manual_pitch();
        }
        Ok(PropEngine {
            prop: self.prop,
            engine: self.engine,
            moment: self.moment,
            gear_ratio: self.gear_ratio,
            contra: self.contra,
            governor: self.governor,
            controls: EngineControls::default(),
            advance: 1.0,
            omega: INITIAL_OMEGA,
            thrust: 0.0,
            engine_torque: 0.0,
            prop_torque: 0.0,
            fuel_flow: 0.0,
        })
    }
}
