use log::{debug, info, warn};
use nalgebra::Vector3;

use crate::dynamics::{RigidBody, State};
use crate::error::{FdmError, Result, SolveError};
use crate::ground::{Gear, NoGround};
use crate::physics::Atmo;
use crate::units::G0;
use super::airplane::Airplane;
use super::mass::Condition;

// ---------------------------------------------------------------------------
// Trim solver
// ---------------------------------------------------------------------------
//
// Five evaluations per iteration: cruise, approach, cruise with the AoA
// nudged, cruise with the tail incidence nudged, approach with the elevator
// nudged. Drag and lift are corrected first; once both factors are within
// STHRESH of unity the cruise AoA, tail incidence and approach elevator are
// walked toward zero residual by damped Newton steps.

/// AoA and incidence perturbation, one arc minute in radians.
const ARCMIN: f64 = 0.0002909;
const ELEVDIDDLE: f64 = 0.001;
/// Damping applied to every correction.
const SOLVE_TWEAK: f64 = 0.3226;
const STHRESH: f64 = 1.0;
const MAX_ITERATIONS: usize = 10_000;
/// Working clamp on the cruise AoA and tail incidence, rad.
const TRIM_CLAMP: f64 = 0.175;
const TEN_DEGREES: f64 = 0.174_532_93;

/// Approach speed used to size the gear when no approach is configured, m/s.
pub const DEFAULT_APPROACH_SPEED: f64 = 30.0;

/// Result of a successful trim.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Trim {
    pub cruise_aoa: f64,        // rad
    pub tail_incidence: f64,    // rad
    pub approach_elevator: f64, // elevator axis value
    pub drag_factor: f64,
    pub lift_ratio: f64,
    pub iterations: usize,
}

impl Default for Trim {
    fn default() -> Self {
        Self {
            cruise_aoa: 0.0,
            tail_incidence: 0.0,
            approach_elevator: 0.0,
            drag_factor: 1.0,
            lift_ratio: 1.0,
            iterations: 0,
        }
    }
}

/// Loads at one trim condition, body frame.
#[derive(Debug, Clone, Copy)]
struct Trial {
    force: Vector3<f64>, // N, gravity included
    racc: Vector3<f64>,  // rad/s^2
    thrust: f64,         // N along body x
    mass: f64,           // kg
}

fn norm_factor(f: f64) -> f64 {
    let f = f.abs();
    if f < 1.0 { 1.0 / f } else { f }
}

/// A level-wings state flying at `speed` along a path `glide` radians
/// below the horizon, nose `aoa` above the path.
pub fn trim_state(aoa: f64, speed: f64, glide: f64, altitude: f64) -> State {
    let mut s = State::pitched(Vector3::new(0.0, 0.0, altitude), aoa - glide);
    s.vel = Vector3::new(speed * glide.cos(), 0.0, -speed * glide.sin());
    s
}

/// Scale gear springs and dampers so that an approach-speed sink is
/// absorbed within the strut travel.
///
/// Each gear's share of the weight falls off with its horizontal distance
/// from the CG; gear ignored by the solver is sized from its own share but
/// does not dilute the others.
pub fn solve_gear(gears: &mut [Gear], body: &RigidBody, approach_speed: f64) {
    let cg = body.cg();
    let mass = body.total_mass();
    let share = |g: &Gear| {
        let d = g.position() - cg;
        1.0 / (0.5 + d.x.hypot(d.y))
    };
    let total: f64 = gears.iter().filter(|g| !g.is_ignored_by_solver()).map(share).sum();
    if total <= 0.0 {
        return;
    }

    let sink = 2.0 * approach_speed / 19.1;
    let energy = 0.5 * mass * sink * sink;
    for g in gears.iter_mut() {
        let w = share(g) / total;
        let len = g.spring_length();
        let k = 2.0 * energy * w / (len * len);
        let c = 2.0 * (k * mass * w).sqrt();
        g.scale_suspension(k, c);
        debug!("gear at {:?}: share {w:.3}, k {:.0} N/m, c {:.0} N·s/m", g.position().as_slice(), g.spring(), g.damping());
    }
}

impl Airplane {
    /// Trim drag, lift, cruise AoA, tail incidence and approach elevator so
    /// that both configured conditions are in equilibrium.
    ///
    /// The failure, if any, is also kept for [`Airplane::failure`].
    pub fn solve(&mut self) -> Result<()> {
        let saved_mass = self.mass.clone();
        let result = self.run_solver();

        self.mass = saved_mass;
        self.mass.apply(self.model.body_mut());
        self.model.sync_body()?;
        self.controls.reset();
        self.controls.apply(1.0e6);
        self.push_controls();

        match result {
            Ok(()) => {
                self.failure = None;
                let t = &self.trim;
                info!(
                    "solved in {} iterations: cruise AoA {:.2}°, tail incidence {:.2}°, approach elevator {:.3}, drag factor {:.4}, lift ratio {:.3}",
                    t.iterations,
                    t.cruise_aoa.to_degrees(),
                    t.tail_incidence.to_degrees(),
                    t.approach_elevator,
                    t.drag_factor,
                    t.lift_ratio
                );
                Ok(())
            }
            Err(FdmError::Solve(e)) => {
                warn!("solve failed: {e}");
                self.failure = Some(e.clone());
                Err(FdmError::Solve(e))
            }
            Err(e) => Err(e),
        }
    }

    fn run_solver(&mut self) -> Result<()> {
        let glide = self.cruise.as_ref().ok_or(FdmError::MissingParameter("cruise"))?.glide;
        if self.approach.is_none() {
            return Err(FdmError::MissingParameter("approach"));
        }
        let tail_incidence = self
            .model
            .parts()
            .tail
            .as_ref()
            .ok_or(SolveError::MissingSurface("tail"))?
            .incidence();
        self.trim = Trim {
            tail_incidence,
            ..Trim::default()
        };

        for iter in 1..=MAX_ITERATIONS {
            self.trim.iterations = iter;

            let cruise = self.run_condition(Condition::Cruise)?;
            let thrust = cruise.thrust + cruise.mass * G0 * glide.sin();
            let xforce = cruise.force.x;
            let clift0 = cruise.force.z;
            let pitch0 = cruise.racc.y;

            let approach = self.run_condition(Condition::Approach)?;
            let apitch0 = approach.racc.y;
            let alift = approach.force.z;

            self.trim.cruise_aoa += ARCMIN;
            let clift1 = self.run_condition(Condition::Cruise)?.force.z;
            self.trim.cruise_aoa -= ARCMIN;

            self.trim.tail_incidence += ARCMIN;
            let pitch1 = self.run_condition(Condition::Cruise)?.racc.y;
            self.trim.tail_incidence -= ARCMIN;

            let awgt = G0 * approach.mass;
            let drag_factor = thrust / (thrust - xforce);
            let lift_factor = awgt / (awgt + alift);
            let aoa_delta = -clift0 * (ARCMIN / (clift1 - clift0));
            let tail_delta = -pitch0 * (ARCMIN / (pitch1 - pitch0));

            if !(drag_factor > 0.0) {
                return Err(SolveError::DragFactor(drag_factor).into());
            }
            if !(lift_factor > 0.0) {
                return Err(SolveError::LiftRatio(lift_factor).into());
            }

            // Same idea as the tail incidence, on the approach pitch axis
            self.trim.approach_elevator += ELEVDIDDLE;
            let apitch1 = self.run_condition(Condition::Approach)?.racc.y;
            self.trim.approach_elevator -= ELEVDIDDLE;
            let elev_delta = -apitch0 * (ELEVDIDDLE / (apitch1 - apitch0));

            debug!(
                "solve {iter}: drag {drag_factor:.5} lift {lift_factor:.5} aoa {aoa_delta:.2e} tail {tail_delta:.2e} elev {elev_delta:.2e}"
            );

            self.apply_drag_factor(drag_factor);
            self.apply_lift_ratio(lift_factor);

            // Minor variables wait until lift and drag are in the ballpark
            if norm_factor(drag_factor) > STHRESH * 1.0001 || norm_factor(lift_factor) > STHRESH * 1.0001 {
                continue;
            }
            if !(aoa_delta.is_finite() && tail_delta.is_finite() && elev_delta.is_finite()) {
                return Err(SolveError::NoConvergence(iter).into());
            }

            self.trim.cruise_aoa = (self.trim.cruise_aoa + SOLVE_TWEAK * aoa_delta).clamp(-TRIM_CLAMP, TRIM_CLAMP);
            self.trim.tail_incidence =
                (self.trim.tail_incidence + SOLVE_TWEAK * tail_delta).clamp(-TRIM_CLAMP, TRIM_CLAMP);

            if (xforce / cruise.mass).abs() < STHRESH * 0.0001
                && (alift / approach.mass).abs() < STHRESH * 0.0001
                && aoa_delta.abs() < STHRESH * 0.000017
                && tail_delta.abs() < STHRESH * 0.000017
            {
                if elev_delta.abs() < STHRESH * 0.0001 {
                    return self.check_bounds();
                }
                self.trim.approach_elevator += SOLVE_TWEAK * elev_delta;
                if self.trim.approach_elevator.abs() > 1.0 {
                    return Err(SolveError::InsufficientElevator.into());
                }
            }
        }
        Err(SolveError::NoConvergence(MAX_ITERATIONS).into())
    }

    fn check_bounds(&self) -> Result<()> {
        let t = &self.trim;
        if t.drag_factor < 1e-6 || t.drag_factor > 1e6 {
            return Err(SolveError::DragFactor(t.drag_factor).into());
        }
        if t.lift_ratio < 1e-4 || t.lift_ratio > 1e4 {
            return Err(SolveError::LiftRatio(t.lift_ratio).into());
        }
        if t.cruise_aoa.abs() >= TEN_DEGREES {
            return Err(SolveError::CruiseAoa.into());
        }
        if t.tail_incidence.abs() >= TEN_DEGREES {
            return Err(SolveError::TailIncidence.into());
        }
        Ok(())
    }

    /// Configure the model for `cond` and evaluate its loads with the
    /// thrusters stabilized.
    fn run_condition(&mut self, cond: Condition) -> Result<Trial> {
        let (speed, altitude, aoa, glide, fuel) = match cond {
            Condition::Cruise => {
                let c = self.cruise.as_ref().ok_or(FdmError::MissingParameter("cruise"))?;
                (c.speed, c.altitude, self.trim.cruise_aoa, c.glide, c.fuel)
            }
            Condition::Approach => {
                let a = self.approach.as_ref().ok_or(FdmError::MissingParameter("approach"))?;
                (a.speed, a.altitude, a.aoa, a.glide, a.fuel)
            }
        };
        let state = trim_state(aoa, speed, glide, altitude);
        self.model.set_air(Atmo::standard(altitude));
        self.model.set_wind(Vector3::zeros());

        // Controls
        self.controls.reset();
        let inputs = match cond {
            Condition::Cruise => &self.cruise_inputs,
            Condition::Approach => &self.approach_inputs,
        };
        for &(axis, value) in inputs {
            self.controls.set_input(axis, value);
        }
        if let (Condition::Approach, Some(elevator)) = (cond, self.elevator) {
            self.controls.set_input(elevator, self.trim.approach_elevator);
        }
        self.controls.apply(1.0e6);
        self.push_controls();
        if let Some(tail) = self.model.parts_mut().tail.as_mut() {
            tail.set_incidence(self.trim.tail_incidence);
        }

        // Masses
        self.mass.set_fuel_fraction(fuel);
        self.mass.apply_for(self.model.body_mut(), cond);
        self.model.sync_body()?;

        // Thrust at equilibrium shaft speed
        self.model.prepare_thrusters(&state);
        for t in &mut self.model.parts_mut().thrusters {
            t.stabilize()?;
        }

        let sum = self.model.calc_forces_with(&state, &NoGround);
        let body = self.model.body();
        let (_, racc) = body.accelerations(&sum, &state);
        Ok(Trial {
            force: sum.force,
            racc,
            thrust: self.model.thrust().x,
            mass: body.total_mass(),
        })
    }

    fn apply_drag_factor(&mut self, factor: f64) {
        let applied = factor.powf(SOLVE_TWEAK);
        self.trim.drag_factor *= applied;
        let parts = self.model.parts_mut();
        for w in parts.wings_mut() {
            w.apply_drag_factor(applied);
        }
        for f in &mut parts.fuselages {
            f.apply_drag_factor(applied);
        }
    }

    fn apply_lift_ratio(&mut self, factor: f64) {
        let applied = factor.powf(SOLVE_TWEAK);
        self.trim.lift_ratio *= applied;
        for w in self.model.parts_mut().wings_mut() {
            w.set_lift_ratio(w.lift_ratio() * applied);
        }
    }
}
