use nalgebra::Vector3;

use crate::ground::GroundQuery;
use crate::physics::atmosphere::Atmo;
use super::rigid_body::RigidBody;
use super::state::State;

// ---------------------------------------------------------------------------
// Force/torque accumulator
// ---------------------------------------------------------------------------

/// Net load on the body for one evaluation, all in the body frame.
/// Torque is taken about `cg`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceSum {
    pub cg: Vector3<f64>,
    pub force: Vector3<f64>,  // N
    pub torque: Vector3<f64>, // N·m
    pub gyro: Vector3<f64>,   // kg·m^2/s, angular momentum of spinning parts
}

impl ForceSum {
    pub fn new(cg: Vector3<f64>) -> Self {
        Self {
            cg,
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            gyro: Vector3::zeros(),
        }
    }

    /// Force acting at the CG.
    pub fn add_force(&mut self, f: &Vector3<f64>) {
        self.force += f;
    }

    /// Force acting at body point `pos`.
    pub fn add_force_at(&mut self, pos: &Vector3<f64>, f: &Vector3<f64>) {
        self.force += f;
        self.torque += (pos - self.cg).cross(f);
    }

    pub fn add_torque(&mut self, t: &Vector3<f64>) {
        self.torque += t;
    }

    pub fn add_gyro(&mut self, h: &Vector3<f64>) {
        self.gyro += h;
    }
}

// ---------------------------------------------------------------------------
// Capabilities consumed by the integrator and the aggregator
// ---------------------------------------------------------------------------

/// Source of loads for the integrator. Evaluated four times per step at
/// trial states, so implementations must not change persistent state.
pub trait BodyEnvironment {
    fn calc_forces(&self, state: &State, body: &RigidBody) -> ForceSum;
}

/// Ambient conditions shared by every contributor during one evaluation.
pub struct ForceContext<'a> {
    pub air: Atmo,
    pub wind: Vector3<f64>, // m/s, world
    pub ground: &'a dyn GroundQuery,
}

impl ForceContext<'_> {
    /// Velocity of the air relative to body point `pos`, in the body frame.
    pub fn local_wind(&self, state: &State, pos: &Vector3<f64>) -> Vector3<f64> {
        state.local_vector(&(self.wind - state.vel)) - state.rot.cross(pos)
    }
}

/// Anything that produces a load on the airframe.
pub trait ForceContributor {
    fn add_forces(&self, ctx: &ForceContext<'_>, state: &State, sum: &mut ForceSum);
}
