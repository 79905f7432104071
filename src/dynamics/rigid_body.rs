use nalgebra::{Matrix3, Vector3};

use crate::error::{FdmError, Result};
use super::forces::ForceSum;
use super::state::State;

// ---------------------------------------------------------------------------
// Mass properties built from point masses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMass {
    pub mass: f64,           // kg
    pub pos: Vector3<f64>,   // m, body
}

/// Handle returned by [`RigidBody::add_mass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MassId(usize);

/// Collection of point masses with cached totals.
///
/// Call [`RigidBody::recalc`] after changing any mass; the cached CG and
/// inertia are stale until then.
#[derive(Debug, Clone)]
pub struct RigidBody {
    masses: Vec<PointMass>,
    base_inertia: Matrix3<f64>, // kg·m^2, about the CG, added on top of the point masses
    total_mass: f64,
    cg: Vector3<f64>,
    inertia: Matrix3<f64>,
    inv_inertia: Matrix3<f64>,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidBody {
    pub fn new() -> Self {
        Self {
            masses: Vec::new(),
            base_inertia: Matrix3::zeros(),
            total_mass: 0.0,
            cg: Vector3::zeros(),
            inertia: Matrix3::zeros(),
            inv_inertia: Matrix3::zeros(),
        }
    }

    /// Single lumped mass with an explicit inertia tensor about its CG.
    pub fn lumped(mass: f64, cg: Vector3<f64>, inertia: Matrix3<f64>) -> Result<Self> {
        let mut body = Self::new();
        body.add_mass(mass, cg);
        body.base_inertia = inertia;
        body.recalc()?;
        Ok(body)
    }

    pub fn add_mass(&mut self, mass: f64, pos: Vector3<f64>) -> MassId {
        self.masses.push(PointMass { mass, pos });
        MassId(self.masses.len() - 1)
    }

    pub fn set_mass(&mut self, id: MassId, mass: f64) {
        self.masses[id.0].mass = mass;
    }

    pub fn set_mass_pos(&mut self, id: MassId, pos: Vector3<f64>) {
        self.masses[id.0].pos = pos;
    }

    pub fn mass(&self, id: MassId) -> f64 {
        self.masses[id.0].mass
    }

    pub fn num_masses(&self) -> usize {
        self.masses.len()
    }

    pub fn masses(&self) -> &[PointMass] {
        &self.masses
    }

    /// Multiply every mass from `first` onward by `scale`.
    pub fn scale_masses_from(&mut self, first: usize, scale: f64) {
        for m in self.masses.iter_mut().skip(first) {
            m.mass *= scale;
        }
    }

    /// Recompute total mass, CG and the inertia tensor about the CG.
    pub fn recalc(&mut self) -> Result<()> {
        let total: f64 = self.masses.iter().map(|m| m.mass).sum();
        if !(total > 0.0) {
            return Err(FdmError::invalid("mass", format!("total mass must be positive, got {total}")));
        }
        let cg = self
            .masses
            .iter()
            .fold(Vector3::zeros(), |acc, m| acc + m.pos * m.mass)
            / total;

        // I = Σ m [(r·r) E − r rᵀ], r relative to the CG
        let mut inertia = self.base_inertia;
        for m in &self.masses {
            let r = m.pos - cg;
            inertia += (Matrix3::identity() * r.dot(&r) - r * r.transpose()) * m.mass;
        }
        let inv = inertia.try_inverse().ok_or(FdmError::SingularInertia)?;

        self.total_mass = total;
        self.cg = cg;
        self.inertia = inertia;
        self.inv_inertia = inv;
        Ok(())
    }

    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    pub fn cg(&self) -> Vector3<f64> {
        self.cg
    }

    pub fn inertia(&self) -> &Matrix3<f64> {
        &self.inertia
    }

    /// Velocity of body point `pos` due to rotation about the CG.
    pub fn point_velocity(&self, pos: &Vector3<f64>, rot: &Vector3<f64>) -> Vector3<f64> {
        rot.cross(&(pos - self.cg))
    }

    /// Linear (world) and angular (body) accelerations from a force sum.
    ///
    /// Euler's equation with the spinning-mass momentum included:
    /// α = I⁻¹ (τ − ω × (Iω + h))
    pub fn accelerations(&self, sum: &ForceSum, state: &State) -> (Vector3<f64>, Vector3<f64>) {
        let acc = state.global_vector(&(sum.force / self.total_mass));
        let momentum = self.inertia * state.rot + sum.gyro;
        let racc = self.inv_inertia * (sum.torque - state.rot.cross(&momentum));
        (acc, racc)
    }

    /// Rotational kinetic energy at body rate `rot`.
    pub fn rotational_energy(&self, rot: &Vector3<f64>) -> f64 {
        0.5 * rot.dot(&(self.inertia * rot))
    }
}
