use nalgebra::Vector3;
use serde::Serialize;

use crate::dynamics::{MassId, RigidBody};
use crate::error::{FdmError, Result};

// ---------------------------------------------------------------------------
// Variable masses: fuel tanks, payload stations, ballast
// ---------------------------------------------------------------------------

/// Density of jet fuel, kg/m^3.
pub const JET_FUEL_DENSITY: f64 = 804.0;
/// Density of aviation gasoline, kg/m^3.
pub const AVGAS_DENSITY: f64 = 720.0;

#[derive(Debug, Clone, Serialize)]
pub struct Tank {
    pub pos: Vector3<f64>, // m body
    pub capacity: f64,     // kg
    pub fill: f64,         // kg
    pub density: f64,      // kg/m^3
    #[serde(skip)]
    handle: Option<MassId>,
}

impl Tank {
    pub fn new(pos: Vector3<f64>, capacity: f64) -> Self {
        Self {
            pos,
            capacity,
            fill: capacity,
            density: AVGAS_DENSITY,
            handle: None,
        }
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_fill(mut self, fill: f64) -> Self {
        self.fill = fill;
        self
    }

    /// Contents in m^3.
    pub fn volume(&self) -> f64 {
        self.fill / self.density
    }
}

/// A named payload station. The solver loads it with the weight given for
/// each trim condition.
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    pub name: String,
    pub pos: Vector3<f64>, // m body
    pub mass: f64,         // kg, current
    pub cruise: f64,       // kg while trimming cruise
    pub approach: f64,     // kg while trimming approach
    #[serde(skip)]
    handle: Option<MassId>,
}

impl Payload {
    pub fn new(name: &str, pos: Vector3<f64>, mass: f64) -> Self {
        Self {
            name: name.to_string(),
            pos,
            mass,
            cruise: mass,
            approach: mass,
            handle: None,
        }
    }

    pub fn solve_weights(mut self, cruise: f64, approach: f64) -> Self {
        self.cruise = cruise;
        self.approach = approach;
        self
    }
}

/// Which trim condition a mass setup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Cruise,
    Approach,
}

#[derive(Debug, Clone, Default)]
pub struct MassModel {
    tanks: Vec<Tank>,
    payloads: Vec<Payload>,
}

impl MassModel {
    pub fn new(tanks: Vec<Tank>, payloads: Vec<Payload>) -> Result<Self> {
        for t in &tanks {
            if !(t.capacity >= 0.0) || t.fill < 0.0 || t.fill > t.capacity {
                return Err(FdmError::invalid("tank.fill", format!("{} outside 0..{}", t.fill, t.capacity)));
            }
            if !(t.density > 0.0) {
                return Err(FdmError::invalid("tank.density", "must be positive"));
            }
        }
        if let Some(p) = payloads.iter().find(|p| p.mass < 0.0 || p.cruise < 0.0 || p.approach < 0.0) {
            return Err(FdmError::invalid("payload.mass", format!("{} has a negative weight", p.name)));
        }
        Ok(Self { tanks, payloads })
    }

    /// Add every tank and payload to `body` as point masses.
    pub fn attach(&mut self, body: &mut RigidBody) {
        for t in &mut self.tanks {
            t.handle = Some(body.add_mass(t.fill, t.pos));
        }
        for p in &mut self.payloads {
            p.handle = Some(body.add_mass(p.mass, p.pos));
        }
    }

    /// Copy the current fills and payloads into `body`.
    pub fn apply(&self, body: &mut RigidBody) {
        for t in &self.tanks {
            if let Some(h) = t.handle {
                body.set_mass(h, t.fill);
            }
        }
        for p in &self.payloads {
            if let Some(h) = p.handle {
                body.set_mass(h, p.mass);
            }
        }
    }

    /// Like [`apply`](Self::apply), but with the solve weights for `cond`.
    pub fn apply_for(&self, body: &mut RigidBody, cond: Condition) {
        self.apply(body);
        for p in &self.payloads {
            if let Some(h) = p.handle {
                let m = match cond {
                    Condition::Cruise => p.cruise,
                    Condition::Approach => p.approach,
                };
                body.set_mass(h, m);
            }
        }
    }

    pub fn tanks(&self) -> &[Tank] {
        &self.tanks
    }

    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    pub fn set_tank_fill(&mut self, tank: usize, fill: f64) -> Result<()> {
        let t = self
            .tanks
            .get_mut(tank)
            .ok_or_else(|| FdmError::invalid("tank", format!("no tank {tank}")))?;
        t.fill = fill.clamp(0.0, t.capacity);
        Ok(())
    }

    /// Fill every tank to `frac` of its capacity.
    pub fn set_fuel_fraction(&mut self, frac: f64) {
        let frac = frac.clamp(0.0, 1.0);
        for t in &mut self.tanks {
            t.fill = t.capacity * frac;
        }
    }

    pub fn set_payload(&mut self, name: &str, mass: f64) -> Result<()> {
        let p = self
            .payloads
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| FdmError::invalid("payload", format!("no payload named {name}")))?;
        p.mass = mass.max(0.0);
        Ok(())
    }

    pub fn fuel(&self) -> f64 {
        self.tanks.iter().map(|t| t.fill).sum()
    }

    pub fn capacity(&self) -> f64 {
        self.tanks.iter().map(|t| t.capacity).sum()
    }

    /// Remove `mass` kg of fuel, drawn from every tank in proportion to its
    /// contents. Returns the mass actually removed.
    pub fn drain(&mut self, mass: f64) -> f64 {
        let total = self.fuel();
        if total <= 0.0 || mass <= 0.0 {
            return 0.0;
        }
        let taken = mass.min(total);
        let frac = taken / total;
        for t in &mut self.tanks {
            t.fill -= t.fill * frac;
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_tanks() -> MassModel {
        MassModel::new(
            vec![
                Tank::new(Vector3::new(0.0, 2.0, 0.0), 100.0),
                Tank::new(Vector3::new(0.0, -2.0, 0.0), 100.0).with_fill(50.0),
            ],
            vec![Payload::new("pilot", Vector3::new(1.0, 0.0, 0.0), 80.0).solve_weights(90.0, 70.0)],
        )
        .unwrap()
    }

    #[test]
    fn drain_is_proportional_to_contents() {
        let mut m = two_tanks();
        let taken = m.drain(30.0);
        assert_relative_eq!(taken, 30.0);
        assert_relative_eq!(m.tanks()[0].fill, 80.0);
        assert_relative_eq!(m.tanks()[1].fill, 40.0);
        assert_relative_eq!(m.drain(1000.0), 120.0);
        assert_relative_eq!(m.fuel(), 0.0);
        assert_relative_eq!(m.drain(1.0), 0.0);
    }

    #[test]
    fn solve_weights_replace_payload() {
        let mut m = two_tanks();
        let mut body = RigidBody::new();
        body.add_mass(1000.0, Vector3::zeros());
        m.attach(&mut body);
        m.apply_for(&mut body, Condition::Cruise);
        body.recalc().unwrap();
        assert_relative_eq!(body.total_mass(), 1000.0 + 150.0 + 90.0);
        m.apply_for(&mut body, Condition::Approach);
        body.recalc().unwrap();
        assert_relative_eq!(body.total_mass(), 1000.0 + 150.0 + 70.0);
    }

    #[test]
    fn overfilled_tank_is_rejected() {
        let t = Tank::new(Vector3::zeros(), 10.0).with_fill(20.0);
        assert!(MassModel::new(vec![t], Vec::new()).is_err());
    }

    #[test]
    fn unknown_payload_is_an_error() {
        let mut m = two_tanks();
        assert!(m.set_payload("cargo", 10.0).is_err());
        m.set_payload("pilot", 100.0).unwrap();
        assert_relative_eq!(m.payloads()[0].mass, 100.0);
    }
}
