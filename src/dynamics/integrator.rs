use log::trace;

use super::forces::BodyEnvironment;
use super::rigid_body::RigidBody;
use super::state::{orthonormalize, Deriv, State};

// ---------------------------------------------------------------------------
// RK4 integrator on (position, orientation matrix, velocity, rotation rate)
// ---------------------------------------------------------------------------

/// Owns the frozen [`RigidBody`] and the authoritative [`State`].
///
/// The environment is handed in for each interval because it borrows the
/// model that also owns this integrator.
#[derive(Debug, Clone)]
pub struct Integrator {
    body: RigidBody,
    state: State,
}

impl Integrator {
    pub fn new(body: RigidBody) -> Self {
        Self {
            body,
            state: State::default(),
        }
    }

    pub fn set_body(&mut self, body: RigidBody) {
        self.body = body;
    }

    pub fn body(&self) -> &RigidBody {
        &self.body
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Advance the state by one interval of `dt` seconds.
    pub fn calc_new_interval<E: BodyEnvironment + ?Sized>(&mut self, env: &E, dt: f64) {
        let s0 = &self.state;

        let k1 = derivative(env, &self.body, s0);
        let k2 = derivative(env, &self.body, &s0.extrapolate(&k1, dt * 0.5));
        let k3 = derivative(env, &self.body, &s0.extrapolate(&k2, dt * 0.5));
        let k4 = derivative(env, &self.body, &s0.extrapolate(&k3, dt));

        let avg = Deriv::rk4_average(&k1, &k2, &k3, &k4);
        let mut next = s0.extrapolate(&avg, dt);
        orthonormalize(&mut next.orient);
        next.acc = avg.acc;
        next.racc = avg.racc;

        trace!(
            "t={:.4} pos=({:.3},{:.3},{:.3}) vel=({:.3},{:.3},{:.3})",
            next.time, next.pos.x, next.pos.y, next.pos.z, next.vel.x, next.vel.y, next.vel.z
        );
        self.state = next;
    }
}

/// Rates of the state at `s`, with accelerations from the environment.
fn derivative<E: BodyEnvironment + ?Sized>(env: &E, body: &RigidBody, s: &State) -> Deriv {
    let sum = env.calc_forces(s, body);
    let (acc, racc) = body.accelerations(&sum, s);
    Deriv {
        vel: s.vel,
        rot: s.rot,
        acc,
        racc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::forces::ForceSum;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Vector3};

    /// Constant body-frame load.
    struct ConstantLoad {
        force: Vector3<f64>,
        torque: Vector3<f64>,
    }

    impl BodyEnvironment for ConstantLoad {
        fn calc_forces(&self, _state: &State, body: &RigidBody) -> ForceSum {
            let mut sum = ForceSum::new(body.cg());
            sum.add_force(&self.force);
            sum.add_torque(&self.torque);
            sum
        }
    }

    fn unloaded() -> ConstantLoad {
        ConstantLoad {
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }

    fn body() -> RigidBody {
        RigidBody::lumped(
            100.0,
            Vector3::zeros(),
            Matrix3::from_diagonal(&Vector3::new(10.0, 20.0, 25.0)),
        )
        .unwrap()
    }

    #[test]
    fn orientation_stays_orthonormal() {
        let mut integ = Integrator::new(body());
        integ.set_state(State {
            rot: Vector3::new(1.3, -0.7, 2.1),
            ..State::default()
        });
        let load = ConstantLoad {
            force: Vector3::new(10.0, -3.0, 5.0),
            torque: Vector3::new(4.0, 1.0, -2.0),
        };
        for _ in 0..50 {
            integ.calc_new_interval(&load, 0.05);
            assert!(integ.state().is_orthonormal(1e-5));
        }
    }

    #[test]
    fn zero_load_is_linear_motion() {
        let mut integ = Integrator::new(body());
        let v = Vector3::new(30.0, -2.0, 1.5);
        integ.set_state(State {
            pos: Vector3::new(1.0, 2.0, 300.0),
            vel: v,
            ..State::default()
        });
        let dt = 0.02;
        integ.calc_new_interval(&unloaded(), dt);
        let s = integ.state();
        assert_relative_eq!(s.vel, v, epsilon = 1e-12);
        assert_relative_eq!(s.rot, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(s.pos, Vector3::new(1.0, 2.0, 300.0) + v * dt, epsilon = 1e-9);
        assert_relative_eq!(s.time, dt);
    }

    #[test]
    fn torque_free_rotation_conserves_energy() {
        let b = body();
        let mut integ = Integrator::new(b.clone());
        let rot0 = Vector3::new(1.0, 0.1, 0.1);
        integ.set_state(State {
            rot: rot0,
            ..State::default()
        });
        let e0 = b.rotational_energy(&rot0);
        for _ in 0..2000 {
            integ.calc_new_interval(&unloaded(), 0.005);
        }
        let e1 = b.rotational_energy(&integ.state().rot);
        assert!(
            ((e1 - e0) / e0).abs() < 1e-4,
            "energy drifted from {e0} to {e1}"
        );
        assert!(integ.state().is_orthonormal(1e-5));
    }

    #[test]
    fn constant_force_matches_kinematics() {
        let mut integ = Integrator::new(body());
        let load = ConstantLoad {
            force: Vector3::new(200.0, 0.0, 0.0),
            torque: Vector3::zeros(),
        };
        for _ in 0..100 {
            integ.calc_new_interval(&load, 0.01);
        }
        // a = 2 m/s^2 for 1 s
        let s = integ.state();
        assert_relative_eq!(s.vel.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(s.pos.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(s.acc.x, 2.0, epsilon = 1e-12);
    }
}
