use log::trace;
use nalgebra::Vector3;

use crate::aero::{Fuselage, Wing};
use crate::dynamics::{BodyEnvironment, ForceContext, ForceContributor, ForceSum, Integrator, RigidBody, State};
use crate::error::Result;
use crate::ground::{Gear, GroundQuery, Hook, Launchbar, NoGround};
use crate::physics::{gravity_force, Atmo};
use crate::propulsion::{MountedThruster, Thruster};
use super::control::{ControlKind, ControlSetting, ControlTarget};

// ---------------------------------------------------------------------------
// Force producers owned by the model
// ---------------------------------------------------------------------------

/// Every force contributor on the airframe. Membership is fixed once built.
#[derive(Debug, Clone, Default)]
pub struct Parts {
    pub wing: Option<Wing>,
    pub tail: Option<Wing>,
    pub vstabs: Vec<Wing>,
    pub fuselages: Vec<Fuselage>,
    pub thrusters: Vec<MountedThruster>,
    pub gears: Vec<Gear>,
    pub hooks: Vec<Hook>,
    pub launchbars: Vec<Launchbar>,
}

impl Parts {
    /// Main wing, tail, then vertical stabilizers.
    pub fn wings(&self) -> impl Iterator<Item = &Wing> {
        self.wing.iter().chain(self.tail.iter()).chain(self.vstabs.iter())
    }

    pub fn wings_mut(&mut self) -> impl Iterator<Item = &mut Wing> {
        self.wing
            .iter_mut()
            .chain(self.tail.iter_mut())
            .chain(self.vstabs.iter_mut())
    }

    fn wing_mut(&mut self, target: ControlTarget) -> Option<&mut Wing> {
        match target {
            ControlTarget::Wing => self.wing.as_mut(),
            ControlTarget::Tail => self.tail.as_mut(),
            ControlTarget::Vstab(i) => self.vstabs.get_mut(i),
            _ => None,
        }
    }

    /// Whether `target` names an existing part.
    pub fn has_target(&self, target: ControlTarget) -> bool {
        match target {
            ControlTarget::Thruster(i) => i < self.thrusters.len(),
            ControlTarget::Wing => self.wing.is_some(),
            ControlTarget::Tail => self.tail.is_some(),
            ControlTarget::Vstab(i) => i < self.vstabs.len(),
            ControlTarget::Gear(i) => i < self.gears.len(),
            ControlTarget::Hook(i) => i < self.hooks.len(),
            ControlTarget::Launchbar(i) => i < self.launchbars.len(),
        }
    }

    /// Push one control output into the part it drives.
    pub fn apply_control(&mut self, s: &ControlSetting) {
        use ControlKind::*;
        let (l, r) = (s.left, s.right);
        match (s.kind, s.target) {
            (Throttle | Mixture | CondLever | Starter | Magnetos | Advance | PropPitch | Boost, ControlTarget::Thruster(i)) => {
                if let Some(t) = self.thrusters.get_mut(i) {
                    apply_engine_control(t, s.kind, l);
                }
            }
            (Brake, ControlTarget::Gear(i)) => self.gears.get_mut(i).into_iter().for_each(|g| g.set_brake(l)),
            (Steer, ControlTarget::Gear(i)) => self.gears.get_mut(i).into_iter().for_each(|g| g.set_rotation(l)),
            (Extend, ControlTarget::Gear(i)) => self.gears.get_mut(i).into_iter().for_each(|g| g.set_extension(l)),
            (Castering, ControlTarget::Gear(i)) => {
                self.gears.get_mut(i).into_iter().for_each(|g| g.set_castering(l != 0.0))
            }
            (HookExtend, ControlTarget::Hook(i)) => self.hooks.get_mut(i).into_iter().for_each(|h| h.set_extension(l)),
            (LaunchbarExtend, ControlTarget::Launchbar(i)) => {
                self.launchbars.get_mut(i).into_iter().for_each(|b| b.set_extension(l))
            }
            (LaunchbarAccel, ControlTarget::Launchbar(i)) => {
                self.launchbars.get_mut(i).into_iter().for_each(|b| b.set_launch_cmd(l))
            }
            (kind, target) => {
                let Some(w) = self.wing_mut(target) else { return };
                match kind {
                    Flap0 => w.set_flap0(l, r),
                    Flap1 => w.set_flap1(l, r),
                    Slat => w.set_slat(l),
                    Spoiler => w.set_spoiler(l, r),
                    Incidence => w.set_incidence(l),
                    Flap0Effectiveness => w.set_flap0_effectiveness(l),
                    Flap1Effectiveness => w.set_flap1_effectiveness(l),
                    _ => {}
                }
            }
        }
    }
}

fn apply_engine_control(t: &mut MountedThruster, kind: ControlKind, v: f64) {
    match kind {
        ControlKind::Advance => {
            if let Thruster::Prop(p) = t.thruster_mut() {
                p.set_advance(v);
            }
        }
        ControlKind::PropPitch => {
            if let Thruster::Prop(p) = t.thruster_mut() {
                p.set_prop_pitch(v);
            }
        }
        _ => {
            let c = t.controls_mut();
            match kind {
                ControlKind::Throttle => c.throttle = v,
                ControlKind::Mixture => c.mixture = v,
                ControlKind::CondLever => c.cond_lever = v,
                ControlKind::Starter => c.starter = v != 0.0,
                ControlKind::Magnetos => c.magnetos = v.round() as u8,
                ControlKind::Boost => c.boost = v,
                _ => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Load evaluation
// ---------------------------------------------------------------------------

/// Read-only view used for the RK4 stage evaluations.
struct Loads<'a> {
    parts: &'a Parts,
    ctx: ForceContext<'a>,
    gravity: bool,
}

impl BodyEnvironment for Loads<'_> {
    fn calc_forces(&self, state: &State, body: &RigidBody) -> ForceSum {
        let mut sum = ForceSum::new(body.cg());
        let p = self.parts;
        for w in p.wings() {
            w.add_forces(&self.ctx, state, &mut sum);
        }
        for f in &p.fuselages {
            f.add_forces(&self.ctx, state, &mut sum);
        }
        for t in &p.thrusters {
            t.add_forces(&self.ctx, state, &mut sum);
        }
        for g in &p.gears {
            g.add_forces(&self.ctx, state, &mut sum);
        }
        for h in &p.hooks {
            h.add_forces(&self.ctx, state, &mut sum);
        }
        for l in &p.launchbars {
            l.add_forces(&self.ctx, state, &mut sum);
        }
        if self.gravity {
            let w = gravity_force(state.pos.z, body.total_mass());
            sum.add_force(&state.local_vector(&w));
        }
        sum
    }
}

// ---------------------------------------------------------------------------
// Model: body + parts + environment + integrator
// ---------------------------------------------------------------------------

pub struct Model {
    integrator: Integrator,
    body: RigidBody,
    parts: Parts,
    air: Atmo,
    wind: Vector3<f64>, // m/s world
    ground: Box<dyn GroundQuery>,
    gravity: bool,
}

impl Model {
    /// `body` must already be recalculated.
    pub fn new(body: RigidBody, parts: Parts) -> Self {
        Self {
            integrator: Integrator::new(body.clone()),
            body,
            parts,
            air: Atmo::standard(0.0),
            wind: Vector3::zeros(),
            ground: Box::new(NoGround),
            gravity: true,
        }
    }

    pub fn state(&self) -> &State { self.integrator.state() }
    pub fn set_state(&mut self, s: State) { self.integrator.set_state(s); }
    pub fn body(&self) -> &RigidBody { &self.body }
    pub fn body_mut(&mut self) -> &mut RigidBody { &mut self.body }
    pub fn parts(&self) -> &Parts { &self.parts }
    pub fn parts_mut(&mut self) -> &mut Parts { &mut self.parts }
    pub fn air(&self) -> Atmo { self.air }
    pub fn set_air(&mut self, air: Atmo) { self.air = air; }
    pub fn wind(&self) -> Vector3<f64> { self.wind }
    pub fn set_wind(&mut self, wind: Vector3<f64>) { self.wind = wind; }
    pub fn ground(&self) -> &dyn GroundQuery { self.ground.as_ref() }
    pub fn set_ground(&mut self, ground: Box<dyn GroundQuery>) { self.ground = ground; }
    pub fn set_gravity(&mut self, on: bool) { self.gravity = on; }

    /// Recalculate mass properties and hand the integrator a fresh copy.
    pub fn sync_body(&mut self) -> Result<()> {
        self.body.recalc()?;
        self.integrator.set_body(self.body.clone());
        Ok(())
    }

    /// Net load at `state` against the model's own ground.
    pub fn calc_forces(&self, state: &State) -> ForceSum {
        self.calc_forces_with(state, self.ground.as_ref())
    }

    /// Net load at `state` against `ground`.
    pub fn calc_forces_with(&self, state: &State, ground: &dyn GroundQuery) -> ForceSum {
        let loads = Loads {
            parts: &self.parts,
            ctx: ForceContext { air: self.air, wind: self.wind, ground },
            gravity: self.gravity,
        };
        loads.calc_forces(state, &self.body)
    }

    /// Total thrust of all thrusters, body frame.
    pub fn thrust(&self) -> Vector3<f64> {
        self.parts.thrusters.iter().map(|t| t.thrust()).sum()
    }

    /// Give each thruster the air and local wind at `state`.
    pub fn prepare_thrusters(&mut self, state: &State) {
        let ctx = ForceContext { air: self.air, wind: self.wind, ground: self.ground.as_ref() };
        for t in &mut self.parts.thrusters {
            t.set_wind(ctx.local_wind(state, &t.position()));
            t.set_air(self.air);
        }
    }

    /// Advance everything by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        let state = self.integrator.state().clone();
        self.prepare_thrusters(&state);
        for t in &mut self.parts.thrusters {
            t.integrate(dt);
        }

        let loads = Loads {
            parts: &self.parts,
            ctx: ForceContext { air: self.air, wind: self.wind, ground: self.ground.as_ref() },
            gravity: self.gravity,
        };
        self.integrator.calc_new_interval(&loads, dt);

        let state = self.integrator.state().clone();
        let ground = self.ground.as_ref();
        for g in &mut self.parts.gears {
            g.commit(ground, &state);
        }
        for h in &mut self.parts.hooks {
            h.commit(ground, &state);
        }
        for l in &mut self.parts.launchbars {
            l.commit(ground, &state);
        }
        trace!("model t={:.3} alt={:.2}", state.time, state.pos.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aero::WingBuilder;
    use crate::ground::{FlatGround, GearBuilder};
    use crate::propulsion::SimpleJet;
    use crate::vehicle::solver::solve_gear;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn lumped(mass: f64) -> RigidBody {
        RigidBody::lumped(mass, Vector3::zeros(), Matrix3::from_diagonal_element(mass)).unwrap()
    }

    #[test]
    fn thrust_gives_f_equals_ma() {
        let mut parts = Parts::default();
        let mut jet = MountedThruster::new(SimpleJet::new(2000.0), Vector3::zeros(), Vector3::x());
        jet.controls_mut().throttle = 1.0;
        parts.thrusters.push(jet);
        let mut model = Model::new(lumped(500.0), parts);
        model.set_gravity(false);

        let dt = 0.01;
        for _ in 0..100 {
            model.step(dt);
        }
        let s = model.state();
        assert_relative_eq!(s.vel.x, 4.0, max_relative = 1e-9);
        assert_relative_eq!(s.pos.x, 0.5 * 4.0 * 1.0, max_relative = 1e-6);
        assert_relative_eq!(s.acc.x, 4.0, max_relative = 1e-9);
    }

    #[test]
    fn winged_gearless_run_accelerates_monotonically() {
        let mut parts = Parts::default();
        let mut wing = WingBuilder::new(Vector3::zeros(), 5.0, 1.0).build().unwrap();
        wing.apply_drag_factor(0.01);
        parts.wing = Some(wing);
        let mut jet = MountedThruster::new(SimpleJet::new(2000.0), Vector3::zeros(), Vector3::x());
        jet.controls_mut().throttle = 1.0;
        parts.thrusters.push(jet);
        let mass = 500.0;
        let mut model = Model::new(lumped(mass), parts);
        model.set_gravity(false);

        let dt = 0.01;
        let mut last = 0.0;
        for i in 1..=200 {
            model.step(dt);
            let vx = model.state().vel.x;
            assert!(vx > last, "step {i}: {vx} <= {last}");
            last = vx;
        }

        // Drag only ever takes away from the point-mass answer, and never
        // more than the drag at the point-mass top speed would.
        let t = 200.0 * dt;
        let ideal = 2000.0 / mass * t;
        let q = 0.5 * Atmo::standard(0.0).density * ideal * ideal;
        let max_drag = q * 10.0 * 0.01;
        let s = model.state();
        assert!(s.vel.x < ideal);
        assert!(ideal - s.vel.x <= max_drag / mass * t, "lost {}", ideal - s.vel.x);
        assert_relative_eq!(s.vel.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn airplane_at_rest_stays_on_its_gear() {
        let mut parts = Parts::default();
        for pos in [
            Vector3::new(1.0, 0.0, -1.0),
            Vector3::new(-0.5, 1.0, -1.0),
            Vector3::new(-0.5, -1.0, -1.0),
        ] {
            parts.gears.push(GearBuilder::new(pos, 0.3).build().unwrap());
        }
        let body = lumped(1000.0);
        solve_gear(&mut parts.gears, &body, 30.0);
        let mut model = Model::new(body, parts);
        model.set_ground(Box::new(FlatGround::new(0.0)));
        model.set_state(State::pitched(Vector3::new(0.0, 0.0, 1.0), 0.0));

        for _ in 0..400 {
            model.step(1.0 / 200.0);
        }
        let s = model.state();
        assert!((s.pos.z - 1.0).abs() <= 0.3, "z = {}", s.pos.z);
        assert!(s.vel.x.hypot(s.vel.y) < 0.1);
        assert!(model.parts().gears.iter().all(|g| g.wow() > 0.0));
    }

    #[test]
    fn no_parts_means_free_fall() {
        let mut model = Model::new(lumped(10.0), Parts::default());
        model.set_state(State::pitched(Vector3::new(0.0, 0.0, 100.0), 0.0));
        model.step(0.1);
        assert!(model.state().vel.z < 0.0);
        assert_relative_eq!(model.state().vel.x, 0.0);
    }
}
