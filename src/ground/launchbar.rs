use log::info;
use nalgebra::Vector3;
use serde::Serialize;

use crate::dynamics::{ForceContext, ForceContributor, ForceSum, State};
use crate::error::{FdmError, Result};
use crate::units::DEG2RAD;
use super::query::{Catapult, GroundQuery};

// ---------------------------------------------------------------------------
// Catapult launch bar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LaunchbarReadout {
    pub angle: f64, // rad below the body x axis, leading
    pub attached: bool,
    pub launching: bool,
    pub travel: f64, // m along the catapult axis
}

/// Nose-mounted bar that engages a catapult shuttle.
#[derive(Debug, Clone)]
pub struct Launchbar {
    pos: Vector3<f64>, // mount, body
    length: f64,       // m
    up_angle: f64,     // rad
    down_angle: f64,   // rad
    extension: f64,
    launch: bool,
    attached: Option<Catapult>,
    readout: LaunchbarReadout,
}

impl Launchbar {
    /// Bar of `length` metres at mount `pos`; 45° down when extended.
    pub fn new(pos: Vector3<f64>, length: f64) -> Result<Self> {
        if !(length > 0.0) {
            return Err(FdmError::invalid("launchbar.length", "must be positive"));
        }
        Ok(Self {
            pos,
            length,
            up_angle: -45.0 * DEG2RAD,
            down_angle: 45.0 * DEG2RAD,
            extension: 0.0,
            launch: false,
            attached: None,
            readout: LaunchbarReadout::default(),
        })
    }

    pub fn with_angles(mut self, up: f64, down: f64) -> Self {
        self.up_angle = up;
        self.down_angle = down;
        self
    }

    pub fn position(&self) -> Vector3<f64> { self.pos }
    pub fn set_extension(&mut self, e: f64) { self.extension = e.clamp(0.0, 1.0); }
    /// Any positive command fires the catapult.
    pub fn set_launch_cmd(&mut self, cmd: f64) { self.launch = cmd > 0.0; }
    pub fn is_attached(&self) -> bool { self.attached.is_some() }
    pub fn readout(&self) -> LaunchbarReadout { self.readout }

    fn angle(&self) -> f64 {
        self.up_angle + self.extension * (self.down_angle - self.up_angle)
    }

    fn tip(&self) -> Vector3<f64> {
        let a = self.angle();
        self.pos + Vector3::new(a.cos(), 0.0, -a.sin()) * self.length
    }

    /// Distance the bar tip has moved along the catapult axis.
    fn travel(cat: &Catapult, state: &State, tip: &Vector3<f64>) -> f64 {
        (state.global_point(tip) - cat.start).dot(&cat.dir)
    }

    /// Catapult force in the world frame.
    fn load(&self, cat: &Catapult, state: &State) -> Vector3<f64> {
        let s = Self::travel(cat, state, &self.tip());
        if self.launch {
            if s < cat.stroke { cat.dir * cat.force } else { Vector3::zeros() }
        } else {
            // Holdback only resists creeping forward
            cat.dir * (-cat.holdback * s.max(0.0))
        }
    }

    pub fn commit(&mut self, ground: &dyn GroundQuery, state: &State) {
        let tip = self.tip();
        match self.attached {
            None if self.extension >= 1.0 => {
                if let Some(cat) = ground.catapult(&state.global_point(&tip)) {
                    info!("launch bar engaged catapult");
                    self.attached = Some(cat);
                }
            }
            Some(cat) => {
                let s = Self::travel(&cat, state, &tip);
                if (self.launch && s >= cat.stroke) || (!self.launch && self.extension < 1.0) {
                    info!("launch bar released after {s:.1} m");
                    self.attached = None;
                }
            }
            None => {}
        }
        self.readout = LaunchbarReadout {
            angle: self.angle(),
            attached: self.attached.is_some(),
            launching: self.attached.is_some() && self.launch,
            travel: self.attached.map_or(0.0, |c| Self::travel(&c, state, &tip)),
        };
    }
}

impl ForceContributor for Launchbar {
    fn add_forces(&self, _ctx: &ForceContext<'_>, state: &State, sum: &mut ForceSum) {
        let Some(cat) = &self.attached else { return };
        let f = state.local_vector(&self.load(cat, state));
        sum.add_force_at(&self.tip(), &f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::{FlatGround, NoGround};
    use crate::physics::Atmo;
    use approx::assert_relative_eq;

    fn deck_with_catapult() -> FlatGround {
        FlatGround::new(0.0).with_catapult(Catapult {
            start: Vector3::new(0.0, 0.0, 0.0),
            dir: Vector3::x(),
            stroke: 80.0,
            force: 4.0e5,
            holdback: 1.0e5,
        })
    }

    fn attached_bar(ground: &FlatGround) -> (Launchbar, State) {
        let mut bar = Launchbar::new(Vector3::new(4.0, 0.0, -1.0), 1.0).unwrap();
        bar.set_extension(1.0);
        // Put the tip on the shuttle
        let tip = bar.tip();
        let state = State::pitched(-tip, 0.0);
        bar.commit(ground, &state);
        (bar, state)
    }

    fn force(bar: &Launchbar, state: &State) -> Vector3<f64> {
        let ctx = ForceContext { air: Atmo::standard(0.0), wind: Vector3::zeros(), ground: &NoGround };
        let mut sum = ForceSum::new(Vector3::zeros());
        bar.add_forces(&ctx, state, &mut sum);
        sum.force
    }

    #[test]
    fn extended_bar_engages_shuttle() {
        let ground = deck_with_catapult();
        let (bar, _) = attached_bar(&ground);
        assert!(bar.is_attached());
        assert!(!bar.readout().launching);
    }

    #[test]
    fn holdback_resists_forward_creep() {
        let ground = deck_with_catapult();
        let (bar, mut state) = attached_bar(&ground);
        state.pos.x += 0.1;
        assert_relative_eq!(force(&bar, &state).x, -1.0e4, max_relative = 1e-9);
        state.pos.x -= 0.2;
        assert_relative_eq!(force(&bar, &state).x, 0.0);
    }

    #[test]
    fn launch_pushes_until_end_of_stroke() {
        let ground = deck_with_catapult();
        let (mut bar, mut state) = attached_bar(&ground);
        bar.set_launch_cmd(1.0);
        assert_relative_eq!(force(&bar, &state).x, 4.0e5);
        state.pos.x += 81.0;
        bar.commit(&ground, &state);
        assert!(!bar.is_attached());
        assert_eq!(force(&bar, &state), Vector3::zeros());
    }
}
