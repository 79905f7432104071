use nalgebra::Vector3;
use log::info;
use serde::Serialize;

use crate::dynamics::{ForceContext, ForceContributor, ForceSum, State};
use crate::error::{FdmError, Result};
use crate::units::DEG2RAD;
use super::query::{ArrestingWire, GroundQuery, LocalGround};

// ---------------------------------------------------------------------------
// Arrestor hook
// ---------------------------------------------------------------------------

const REST_ITERATIONS: usize = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HookReadout {
    pub angle: f64, // rad below the body x axis, trailing
    pub caught: bool,
    pub tension: f64, // N
}

#[derive(Debug, Clone, Copy)]
struct Caught {
    wire: ArrestingWire,
    anchor: Vector3<f64>, // world
}

/// A trailing hook hinged at `pos` that can catch deck cables.
#[derive(Debug, Clone)]
pub struct Hook {
    pos: Vector3<f64>, // pivot, body
    length: f64,       // m
    up_angle: f64,     // rad
    down_angle: f64,   // rad
    extension: f64,
    caught: Option<Caught>,
    readout: HookReadout,
}

impl Hook {
    /// Hook of `length` metres at pivot `pos`, 70° down when extended.
    pub fn new(pos: Vector3<f64>, length: f64) -> Result<Self> {
        if !(length > 0.0) {
            return Err(FdmError::invalid("hook.length", "must be positive"));
        }
        Ok(Self {
            pos,
            length,
            up_angle: 0.0,
            down_angle: 70.0 * DEG2RAD,
            extension: 0.0,
            caught: None,
            readout: HookReadout::default(),
        })
    }

    pub fn with_angles(mut self, up: f64, down: f64) -> Self {
        self.up_angle = up;
        self.down_angle = down;
        self
    }

    pub fn position(&self) -> Vector3<f64> { self.pos }
    pub fn set_extension(&mut self, e: f64) { self.extension = e.clamp(0.0, 1.0); }
    pub fn is_caught(&self) -> bool { self.caught.is_some() }
    pub fn readout(&self) -> HookReadout { self.readout }

    fn tip_at(&self, angle: f64) -> Vector3<f64> {
        self.pos + Vector3::new(-angle.cos(), 0.0, -angle.sin()) * self.length
    }

    /// Hook angle at `state`, resting on the surface if it would dig in.
    fn angle(&self, ground: &dyn GroundQuery, state: &State) -> f64 {
        let free = self.up_angle + self.extension * (self.down_angle - self.up_angle);
        let Some(g) = LocalGround::under(ground, state, &self.tip_at(free)) else {
            return free;
        };
        if g.height(&self.tip_at(free)) >= 0.0 {
            return free;
        }
        if g.height(&self.tip_at(self.up_angle)) < 0.0 {
            return self.up_angle;
        }
        let (mut lo, mut hi) = (self.up_angle, free);
        for _ in 0..REST_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if g.height(&self.tip_at(mid)) < 0.0 {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        lo
    }

    /// Cable tension vector in the world frame.
    fn tension(&self, c: &Caught, state: &State, tip: &Vector3<f64>) -> Vector3<f64> {
        let tip_w = state.global_point(tip);
        let d = c.anchor - tip_w;
        let len = d.norm();
        if len < 1e-9 {
            return Vector3::zeros();
        }
        let dir = d / len;
        let tip_vel = state.global_vector(&state.point_velocity(tip));
        // Payout rate is the tip velocity away from the anchor
        let payout = -tip_vel.dot(&dir);
        let t = (c.wire.spring * len + c.wire.damping * payout).clamp(0.0, c.wire.max_force);
        dir * t
    }

    pub fn commit(&mut self, ground: &dyn GroundQuery, state: &State) {
        let angle = self.angle(ground, state);
        let tip = self.tip_at(angle);
        if self.extension < 1.0 {
            if self.caught.take().is_some() {
                info!("hook released wire");
            }
        } else if self.caught.is_none() {
            let tip_w = state.global_point(&tip);
            if let Some(wire) = ground.arresting_wire(&tip_w) {
                info!("hook caught wire at {:.1?}", tip_w.as_slice());
                self.caught = Some(Caught { wire, anchor: tip_w });
            }
        }
        let tension = self
            .caught
            .as_ref()
            .map_or(0.0, |c| self.tension(c, state, &tip).norm());
        self.readout = HookReadout { angle, caught: self.caught.is_some(), tension };
    }
}

impl ForceContributor for Hook {
    fn add_forces(&self, ctx: &ForceContext<'_>, state: &State, sum: &mut ForceSum) {
        let Some(c) = &self.caught else { return };
        let tip = self.tip_at(self.angle(ctx.ground, state));
        let f = state.local_vector(&self.tension(c, state, &tip));
        sum.add_force_at(&self.pos, &f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::FlatGround;
    use crate::physics::Atmo;
    use approx::assert_relative_eq;

    fn deck() -> FlatGround {
        FlatGround::new(0.0).with_wire(ArrestingWire {
            ends: [Vector3::new(0.0, -15.0, 0.0), Vector3::new(0.0, 15.0, 0.0)],
            spring: 2.0e4,
            damping: 0.0,
            max_force: 1.0e5,
        })
    }

    #[test]
    fn extended_hook_hangs_at_down_angle() {
        let mut h = Hook::new(Vector3::new(-5.0, 0.0, 0.0), 1.0).unwrap();
        h.set_extension(1.0);
        let state = State::pitched(Vector3::new(0.0, 0.0, 50.0), 0.0);
        h.commit(&FlatGround::new(0.0), &state);
        assert_relative_eq!(h.readout().angle, 70.0 * DEG2RAD);
        assert!(!h.is_caught());
    }

    #[test]
    fn hook_rests_on_the_deck() {
        let mut h = Hook::new(Vector3::new(-5.0, 0.0, 0.0), 1.0).unwrap();
        h.set_extension(1.0);
        // Pivot half a metre up: the tip can only drop 30 degrees
        let state = State::pitched(Vector3::new(0.0, 0.0, 0.5), 0.0);
        h.commit(&FlatGround::new(0.0), &state);
        assert_relative_eq!(h.readout().angle, 30.0 * DEG2RAD, epsilon = 1e-5);
    }

    #[test]
    fn caught_wire_pulls_back_until_retracted() {
        let mut h = Hook::new(Vector3::new(-5.0, 0.0, 0.0), 1.0).unwrap();
        h.set_extension(1.0);
        let ground = deck();
        // Tip lands on the cable line
        let tip_x = 5.0 + (30.0 * DEG2RAD).cos();
        let state = State::pitched(Vector3::new(tip_x, 0.0, 0.5), 0.0);
        h.commit(&ground, &state);
        assert!(h.is_caught());

        let moved = State::pitched(Vector3::new(tip_x + 10.0, 0.0, 0.5), 0.0);
        let ctx = ForceContext { air: Atmo::standard(0.0), wind: Vector3::zeros(), ground: &ground };
        let mut sum = ForceSum::new(Vector3::zeros());
        h.add_forces(&ctx, &moved, &mut sum);
        // 10 m of payout would be 2e5 N; the wire caps it
        assert_relative_eq!(sum.force.x, -1.0e5, max_relative = 1e-6);

        h.set_extension(0.0);
        h.commit(&ground, &moved);
        assert!(!h.is_caught());
    }
}
