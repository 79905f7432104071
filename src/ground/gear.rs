use nalgebra::Vector3;
use serde::Serialize;

use crate::dynamics::{ForceContext, ForceContributor, ForceSum, State};
use crate::error::{FdmError, Result};
use super::query::{GroundQuery, LocalGround};

// ---------------------------------------------------------------------------
// Landing gear contact
// ---------------------------------------------------------------------------

/// Below this speed solid-ground friction ramps linearly to zero, m/s.
const SOLID_STATIC_SPEED: f64 = 0.1;
/// Same threshold on fluid ground, m/s.
const FLUID_STATIC_SPEED: f64 = 0.01;
/// Rolling resistance coefficient of an unbraked wheel.
const ROLLING_RESISTANCE: f64 = 0.02;
/// Below this compression fraction the initial-load onset is smoothed.
const ONSET_FRACTION: f64 = 0.2;

/// Committed gear telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GearReadout {
    pub compression: f64,  // m
    pub frac: f64,         // 0..1
    pub wow: f64,          // N
    pub roll_speed: f64,   // m/s
    pub caster_angle: f64, // rad
}

/// One evaluated ground contact.
#[derive(Debug, Clone, Copy)]
struct Contact {
    point: Vector3<f64>, // body
    force: Vector3<f64>, // body
    readout: GearReadout,
}

/// A sprung, damped contact point with wheel friction.
#[derive(Debug, Clone)]
pub struct Gear {
    pos: Vector3<f64>,  // extended tip, body
    cmpr: Vector3<f64>, // tip to fully compressed tip, body
    spring: f64,        // multiplier, then N/m once scaled
    damp: f64,          // multiplier, then N·s/m once scaled
    sfric: f64,
    dfric: f64,
    brake: f64,
    rotation: f64, // steer angle, rad
    extension: f64,
    castering: bool,
    initial_load: f64,
    on_solid: bool,
    on_water: bool,
    speed_planing: f64,
    spring_factor_not_planing: f64,
    reduce_friction_by_extension: f64,
    ignored_by_solver: bool,
    readout: GearReadout,
}

impl Gear {
    pub fn position(&self) -> Vector3<f64> { self.pos }
    pub fn compression_vector(&self) -> Vector3<f64> { self.cmpr }
    pub fn spring(&self) -> f64 { self.spring }
    pub fn damping(&self) -> f64 { self.damp }
    pub fn initial_load(&self) -> f64 { self.initial_load }
    pub fn is_ignored_by_solver(&self) -> bool { self.ignored_by_solver }

    pub fn set_brake(&mut self, b: f64) { self.brake = b.clamp(0.0, 1.0); }
    pub fn set_rotation(&mut self, r: f64) { self.rotation = r; }
    pub fn set_extension(&mut self, e: f64) { self.extension = e.clamp(0.0, 1.0); }
    pub fn set_castering(&mut self, c: bool) { self.castering = c; }

    /// Length used when sizing the spring.
    pub fn spring_length(&self) -> f64 {
        self.cmpr.norm() * (1.0 + 2.0 * self.initial_load)
    }

    /// Replace the spring and damping multipliers with absolute values
    /// `k` and `c` scaled by them.
    pub(crate) fn scale_suspension(&mut self, k: f64, c: f64) {
        self.spring *= k;
        self.damp *= c;
    }

    pub fn readout(&self) -> GearReadout { self.readout }
    pub fn compression(&self) -> f64 { self.readout.compression }
    pub fn wow(&self) -> f64 { self.readout.wow }
    pub fn roll_speed(&self) -> f64 { self.readout.roll_speed }
    pub fn caster_angle(&self) -> f64 { self.readout.caster_angle }

    /// Latch telemetry from the accepted state.
    pub fn commit(&mut self, ground: &dyn GroundQuery, state: &State) {
        self.readout = self
            .contact(ground, state)
            .map(|c| c.readout)
            .unwrap_or_default();
    }

    fn tip(&self) -> Vector3<f64> {
        self.pos + self.cmpr * (1.0 - self.extension)
    }

    fn contact(&self, ground: &dyn GroundQuery, state: &State) -> Option<Contact> {
        if self.extension < 1.0 && self.reduce_friction_by_extension <= 0.0 {
            return None;
        }
        let tip = self.tip();
        let g = LocalGround::under(ground, state, &tip)?;
        if (g.solid && !self.on_solid) || (!g.solid && !self.on_water) {
            return None;
        }

        let a = g.height(&tip);
        if a >= 0.0 {
            return None;
        }
        let b = g.height(&(tip + self.cmpr));
        let frac = if b < 0.0 { 1.0 } else { a / (a - b) };
        let point = tip + self.cmpr * frac;
        let clen = self.cmpr.norm();
        let u = self.cmpr / clen;
        let n = g.normal;

        // Contact point velocity relative to the surface
        let cv = state.point_velocity(&point) - g.velocity;

        let mut fmag = (frac + self.initial_load) * clen * self.spring;
        if self.initial_load > 0.0 && frac < ONSET_FRACTION {
            fmag *= 75.0 * frac * frac - 250.0 * frac.powi(3);
        }
        if !g.solid && self.speed_planing > 0.0 {
            let v = (cv - n * n.dot(&cv)).norm();
            let p = (v / self.speed_planing).min(1.0);
            fmag *= self.spring_factor_not_planing + (1.0 - self.spring_factor_not_planing) * p * p;
        }

        let un = u.dot(&n);
        let dmag = (self.damp * n.dot(&cv) * un).clamp(-fmag, fmag);
        let wow = ((fmag - dmag) * un).max(0.0);
        let mut force = n * wow;

        // Wheel axes in the ground plane
        let steer = Vector3::new(self.rotation.cos(), self.rotation.sin(), 0.0);
        let mut roll_dir = steer - n * n.dot(&steer);
        let rn = roll_dir.norm();
        if rn > 1e-9 {
            roll_dir /= rn;
        } else {
            roll_dir = Vector3::zeros();
        }
        let skid_dir = n.cross(&roll_dir);
        let vroll = cv.dot(&roll_dir);
        let vskid = cv.dot(&skid_dir);

        let fric = |v: f64, scale: f64| -> f64 {
            friction(v, wow * scale, self.sfric, self.dfric, g.solid)
        };
        let mut froll = fric(vroll, self.brake * g.friction_factor + (1.0 - self.brake) * ROLLING_RESISTANCE);
        let mut fskid = if self.castering { 0.0 } else { fric(vskid, g.friction_factor) };
        if self.extension < 1.0 {
            let s = (1.0 - (1.0 - self.extension) * self.reduce_friction_by_extension).max(0.0);
            froll *= s;
            fskid *= s;
        }
        force -= roll_dir * froll + skid_dir * fskid;

        let caster_angle = if self.castering && vroll.hypot(vskid) > FLUID_STATIC_SPEED {
            self.rotation + vskid.atan2(vroll)
        } else {
            self.rotation
        };

        Some(Contact {
            point,
            force,
            readout: GearReadout {
                compression: frac * clen,
                frac,
                wow,
                roll_speed: vroll,
                caster_angle,
            },
        })
    }
}

/// Signed friction opposing `v` under `load` (already scaled by the
/// applicable coefficient factor).
fn friction(v: f64, load: f64, sfric: f64, dfric: f64, solid: bool) -> f64 {
    let s = v.abs();
    let mag = if solid {
        if s < SOLID_STATIC_SPEED {
            load * sfric * s / SOLID_STATIC_SPEED
        } else {
            load * dfric
        }
    } else if s < FLUID_STATIC_SPEED {
        load * sfric * s / FLUID_STATIC_SPEED
    } else {
        load * dfric * FLUID_STATIC_SPEED * s * s
    };
    mag.copysign(v)
}

impl ForceContributor for Gear {
    fn add_forces(&self, ctx: &ForceContext<'_>, state: &State, sum: &mut ForceSum) {
        if let Some(c) = self.contact(ctx.ground, state) {
            sum.add_force_at(&c.point, &c.force);
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct GearBuilder {
    pos: Vector3<f64>,
    compression: f64,
    cmpr_dir: Vector3<f64>,
    spring: f64,
    damp: f64,
    sfric: f64,
    dfric: f64,
    castering: bool,
    initial_load: f64,
    on_solid: bool,
    on_water: bool,
    speed_planing: f64,
    spring_factor_not_planing: f64,
    reduce_friction_by_extension: f64,
    ignored_by_solver: bool,
}

impl GearBuilder {
    /// Gear whose extended tip sits at body point `pos` and compresses
    /// `compression` metres straight up.
    pub fn new(pos: Vector3<f64>, compression: f64) -> Self {
        Self {
            pos,
            compression,
            cmpr_dir: Vector3::z(),
            spring: 1.0,
            damp: 1.0,
            sfric: 0.8,
            dfric: 0.7,
            castering: false,
            initial_load: 0.0,
            on_solid: true,
            on_water: false,
            speed_planing: 0.0,
            spring_factor_not_planing: 1.0,
            reduce_friction_by_extension: 0.0,
            ignored_by_solver: false,
        }
    }

    pub fn upward(mut self, dir: Vector3<f64>) -> Self { self.cmpr_dir = dir; self }
    pub fn spring(mut self, v: f64) -> Self { self.spring = v; self }
    pub fn damp(mut self, v: f64) -> Self { self.damp = v; self }
    pub fn sfric(mut self, v: f64) -> Self { self.sfric = v; self }
    pub fn dfric(mut self, v: f64) -> Self { self.dfric = v; self }
    pub fn castering(mut self, v: bool) -> Self { self.castering = v; self }
    pub fn initial_load(mut self, v: f64) -> Self { self.initial_load = v; self }
    pub fn on_solid(mut self, v: bool) -> Self { self.on_solid = v; self }
    pub fn on_water(mut self, v: bool) -> Self { self.on_water = v; self }
    pub fn ignored_by_solver(mut self, v: bool) -> Self { self.ignored_by_solver = v; self }
    pub fn reduce_friction_by_extension(mut self, v: f64) -> Self { self.reduce_friction_by_extension = v; self }

    pub fn planing(mut self, speed: f64, factor_not_planing: f64) -> Self {
        self.speed_planing = speed;
        self.spring_factor_not_planing = factor_not_planing;
        self
    }

    pub fn build(self) -> Result<Gear> {
        if !(self.compression > 0.0) {
            return Err(FdmError::invalid("gear.compression", "must be positive"));
        }
        let n = self.cmpr_dir.norm();
        if !(n > 0.0) {
            return Err(FdmError::invalid("gear.upward", "zero direction"));
        }
        if self.spring <= 0.0 || self.damp < 0.0 {
            return Err(FdmError::invalid("gear.spring", "spring must be positive and damping non-negative"));
        }
        Ok(Gear {
            pos: self.pos,
            cmpr: self.cmpr_dir / n * self.compression,
            spring: self.spring,
            damp: self.damp,
            sfric: self.sfric,
            dfric: self.dfric,
            brake: 0.0,
            rotation: 0.0,
            extension: 1.0,
            castering: self.castering,
            initial_load: self.initial_load,
            on_solid: self.on_solid,
            on_water: self.on_water,
            speed_planing: self.speed_planing,
            spring_factor_not_planing: self.spring_factor_not_planing,
            reduce_friction_by_extension: self.reduce_friction_by_extension,
            ignored_by_solver: self.ignored_by_solver,
            readout: GearReadout::default(),
        })
    }
}
