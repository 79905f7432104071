use nalgebra::{Matrix3, Vector3};

use crate::dynamics::{ForceContext, ForceContributor, ForceSum, State};
use crate::error::{FdmError, Result};
use super::surface::Surface;

// ---------------------------------------------------------------------------
// Fuselage: a line of drag bodies from nose to tail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Fuselage {
    surfaces: Vec<(Surface, f64)>, // element and its nominal area, m^2
    drag_scale: f64,
}

impl Fuselage {
    pub fn num_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    pub fn mass_points(&self) -> impl Iterator<Item = (f64, Vector3<f64>)> + '_ {
        self.surfaces
            .iter()
            .map(|(s, w)| (w * w.sqrt(), s.position()))
    }

    pub fn apply_drag_factor(&mut self, factor: f64) {
        self.drag_scale *= factor;
        for (s, weight) in &mut self.surfaces {
            s.set_total_drag(self.drag_scale * *weight);
        }
    }
}

impl ForceContributor for Fuselage {
    fn add_forces(&self, ctx: &ForceContext<'_>, state: &State, sum: &mut ForceSum) {
        for (s, _) in &self.surfaces {
            let pos = s.position();
            let wind = ctx.local_wind(state, &pos);
            let (force, torque) = s.calc_force(&wind, ctx.air.density);
            sum.add_force_at(&pos, &force);
            sum.add_torque(&torque);
        }
    }
}

#[derive(Debug, Clone)]
pub struct FuselageBuilder {
    front: Vector3<f64>, // m body
    back: Vector3<f64>,  // m body
    width: f64,          // m
    taper: f64,          // end width / mid width
    mid: f64,            // fraction of length at full width
    cx: f64,
    cy: f64,
    cz: f64,
    idrag: f64,
}

impl FuselageBuilder {
    pub fn new(front: Vector3<f64>, back: Vector3<f64>, width: f64) -> Self {
        Self {
            front,
            back,
            width,
            taper: 1.0,
            mid: 0.5,
            cx: 1.0,
            cy: 1.0,
            cz: 1.0,
            idrag: 1.0,
        }
    }

    pub fn taper(mut self, v: f64) -> Self { self.taper = v; self }
    pub fn midpoint(mut self, v: f64) -> Self { self.mid = v; self }
    pub fn cx(mut self, v: f64) -> Self { self.cx = v; self }
    pub fn cy(mut self, v: f64) -> Self { self.cy = v; self }
    pub fn cz(mut self, v: f64) -> Self { self.cz = v; self }
    pub fn idrag(mut self, v: f64) -> Self { self.idrag = v; self }

    pub fn build(self) -> Result<Fuselage> {
        let axis = self.front - self.back;
        let len = axis.norm();
        if !(self.width > 0.0) {
            return Err(FdmError::invalid("fuselage.width", format!("{} must be positive", self.width)));
        }
        if len <= 0.0 {
            return Err(FdmError::invalid("fuselage.length", "front and back coincide"));
        }
        if !(0.0..=1.0).contains(&self.mid) {
            return Err(FdmError::invalid("fuselage.midpoint", format!("{} outside 0..1", self.mid)));
        }

        // Element x along the axis toward the nose; y and z from the body
        // axes that are least parallel to it.
        let fwd = axis / len;
        let up = if fwd.z.abs() < 0.9 { Vector3::z() } else { -Vector3::x() };
        let left = up.cross(&fwd).normalize();
        let normal = fwd.cross(&left);
        let orient = Matrix3::from_rows(&[fwd.transpose(), left.transpose(), normal.transpose()]);

        let segs = (len / self.width).ceil().max(1.0) as usize;
        let seg_weight = len * self.width / segs as f64;
        let slenderness = len / self.width;

        let mut surfaces = Vec::with_capacity(segs);
        for j in 0..segs {
            let frac = (j as f64 + 0.5) / segs as f64;

            // Width scale: full at the midpoint, `taper` at either end
            let scale = if frac < self.mid {
                self.taper + (1.0 - self.taper) * frac / self.mid
            } else if self.mid < 1.0 {
                self.taper + (1.0 - self.taper) * (1.0 - frac) / (1.0 - self.mid)
            } else {
                1.0
            };

            let pos = self.back + axis * frac;
            let weight = scale * seg_weight;
            let mut s = Surface::new(pos, orient);
            s.set_total_drag(weight);
            s.set_x_drag(self.cx);
            s.set_y_drag(slenderness * self.cy);
            s.set_z_drag(slenderness * self.cz);
            s.set_induced_drag(self.idrag);
            surfaces.push((s, weight));
        }

        Ok(Fuselage {
            surfaces,
            drag_scale: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::NoGround;
    use crate::physics::Atmo;

    fn body() -> Fuselage {
        FuselageBuilder::new(Vector3::new(3.0, 0.0, 0.0), Vector3::new(-4.0, 0.0, 0.0), 1.2)
            .taper(0.4)
            .build()
            .unwrap()
    }

    fn drag_at(f: &Fuselage, vel: Vector3<f64>) -> Vector3<f64> {
        let ctx = ForceContext {
            air: Atmo::standard(0.0),
            wind: Vector3::zeros(),
            ground: &NoGround,
        };
        let state = State { vel, ..State::default() };
        let mut sum = ForceSum::new(Vector3::zeros());
        f.add_forces(&ctx, &state, &mut sum);
        sum.force
    }

    #[test]
    fn segments_follow_slenderness() {
        // 7 m long, 1.2 m wide
        assert_eq!(body().num_surfaces(), 6);
    }

    #[test]
    fn head_on_flow_is_drag_only() {
        let f = drag_at(&body(), Vector3::new(40.0, 0.0, 0.0));
        assert!(f.x < 0.0);
        assert!(f.z.abs() < 1e-9 * f.x.abs());
    }

    #[test]
    fn crossflow_is_much_stiffer_than_axial() {
        let fus = body();
        let axial = drag_at(&fus, Vector3::new(40.0, 0.0, 0.0)).norm();
        let cross = drag_at(&fus, Vector3::new(0.0, 40.0, 0.0)).norm();
        assert!(cross > 3.0 * axial);
    }

    #[test]
    fn drag_factor_scales_all_elements() {
        let mut fus = body();
        let d0 = drag_at(&fus, Vector3::new(40.0, 0.0, 0.0)).x;
        fus.apply_drag_factor(0.5);
        let d1 = drag_at(&fus, Vector3::new(40.0, 0.0, 0.0)).x;
        assert!((d1 - 0.5 * d0).abs() < 1e-9 * d0.abs());
    }
}
