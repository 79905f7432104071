use nalgebra::{Matrix3, Vector3};

use crate::dynamics::{ForceContext, ForceContributor, ForceSum, State};
use crate::error::{FdmError, Result};
use super::surface::Surface;

// ---------------------------------------------------------------------------
// Wing geometry pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stall {
    pub aoa: f64,   // rad
    pub width: f64, // rad
    pub peak: f64,  // lift multiplier at the stall
}

impl Default for Stall {
    fn default() -> Self {
        Self {
            aoa: 16.0_f64.to_radians(),
            width: 2.0_f64.to_radians(),
            peak: 1.5,
        }
    }
}

/// A control-surface span along the wing, as fractions of the half-span.
/// For slats `lift` holds the stall-angle increase in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSpan {
    pub start: f64,
    pub end: f64,
    pub lift: f64,
    pub drag: f64,
}

impl ControlSpan {
    pub fn new(start: f64, end: f64, lift: f64, drag: f64) -> Self {
        Self { start, end, lift, drag }
    }

    fn contains(&self, frac: f64) -> bool {
        frac >= self.start && frac <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Element {
    surface: Surface,
    weight: f64, // planform area of this element, m^2
    side: Side,
    flap0: bool,
    flap1: bool,
    slat: bool,
    spoiler: bool,
}

// ---------------------------------------------------------------------------
// Wing: a strip of surfaces along a (possibly mirrored) half-span
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Wing {
    elements: Vec<Element>,
    incidence: f64,  // rad
    drag_scale: f64,
    lift_ratio: f64,
}

impl Wing {
    pub fn num_surfaces(&self) -> usize {
        self.elements.len()
    }

    /// Sum of element planform areas (both sides), m^2.
    pub fn area(&self) -> f64 {
        self.elements.iter().map(|e| e.weight).sum()
    }

    /// Aerodynamic centre approximation: area-weighted element position.
    pub fn centroid(&self) -> Vector3<f64> {
        let area = self.area();
        if area <= 0.0 {
            return Vector3::zeros();
        }
        self.elements
            .iter()
            .map(|e| e.surface.position() * e.weight)
            .sum::<Vector3<f64>>()
            / area
    }

    /// Structural mass distribution: one point per element, weighted by
    /// area^1.5 so that larger elements carry proportionally more structure.
    pub fn mass_points(&self) -> impl Iterator<Item = (f64, Vector3<f64>)> + '_ {
        self.elements
            .iter()
            .map(|e| (e.weight * e.weight.sqrt(), e.surface.position()))
    }

    pub fn incidence(&self) -> f64 {
        self.incidence
    }

    pub fn set_incidence(&mut self, angle: f64) {
        self.incidence = angle;
        for e in &mut self.elements {
            e.surface.set_incidence(angle);
        }
    }

    pub fn drag_scale(&self) -> f64 {
        self.drag_scale
    }

    /// Multiply the parasitic drag of every element by `factor`.
    pub fn apply_drag_factor(&mut self, factor: f64) {
        self.drag_scale *= factor;
        for e in &mut self.elements {
            e.surface.set_total_drag(self.drag_scale * e.weight);
        }
    }

    pub fn lift_ratio(&self) -> f64 {
        self.lift_ratio
    }

    pub fn set_lift_ratio(&mut self, ratio: f64) {
        self.lift_ratio = ratio;
        for e in &mut self.elements {
            e.surface.set_z_drag(ratio);
        }
    }

    pub fn set_flap0(&mut self, left: f64, right: f64) {
        self.for_span(|e| e.flap0, |s, side| s.set_flap(side.pick(left, right)));
    }

    pub fn set_flap1(&mut self, left: f64, right: f64) {
        self.for_span(|e| e.flap1, |s, side| s.set_flap(side.pick(left, right)));
    }

    pub fn set_flap0_effectiveness(&mut self, e: f64) {
        self.for_span(|el| el.flap0, |s, _| s.set_flap_effectiveness(e));
    }

    pub fn set_flap1_effectiveness(&mut self, e: f64) {
        self.for_span(|el| el.flap1, |s, _| s.set_flap_effectiveness(e));
    }

    pub fn set_slat(&mut self, pos: f64) {
        self.for_span(|e| e.slat, |s, _| s.set_slat(pos));
    }

    pub fn set_spoiler(&mut self, left: f64, right: f64) {
        self.for_span(|e| e.spoiler, |s, side| s.set_spoiler(side.pick(left, right)));
    }

    fn for_span(&mut self, member: impl Fn(&Element) -> bool, mut f: impl FnMut(&mut Surface, Side)) {
        for e in self.elements.iter_mut().filter(|e| member(e)) {
            f(&mut e.surface, e.side);
        }
    }
}

impl Side {
    fn pick(self, left: f64, right: f64) -> f64 {
        match self {
            Side::Left => left,
            Side::Right => right,
        }
    }
}

impl ForceContributor for Wing {
    fn add_forces(&self, ctx: &ForceContext<'_>, state: &State, sum: &mut ForceSum) {
        for e in &self.elements {
            let pos = e.surface.position();
            let wind = ctx.local_wind(state, &pos);
            let (force, torque) = e.surface.calc_force(&wind, ctx.air.density);
            sum.add_force_at(&pos, &force);
            sum.add_torque(&torque);
        }
    }
}

/// Surface axes for a half-span running along `left`: chord forward,
/// span along `left`, normal completing a right-handed frame.
fn surface_frame(left: &Vector3<f64>) -> Matrix3<f64> {
    let y = *left;
    let z = Vector3::x().cross(&y).normalize();
    let x = y.cross(&z);
    Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()])
}

/// Reflect a surface frame through the body xz plane, keeping it right-handed.
fn mirror_frame(orient: &Matrix3<f64>) -> Matrix3<f64> {
    let flip = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, 1.0));
    flip * orient * flip
}

// ---------------------------------------------------------------------------
// Wing builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WingBuilder {
    base: Vector3<f64>,  // root, m body
    length: f64,         // half-span, m
    chord: f64,          // root chord, m
    taper: f64,          // tip chord / root chord
    sweep: f64,          // rad
    dihedral: f64,       // rad
    incidence: f64,      // rad
    twist: f64,          // rad at the tip
    camber: f64,
    induced_drag: f64,
    stall: Option<Stall>,
    mirror: bool,
    flap0: Option<ControlSpan>,
    flap1: Option<ControlSpan>,
    slat: Option<ControlSpan>,
    spoiler: Option<ControlSpan>,
    drag_scale: f64,
}

impl WingBuilder {
    /// A mirrored wing (left half plus its reflection).
    pub fn new(base: Vector3<f64>, length: f64, chord: f64) -> Self {
        Self {
            base,
            length,
            chord,
            taper: 1.0,
            sweep: 0.0,
            dihedral: 0.0,
            incidence: 0.0,
            twist: 0.0,
            camber: 0.0,
            induced_drag: 0.7,
            stall: None,
            mirror: true,
            flap0: None,
            flap1: None,
            slat: None,
            spoiler: None,
            drag_scale: 1.0,
        }
    }

    /// A single vertical fin.
    pub fn vertical(base: Vector3<f64>, length: f64, chord: f64) -> Self {
        Self::new(base, length, chord)
            .dihedral(std::f64::consts::FRAC_PI_2)
            .mirror(false)
    }

    pub fn taper(mut self, v: f64) -> Self { self.taper = v; self }
    pub fn sweep(mut self, v: f64) -> Self { self.sweep = v; self }
    pub fn dihedral(mut self, v: f64) -> Self { self.dihedral = v; self }
    pub fn incidence(mut self, v: f64) -> Self { self.incidence = v; self }
    pub fn twist(mut self, v: f64) -> Self { self.twist = v; self }
    pub fn camber(mut self, v: f64) -> Self { self.camber = v; self }
    /// Induced drag multiplier (scaled by 0.7 internally).
    pub fn idrag(mut self, v: f64) -> Self { self.induced_drag = 0.7 * v; self }
    pub fn stall(mut self, v: Stall) -> Self { self.stall = Some(v); self }
    pub fn mirror(mut self, v: bool) -> Self { self.mirror = v; self }
    pub fn flap0(mut self, v: ControlSpan) -> Self { self.flap0 = Some(v); self }
    pub fn flap1(mut self, v: ControlSpan) -> Self { self.flap1 = Some(v); self }
    pub fn slat(mut self, v: ControlSpan) -> Self { self.slat = Some(v); self }
    pub fn spoiler(mut self, v: ControlSpan) -> Self { self.spoiler = Some(v); self }
    pub fn effectiveness(mut self, v: f64) -> Self { self.drag_scale *= v; self }

    pub fn build(self) -> Result<Wing> {
        if !(self.length > 0.0) {
            return Err(FdmError::invalid("wing.length", format!("{} must be positive", self.length)));
        }
        if !(self.chord > 0.0) {
            return Err(FdmError::invalid("wing.chord", format!("{} must be positive", self.chord)));
        }
        if !(self.taper >= 0.0) {
            return Err(FdmError::invalid("wing.taper", format!("{} must not be negative", self.taper)));
        }
        for span in self.spans().into_iter().flatten() {
            if span.start < 0.0 || span.end > 1.0 || span.start >= span.end {
                return Err(FdmError::invalid(
                    "wing.span",
                    format!("control span {}..{} outside 0..1", span.start, span.end),
                ));
            }
        }

        // Segment boundaries: the ends plus every control-surface edge
        let mut bounds: Vec<f64> = vec![0.0, 1.0];
        for span in self.spans().into_iter().flatten() {
            bounds.push(span.start);
            bounds.push(span.end);
        }
        bounds.sort_by(|a, b| a.total_cmp(b));
        bounds.dedup_by(|a, b| (*a - *b).abs() < 1e-3);

        let left = Vector3::new(-self.sweep.tan(), self.dihedral.cos(), self.dihedral.sin()).normalize();
        let orient = surface_frame(&left);
        let tip = self.base + left * self.length;

        // Nominal segment length: one mean chord, as a span fraction
        let seg_len = self.chord * 0.5 * (self.taper + 1.0) / self.length;

        let mut elements = Vec::new();
        for w in bounds.windows(2) {
            let (b0, b1) = (w[0], w[1]);
            let mut segs = ((b1 - b0) / seg_len).ceil().max(1.0) as usize;
            if self.twist != 0.0 && segs < 8 {
                segs = 8;
            }
            let seg_frac = (b1 - b0) / segs as f64;
            for j in 0..segs {
                let frac = b0 + (j as f64 + 0.5) * seg_frac;
                let pos = self.base.lerp(&tip, frac);
                let chord = self.chord * (1.0 - (1.0 - self.taper) * frac);
                let weight = chord * seg_frac * self.length;

                elements.push(self.element(pos, orient, chord, weight, frac, Side::Left));
                if self.mirror {
                    let mpos = Vector3::new(pos.x, -pos.y, pos.z);
                    elements.push(self.element(mpos, mirror_frame(&orient), chord, weight, frac, Side::Right));
                }
            }
        }

        Ok(Wing {
            elements,
            incidence: self.incidence,
            drag_scale: self.drag_scale,
            lift_ratio: 1.0,
        })
    }

    fn spans(&self) -> [Option<ControlSpan>; 4] {
        [self.flap0, self.flap1, self.slat, self.spoiler]
    }

    fn element(&self, pos: Vector3<f64>, orient: Matrix3<f64>, chord: f64, weight: f64, frac: f64, side: Side) -> Element {
        let mut s = Surface::new(pos, orient);
        s.set_chord(chord);
        s.set_total_drag(self.drag_scale * weight);
        s.set_induced_drag(self.induced_drag);
        s.set_incidence(self.incidence);
        s.set_twist(self.twist * frac);

        if let Some(stall) = self.stall {
            s.set_zero_alpha_lift(self.camber * stall.peak);
            let aoa = stall.aoa - stall.width / 4.0;
            s.set_stall(0, aoa, stall.width);
            s.set_stall_peak(false, stall.peak);
            // Cambered sections stall earlier and harder at negative AoA
            if self.camber > 0.0 {
                s.set_stall(1, aoa * 0.8, stall.width * 0.5);
            } else {
                s.set_stall(1, aoa, stall.width);
            }
            s.set_stall(2, 0.2267, 0.01);
            s.set_stall(3, 0.2267, 0.01);
            s.set_stall_peak(true, 1.5);
        } else {
            s.set_zero_alpha_lift(self.camber);
        }

        let within = |span: Option<ControlSpan>| span.filter(|sp| sp.contains(frac));
        let flap0 = within(self.flap0);
        let flap1 = within(self.flap1);
        let slat = within(self.slat);
        let spoiler = within(self.spoiler);
        for flap in [flap0, flap1].into_iter().flatten() {
            s.set_flap_params(flap.lift, flap.drag);
        }
        if let Some(sl) = slat {
            s.set_slat_params(sl.lift, sl.drag);
        }
        if let Some(sp) = spoiler {
            s.set_spoiler_params(sp.lift, sp.drag);
        }

        Element {
            surface: s,
            weight,
            side,
            flap0: flap0.is_some(),
            flap1: flap1.is_some(),
            slat: slat.is_some(),
            spoiler: spoiler.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::NoGround;
    use crate::physics::Atmo;
    use approx::assert_relative_eq;

    fn main_wing() -> WingBuilder {
        WingBuilder::new(Vector3::new(0.0, 0.5, 0.0), 5.0, 1.5)
            .taper(0.7)
            .stall(Stall::default())
            .flap0(ControlSpan::new(0.6, 1.0, 1.3, 1.1))
            .flap1(ControlSpan::new(0.0, 0.5, 1.5, 1.6))
    }

    fn loads(wing: &Wing, aoa: f64) -> ForceSum {
        let ctx = ForceContext {
            air: Atmo::standard(0.0),
            wind: Vector3::zeros(),
            ground: &NoGround,
        };
        let state = State {
            vel: Vector3::new(50.0 * aoa.cos(), 0.0, -50.0 * aoa.sin()),
            ..State::default()
        };
        let mut sum = ForceSum::new(Vector3::zeros());
        wing.add_forces(&ctx, &state, &mut sum);
        sum
    }

    #[test]
    fn mirrored_wing_is_symmetric() {
        let wing = main_wing().dihedral(0.05).sweep(0.1).build().unwrap();
        assert_eq!(wing.num_surfaces() % 2, 0);
        let sum = loads(&wing, 0.08);
        assert!(sum.force.z > 0.0);
        assert_relative_eq!(sum.force.y, 0.0, epsilon = 1e-6 * sum.force.z);
        assert_relative_eq!(sum.torque.x, 0.0, epsilon = 1e-6 * sum.force.z);
    }

    #[test]
    fn area_matches_trapezoid() {
        let wing = main_wing().build().unwrap();
        // Two halves of 5 m span, chord 1.5 tapering to 1.05
        assert_relative_eq!(wing.area(), 2.0 * 5.0 * (1.5 + 1.05) / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn twisted_wing_gets_extra_segments() {
        let plain = WingBuilder::new(Vector3::zeros(), 2.0, 1.0).mirror(false).build().unwrap();
        let twisted = WingBuilder::new(Vector3::zeros(), 2.0, 1.0)
            .mirror(false)
            .twist(-0.05)
            .build()
            .unwrap();
        assert_eq!(plain.num_surfaces(), 2);
        assert_eq!(twisted.num_surfaces(), 8);
    }

    #[test]
    fn control_span_edges_split_segments() {
        let plain = WingBuilder::new(Vector3::zeros(), 2.0, 1.0).mirror(false).build().unwrap();
        let mut flapped = WingBuilder::new(Vector3::zeros(), 2.0, 1.0)
            .mirror(false)
            .stall(Stall::default())
            .flap0(ControlSpan::new(0.3, 0.6, 1.5, 1.2))
            .build()
            .unwrap();
        assert_eq!(plain.num_surfaces(), 2);
        // Bounds 0, 0.3, 0.6, 1 with one segment each
        assert_eq!(flapped.num_surfaces(), 3);

        let up = loads(&flapped, 0.05).force.z;
        flapped.set_flap0(1.0, 1.0);
        let down = loads(&flapped, 0.05).force.z;
        assert!(down > up, "flap adds lift: {up} -> {down}");
    }

    #[test]
    fn split_ailerons_roll_the_aircraft() {
        let mut wing = main_wing().build().unwrap();
        wing.set_flap0(1.0, -1.0);
        let sum = loads(&wing, 0.05);
        assert!(sum.torque.x > 0.0, "left wing up is positive roll torque");
    }

    #[test]
    fn drag_factor_scales_drag() {
        let mut wing = main_wing().build().unwrap();
        let d0 = loads(&wing, 0.0).force.x;
        wing.apply_drag_factor(2.0);
        let d1 = loads(&wing, 0.0).force.x;
        assert_relative_eq!(d1, 2.0 * d0, epsilon = 1e-9 * d0.abs());
        assert_relative_eq!(wing.drag_scale(), 2.0);
    }

    #[test]
    fn vertical_fin_makes_side_force() {
        let fin = WingBuilder::vertical(Vector3::new(-5.0, 0.0, 0.5), 1.5, 1.0)
            .stall(Stall::default())
            .build()
            .unwrap();
        let ctx = ForceContext {
            air: Atmo::standard(0.0),
            wind: Vector3::zeros(),
            ground: &NoGround,
        };
        // Sideslip with the nose left of the flight path
        let state = State {
            vel: Vector3::new(50.0, -3.0, 0.0),
            ..State::default()
        };
        let mut sum = ForceSum::new(Vector3::zeros());
        fin.add_forces(&ctx, &state, &mut sum);
        assert!(sum.force.y > 0.0);
        assert!(sum.torque.z < 0.0, "weathervanes back into the wind");
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(WingBuilder::new(Vector3::zeros(), 0.0, 1.0).build().is_err());
        assert!(WingBuilder::new(Vector3::zeros(), 1.0, 1.0)
            .flap0(ControlSpan::new(0.5, 1.2, 1.2, 1.2))
            .build()
            .is_err());
    }
}
