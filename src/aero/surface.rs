use nalgebra::{Matrix3, Vector3};

// ---------------------------------------------------------------------------
// Flat-plate aerodynamic surface element
// ---------------------------------------------------------------------------

/// Induced-drag scaling applied to (lift · vertical airflow).
const IDRAG_MUL: f64 = 0.5;

/// Stall table slots: [forward +AoA, forward −AoA, reverse +AoA, reverse −AoA].
const STALL_SLOTS: usize = 4;

/// One lifting element. Forces are a flat-plate response to the local
/// airflow, scaled per axis and shaped by a stall curve.
///
/// `orient` rows are the surface axes expressed in the body frame:
/// x along the chord (forward), y along the span, z the surface normal.
#[derive(Debug, Clone)]
pub struct Surface {
    pos: Vector3<f64>,         // m, body
    orient: Matrix3<f64>,      // body→surface
    chord: f64,                // m
    total_drag: f64,           // overall scale (area × drag factor), m^2
    cx: f64,
    cy: f64,
    cz: f64,
    cz0: f64,                  // zero-alpha lift, fraction of cz
    induced_drag: f64,
    stalls: [f64; STALL_SLOTS],
    widths: [f64; STALL_SLOTS],
    peaks: [f64; 2],           // [forward, reverse]
    incidence: f64,            // rad
    twist: f64,                // rad
    flap_pos: f64,
    flap_lift: f64,
    flap_drag: f64,
    flap_effectiveness: f64,
    slat_pos: f64,
    slat_alpha: f64,
    slat_drag: f64,
    spoiler_pos: f64,
    spoiler_lift: f64,
    spoiler_drag: f64,
}

impl Surface {
    pub fn new(pos: Vector3<f64>, orient: Matrix3<f64>) -> Self {
        Self {
            pos,
            orient,
            chord: 0.0,
            total_drag: 1.0,
            cx: 1.0,
            cy: 1.0,
            cz: 1.0,
            cz0: 0.0,
            induced_drag: 1.0,
            stalls: [0.0; STALL_SLOTS],
            widths: [0.01; STALL_SLOTS],
            peaks: [1.0; 2],
            incidence: 0.0,
            twist: 0.0,
            flap_pos: 0.0,
            flap_lift: 1.0,
            flap_drag: 1.0,
            flap_effectiveness: 1.0,
            slat_pos: 0.0,
            slat_alpha: 0.0,
            slat_drag: 1.0,
            spoiler_pos: 0.0,
            spoiler_lift: 1.0,
            spoiler_drag: 1.0,
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        self.pos
    }

    pub fn set_chord(&mut self, chord: f64) { self.chord = chord; }
    pub fn set_total_drag(&mut self, c0: f64) { self.total_drag = c0; }
    pub fn total_drag(&self) -> f64 { self.total_drag }
    pub fn set_x_drag(&mut self, cx: f64) { self.cx = cx; }
    pub fn set_y_drag(&mut self, cy: f64) { self.cy = cy; }
    pub fn set_z_drag(&mut self, cz: f64) { self.cz = cz; }
    pub fn z_drag(&self) -> f64 { self.cz }
    pub fn set_zero_alpha_lift(&mut self, cz0: f64) { self.cz0 = cz0; }
    pub fn set_induced_drag(&mut self, k: f64) { self.induced_drag = k; }
    pub fn set_incidence(&mut self, angle: f64) { self.incidence = angle; }
    pub fn set_twist(&mut self, angle: f64) { self.twist = angle; }

    /// Stall angle, width and (for slots 0 and 2) the lift peak.
    pub fn set_stall(&mut self, slot: usize, alpha: f64, width: f64) {
        self.stalls[slot] = alpha;
        self.widths[slot] = width;
    }

    pub fn set_stall_peak(&mut self, reverse: bool, peak: f64) {
        self.peaks[reverse as usize] = peak;
    }

    pub fn set_flap_params(&mut self, lift: f64, drag: f64) {
        self.flap_lift = lift;
        self.flap_drag = drag;
    }

    pub fn set_flap_effectiveness(&mut self, e: f64) { self.flap_effectiveness = e; }

    pub fn set_slat_params(&mut self, alpha: f64, drag: f64) {
        self.slat_alpha = alpha;
        self.slat_drag = drag;
    }

    pub fn set_spoiler_params(&mut self, lift: f64, drag: f64) {
        self.spoiler_lift = lift;
        self.spoiler_drag = drag;
    }

    pub fn set_flap(&mut self, pos: f64) { self.flap_pos = pos; }
    pub fn set_slat(&mut self, pos: f64) { self.slat_pos = pos; }
    pub fn set_spoiler(&mut self, pos: f64) { self.spoiler_pos = pos; }

    /// Force and torque (body frame) for air moving at `v` relative to the
    /// surface (body frame), air density `rho`.
    pub fn calc_force(&self, v: &Vector3<f64>, rho: f64) -> (Vector3<f64>, Vector3<f64>) {
        let vel = v.norm();
        if vel == 0.0 || (self.cx == 0.0 && self.cy == 0.0 && self.cz == 0.0) {
            return (Vector3::zeros(), Vector3::zeros());
        }

        // Unit airflow in surface axes, rotated into the incidence frame
        let inc = self.incidence + self.twist;
        let lwind = rotate_incidence(&(self.orient * (v / vel)), inc);
        let mut out = lwind;

        let stall_mul = self.stall_mul(&lwind) * (1.0 + self.spoiler_pos * (self.spoiler_lift - 1.0));
        let stall_lift = (stall_mul - 1.0) * self.cz * lwind.z;
        let flap_lift = self.flap_lift(lwind.z);

        out.z = lwind.z * self.cz + self.cz * self.cz0 + stall_lift + flap_lift;

        // Airfoil lift pitches up, flap lift pitches down, both at a third
        // of the chord from the reference point.
        let torque = Vector3::new(
            0.0,
            0.1667 * self.chord * (flap_lift - (self.cz * self.cz0 + stall_lift)),
            0.0,
        );

        let drag_mul = 1.0
            + self.flap_pos * (self.flap_drag - 1.0)
            + self.spoiler_pos * (self.spoiler_drag - 1.0)
            + self.slat_pos * (self.slat_drag - 1.0);
        out.x *= self.cx * drag_mul;
        out.y *= self.cy;

        // Induced drag acts along the airflow
        out += lwind * (self.induced_drag * out.z * lwind.z * IDRAG_MUL);

        let out = rotate_incidence(&out, -inc);
        let torque = rotate_incidence(&torque, -inc);

        let scale = 0.5 * rho * vel * vel * self.total_drag;
        (
            self.orient.tr_mul(&out) * scale,
            self.orient.tr_mul(&torque) * scale,
        )
    }

    /// Lift multiplier from the stall curve for airflow direction `v`
    /// (surface axes). Unity past the stall, the pre-stall slope before it,
    /// and a smooth cubic across the stall width.
    fn stall_mul(&self, v: &Vector3<f64>) -> f64 {
        if v.x == 0.0 {
            return 1.0;
        }
        let alpha = (v.z / v.x).abs();
        let reverse = v.x > 0.0;
        let negative = v.z < 0.0;
        let slot = ((reverse as usize) << 1) | negative as usize;

        let mut stall_alpha = self.stalls[slot];
        if stall_alpha == 0.0 {
            return 1.0;
        }
        if slot == 0 {
            stall_alpha += self.slat_pos * self.slat_alpha;
        }
        if alpha > stall_alpha + self.widths[slot] {
            return 1.0;
        }

        // Slope uses the positive-AoA stall of the same direction
        let scale = 0.5 * self.peaks[reverse as usize] / self.stalls[slot & 2];
        if alpha <= stall_alpha {
            return scale;
        }
        let frac = smoothstep((alpha - stall_alpha) / self.widths[slot]);
        scale * (1.0 - frac) + frac
    }

    /// Extra lift from flap deflection, faded out through the stall.
    fn flap_lift(&self, alpha: f64) -> f64 {
        let lift = self.cz * self.flap_pos * (self.flap_lift - 1.0) * self.flap_effectiveness;
        if self.stalls[0] == 0.0 {
            return lift;
        }
        let alpha = alpha.abs();
        if alpha < self.stalls[0] {
            lift
        } else if alpha > self.stalls[0] + self.widths[0] {
            0.0
        } else {
            lift * (1.0 - smoothstep((alpha - self.stalls[0]) / self.widths[0]))
        }
    }
}

fn smoothstep(f: f64) -> f64 {
    f * f * (3.0 - 2.0 * f)
}

/// Rotate a surface-frame vector nose-up by `angle` about the surface y axis.
fn rotate_incidence(v: &Vector3<f64>, angle: f64) -> Vector3<f64> {
    let (s, c) = angle.sin_cos();
    Vector3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plate() -> Surface {
        let mut s = Surface::new(Vector3::zeros(), Matrix3::identity());
        s.set_total_drag(2.0);
        s
    }

    /// Air relative to a surface flying forward at `speed` with `aoa`.
    fn airflow(speed: f64, aoa: f64) -> Vector3<f64> {
        Vector3::new(-speed * aoa.cos(), 0.0, speed * aoa.sin())
    }

    #[test]
    fn no_airflow_no_force() {
        let (f, t) = plate().calc_force(&Vector3::zeros(), 1.225);
        assert_eq!(f, Vector3::zeros());
        assert_eq!(t, Vector3::zeros());
    }

    #[test]
    fn head_on_flow_is_pure_drag() {
        let (f, _) = plate().calc_force(&airflow(10.0, 0.0), 1.2);
        // q · c0 · cx = 60 · 2
        assert_relative_eq!(f.x, -120.0, epsilon = 1e-9);
        assert_relative_eq!(f.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn positive_aoa_lifts() {
        let (f, _) = plate().calc_force(&airflow(30.0, 0.05), 1.225);
        assert!(f.z > 0.0);
        assert!(f.x < 0.0, "drag points aft");
    }

    #[test]
    fn incidence_adds_lift() {
        let mut s = plate();
        s.set_stall(0, 0.25, 0.05);
        s.set_stall(1, 0.25, 0.05);
        s.set_stall_peak(false, 1.5);
        let (f0, _) = s.calc_force(&airflow(30.0, 0.0), 1.225);
        s.set_incidence(0.05);
        let (f1, _) = s.calc_force(&airflow(30.0, 0.0), 1.225);
        assert!(f1.z > f0.z + 1.0, "{} -> {}", f0.z, f1.z);

        // Same angle as incidence or as AoA gives the same lift
        s.set_incidence(0.0);
        let (fa, _) = s.calc_force(&airflow(30.0, 0.05), 1.225);
        let lift_along_flow = fa.z * 0.05f64.cos() + fa.x * 0.05f64.sin();
        assert_relative_eq!(f1.z, lift_along_flow, epsilon = 1e-6 * f1.z);
    }

    #[test]
    fn symmetric_plate_ignores_incidence() {
        // cx == cz: rotating into and out of the incidence frame cancels
        let mut s = plate();
        let (f0, _) = s.calc_force(&airflow(30.0, 0.0), 1.225);
        s.set_incidence(0.05);
        let (f1, _) = s.calc_force(&airflow(30.0, 0.0), 1.225);
        assert_relative_eq!(f1.z, f0.z, epsilon = 1e-6);
    }

    #[test]
    fn stall_reduces_lift_slope() {
        let mut s = plate();
        s.set_stall(0, 0.25, 0.05);
        s.set_stall(1, 0.25, 0.05);
        s.set_stall_peak(false, 1.5);
        let lift = |aoa: f64| s.calc_force(&airflow(30.0, aoa), 1.225).0.z;
        // Pre-stall lift is boosted well above the flat plate value
        assert!(lift(0.2) > 2.0 * plate().calc_force(&airflow(30.0, 0.2), 1.225).0.z);
        // Past the stall the curve drops back to the flat plate
        assert!(lift(0.35) < lift(0.24));
    }

    #[test]
    fn flap_increases_lift_and_drag() {
        let mut s = plate();
        s.set_chord(1.0);
        s.set_flap_params(1.5, 1.3);
        let (f0, _) = s.calc_force(&airflow(30.0, 0.05), 1.225);
        s.set_flap(1.0);
        let (f1, t1) = s.calc_force(&airflow(30.0, 0.05), 1.225);
        assert!(f1.z > f0.z);
        assert!(f1.x < f0.x);
        assert!(t1.y > 0.0, "flap lift pitches nose down");
    }
}
