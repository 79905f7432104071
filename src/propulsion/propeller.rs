use crate::physics::atmosphere::std_density;

// ---------------------------------------------------------------------------
// Closed-form propeller model
// ---------------------------------------------------------------------------
//
// Thrust coefficient falls linearly with advance ratio and reaches zero at
// J0 (the "pitch" of the prop). Efficiency peaks at lambda_peak = J/J0 and
// the model constants are chosen so that the peak efficiency is eta_c.

/// Peak propulsive efficiency.
const ETA_C: f64 = 0.85;
/// Advance-ratio fraction at which windmilling torque reaches zero.
const LAMBDA_WINDMILL: f64 = 1.2;

#[derive(Debug, Clone)]
pub struct Propeller {
    r: f64,            // m
    j0: f64,           // zero-thrust advance ratio, m/rad
    base_j0: f64,
    f0: f64,           // thrust scale, m^2
    lambda_peak: f64,
    beta: f64,
    tc0: Option<f64>,  // takeoff thrust coefficient cap
    manual: bool,
    fine_stop: f64,
    coarse_stop: f64,
}

impl Propeller {
    /// Propeller of `radius` m absorbing `power` W at cruise speed `v` m/s,
    /// shaft speed `omega` rad/s and density `rho`.
    pub fn new(radius: f64, v: f64, omega: f64, rho: f64, power: f64) -> Self {
        let lambda_peak = 5.0_f64.powf(-0.25);
        let beta = 1.0 / (lambda_peak - 5.0_f64.powf(-1.25));
        let j0 = v / (omega * lambda_peak);
        let v2 = v * v + (radius * omega).powi(2);
        Self {
            r: radius,
            j0,
            base_j0: j0,
            f0: 2.0 * ETA_C * power / (rho * v * v2),
            lambda_peak,
            beta,
            tc0: None,
            manual: false,
            fine_stop: 0.25,
            coarse_stop: 4.0,
        }
    }

    /// Calibrate static thrust from takeoff shaft speed and power at
    /// sea level.
    pub fn set_takeoff(&mut self, omega0: f64, power0: f64) {
        let v2 = (self.r * omega0).powi(2);
        let gamma = ETA_C * self.beta / self.j0;
        let torque = power0 / omega0;
        self.tc0 = Some(torque * gamma / (0.5 * std_density(0.0) * v2 * self.f0));
    }

    /// Pitch limits as multiples of the cruise J0.
    pub fn set_stops(&mut self, fine: f64, coarse: f64) {
        self.fine_stop = fine;
        self.coarse_stop = coarse;
        self.j0 = self.clamp_j0(self.j0);
    }

    pub fn fine_stop(&self) -> f64 { self.fine_stop }
    pub fn coarse_stop(&self) -> f64 { self.coarse_stop }

    /// Scale the pitch by `factor`, within the stops.
    pub fn mod_pitch(&mut self, factor: f64) {
        self.j0 = self.clamp_j0(self.j0 * factor);
    }

    pub fn set_manual_pitch(&mut self) {
        self.manual = true;
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// Direct pitch control in 0..1; 0.5 is the cruise pitch, each quarter
    /// of travel doubles or halves it.
    pub fn set_prop_pitch(&mut self, pitch: f64) {
        let p = pitch.clamp(0.0, 1.0);
        self.j0 = self.clamp_j0(self.base_j0 * 2.0_f64.powf(2.0 - 4.0 * p));
    }

    pub fn j0(&self) -> f64 {
        self.j0
    }

    fn clamp_j0(&self, j0: f64) -> f64 {
        j0.clamp(self.fine_stop * self.base_j0, self.coarse_stop * self.base_j0)
    }

    /// Thrust (N) and shaft torque (N·m) at `density`, axial airspeed `v`
    /// and shaft speed `omega`.
    pub fn calc(&self, density: f64, v: f64, omega: f64) -> (f64, f64) {
        // Dynamic factor uses the raw inputs: a stopped prop in still air
        // produces nothing.
        let tip = self.r * omega;
        let q = 0.5 * density * (v * v + tip * tip) * self.f0;

        let v = v.max(0.0);
        let omega = omega.max(0.001);
        let mut lambda = (v / omega) / self.j0;
        if lambda == 1.0 {
            lambda = 0.9999;
        }

        let mut tc = (1.0 - lambda) / (1.0 - self.lambda_peak);
        if let Some(tc0) = self.tc0 {
            tc = tc.min(tc0);
        }
        let thrust = q * tc;

        let torque = if lambda > 1.0 {
            // Windmilling: driving torque decays linearly to zero
            let tau0 = 0.25 * self.j0 / (ETA_C * self.beta * (1.0 - self.lambda_peak));
            q * (tau0 - tau0 * (lambda - 1.0) / (LAMBDA_WINDMILL - 1.0))
        } else {
            let l4 = lambda.powi(4);
            let gamma = (ETA_C * self.beta / self.j0) * (1.0 - l4);
            thrust / gamma
        };

        (thrust, torque)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{HP2W, RPM2RAD};
    use approx::assert_relative_eq;

    fn cessna_prop() -> Propeller {
        let mut p = Propeller::new(0.95, 55.0, 2400.0 * RPM2RAD, 1.0, 120.0 * HP2W);
        p.set_takeoff(2700.0 * RPM2RAD, 160.0 * HP2W);
        p
    }

    #[test]
    fn static_thrust_and_torque_are_positive() {
        let p = cessna_prop();
        let (thrust, torque) = p.calc(1.225, 0.0, 2300.0 * RPM2RAD);
        assert!(thrust > 500.0, "thrust = {thrust}");
        assert!(torque > 0.0);
    }

    #[test]
    fn stopped_prop_does_nothing() {
        let p = cessna_prop();
        let (thrust, torque) = p.calc(1.225, 0.0, 0.0);
        assert_relative_eq!(thrust, 0.0);
        assert_relative_eq!(torque, 0.0);
    }

    #[test]
    fn cruise_point_absorbs_cruise_power() {
        let p = Propeller::new(0.95, 55.0, 2400.0 * RPM2RAD, 1.0, 120.0 * HP2W);
        let omega = 2400.0 * RPM2RAD;
        let (thrust, torque) = p.calc(1.0, 55.0, omega);
        // Peak efficiency at the design point
        assert_relative_eq!(thrust * 55.0 / (torque * omega), ETA_C, epsilon = 1e-9);
        assert_relative_eq!(thrust * 55.0, ETA_C * 120.0 * HP2W, max_relative = 1e-9);
    }

    #[test]
    fn windmilling_prop_drags() {
        let p = cessna_prop();
        let omega = 1000.0 * RPM2RAD;
        let v = 1.1 * p.j0() * omega;
        let (thrust, torque) = p.calc(1.225, v, omega);
        assert!(thrust < 0.0);
        assert!(torque > 0.0 && torque.is_finite());
    }

    #[test]
    fn pitch_stays_within_stops() {
        let mut p = cessna_prop();
        let base = p.j0();
        p.mod_pitch(1e6);
        assert_relative_eq!(p.j0(), 4.0 * base);
        p.mod_pitch(1e-6);
        assert_relative_eq!(p.j0(), 0.25 * base);
    }

    #[test]
    fn manual_pitch_midpoint_is_cruise_pitch() {
        let mut p = cessna_prop();
        let base = p.j0();
        p.set_manual_pitch();
        p.set_prop_pitch(0.5);
        assert_relative_eq!(p.j0(), base, epsilon = 1e-12);
        p.set_prop_pitch(0.25);
        assert_relative_eq!(p.j0(), 2.0 * base, epsilon = 1e-12);
    }

    #[test]
    fn coarser_pitch_absorbs_more_torque() {
        let mut p = cessna_prop();
        let omega = 2400.0 * RPM2RAD;
        let (_, fine) = p.calc(1.0, 50.0, omega);
        p.mod_pitch(1.2);
        let (_, coarse) = p.calc(1.0, 50.0, omega);
        assert!(coarse > fine);
    }
}
