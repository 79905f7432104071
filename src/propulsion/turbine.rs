use crate::physics::atmosphere::std_density;
use crate::units::bsfc_from_imperial;

// ---------------------------------------------------------------------------
// Turboprop / turboshaft engine model
// ---------------------------------------------------------------------------

/// N2 first-order spool rate, 1/s.
const SPOOL_RATE: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct TurbineEngine {
    max_torque: f64,    // N·m at rated speed
    flat_rating: f64,   // W
    rho0: f64,          // density at the rating altitude, kg/m^3
    bsfc: f64,          // kg/J
    n2_low_idle: f64,   // %
    n2_high_idle: f64,  // %
    n2_max: f64,        // %
    n1_idle: f64,       // %
    n1_max: f64,        // %

    // Controls
    throttle: f64,
    cond_lever: f64,
    starter: bool,
    fuel: bool,

    // State
    n2: f64,

    // Outputs
    running: bool,
    n2_target: f64,
    torque: f64,
    fuel_flow: f64,
    n1: f64,
}

impl TurbineEngine {
    /// Engine producing `power` W at `omega` rad/s, rated at `altitude` m
    /// and limited to `flat_rating` W.
    pub fn new(power: f64, omega: f64, altitude: f64, flat_rating: f64) -> Self {
        Self {
            max_torque: power / omega,
            flat_rating,
            rho0: std_density(altitude),
            bsfc: bsfc_from_imperial(0.5),
            n2_low_idle: 50.0,
            n2_high_idle: 70.0,
            n2_max: 100.0,
            n1_idle: 55.0,
            n1_max: 100.0,
            throttle: 0.0,
            cond_lever: 1.0,
            starter: false,
            fuel: true,
            n2: 0.0,
            running: false,
            n2_target: 0.0,
            torque: 0.0,
            fuel_flow: 0.0,
            n1: 0.0,
        }
    }

    pub fn set_n2_range(&mut self, low_idle: f64, high_idle: f64, max: f64) {
        self.n2_low_idle = low_idle;
        self.n2_high_idle = high_idle;
        self.n2_max = max;
    }

    /// Brake-specific fuel consumption, kg/J.
    pub fn set_fuel_consumption(&mut self, bsfc: f64) { self.bsfc = bsfc; }

    pub fn set_throttle(&mut self, t: f64) { self.throttle = t; }
    pub fn set_cond_lever(&mut self, c: f64) { self.cond_lever = c; }
    pub fn set_starter(&mut self, s: bool) { self.starter = s; }
    pub fn set_fuel(&mut self, f: bool) { self.fuel = f; }

    pub fn is_running(&self) -> bool { self.running }
    pub fn is_cranking(&self) -> bool { self.starter && !self.running }
    pub fn torque(&self) -> f64 { self.torque }
    pub fn fuel_flow(&self) -> f64 { self.fuel_flow }
    pub fn n1(&self) -> f64 { self.n1 }
    pub fn n2(&self) -> f64 { self.n2 }

    /// Update torque and fuel flow for air of `density` kg/m^3 at shaft speed `omega`.
    pub fn calc(&mut self, density: f64, omega: f64) {
        self.running = self.fuel && self.cond_lever > 0.001;

        let available = self.max_torque * density / self.rho0;
        let mut demand = self.throttle * available;
        if omega > 0.0 && demand * omega > self.flat_rating {
            demand = self.flat_rating / omega;
        }
        let frac = if available > 0.0 { demand / available } else { 0.0 };

        self.n2_target = if self.running {
            let idle = self.n2_low_idle + self.cond_lever * (self.n2_high_idle - self.n2_low_idle);
            idle + (self.n2_max - idle) * frac
        } else {
            0.0
        };

        // Output follows the spooled core, not the lever
        let spool = self.spool_fraction();
        self.torque = if self.running { available * spool } else { 0.0 };
        if omega > 0.0 && self.torque * omega > self.flat_rating {
            self.torque = self.flat_rating / omega;
        }
        self.fuel_flow = if self.running {
            self.bsfc * self.torque * omega.max(0.0)
        } else {
            0.0
        };
        self.n1 = if self.n2 > 0.0 {
            self.n1_idle + (self.n1_max - self.n1_idle) * spool
        } else {
            0.0
        };
    }

    pub fn integrate(&mut self, dt: f64) {
        let k = (dt * SPOOL_RATE).min(1.0);
        self.n2 += (self.n2_target - self.n2) * k;
    }

    pub fn stabilize(&mut self) {
        self.n2 = self.n2_target;
    }

    /// Fraction of the way from idle to maximum N2, clamped at zero.
    fn spool_fraction(&self) -> f64 {
        let idle = self.n2_low_idle + self.cond_lever * (self.n2_high_idle - self.n2_low_idle);
        if self.n2_max <= idle {
            return 0.0;
        }
        ((self.n2 - idle) / (self.n2_max - idle)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::RHO0;
    use crate::units::{HP2W, RPM2RAD};
    use approx::assert_relative_eq;

    fn pt6() -> TurbineEngine {
        TurbineEngine::new(750.0 * HP2W, 2200.0 * RPM2RAD, 0.0, 680.0 * HP2W)
    }

    #[test]
    fn shutdown_engine_makes_nothing() {
        let mut e = pt6();
        e.set_cond_lever(0.0);
        e.set_throttle(1.0);
        e.calc(RHO0, 2200.0 * RPM2RAD);
        e.stabilize();
        e.calc(RHO0, 2200.0 * RPM2RAD);
        assert!(!e.is_running());
        assert_eq!(e.torque(), 0.0);
        assert_eq!(e.fuel_flow(), 0.0);
    }

    #[test]
    fn spooled_torque_respects_flat_rating() {
        let mut e = pt6();
        let omega = 2200.0 * RPM2RAD;
        e.set_throttle(1.0);
        e.calc(RHO0, omega);
        e.stabilize();
        e.calc(RHO0, omega);
        assert_relative_eq!(e.torque() * omega, 680.0 * HP2W, max_relative = 1e-9);
        assert!(e.fuel_flow() > 0.0);
        assert!(e.n1() > 90.0);
    }

    #[test]
    fn n2_spools_up_gradually() {
        let mut e = pt6();
        let omega = 2200.0 * RPM2RAD;
        e.set_throttle(0.5);
        e.calc(RHO0, omega);
        let target = e.n2_target;
        e.integrate(0.1);
        assert!(e.n2() > 0.0 && e.n2() < target);
        let mut prev = e.n2();
        for _ in 0..100 {
            e.calc(RHO0, omega);
            e.integrate(0.1);
            assert!(e.n2() >= prev);
            prev = e.n2();
        }
        assert_relative_eq!(e.n2(), target, epsilon = 1e-3);
    }

    #[test]
    fn torque_scales_with_density_below_flat_rating() {
        let omega = 2200.0 * RPM2RAD;
        let mut e = TurbineEngine::new(750.0 * HP2W, omega, 0.0, 2000.0 * HP2W);
        e.set_throttle(1.0);
        let mut torque_at = |rho: f64| {
            e.calc(rho, omega);
            e.stabilize();
            e.calc(rho, omega);
            e.torque()
        };
        let sea_level = torque_at(RHO0);
        let thin = torque_at(0.5 * RHO0);
        assert_relative_eq!(sea_level * omega, 750.0 * HP2W, max_relative = 1e-3);
        assert_relative_eq!(thin, 0.5 * sea_level, max_relative = 1e-9);
    }
}
