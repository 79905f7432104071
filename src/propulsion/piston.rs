use crate::physics::atmosphere::{std_density, std_pressure, std_temperature};
use crate::units::{CIN2CM, HP2W, RPM2RAD};

// ---------------------------------------------------------------------------
// Piston engine model
// ---------------------------------------------------------------------------

/// Specific heat of the exhaust gas, J/(kg·K).
const EXHAUST_CP: f64 = 1300.0;
/// Gas constant used for the manifold charge, J/(kg·K).
const R_MANIFOLD: f64 = 287.1;
/// Below this shaft speed the engine cannot fire.
const MIN_RUNNING_SPEED: f64 = 60.0 * RPM2RAD;
/// Oil temperature a running engine settles at, idle and full power, K.
const OIL_TEMP_IDLE: f64 = 363.0;
const OIL_TEMP_SPAN: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct PistonEngine {
    // Rating
    power0: f64,       // W
    omega0: f64,       // rad/s
    f0: f64,           // reference fuel flow at rated power, kg/s
    mix_coeff: f64,    // kg/rad
    rho0: f64,         // manifold density at rated conditions, kg/m^3
    turbo: f64,        // turbo/supercharger pressure multiplier
    max_mp: f64,       // wastegate ceiling, Pa
    compression: f64,
    displacement: f64, // m^3
    supercharger: bool,
    turbo_lag: f64,    // s

    // Controls
    throttle: f64,
    mixture: f64,
    magnetos: u8,
    starter: bool,
    boost: f64,
    fuel: bool,

    // Persistent state
    charge: f64,       // current pressure multiplier
    oil_temp: f64,     // K

    // Outputs of the last calc
    running: bool,
    charge_target: f64,
    torque: f64,       // N·m
    fuel_flow: f64,    // kg/s
    mp: f64,           // Pa
    egt: f64,          // K
    power: f64,        // W
    ambient_temp: f64, // K
}

impl PistonEngine {
    /// Engine rated at `power` W and `speed` rad/s at sea level.
    pub fn new(power: f64, speed: f64) -> Self {
        // BSFC of 0.45 lb/hr/hp
        let f0 = power * 7.62e-8;
        // Full throttle takeoff runs at 11/8 of ideal flow
        let mix_coeff = f0 * (11.0 / 8.0) * 1.1 / speed;
        Self {
            power0: power,
            omega0: speed,
            f0,
            mix_coeff,
            rho0: std_density(0.0),
            turbo: 1.0,
            max_mp: 1e6,
            compression: 8.0,
            displacement: power * (2.0 * CIN2CM / HP2W),
            supercharger: false,
            turbo_lag: 2.0,
            throttle: 0.0,
            mixture: 0.0,
            magnetos: 0,
            starter: false,
            boost: 1.0,
            fuel: true,
            charge: 1.0,
            oil_temp: std_temperature(0.0),
            running: false,
            charge_target: 1.0,
            torque: 0.0,
            fuel_flow: 0.0,
            mp: 0.0,
            egt: std_temperature(0.0),
            power: 0.0,
            ambient_temp: std_temperature(0.0),
        }
    }

    /// Turbocharger pressure multiplier and wastegate manifold ceiling.
    /// Re-derives the rated manifold density.
    pub fn set_turbo_params(&mut self, turbo: f64, max_mp: f64) {
        self.turbo = turbo;
        self.max_mp = max_mp;
        let p0 = std_pressure(0.0);
        let p = (p0 * (1.0 + self.boost * (turbo - 1.0))).min(max_mp);
        let t = std_temperature(0.0) * (p / p0).powf(2.0 / 7.0);
        self.rho0 = p / (R_MANIFOLD * t);
        self.charge = 1.0 + self.boost * (turbo - 1.0);
        self.charge_target = self.charge;
    }

    pub fn set_turbo_lag(&mut self, lag: f64) { self.turbo_lag = lag; }
    pub fn set_supercharger(&mut self, on: bool) { self.supercharger = on; }
    pub fn set_displacement(&mut self, d: f64) { self.displacement = d; }
    pub fn set_compression(&mut self, c: f64) { self.compression = c; }

    pub fn set_throttle(&mut self, t: f64) { self.throttle = t; }
    pub fn set_mixture(&mut self, m: f64) { self.mixture = m; }
    pub fn set_magnetos(&mut self, m: u8) { self.magnetos = m; }
    pub fn set_starter(&mut self, s: bool) { self.starter = s; }
    pub fn set_boost(&mut self, b: f64) { self.boost = b; }
    pub fn set_fuel(&mut self, f: bool) { self.fuel = f; }

    pub fn max_power(&self) -> f64 { self.power0 }
    pub fn rated_speed(&self) -> f64 { self.omega0 }
    pub fn is_running(&self) -> bool { self.running }
    pub fn is_cranking(&self) -> bool { self.starter }
    pub fn torque(&self) -> f64 { self.torque }
    pub fn fuel_flow(&self) -> f64 { self.fuel_flow }
    pub fn mp(&self) -> f64 { self.mp }
    pub fn egt(&self) -> f64 { self.egt }
    pub fn oil_temp(&self) -> f64 { self.oil_temp }
    pub fn boost_pressure(&self) -> f64 { self.charge }

    /// Torque, fuel flow, manifold pressure and EGT for ambient `pressure`
    /// (Pa), `temp` (K) and shaft `speed` (rad/s).
    pub fn calc(&mut self, pressure: f64, temp: f64, speed: f64) {
        self.ambient_temp = temp;
        self.running = self.magnetos != 0 && speed >= MIN_RUNNING_SPEED && self.fuel;

        // Turbochargers only spool properly with the engine lit;
        // superchargers follow shaft speed directly.
        let mut target = 1.0 + self.boost * (self.turbo - 1.0);
        if self.supercharger {
            target = 1.0 + self.boost * (self.turbo - 1.0) * supercharger_factor(speed / self.omega0);
        } else if !self.running {
            target = 1.0 + (target - 1.0) * 0.25;
        }
        self.charge_target = target;
        let charge = if self.supercharger || self.turbo_lag <= 0.0 {
            target
        } else {
            self.charge
        };

        // Minimum throttle leaves 10% of ambient in the manifold
        let mp = (pressure * charge * (0.1 + 0.9 * self.throttle)).min(self.max_mp);
        self.mp = mp;

        // Adiabatic compression into the manifold
        let manifold_t = temp * (mp / pressure).powf(2.0 / 7.0);
        let rho = mp / (R_MANIFOLD * manifold_t);

        self.fuel_flow = if self.magnetos == 0 || !self.fuel {
            0.0
        } else {
            self.mixture * speed * self.mix_coeff
        };

        // Complete combustion below 5/8 of ideal, all oxygen used
        // above 11/8, linear in between.
        let burnable = self.f0 * (rho / self.rho0) * (speed / self.omega0);
        let mut burned = if burnable <= 0.0 {
            0.0
        } else {
            let r = self.fuel_flow / burnable;
            if r < 0.625 {
                self.fuel_flow
            } else if r > 1.375 {
                burnable
            } else {
                self.fuel_flow + (burnable - self.fuel_flow) * (r - 0.625) * (4.0 / 3.0)
            }
        };
        if !self.running {
            burned = 0.0;
        }
        if self.magnetos < 3 {
            burned *= 0.9;
        }

        self.power = self.power0 * burned / self.f0;
        self.torque = if speed > 0.0 { self.power / speed } else { 0.0 };

        let rated_torque = self.power0 / self.omega0;
        if self.starter && !self.running {
            self.torque += 0.15 * rated_torque;
        }
        // Internal friction: full below half rated speed, gone at rated
        if speed > 0.0 && speed < self.omega0 {
            let interp = (2.0 - 2.0 * speed / self.omega0).min(1.0);
            self.torque -= 0.08 * rated_torque * interp;
        }

        // Exhaust energy balance. Four strokes fire every other rev.
        let mass_flow = self.fuel_flow + rho * 0.5 * self.displacement * speed;
        self.egt = if mass_flow > 0.0 {
            let corr = 1.0 / (self.compression.powf(0.4) - 1.0);
            (corr * self.power * 1.1 / (mass_flow * EXHAUST_CP)).max(temp)
        } else {
            temp
        };
    }

    /// Advance turbo spool and oil temperature toward the targets of the
    /// last `calc`.
    pub fn integrate(&mut self, dt: f64) {
        if self.turbo_lag > 0.0 {
            let k = (dt * 2.3 / self.turbo_lag).min(1.0);
            self.charge += (self.charge_target - self.charge) * k;
        } else {
            self.charge = self.charge_target;
        }

        let (target, tau) = self.oil_target();
        self.oil_temp += (target - self.oil_temp) * (dt / tau).min(1.0);
    }

    /// Snap the slow states to their equilibrium.
    pub fn stabilize(&mut self) {
        self.charge = self.charge_target;
        self.oil_temp = self.oil_target().0;
    }

    fn oil_target(&self) -> (f64, f64) {
        if self.running {
            let frac = (self.power / self.power0).clamp(0.0, 1.0);
            (OIL_TEMP_IDLE + OIL_TEMP_SPAN * frac, 600.0 - 300.0 * frac)
        } else {
            (self.ambient_temp, 1500.0)
        }
    }
}

/// Supercharger pressure gain versus normalized shaft speed, unity at
/// rated speed.
fn supercharger_factor(rpm_norm: f64) -> f64 {
    let x = rpm_norm.max(0.0);
    1.795_206_541 * 0.556_201_78_f64.powf(x) * x.powf(1.246_708_471)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::{P0, T0};
    use approx::assert_relative_eq;

    fn o360() -> PistonEngine {
        PistonEngine::new(180.0 * HP2W, 2700.0 * RPM2RAD)
    }

    fn running(throttle: f64, mixture: f64) -> PistonEngine {
        let mut e = o360();
        e.set_magnetos(3);
        e.set_throttle(throttle);
        e.set_mixture(mixture);
        e
    }

    #[test]
    fn magnetos_off_means_dead() {
        let mut e = running(1.0, 1.0);
        e.set_magnetos(0);
        for rpm in [0.0, 100.0, 1500.0, 2700.0] {
            e.calc(P0, T0, rpm * RPM2RAD);
            assert!(!e.is_running());
            assert_eq!(e.fuel_flow(), 0.0);
        }
    }

    #[test]
    fn fuel_flow_linear_in_mixture() {
        let speed = 2200.0 * RPM2RAD;
        let mut lean = running(0.7, 0.4);
        let mut rich = running(0.7, 0.8);
        lean.calc(P0, T0, speed);
        rich.calc(P0, T0, speed);
        assert!(lean.fuel_flow() > 0.0);
        assert_relative_eq!(rich.fuel_flow(), 2.0 * lean.fuel_flow(), epsilon = 1e-15);
    }

    #[test]
    fn full_throttle_at_rated_speed_makes_rated_power() {
        let mut e = running(1.0, 1.0);
        e.calc(P0, T0, e.rated_speed());
        let rated_torque = e.max_power() / e.rated_speed();
        assert!(e.is_running());
        assert_relative_eq!(e.torque(), rated_torque, max_relative = 0.01);
        assert!(e.egt().is_finite() && e.egt() >= T0);
    }

    #[test]
    fn zero_speed_is_finite() {
        let mut e = running(1.0, 1.0);
        e.calc(P0, T0, 0.0);
        assert!(!e.is_running());
        assert_eq!(e.torque(), 0.0);
        assert_eq!(e.egt(), T0);
    }

    #[test]
    fn starter_cranks_a_cold_engine() {
        let mut e = running(0.2, 1.0);
        e.set_starter(true);
        e.calc(P0, T0, 0.0);
        assert!(e.is_cranking());
        assert_relative_eq!(e.torque(), 0.15 * e.max_power() / e.rated_speed(), epsilon = 1e-9);
    }

    #[test]
    fn single_magneto_loses_power() {
        let speed = 2400.0 * RPM2RAD;
        let mut both = running(1.0, 0.9);
        let mut left = running(1.0, 0.9);
        left.set_magnetos(1);
        both.calc(P0, T0, speed);
        left.calc(P0, T0, speed);
        assert!(left.torque() < both.torque());
    }

    #[test]
    fn wastegate_caps_manifold_pressure() {
        let mut e = running(1.0, 1.0);
        e.set_turbo_lag(0.0);
        e.set_turbo_params(2.0, 40.0 * crate::units::INHG2PA);
        e.calc(P0, T0, e.rated_speed());
        assert_relative_eq!(e.mp(), 40.0 * crate::units::INHG2PA, epsilon = 1e-6);
    }

    #[test]
    fn turbo_spools_with_lag() {
        let mut e = running(1.0, 1.0);
        e.set_turbo_params(1.5, 1e6);
        e.set_turbo_lag(2.0);
        // Start from an unboosted charge
        e.set_magnetos(0);
        e.calc(P0, T0, e.rated_speed());
        e.stabilize();
        let cold = e.boost_pressure();
        e.set_magnetos(3);
        e.calc(P0, T0, e.rated_speed());
        e.integrate(0.5);
        let partial = e.boost_pressure();
        assert!(partial > cold && partial < 1.5);
        for _ in 0..50 {
            e.calc(P0, T0, e.rated_speed());
            e.integrate(0.5);
        }
        assert_relative_eq!(e.boost_pressure(), 1.5, epsilon = 1e-6);
    }

    #[test]
    fn supercharger_factor_is_unity_at_rated_speed() {
        assert_relative_eq!(supercharger_factor(1.0), 1.0, epsilon = 2e-3);
        assert_eq!(supercharger_factor(0.0), 0.0);
    }

    #[test]
    fn oil_warms_while_running() {
        let mut e = running(0.8, 1.0);
        let t0 = e.oil_temp();
        for _ in 0..100 {
            e.calc(P0, T0, 2300.0 * RPM2RAD);
            e.integrate(1.0);
        }
        assert!(e.oil_temp() > t0 + 10.0);
        assert!(e.oil_temp() < OIL_TEMP_IDLE + OIL_TEMP_SPAN);
    }
}
