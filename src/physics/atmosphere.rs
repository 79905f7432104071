use crate::units::G0;

// ---------------------------------------------------------------------------
// ISA 1976 Standard Atmosphere (sea level to 86 km)
// ---------------------------------------------------------------------------

pub const R_AIR: f64 = 287.052_87; // specific gas constant for dry air, J/(kg·K)
const GAMMA: f64 = 1.4;            // ratio of specific heats

pub const T0: f64 = 288.15;        // sea-level temperature, K
pub const P0: f64 = 101_325.0;     // sea-level pressure, Pa
pub const RHO0: f64 = P0 / (R_AIR * T0);

/// Air properties at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atmo {
    pub density: f64,      // kg/m^3
    pub pressure: f64,     // Pa
    pub temperature: f64,  // K
    pub sound_speed: f64,  // m/s
}

impl Atmo {
    /// Air of the given pressure and temperature, density from the gas law.
    pub fn new(pressure: f64, temperature: f64) -> Self {
        Self::with_density(pressure, temperature, density(pressure, temperature))
    }

    /// Air with an externally supplied density (humidity, non-standard day).
    pub fn with_density(pressure: f64, temperature: f64, density: f64) -> Self {
        Self {
            density,
            pressure,
            temperature,
            sound_speed: sound_speed(temperature),
        }
    }

    /// Standard day at `altitude_m`.
    pub fn standard(altitude_m: f64) -> Self {
        isa(altitude_m)
    }
}

/// ISA 1976 standard atmosphere model.
///
/// Piecewise temperature profile with 7 layers from 0-86 km.
/// Clamps negative altitudes to sea level; returns near-vacuum above 86 km.
pub fn isa(altitude_m: f64) -> Atmo {
    let h = altitude_m.max(0.0);

    let (temperature, pressure) = if h < 11_000.0 {
        gradient_layer(h, 0.0, T0, -0.0065, P0)
    } else if h < 20_000.0 {
        isothermal_layer(h, 11_000.0, 216.65, 22_632.1)
    } else if h < 32_000.0 {
        gradient_layer(h, 20_000.0, 216.65, 0.001, 5_474.89)
    } else if h < 47_000.0 {
        gradient_layer(h, 32_000.0, 228.65, 0.0028, 868.019)
    } else if h < 51_000.0 {
        isothermal_layer(h, 47_000.0, 270.65, 110.906)
    } else if h < 71_000.0 {
        gradient_layer(h, 51_000.0, 270.65, -0.0028, 66.9389)
    } else if h < 86_000.0 {
        gradient_layer(h, 71_000.0, 214.65, -0.002, 3.956_42)
    } else {
        let t = 186.87;
        let p = 0.3734 * (-0.000_15 * (h - 86_000.0)).exp();
        (t, p.max(0.0))
    };

    Atmo::new(pressure, temperature)
}

pub fn std_pressure(altitude_m: f64) -> f64 {
    isa(altitude_m).pressure
}

pub fn std_temperature(altitude_m: f64) -> f64 {
    isa(altitude_m).temperature
}

pub fn std_density(altitude_m: f64) -> f64 {
    isa(altitude_m).density
}

/// Ideal-gas density.
pub fn density(pressure: f64, temperature: f64) -> f64 {
    if temperature > 0.0 {
        pressure / (R_AIR * temperature)
    } else {
        0.0
    }
}

pub fn sound_speed(temperature: f64) -> f64 {
    (GAMMA * R_AIR * temperature.max(0.0)).sqrt()
}

// ---------------------------------------------------------------------------
// Airspeed conversions
// ---------------------------------------------------------------------------

pub fn mach(speed: f64, temperature: f64) -> f64 {
    speed / sound_speed(temperature)
}

pub fn speed_from_mach(mach: f64, temperature: f64) -> f64 {
    mach * sound_speed(temperature)
}

/// Equivalent airspeed: true speed scaled to sea-level dynamic pressure.
pub fn veas(speed: f64, density: f64) -> f64 {
    speed * (density / RHO0).sqrt()
}

/// Calibrated airspeed from true speed (subsonic compressible pitot relation).
pub fn vcas(speed: f64, pressure: f64, temperature: f64) -> f64 {
    let m = mach(speed, temperature);
    let qc = pressure * ((1.0 + 0.2 * m * m).powf(3.5) - 1.0);
    let a0 = sound_speed(T0);
    a0 * (5.0 * ((qc / P0 + 1.0).powf(2.0 / 7.0) - 1.0)).sqrt()
}

/// True speed from calibrated airspeed, inverse of [`vcas`].
pub fn speed_from_vcas(vcas: f64, pressure: f64, temperature: f64) -> f64 {
    let a0 = sound_speed(T0);
    let r = vcas / a0;
    let qc = P0 * ((1.0 + 0.2 * r * r).powf(3.5) - 1.0);
    let m = (5.0 * ((qc / pressure + 1.0).powf(2.0 / 7.0) - 1.0)).sqrt();
    speed_from_mach(m, temperature)
}

// ---------------------------------------------------------------------------
// Layer helpers
// ---------------------------------------------------------------------------

/// Gradient layer: T = T_base + lapse * (h - h_base)
fn gradient_layer(h: f64, h_base: f64, t_base: f64, lapse: f64, p_base: f64) -> (f64, f64) {
    let t = t_base + lapse * (h - h_base);
    let p = p_base * (t / t_base).powf(-G0 / (lapse * R_AIR));
    (t, p)
}

/// Isothermal layer: T = const, pressure decays exponentially
fn isothermal_layer(h: f64, h_base: f64, t: f64, p_base: f64) -> (f64, f64) {
    let p = p_base * ((-G0 / (R_AIR * t)) * (h - h_base)).exp();
    (t, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_level_standard_values() {
        let a = isa(0.0);
        assert!((a.temperature - 288.15).abs() < 0.01);
        assert!((a.pressure - 101_325.0).abs() < 1.0);
        assert!((a.density - 1.225).abs() < 0.001);
        assert!((a.sound_speed - 340.29).abs() < 0.1);
    }

    #[test]
    fn tropopause_11km() {
        let a = isa(11_000.0);
        assert!((a.temperature - 216.65).abs() < 0.5);
        assert!((a.pressure - 22_632.0).abs() < 100.0);
    }

    #[test]
    fn density_monotonically_decreases() {
        let rho_0 = std_density(0.0);
        let rho_3k = std_density(3_000.0);
        let rho_10k = std_density(10_000.0);
        assert!(rho_0 > rho_3k);
        assert!(rho_3k > rho_10k);
        assert!(rho_10k > 0.0);
    }

    #[test]
    fn negative_altitude_clamps_to_sea_level() {
        let a = isa(-500.0);
        assert!((a.temperature - 288.15).abs() < 0.01);
    }

    #[test]
    fn calibrated_equals_true_at_sea_level() {
        assert_relative_eq!(vcas(60.0, P0, T0), 60.0, epsilon = 1e-9);
        assert_relative_eq!(veas(60.0, RHO0), 60.0, epsilon = 1e-12);
    }

    #[test]
    fn calibrated_reads_low_at_altitude() {
        let a = isa(3_000.0);
        let cas = vcas(80.0, a.pressure, a.temperature);
        assert!(cas < 80.0 && cas > 60.0, "CAS at 3 km = {cas}");
        let back = speed_from_vcas(cas, a.pressure, a.temperature);
        assert_relative_eq!(back, 80.0, epsilon = 1e-6);
    }

    #[test]
    fn mach_one_is_sound_speed() {
        let t = std_temperature(5_000.0);
        assert_relative_eq!(mach(speed_from_mach(1.0, t), t), 1.0, epsilon = 1e-12);
    }
}
