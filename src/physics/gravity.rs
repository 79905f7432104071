use nalgebra::Vector3;

use crate::units::G0;

const EARTH_RADIUS: f64 = 6_371_000.0;

/// Inverse-square gravity acceleration in the world frame (+z up).
pub fn gravity_accel(altitude: f64) -> Vector3<f64> {
    let alt = altitude.max(0.0);
    let g = G0 * (EARTH_RADIUS / (EARTH_RADIUS + alt)).powi(2);
    Vector3::new(0.0, 0.0, -g)
}

/// Weight of `mass` at `altitude`, world frame.
pub fn gravity_force(altitude: f64, mass: f64) -> Vector3<f64> {
    gravity_accel(altitude) * mass
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_gravity() {
        let g = gravity_accel(0.0);
        assert!((g.z + G0).abs() < 1e-9);
    }

    #[test]
    fn gravity_decreases_with_altitude() {
        let g0 = gravity_accel(0.0).z.abs();
        let g10k = gravity_accel(10_000.0).z.abs();
        assert!(g10k < g0);
        assert!(g0 - g10k < 0.05, "flat-earth altitudes barely change g");
    }
}
