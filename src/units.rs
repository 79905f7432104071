// ---------------------------------------------------------------------------
// Physical constants and unit conversions (everything internal is SI)
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;

pub const HP2W: f64 = 745.7;
pub const RPM2RAD: f64 = std::f64::consts::PI / 30.0;
pub const CIN2CM: f64 = 1.638_706_4e-5; // cubic inch → m^3
pub const LBS2KG: f64 = 0.453_592_37;
pub const FT2M: f64 = 0.3048;
pub const KTS2MPS: f64 = 0.514_444;
pub const INHG2PA: f64 = 3386.389;
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Brake-specific fuel consumption given in lb/hr per hp, as kg/J.
pub fn bsfc_from_imperial(lb_per_hp_hr: f64) -> f64 {
    lb_per_hp_hr * LBS2KG / (3600.0 * HP2W)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpm_conversion() {
        assert!((60.0 * RPM2RAD - 2.0 * std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn bsfc_conversion_matches_reference_flow() {
        // 0.45 lb/hp/hr is the reference piston consumption
        let bsfc = bsfc_from_imperial(0.45);
        assert!((bsfc - 7.6e-8).abs() < 1e-9, "got {bsfc}");
    }
}
