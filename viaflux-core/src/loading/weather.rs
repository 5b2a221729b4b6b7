//! Capacity adjustment factor derived from weather observations.

/// Rain intensity at which the rain attenuation alone bottoms out, in mm/h.
const RAIN_SATURATION: f64 = 75.0;

/// Visibility above which sight conditions stop limiting capacity, in m.
const CLEAR_VISIBILITY: f64 = 2_000.0;

/// Lower bound of the capacity factor.
pub const MIN_CAPACITY_FACTOR: f64 = 0.1;

/// Computes the scalar capacity factor for the given rain intensity (mm/h)
/// and visibility (m).
///
/// The factor multiplies edge capacities during simulation and is always in
/// `[0.1, 1.0]`: the product of a linear rain attenuation and a visibility
/// attenuation saturating at [`CLEAR_VISIBILITY`], rounded to two decimals
/// and clamped.
pub fn capacity_factor(rain_intensity: f64, visibility: f64) -> f64 {
    let rain = 1.0 - rain_intensity.max(0.0) / RAIN_SATURATION;
    let sight = (0.8 + 0.2 * visibility.max(0.0) / CLEAR_VISIBILITY).min(1.0);
    let factor = (rain * sight * 100.0).round() / 100.0;
    factor.clamp(MIN_CAPACITY_FACTOR, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderate_rain_with_reduced_visibility() {
        assert_eq!(capacity_factor(5.0, 1_000.0), 0.84);
    }

    #[test]
    fn torrential_rain_clamps_to_the_floor() {
        assert_eq!(capacity_factor(70.0, 1_000.0), MIN_CAPACITY_FACTOR);
        assert_eq!(capacity_factor(500.0, 10_000.0), MIN_CAPACITY_FACTOR);
    }

    #[test]
    fn clear_conditions_leave_capacity_untouched() {
        assert_eq!(capacity_factor(0.0, 10_000.0), 1.0);
        assert_eq!(capacity_factor(-3.0, CLEAR_VISIBILITY), 1.0);
    }

    #[test]
    fn factor_stays_within_bounds() {
        for rain in [0.0, 1.0, 10.0, 40.0, 75.0, 120.0] {
            for visibility in [0.0, 500.0, 1_000.0, 2_000.0, 9_999.0] {
                let factor = capacity_factor(rain, visibility);
                assert!((MIN_CAPACITY_FACTOR..=1.0).contains(&factor));
            }
        }
    }
}
