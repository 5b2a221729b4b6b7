//! Polynomial extrapolation of cumulative-count curves.

/// Trailing sample window the Lagrange polynomial is fit over. Longer
/// windows oscillate on step-shaped count curves.
const WINDOW: usize = 3;

/// Evaluates a cumulative curve at `t`.
///
/// The polynomial is fit over the trailing sample window; with fewer than
/// two samples it degenerates to the last observed value. Results are
/// floored at zero - a cumulative count cannot be negative.
pub fn extrapolate(times: &[f64], values: &[f64], t: f64) -> f64 {
    debug_assert_eq!(times.len(), values.len());
    if values.len() < 2 {
        return values.last().copied().unwrap_or(0.0).max(0.0);
    }
    let start = times.len().saturating_sub(WINDOW);
    let (ts, vs) = (&times[start..], &values[start..]);
    let mut acc = 0.0;
    for i in 0..ts.len() {
        let mut term = vs[i];
        for j in 0..ts.len() {
            if i != j {
                term *= (t - ts[j]) / (ts[i] - ts[j]);
            }
        }
        acc += term;
    }
    acc.max(0.0)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn empty_curve_reads_zero() {
        assert_eq!(extrapolate(&[], &[], 5.0), 0.0);
    }

    #[test]
    fn single_sample_degenerates_to_the_observed_value() {
        assert_eq!(extrapolate(&[0.0], &[4.0], 10.0), 4.0);
    }

    #[test]
    fn two_samples_extrapolate_linearly() {
        let times = [0.0, 10.0];
        let values = [0.0, 5.0];
        assert_approx_eq!(extrapolate(&times, &values, 20.0), 10.0);
        assert_approx_eq!(extrapolate(&times, &values, 5.0), 2.5);
    }

    #[test]
    fn interpolation_reproduces_the_samples() {
        let times = [0.0, 10.0, 20.0, 30.0];
        let values = [0.0, 2.0, 6.0, 7.0];
        assert_approx_eq!(extrapolate(&times, &values, 20.0), 6.0);
        assert_approx_eq!(extrapolate(&times, &values, 30.0), 7.0);
    }

    #[test]
    fn negative_projections_are_floored() {
        let times = [0.0, 10.0];
        let values = [4.0, 1.0];
        assert_eq!(extrapolate(&times, &values, 30.0), 0.0);
    }

    #[test]
    fn only_the_trailing_window_matters() {
        // A flat tail keeps the projection flat regardless of the head.
        let times = [0.0, 10.0, 20.0, 30.0, 40.0];
        let values = [0.0, 100.0, 8.0, 8.0, 8.0];
        assert_approx_eq!(extrapolate(&times, &values, 60.0), 8.0);
    }
}
