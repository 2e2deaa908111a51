use crate::config::WindowFunction;
use std::f32::consts::PI;

/// Precomputes `n` coefficients for `function`, or `None` for the rectangular
/// window (multiply by one, so the pass is skipped).
pub fn coefficients(function: WindowFunction, n: usize) -> Option<Vec<f32>> {
    if function == WindowFunction::None || n == 0 {
        return None;
    }

    let denom = (n.max(2) - 1) as f32;
    let phase = |i: usize, k: f32| (k * PI * i as f32 / denom).cos();

    let coefficients = (0..n)
        .map(|i| match function {
            WindowFunction::Hamming => 0.53836 - 0.46164 * phase(i, 2.0),
            WindowFunction::Blackman => 0.42 - 0.5 * phase(i, 2.0) + 0.08 * phase(i, 4.0),
            WindowFunction::BlackmanHarris => {
                0.35875 - 0.48829 * phase(i, 2.0) + 0.14128 * phase(i, 4.0)
                    - 0.01168 * phase(i, 6.0)
            }
            WindowFunction::Hann | WindowFunction::None => 0.5 * (1.0 - phase(i, 2.0)),
        })
        .collect();

    Some(coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rectangular_window_is_absent() {
        assert!(coefficients(WindowFunction::None, 2048).is_none());
    }

    #[test]
    fn shapes_are_symmetric_and_peak_in_the_middle() {
        for function in [
            WindowFunction::Hann,
            WindowFunction::Hamming,
            WindowFunction::Blackman,
            WindowFunction::BlackmanHarris,
        ] {
            let n = 257;
            let w = coefficients(function, n).unwrap();
            assert_eq!(w.len(), n);
            for i in 0..n {
                assert_abs_diff_eq!(w[i], w[n - 1 - i], epsilon = 1e-5);
            }
            assert_abs_diff_eq!(w[n / 2], 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn hann_endpoints_are_zero() {
        let w = coefficients(WindowFunction::Hann, 128).unwrap();
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(w[127], 0.0, epsilon = 1e-5);
    }
}
