#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod x86;

use crate::constants::LANCZOS_TAPS;
use crate::cpu::CpuFeatures;
use std::f32::consts::PI;
use std::sync::Arc;

/// Hot loops of the pipeline. Every implementation produces the same values up
/// to floating-point summation order; the default methods are the scalar
/// baseline and vector implementations override what they accelerate.
pub trait Kernels: Send + Sync {
    fn name(&self) -> &'static str;

    /// Multiplies `samples` by the window `coefficients` in place.
    fn apply_window(&self, samples: &mut [f32], coefficients: &[f32]) {
        for (sample, coefficient) in samples.iter_mut().zip(coefficients) {
            *sample *= *coefficient;
        }
    }

    /// One-pole smoothing of `values` against `state`. Both end up holding the
    /// smoothed spectrum.
    fn smooth(&self, values: &mut [f32], state: &mut [f32], gravity: f32, fast_peaks: bool) {
        for (value, previous) in values.iter_mut().zip(state.iter_mut()) {
            let smoothed = smooth_one(*value, *previous, gravity, fast_peaks);
            *value = smoothed;
            *previous = smoothed;
        }
    }

    /// `out[i] = spectrum[floor(indices[i])]`.
    fn resample_point(&self, spectrum: &[f32], indices: &[f32], out: &mut [f32]) {
        let last = spectrum.len().saturating_sub(1);
        for (out, &index) in out.iter_mut().zip(indices) {
            *out = spectrum[(index as usize).min(last)];
        }
    }

    /// Windowed-sinc sample of `spectrum` at every fractional index.
    fn resample_lanczos(&self, spectrum: &[f32], indices: &[f32], out: &mut [f32]) {
        for (out, &index) in out.iter_mut().zip(indices) {
            *out = lanczos_interp(index, LANCZOS_TAPS, spectrum);
        }
    }

    /// Averages the spectrum over each band `[indices[i], indices[i + 1])`.
    /// `indices` holds one more entry than `out`. Every band takes at least one
    /// sample, even when both bounds truncate to the same bin.
    fn average_bands(&self, spectrum: &[f32], indices: &[f32], lanczos: bool, out: &mut [f32]) {
        for (i, out) in out.iter_mut().enumerate() {
            *out = if lanczos {
                lanczos_band(spectrum, indices[i], indices[i + 1], |pos| {
                    lanczos_interp(pos, LANCZOS_TAPS, spectrum)
                })
            } else {
                let (start, end) = band_range(spectrum.len(), indices[i], indices[i + 1]);
                spectrum[start..end].iter().sum::<f32>() / (end - start) as f32
            };
        }
    }

    /// Convolves `input` with `kernel` into `out`, clamping reads at the edges.
    fn filter(&self, input: &[f32], kernel: &[f32], out: &mut [f32]) {
        filter_range(input, kernel, out, 0, input.len().min(out.len()));
    }
}

/// Scalar implementation, always available.
pub struct Baseline;

impl Kernels for Baseline {
    fn name(&self) -> &'static str {
        "SSE2"
    }
}

/// Picks the widest kernel set both `features` and the running CPU allow.
/// The choice is made once per pipeline instance.
pub fn select(features: &CpuFeatures) -> Arc<dyn Kernels> {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if features.avx2 {
            if let Some(kernels) = x86::Avx2::new() {
                return Arc::new(kernels);
            }
        }
        if features.avx {
            if let Some(kernels) = x86::Avx::new() {
                return Arc::new(kernels);
            }
        }
        if features.sse41 {
            if let Some(kernels) = x86::Sse41::new() {
                return Arc::new(kernels);
            }
        }
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    let _ = features;

    Arc::new(Baseline)
}

/// Every kernel set usable on this machine, baseline first.
pub fn available() -> Vec<Arc<dyn Kernels>> {
    #[allow(unused_mut)]
    let mut sets: Vec<Arc<dyn Kernels>> = vec![Arc::new(Baseline)];

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if let Some(kernels) = x86::Sse41::new() {
            sets.push(Arc::new(kernels));
        }
        if let Some(kernels) = x86::Avx::new() {
            sets.push(Arc::new(kernels));
        }
        if let Some(kernels) = x86::Avx2::new() {
            sets.push(Arc::new(kernels));
        }
    }

    sets
}

#[inline(always)]
pub(crate) fn smooth_one(raw: f32, previous: f32, gravity: f32, fast_peaks: bool) -> f32 {
    if fast_peaks && raw > previous {
        return raw;
    }

    let smoothed = raw + (previous - raw) * gravity;
    smoothed.clamp(raw.min(previous), raw.max(previous))
}

pub fn lanczos_kernel(x: f32, a: f32) -> f32 {
    if x == 0.0 {
        1.0
    } else if x > -a && x < a {
        let px = PI * x;
        a * px.sin() * (px / a).sin() / (px * px)
    } else {
        0.0
    }
}

/// Inclusive tap range `[low, high]` around `x`, clamped to `len`.
#[inline(always)]
pub(crate) fn lanczos_taps(x: f32, a: f32, len: usize) -> (usize, usize) {
    let floor = x.floor() as isize;
    let taps = a as isize;
    let last = len as isize - 1;
    let low = (floor - taps + 1).clamp(0, last.max(0));
    let high = (floor + taps).clamp(0, last.max(0));
    (low as usize, high as usize)
}

/// Lanczos resampling of `data` at fractional position `x` with `a` lobes.
pub fn lanczos_interp(x: f32, a: f32, data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }

    let (low, high) = lanczos_taps(x, a, data.len());
    (low..=high)
        .map(|i| data[i] * lanczos_kernel(x - i as f32, a))
        .sum()
}

/// Bins covered by a point-sampled band. Always at least one.
#[inline(always)]
pub(crate) fn band_range(len: usize, start: f32, stop: f32) -> (usize, usize) {
    let last = len.saturating_sub(1);
    let start = (start as usize).min(last);
    let end = (stop as usize).clamp(start + 1, len.max(start + 1));
    (start, end)
}

/// Mean of `sample(pos)` for `pos = start, start + 1, ...` while `pos < stop`,
/// taking at least one sample.
#[inline(always)]
pub(crate) fn lanczos_band(
    spectrum: &[f32],
    start: f32,
    stop: f32,
    mut sample: impl FnMut(f32) -> f32,
) -> f32 {
    let max_count = spectrum.len().max(1);
    let mut pos = start;
    let mut sum = 0.0;
    let mut count = 0usize;

    loop {
        sum += sample(pos);
        count += 1;
        pos += 1.0;
        if pos >= stop || count >= max_count {
            break;
        }
    }

    sum / count as f32
}

/// Scalar convolution for output positions `from..to`.
pub(crate) fn filter_range(input: &[f32], kernel: &[f32], out: &mut [f32], from: usize, to: usize) {
    if input.is_empty() {
        return;
    }

    let half = kernel.len() / 2;
    let last = input.len() as isize - 1;
    for i in from..to {
        let mut acc = 0.0;
        for (k, weight) in kernel.iter().enumerate() {
            let j = (i as isize + k as isize - half as isize).clamp(0, last);
            acc += input[j as usize] * weight;
        }
        out[i] = acc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| (i as f32 * 0.37).sin() * 20.0 - 40.0).collect()
    }

    #[test]
    fn lanczos_is_exact_on_integer_positions() {
        let data = ramp(64);
        for i in 0..64 {
            assert_relative_eq!(lanczos_interp(i as f32, 3.0, &data), data[i], max_relative = 1e-4);
        }
    }

    #[test]
    fn lanczos_kernel_vanishes_outside_support() {
        assert_eq!(lanczos_kernel(3.0, 3.0), 0.0);
        assert_eq!(lanczos_kernel(-4.5, 3.0), 0.0);
        assert_eq!(lanczos_kernel(0.0, 3.0), 1.0);
    }

    #[test]
    fn bands_take_at_least_one_sample() {
        let data = ramp(32);
        let indices = [4.2, 4.7, 9.0, 12.0];
        let mut out = [0.0; 3];
        Baseline.average_bands(&data, &indices, false, &mut out);

        assert_eq!(out[0], data[4]);
        assert_relative_eq!(out[1], data[4..9].iter().sum::<f32>() / 5.0);
        assert_relative_eq!(out[2], data[9..12].iter().sum::<f32>() / 3.0);

        Baseline.average_bands(&data, &indices, true, &mut out);
        assert_relative_eq!(out[0], lanczos_interp(4.2, 3.0, &data));
    }

    #[test]
    fn point_resampling_truncates() {
        let data = ramp(16);
        let mut out = [0.0; 3];
        Baseline.resample_point(&data, &[1.0, 2.9, 15.5], &mut out);
        assert_eq!(out, [data[1], data[2], data[15]]);
    }

    #[test]
    fn smoothing_stays_between_previous_and_raw() {
        for (raw, previous) in [(-10.0, -30.0), (-30.0, -10.0), (-20.0, -20.0)] {
            for gravity in [0.0, 0.3, 0.65, 1.0] {
                let smoothed = smooth_one(raw, previous, gravity, false);
                assert!(smoothed >= f32::min(raw, previous));
                assert!(smoothed <= f32::max(raw, previous));
            }
        }
        assert_eq!(smooth_one(-5.0, -50.0, 0.9, true), -5.0);
        assert_eq!(smooth_one(-50.0, -5.0, 0.0, true), -50.0);
    }

    #[test]
    fn every_kernel_set_matches_baseline() {
        let spectrum = ramp(1024);
        let indices: Vec<f32> = (0..301).map(|i| 1.0 + i as f32 * 3.31).collect();
        let coefficients: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.01).cos()).collect();
        let kernel = crate::filter::gauss_kernel(2.5);

        let baseline = Baseline;
        let mut expected_point = vec![0.0; 301];
        let mut expected_lanczos = vec![0.0; 301];
        let mut expected_bands = vec![0.0; 300];
        let mut expected_filter = vec![0.0; 1024];
        let mut expected_window = spectrum.clone();
        let mut expected_smooth = spectrum.clone();
        let mut expected_state = vec![-60.0; 1024];
        baseline.resample_point(&spectrum, &indices, &mut expected_point);
        baseline.resample_lanczos(&spectrum, &indices, &mut expected_lanczos);
        baseline.average_bands(&spectrum, &indices, false, &mut expected_bands);
        baseline.filter(&spectrum, &kernel, &mut expected_filter);
        baseline.apply_window(&mut expected_window, &coefficients);
        baseline.smooth(&mut expected_smooth, &mut expected_state, 0.65, true);

        for kernels in available() {
            let mut point = vec![0.0; 301];
            let mut lanczos = vec![0.0; 301];
            let mut bands = vec![0.0; 300];
            let mut filtered = vec![0.0; 1024];
            let mut window = spectrum.clone();
            let mut smooth = spectrum.clone();
            let mut state = vec![-60.0; 1024];
            kernels.resample_point(&spectrum, &indices, &mut point);
            kernels.resample_lanczos(&spectrum, &indices, &mut lanczos);
            kernels.average_bands(&spectrum, &indices, false, &mut bands);
            kernels.filter(&spectrum, &kernel, &mut filtered);
            kernels.apply_window(&mut window, &coefficients);
            kernels.smooth(&mut smooth, &mut state, 0.65, true);

            assert_eq!(point, expected_point, "{}", kernels.name());
            for (a, b) in [
                (&lanczos, &expected_lanczos),
                (&bands, &expected_bands),
                (&filtered, &expected_filter),
                (&window, &expected_window),
                (&smooth, &expected_smooth),
                (&state, &expected_state),
            ] {
                for (x, y) in a.iter().zip(b.iter()) {
                    assert_relative_eq!(*x, *y, epsilon = 1e-3, max_relative = 1e-4);
                }
            }
        }
    }

    #[test]
    fn selection_respects_requested_features() {
        assert_eq!(select(&CpuFeatures::baseline()).name(), "SSE2");
    }
}
