use super::find_plan;
use crate::config::WindowFunction;
use crate::constants::{SLOPE_REF_HIGH, SLOPE_REF_LOW};
use crate::simd::Kernels;
use crate::{log_interp, window, DB_MIN};
use num_complex::Complex32;
use realfft::RealToComplex;
use std::sync::Arc;

/// Turns one analysis window of raw samples into `N / 2` decibel bins.
pub struct FftEngine {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,

    //
    // Transform buffers, reused every frame.
    //
    input: Vec<f32>,
    output: Vec<Complex32>,
    scratch: Vec<Complex32>,

    window: Option<Vec<f32>>,
    slope: Vec<f32>,
}

impl FftEngine {
    pub fn new(size: usize, window_function: WindowFunction, slope: f32) -> Self {
        let plan = find_plan(size);

        Self {
            size,
            input: plan.make_input_vec(),
            output: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
            window: window::coefficients(window_function, size),
            slope: slope_table(size / 2, slope),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bins(&self) -> usize {
        self.size / 2
    }

    pub fn window_coefficients(&self) -> Option<&[f32]> {
        self.window.as_deref()
    }

    pub fn slope_table(&self) -> &[f32] {
        &self.slope
    }

    /// The time-domain window to fill before calling [`analyze`](Self::analyze).
    pub fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    /// Transforms the current input into decibels, writing `N / 2` bins to
    /// `out`. An all-zero window short-circuits to `DB_MIN` everywhere and
    /// returns `true`.
    pub fn analyze(&mut self, kernels: &dyn Kernels, out: &mut [f32]) -> bool {
        let bins = self.bins().min(out.len());

        if self.input.iter().all(|&sample| sample == 0.0) {
            out[..bins].fill(DB_MIN);
            return true;
        }

        if let Some(coefficients) = &self.window {
            kernels.apply_window(&mut self.input, coefficients);
        }

        if let Err(err) = self
            .plan
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
        {
            log::error!("FFT of size {} failed: {}", self.size, err);
            out[..bins].fill(DB_MIN);
            return false;
        }

        let scale = 1.0 / self.size as f32;
        for ((db, bin), slope) in out[..bins].iter_mut().zip(&self.output).zip(&self.slope) {
            *db = bin_level(bin.norm() * scale, *slope);
        }

        false
    }
}

/// Decibel level of one normalised bin magnitude. Overflow saturates at
/// `f32::MAX`; only NaN reads as silence.
#[inline]
fn bin_level(magnitude: f32, slope: f32) -> f32 {
    let level = 20.0 * magnitude.log10();
    if level.is_nan() {
        DB_MIN
    } else {
        (level.max(DB_MIN) + slope).min(f32::MAX)
    }
}

/// Per-bin additive decibel correction. The reference curve runs
/// logarithmically from 10 Hz to 10 kHz across the bins; `slope` stretches it,
/// and zero gives a flat table.
pub fn slope_table(bins: usize, slope: f32) -> Vec<f32> {
    let max = bins.saturating_sub(1).max(1) as f32;
    (0..bins)
        .map(|i| {
            let reference = log_interp(SLOPE_REF_LOW, SLOPE_REF_HIGH, i as f32 * slope / max);
            20.0 * reference.log10().log10()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    fn sine(n: usize, bin: f32, amplitude: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * bin * i as f32 / n as f32).sin())
            .collect()
    }

    #[test]
    fn silent_window_is_db_min() {
        let mut engine = FftEngine::new(2048, WindowFunction::Hann, 2.0);
        let mut out = vec![0.0; 1024];
        assert!(engine.analyze(&simd::Baseline, &mut out));
        assert!(out.iter().all(|&db| db == DB_MIN));
    }

    #[test]
    fn decibels_are_finite_and_above_floor() {
        for window in [WindowFunction::None, WindowFunction::Hann, WindowFunction::BlackmanHarris] {
            let mut engine = FftEngine::new(512, window, 1.0);
            let mut out = vec![0.0; 256];

            //
            // A lone impulse and a tiny denormal-sized signal.
            //
            engine.input_mut().fill(0.0);
            engine.input_mut()[100] = 1.0;
            engine.analyze(&simd::Baseline, &mut out);
            assert!(out.iter().all(|db| db.is_finite() && *db >= DB_MIN));

            engine.input_mut().fill(1e-38);
            engine.analyze(&simd::Baseline, &mut out);
            assert!(out.iter().all(|db| db.is_finite() && *db >= DB_MIN));
        }
    }

    #[test]
    fn sine_peaks_in_its_bin() {
        let mut engine = FftEngine::new(1024, WindowFunction::None, 0.0);
        engine.input_mut().copy_from_slice(&sine(1024, 64.0, 1.0));
        let mut out = vec![0.0; 512];
        assert!(!engine.analyze(&simd::Baseline, &mut out));

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(64));
        // |X[k]| = N/2 for a unit sine, so |X[k]| / N is -6 dB.
        assert_relative_eq!(out[64], 20.0 * 0.5f32.log10(), epsilon = 1e-3);
    }

    #[test]
    fn overflowing_levels_saturate_high() {
        assert_eq!(bin_level(f32::INFINITY, 0.0), f32::MAX);
        assert_eq!(bin_level(f32::INFINITY, 12.0), f32::MAX);
        assert_eq!(bin_level(f32::NAN, 0.0), DB_MIN);
        assert_eq!(bin_level(0.0, 0.0), DB_MIN);
        assert_relative_eq!(bin_level(0.5, 0.0), 20.0 * 0.5f32.log10());

        let mut engine = FftEngine::new(512, WindowFunction::None, 0.0);
        engine.input_mut().fill(3.0e38);
        let mut out = vec![0.0; 256];
        assert!(!engine.analyze(&simd::Baseline, &mut out));
        assert!(out.iter().all(|db| db.is_finite() && *db >= DB_MIN));
    }

    #[test]
    fn flat_slope_is_zero() {
        assert!(slope_table(1024, 0.0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn slope_raises_high_bins() {
        let table = slope_table(1024, 1.0);
        assert_eq!(table[0], 0.0);
        assert!(table.windows(2).all(|w| w[1] >= w[0]));
        // log10(10 kHz) = 4, so the top bin gains 20 * log10(4).
        assert_relative_eq!(table[1023], 20.0 * 4.0f32.log10(), epsilon = 1e-3);
    }
}
