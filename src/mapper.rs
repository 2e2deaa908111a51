use crate::config::{DisplayMode, InterpMode};
use crate::simd::Kernels;
use crate::{lerp, log_interp};

/// Fractional bin position for every output column, spread logarithmically or
/// linearly between the cutoff bins.
pub struct FrequencyMapper {
    indices: Vec<f32>,
    mode: DisplayMode,
    interp: InterpMode,
}

/// First and last visible bins for the cutoff frequencies, both clamped to
/// `[1, fft_size / 2 - 1]`.
pub fn bin_range(
    cutoff_low: f32,
    cutoff_high: f32,
    fft_size: usize,
    sample_rate: f32,
) -> (f32, f32) {
    let max_bin = (fft_size / 2).saturating_sub(1).max(1) as f32;
    let to_bin = |hz: f32| (hz * fft_size as f32 / sample_rate).clamp(1.0, max_bin);
    (to_bin(cutoff_low), to_bin(cutoff_high))
}

/// Builds `count` positions from `low` to `high`.
pub fn build_indices(low: f32, high: f32, count: usize, log_scale: bool) -> Vec<f32> {
    let (min, max) = (low.min(high), low.max(high));
    let denom = count.saturating_sub(1).max(1) as f32;

    (0..count)
        .map(|i| {
            let t = i as f32 / denom;
            let index = if log_scale { log_interp(low, high, t) } else { lerp(low, high, t) };
            index.clamp(min, max)
        })
        .collect()
}

impl FrequencyMapper {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mode: DisplayMode,
        interp: InterpMode,
        count: usize,
        log_scale: bool,
        cutoff_low: f32,
        cutoff_high: f32,
        fft_size: usize,
        sample_rate: f32,
    ) -> Self {
        let (low, high) = bin_range(cutoff_low, cutoff_high, fft_size, sample_rate);

        Self {
            indices: build_indices(low, high, count, log_scale),
            mode,
            interp,
        }
    }

    pub fn indices(&self) -> &[f32] {
        &self.indices
    }

    /// Output columns produced by [`resample`](Self::resample).
    pub fn columns(&self) -> usize {
        match self.mode {
            DisplayMode::Curve => self.indices.len(),
            DisplayMode::Bars | DisplayMode::SteppedBars => self.indices.len().saturating_sub(1),
        }
    }

    /// Samples `spectrum` into one value per column.
    pub fn resample(&self, kernels: &dyn Kernels, spectrum: &[f32], out: &mut [f32]) {
        let columns = self.columns().min(out.len());
        let out = &mut out[..columns];

        match (self.mode, self.interp) {
            (DisplayMode::Curve, InterpMode::Point) => {
                kernels.resample_point(spectrum, &self.indices, out)
            }
            (DisplayMode::Curve, InterpMode::Lanczos) => {
                kernels.resample_lanczos(spectrum, &self.indices, out)
            }
            (_, interp) => {
                kernels.average_bands(spectrum, &self.indices, interp == InterpMode::Lanczos, out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd;
    use approx::assert_relative_eq;

    #[test]
    fn reference_curve_table() {
        let mapper = FrequencyMapper::new(
            DisplayMode::Curve,
            InterpMode::Lanczos,
            800,
            true,
            30.0,
            17500.0,
            2048,
            44100.0,
        );
        let indices = mapper.indices();

        assert_eq!(indices.len(), 800);
        assert!(indices.windows(2).all(|w| w[1] > w[0]));
        assert_relative_eq!(indices[0], 30.0 * 2048.0 / 44100.0, max_relative = 1e-5);
        assert_relative_eq!(indices[799], 17500.0 * 2048.0 / 44100.0, max_relative = 1e-4);
        assert!(indices[0] > 1.39 && indices[0] < 1.40);
        assert!(indices[799] > 812.0 && indices[799] < 813.0);
    }

    #[test]
    fn tables_are_monotone_and_in_range() {
        for log_scale in [true, false] {
            let ranges = [(0.0, 24000.0), (30.0, 17500.0), (5000.0, 5001.0), (20000.0, 24000.0)];
            for (low, high) in ranges {
                for fft_size in [128, 720, 2048, 4096] {
                    let mapper = FrequencyMapper::new(
                        DisplayMode::Bars,
                        InterpMode::Point,
                        57,
                        log_scale,
                        low,
                        high,
                        fft_size,
                        44100.0,
                    );
                    let max_bin = (fft_size / 2 - 1) as f32;
                    let indices = mapper.indices();
                    assert!(indices.windows(2).all(|w| w[1] >= w[0]));
                    assert!(indices.iter().all(|&i| (1.0..=max_bin).contains(&i)));
                }
            }
        }
    }

    #[test]
    fn single_column_does_not_divide_by_zero() {
        let indices = build_indices(2.0, 100.0, 1, true);
        assert_eq!(indices, vec![2.0]);
    }

    #[test]
    fn bar_mode_has_a_sentinel_entry() {
        let mapper = FrequencyMapper::new(
            DisplayMode::Bars,
            InterpMode::Point,
            27,
            false,
            30.0,
            17500.0,
            2048,
            44100.0,
        );
        assert_eq!(mapper.indices().len(), 27);
        assert_eq!(mapper.columns(), 26);

        let spectrum: Vec<f32> = (0..1024).map(|i| -(i as f32)).collect();
        let mut out = vec![0.0; 26];
        mapper.resample(&simd::Baseline, &spectrum, &mut out);
        assert!(out.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn point_curve_reads_truncated_bins() {
        let mapper = FrequencyMapper::new(
            DisplayMode::Curve,
            InterpMode::Point,
            16,
            false,
            0.0,
            44100.0,
            64,
            44100.0,
        );
        let spectrum: Vec<f32> = (0..32).map(|i| i as f32).collect();
        let mut out = vec![0.0; 16];
        mapper.resample(&simd::Baseline, &spectrum, &mut out);
        for (value, index) in out.iter().zip(mapper.indices()) {
            assert_eq!(*value, index.floor());
        }
    }
}
