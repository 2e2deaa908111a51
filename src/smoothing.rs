use crate::config::SmoothingMode;
use crate::simd::Kernels;
use crate::DB_MIN;

/// Frame-to-frame smoothing of the decibel spectrum.
///
/// In exponential mode each bin is a one-pole filter: the new value is
/// `raw + (previous - raw) * gravity`, so a gravity near one decays slowly.
/// With fast peaks, rising bins jump straight to the raw value.
pub struct TemporalSmoother {
    mode: SmoothingMode,
    gravity: f32,
    fast_peaks: bool,
    /// Previous smoothed frame per channel; empty when smoothing is off.
    state: Vec<Vec<f32>>,
}

impl TemporalSmoother {
    pub fn new(
        mode: SmoothingMode,
        gravity: f32,
        fast_peaks: bool,
        channels: usize,
        bins: usize,
    ) -> Self {
        let state = match mode {
            SmoothingMode::None => Vec::new(),
            SmoothingMode::Exponential => vec![vec![DB_MIN; bins]; channels],
        };

        Self {
            mode,
            gravity: gravity.clamp(0.0, 1.0),
            fast_peaks,
            state,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != SmoothingMode::None
    }

    /// Replaces the raw decibels in `spectrum` with the smoothed values for
    /// `channel` and remembers them for the next frame.
    pub fn apply(&mut self, kernels: &dyn Kernels, channel: usize, spectrum: &mut [f32]) {
        if let Some(state) = self.state.get_mut(channel) {
            kernels.smooth(spectrum, state, self.gravity, self.fast_peaks);
        }
    }

    pub fn state(&self, channel: usize) -> Option<&[f32]> {
        self.state.get(channel).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd;

    fn frames() -> Vec<Vec<f32>> {
        // Deterministic pseudo-random raw frames in [-100, 0].
        let mut seed = 0x2545f491u32;
        (0..40)
            .map(|_| {
                (0..64)
                    .map(|_| {
                        seed ^= seed << 13;
                        seed ^= seed >> 17;
                        seed ^= seed << 5;
                        -((seed % 10000) as f32) / 100.0
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn disabled_mode_passes_raw_values_through() {
        let mut smoother = TemporalSmoother::new(SmoothingMode::None, 0.9, false, 1, 4);
        let mut spectrum = [-1.0, -2.0, -3.0, -4.0];
        smoother.apply(&simd::Baseline, 0, &mut spectrum);
        assert_eq!(spectrum, [-1.0, -2.0, -3.0, -4.0]);
        assert!(smoother.state(0).is_none());
    }

    #[test]
    fn exponential_output_is_bounded_by_previous_and_raw() {
        for kernels in simd::available() {
            let mut smoother =
                TemporalSmoother::new(SmoothingMode::Exponential, 0.65, false, 1, 64);
            let mut previous = vec![DB_MIN; 64];

            for raw in frames() {
                let mut spectrum = raw.clone();
                smoother.apply(kernels.as_ref(), 0, &mut spectrum);

                for i in 0..64 {
                    let (r, p, s) = (raw[i], previous[i], spectrum[i]);
                    if r >= p {
                        assert!(s >= p && s <= r, "{} rising: {} {} {}", kernels.name(), p, r, s);
                    } else {
                        assert!(s >= r && s <= p, "{} falling: {} {} {}", kernels.name(), p, r, s);
                    }
                }
                previous = spectrum;
            }
        }
    }

    #[test]
    fn falling_values_decay_toward_raw() {
        let mut smoother = TemporalSmoother::new(SmoothingMode::Exponential, 0.5, false, 1, 1);
        let mut spectrum = [0.0];
        smoother.apply(&simd::Baseline, 0, &mut spectrum);
        // From DB_MIN up to 0 with gravity 0.5: halfway.
        assert_eq!(spectrum[0], DB_MIN * 0.5);

        let mut last = spectrum[0];
        for _ in 0..10 {
            let mut spectrum = [-800.0];
            smoother.apply(&simd::Baseline, 0, &mut spectrum);
            assert!(spectrum[0] < last);
            assert!(spectrum[0] >= -800.0);
            last = spectrum[0];
        }
    }

    #[test]
    fn fast_peaks_jump_on_rise() {
        let mut smoother = TemporalSmoother::new(SmoothingMode::Exponential, 0.99, true, 2, 2);
        let mut spectrum = [-10.0, -20.0];
        smoother.apply(&simd::Baseline, 1, &mut spectrum);
        assert_eq!(spectrum, [-10.0, -20.0]);

        // Channel 0 is independent and still at the floor.
        assert_eq!(smoother.state(0).unwrap(), &[DB_MIN, DB_MIN][..]);
    }
}
