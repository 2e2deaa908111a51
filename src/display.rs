use crate::config::{Config, DisplayMode};
use crate::lerp;

/// How many `width`-wide items separated by `gap` fit in `extent`. A final item
/// that fits without its trailing gap still counts.
pub fn fit_count(extent: u32, width: u32, gap: u32) -> u32 {
    let stride = width.saturating_add(gap).max(1);
    let mut count = extent / stride;
    if extent - count * stride >= width {
        count += 1;
    }
    count
}

/// Geometry the renderer needs alongside the column values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub mode: DisplayMode,
    pub width: u32,
    pub height: u32,
    pub stereo: bool,
    /// Output columns: pixels in curve mode, bars otherwise.
    pub columns: usize,
    pub bar_width: u32,
    pub bar_gap: u32,
    pub step_width: u32,
    pub step_gap: u32,
    /// Steps per bar in stepped-bar mode, zero otherwise.
    pub max_steps: u32,
}

impl Layout {
    pub fn new(config: &Config) -> Self {
        let stereo = config.is_stereo();
        let columns = match config.display_mode {
            DisplayMode::Curve => config.width as usize,
            DisplayMode::Bars | DisplayMode::SteppedBars => {
                fit_count(config.width, config.bar_width, config.bar_gap) as usize
            }
        };

        let mut layout = Self {
            mode: config.display_mode,
            width: config.width,
            height: config.height,
            stereo,
            columns,
            bar_width: config.bar_width,
            bar_gap: config.bar_gap,
            step_width: config.step_width,
            step_gap: config.step_gap,
            max_steps: 0,
        };

        if config.display_mode == DisplayMode::SteppedBars {
            layout.max_steps =
                fit_count(layout.baseline() as u32, config.step_width, config.step_gap);
        }
        layout
    }

    /// Vertical position of the zero-level line: mid-height for stereo, the
    /// bottom edge for mono.
    pub fn baseline(&self) -> f32 {
        if self.stereo {
            self.height as f32 / 2.0 + 0.5
        } else {
            self.height as f32 + 0.5
        }
    }

    pub fn bottom(&self) -> f32 {
        self.height as f32 + 0.5
    }

    /// Horizontal start of bar `i`.
    pub fn bar_x(&self, i: usize) -> f32 {
        i as f32 * (self.bar_width as f32 + self.bar_gap as f32) + 0.5
    }

    /// Index-table entries needed: bars carry one extra entry bounding the last band.
    pub fn index_count(&self) -> usize {
        match self.mode {
            DisplayMode::Curve => self.columns,
            DisplayMode::Bars | DisplayMode::SteppedBars => self.columns + 1,
        }
    }
}

/// Maps a decibel value to a vertical offset in `[0.5, baseline]`; louder is
/// closer to 0.5 (the top).
#[inline]
pub fn vertical_offset(db: f32, ceiling: f32, range: f32, baseline: f32) -> f32 {
    let t = (ceiling - db).clamp(0.0, range) / range;
    lerp(0.5, baseline, t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelMode;

    #[test]
    fn bar_count_includes_a_trailing_bar_that_fits() {
        // 800 / 30 = 26 rem 20 -> 20 < 24, no extra.
        assert_eq!(fit_count(800, 24, 6), 26);
        // 810 / 30 = 27 rem 0.
        assert_eq!(fit_count(810, 24, 6), 27);
        // 834 / 30 = 27 rem 24 -> the extra bar fits without its gap.
        assert_eq!(fit_count(834, 24, 6), 28);
        assert_eq!(fit_count(10, 24, 6), 0);
    }

    #[test]
    fn huge_gaps_do_not_overflow() {
        assert_eq!(fit_count(800, 24, u32::MAX), 1);
        assert_eq!(fit_count(800, u32::MAX, u32::MAX), 0);

        let config = Config {
            display_mode: DisplayMode::Bars,
            bar_width: u32::MAX,
            ..Default::default()
        };
        let layout = Layout::new(&config);
        assert_eq!(layout.bar_x(0), 0.5);
        assert_eq!(layout.bar_x(2), 2.0 * (u32::MAX as f32 + 6.0) + 0.5);
    }

    #[test]
    fn stepped_layout_counts_steps() {
        let config = Config {
            display_mode: DisplayMode::SteppedBars,
            height: 225,
            ..Default::default()
        };
        let layout = Layout::new(&config);
        // Baseline 225.5, stride 12: 18 full steps, remainder 9 >= 8 adds one.
        assert_eq!(layout.max_steps, 19);
        assert_eq!(layout.index_count(), layout.columns + 1);
    }

    #[test]
    fn baseline_depends_on_channel_mode() {
        let mono = Layout::new(&Config::default());
        assert_eq!(mono.baseline(), 225.5);
        assert_eq!(mono.index_count(), 800);

        let stereo = Layout::new(&Config {
            channel_mode: ChannelMode::Stereo,
            ..Default::default()
        });
        assert_eq!(stereo.baseline(), 113.0);
    }

    #[test]
    fn vertical_offset_clamps_to_display() {
        assert_eq!(vertical_offset(0.0, 0.0, 65.0, 225.5), 0.5);
        assert_eq!(vertical_offset(10.0, 0.0, 65.0, 225.5), 0.5);
        assert_eq!(vertical_offset(-65.0, 0.0, 65.0, 225.5), 225.5);
        assert_eq!(vertical_offset(crate::DB_MIN, 0.0, 65.0, 225.5), 225.5);
    }
}
