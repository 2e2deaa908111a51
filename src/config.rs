use crate::constants::{
    DEFAULT_CEILING, DEFAULT_CUTOFF_HIGH, DEFAULT_CUTOFF_LOW, DEFAULT_FLOOR, FFT_ALIGNMENT,
    MAX_GAP, MIN_FFT_SIZE, NO_SOURCE,
};

/// How the spectrum is laid out across the display width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Curve,
    Bars,
    SteppedBars,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Mono,
    Stereo,
}

/// Window applied to the analysis window before the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFunction {
    None,
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpMode {
    Point,
    Lanczos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    None,
    Gauss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothingMode {
    None,
    Exponential,
}

/// Only consumed by renderers; the pipeline passes it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Line,
    Solid,
    Gradient,
}

//
// Setting-key parsing. Unrecognised keys fall through to the same variant the
// host settings layer uses for its final `else` branch.
//

impl From<&str> for DisplayMode {
    fn from(key: &str) -> Self {
        match key {
            "bars" => Self::Bars,
            "step_bars" => Self::SteppedBars,
            _ => Self::Curve,
        }
    }
}

impl From<&str> for ChannelMode {
    fn from(key: &str) -> Self {
        match key {
            "stereo" => Self::Stereo,
            _ => Self::Mono,
        }
    }
}

impl From<&str> for WindowFunction {
    fn from(key: &str) -> Self {
        match key {
            "hann" => Self::Hann,
            "hamming" => Self::Hamming,
            "blackman" => Self::Blackman,
            "blackman_harris" => Self::BlackmanHarris,
            _ => Self::None,
        }
    }
}

impl From<&str> for InterpMode {
    fn from(key: &str) -> Self {
        match key {
            "lanczos" => Self::Lanczos,
            _ => Self::Point,
        }
    }
}

impl From<&str> for FilterMode {
    fn from(key: &str) -> Self {
        match key {
            "gauss" => Self::Gauss,
            _ => Self::None,
        }
    }
}

impl From<&str> for SmoothingMode {
    fn from(key: &str) -> Self {
        match key {
            "expavg" => Self::Exponential,
            _ => Self::None,
        }
    }
}

impl From<&str> for RenderMode {
    fn from(key: &str) -> Self {
        match key {
            "line" => Self::Line,
            "solid" => Self::Solid,
            _ => Self::Gradient,
        }
    }
}

/// Immutable snapshot of every tunable. A new snapshot replaces the old one
/// wholesale; all derived state is rebuilt from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub audio_source: String,
    pub display_mode: DisplayMode,
    pub width: u32,
    pub height: u32,
    pub log_scale: bool,
    pub channel_mode: ChannelMode,
    pub fft_size: usize,
    pub auto_fft_size: bool,
    pub window: WindowFunction,
    pub interp_mode: InterpMode,
    pub filter_mode: FilterMode,
    pub filter_radius: f32,
    pub smoothing: SmoothingMode,
    pub gravity: f32,
    pub fast_peaks: bool,
    pub cutoff_low: i32,
    pub cutoff_high: i32,
    pub floor: i32,
    pub ceiling: i32,
    pub slope: f32,
    pub render_mode: RenderMode,
    /// Packed `0xAABBGGRR`.
    pub color_base: u32,
    pub color_crest: u32,
    pub grad_ratio: f32,
    pub bar_width: u32,
    pub bar_gap: u32,
    pub step_width: u32,
    pub step_gap: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio_source: NO_SOURCE.to_string(),
            display_mode: DisplayMode::Curve,
            width: 800,
            height: 225,
            log_scale: true,
            channel_mode: ChannelMode::Mono,
            fft_size: 2048,
            auto_fft_size: false,
            window: WindowFunction::Hann,
            interp_mode: InterpMode::Lanczos,
            filter_mode: FilterMode::None,
            filter_radius: 1.5,
            smoothing: SmoothingMode::Exponential,
            gravity: 0.65,
            fast_peaks: false,
            cutoff_low: 30,
            cutoff_high: 17500,
            floor: -65,
            ceiling: 0,
            slope: 0.0,
            render_mode: RenderMode::Solid,
            color_base: 0xffffffff,
            color_crest: 0xffffffff,
            grad_ratio: 0.75,
            bar_width: 24,
            bar_gap: 6,
            step_width: 8,
            step_gap: 4,
        }
    }
}

impl Config {
    /// Silently corrects out-of-range or degenerate values.
    pub fn sanitize(mut self) -> Self {
        self.fft_size = align_fft_size(self.fft_size);

        // Differences are taken in i64 so extreme values cannot overflow.
        if (self.cutoff_high as i64) - (self.cutoff_low as i64) < 1 {
            self.cutoff_low = DEFAULT_CUTOFF_LOW;
            self.cutoff_high = DEFAULT_CUTOFF_HIGH;
        }

        if (self.ceiling as i64) - (self.floor as i64) < 1 {
            self.floor = DEFAULT_FLOOR;
            self.ceiling = DEFAULT_CEILING;
        }

        // NaN falls back to the neutral end of each range.
        self.gravity = if self.gravity.is_nan() { 0.0 } else { self.gravity.clamp(0.0, 1.0) };
        self.slope = if self.slope.is_nan() { 0.0 } else { self.slope.clamp(0.0, 10.0) };
        self.filter_radius = if self.filter_radius.is_nan() {
            0.0
        } else {
            self.filter_radius.clamp(0.0, 32.0)
        };

        self.width = self.width.max(1);
        self.height = self.height.max(1);
        self.bar_width = self.bar_width.max(1);
        self.step_width = self.step_width.max(1);
        self.bar_gap = self.bar_gap.min(MAX_GAP);
        self.step_gap = self.step_gap.min(MAX_GAP);
        self
    }

    pub fn is_stereo(&self) -> bool {
        self.channel_mode == ChannelMode::Stereo
    }

    pub fn has_source(&self) -> bool {
        !self.audio_source.is_empty() && self.audio_source != NO_SOURCE
    }

    pub fn db_range(&self) -> f32 {
        ((self.ceiling as i64) - (self.floor as i64)) as f32
    }
}

/// Clamps a requested analysis window to the minimum and rounds it down to the
/// alignment multiple.
pub fn align_fft_size(n: usize) -> usize {
    if n < MIN_FFT_SIZE {
        MIN_FFT_SIZE
    } else {
        n & !(FFT_ALIGNMENT - 1)
    }
}

/// Window size giving one analysis window per video frame.
pub fn auto_fft_size(sample_rate: u32, fps: f64) -> usize {
    let fps = if fps.is_finite() && fps > 0.0 { fps } else { crate::constants::FALLBACK_FPS };
    align_fft_size((sample_rate as f64 / fps) as usize)
}

/// Unpacks a `0xAABBGGRR` colour into normalised RGBA.
pub fn unpack_color(packed: u32) -> [f32; 4] {
    [
        (packed & 0xff) as f32 / 255.0,
        ((packed >> 8) & 0xff) as f32 / 255.0,
        ((packed >> 16) & 0xff) as f32 / 255.0,
        ((packed >> 24) & 0xff) as f32 / 255.0,
    ]
}
