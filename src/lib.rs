//! Real-time audio spectrum pipeline: capture buffering, windowed FFT analysis,
//! temporal smoothing, frequency-axis remapping and spatial filtering, with the
//! hot loops dispatched to CPU-specific kernels chosen once per instance.

pub mod capture;
pub mod config;
pub mod constants;
pub mod cpu;
pub mod display;
pub mod fft;
pub mod filter;
pub mod host;
pub mod mapper;
pub mod simd;
pub mod smoothing;
pub mod source;
pub mod window;

pub use config::Config;
pub use cpu::CpuFeatures;
pub use host::{AudioHost, AudioInfo};
pub use source::{Frame, SpectrumSource};

/// Silence floor in dBFS: `20 * log10(f32::MIN_POSITIVE)`. Every decibel value
/// produced by the pipeline is at least this, never -inf.
pub const DB_MIN: f32 = -758.595_6;

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Logarithmic interpolation between two positive values.
#[inline]
pub fn log_interp(a: f32, b: f32, t: f32) -> f32 {
    a * (b / a).powf(t)
}
