use std::time::Duration;

// Capture path gives up on the instance lock after this long and drops the frame.
pub const CAPTURE_LOCK_TIMEOUT: Duration = Duration::from_millis(10);

// Seconds between attempts to attach a missing audio source.
pub const RETRY_DELAY: f32 = 2.0;

// Environment fallbacks when the host cannot report audio/video info.
pub const FALLBACK_SAMPLE_RATE: u32 = 44100;
pub const FALLBACK_FPS: f64 = 60.0;

// Analysis window limits. Sizes are kept at a multiple of 16 samples so N/2 stays
// on a 256-bit boundary.
pub const MIN_FFT_SIZE: usize = 128;
pub const FFT_ALIGNMENT: usize = 16;

pub const LANCZOS_TAPS: f32 = 3.0;

// Largest bar or step gap in pixels.
pub const MAX_GAP: u32 = 256;

// Substituted when a configured range is degenerate.
pub const DEFAULT_CUTOFF_LOW: i32 = 120;
pub const DEFAULT_CUTOFF_HIGH: i32 = 17500;
pub const DEFAULT_FLOOR: i32 = -120;
pub const DEFAULT_CEILING: i32 = 0;

// Audio source name meaning "nothing attached".
pub const NO_SOURCE: &str = "none";

// Reference curve endpoints (Hz) for the slope correction table.
pub const SLOPE_REF_LOW: f32 = 10.0;
pub const SLOPE_REF_HIGH: f32 = 10000.0;
