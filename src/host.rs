use crate::constants::{FALLBACK_FPS, FALLBACK_SAMPLE_RATE};

/// Audio environment as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    /// Number of speaker channels; 0 when the layout is unknown.
    pub channels: u32,
}

impl Default for AudioInfo {
    fn default() -> Self {
        Self {
            sample_rate: FALLBACK_SAMPLE_RATE,
            channels: 0,
        }
    }
}

/// Services the pipeline needs from whatever application embeds it.
///
/// The host pushes audio by calling [`SpectrumSource::capture`](crate::SpectrumSource::capture)
/// from its own thread once a source has been attached.
pub trait AudioHost: Send + Sync {
    /// Sample rate and channel layout, or `None` if the host has no audio info.
    fn audio_info(&self) -> Option<AudioInfo>;

    /// Output frame rate, used only to size an automatic analysis window.
    fn video_fps(&self) -> Option<f64>;

    /// Starts routing audio from the named source. Returns `false` if no such
    /// source exists.
    fn attach_audio_source(&self, name: &str) -> bool;

    fn release_audio_source(&self, _name: &str) {}
}

/// Queries the host, substituting fallbacks for anything unavailable.
pub(crate) fn query_environment(host: &dyn AudioHost) -> (AudioInfo, f64) {
    let info = host
        .audio_info()
        .filter(|info| info.sample_rate > 0)
        .unwrap_or_default();
    let fps = host
        .video_fps()
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .unwrap_or(FALLBACK_FPS);

    (info, fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    impl AudioHost for Offline {
        fn audio_info(&self) -> Option<AudioInfo> {
            None
        }

        fn video_fps(&self) -> Option<f64> {
            Some(f64::NAN)
        }

        fn attach_audio_source(&self, _name: &str) -> bool {
            false
        }
    }

    #[test]
    fn missing_environment_uses_fallbacks() {
        let (info, fps) = query_environment(&Offline);
        assert_eq!(
            info,
            AudioInfo {
                sample_rate: 44100,
                channels: 0,
            }
        );
        assert_eq!(fps, 60.0);
    }
}
