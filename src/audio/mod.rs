use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample};
use fftspectrum::{AudioHost, AudioInfo, SpectrumSource};
use std::sync::Arc;
use thiserror::Error;

/// Source name the pipeline uses for the default input device.
pub const DEFAULT_SOURCE: &str = "default";

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio input device found, please check system settings")]
    NoDevice,
    #[error("failed to get default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("unsupported audio sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),
}

/// The opened default input device and its default configuration.
pub struct InputDevice {
    device: cpal::Device,
    name: String,
    config: cpal::SupportedStreamConfig,
}

/// What the pipeline sees of the audio system. Only the default input device
/// can be attached.
pub struct CpalHost {
    info: Option<AudioInfo>,
}

impl CpalHost {
    /// A host with no usable device; attaching always fails.
    pub fn offline() -> Self {
        Self { info: None }
    }
}

impl AudioHost for CpalHost {
    fn audio_info(&self) -> Option<AudioInfo> {
        self.info
    }

    fn video_fps(&self) -> Option<f64> {
        Some(60.0)
    }

    fn attach_audio_source(&self, name: &str) -> bool {
        self.info.is_some() && name == DEFAULT_SOURCE
    }

    fn release_audio_source(&self, name: &str) {
        log::debug!("Released audio source \"{}\"", name);
    }
}

/// Opens the default input device of the default host.
pub fn open_default_input() -> Result<InputDevice, AudioError> {
    let host = cpal::default_host();

    //
    // Log all available input devices for debugging.
    //
    log::info!("--- AVAILABLE INPUT DEVICES ---");
    if let Ok(devices) = host.input_devices() {
        for (i, dev) in devices.enumerate() {
            let name = dev.name().unwrap_or("Unknown".into());
            log::info!("  [{}]: {}", i, name);
        }
    }
    log::info!("-------------------------------");

    let device = host.default_input_device().ok_or(AudioError::NoDevice)?;
    let name = device.name().unwrap_or("Unknown".into());
    log::info!("Selected audio device: {}", name);

    let config = device.default_input_config()?;
    log::info!(
        "Audio config: {:?} @ {}Hz, Channels: {}",
        config.sample_format(),
        config.sample_rate().0,
        config.channels()
    );

    Ok(InputDevice { device, name, config })
}

impl InputDevice {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> CpalHost {
        CpalHost {
            info: Some(AudioInfo {
                sample_rate: self.config.sample_rate().0,
                channels: self.config.channels() as u32,
            }),
        }
    }

    /// Starts streaming into `source`. The stream stops when dropped.
    pub fn start(self, source: Arc<SpectrumSource>) -> Result<cpal::Stream, AudioError> {
        let sample_format = self.config.sample_format();
        let config: cpal::StreamConfig = self.config.into();
        let planes = Planes::new(source, config.channels as usize);

        let stream = match sample_format {
            SampleFormat::F32 => build(&self.device, &config, planes, |s: f32| s)?,
            SampleFormat::I16 => build(&self.device, &config, planes, |s: i16| s as f32 / 32768.0)?,
            SampleFormat::U16 => {
                build(&self.device, &config, planes, |s: u16| (s as f32 - 32768.0) / 32768.0)?
            }
            format => return Err(AudioError::UnsupportedFormat(format)),
        };

        stream.play()?;
        Ok(stream)
    }
}

fn build<T: SizedSample + 'static>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut planes: Planes,
    convert: fn(T) -> f32,
) -> Result<cpal::Stream, AudioError> {
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &_| planes.deliver(data, convert),
        |err| log::error!("Audio input error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Splits interleaved callback data into per-channel planes for the pipeline.
/// Channels beyond the second are ignored.
struct Planes {
    source: Arc<SpectrumSource>,
    channels: usize,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Planes {
    fn new(source: Arc<SpectrumSource>, channels: usize) -> Self {
        Self {
            source,
            channels: channels.max(1),
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    fn deliver<T: Copy>(&mut self, data: &[T], convert: fn(T) -> f32) {
        let frames = data.len() / self.channels;

        self.left.clear();
        self.left
            .extend(data.chunks_exact(self.channels).map(|frame| convert(frame[0])));

        if self.channels == 1 {
            self.source.capture(frames, &[&self.left[..]], false);
            return;
        }

        self.right.clear();
        self.right
            .extend(data.chunks_exact(self.channels).map(|frame| convert(frame[1])));
        self.source.capture(frames, &[&self.left[..], &self.right[..]], false);
    }
}
