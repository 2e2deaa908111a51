use crate::capture::{CaptureBuffer, MAX_CHANNELS};
use crate::config::{self, unpack_color, Config, RenderMode};
use crate::constants::{CAPTURE_LOCK_TIMEOUT, RETRY_DELAY};
use crate::cpu::CpuFeatures;
use crate::display::{vertical_offset, Layout};
use crate::fft::FftEngine;
use crate::filter::SpatialFilter;
use crate::host::{query_environment, AudioHost, AudioInfo};
use crate::mapper::FrequencyMapper;
use crate::simd::{self, Kernels};
use crate::smoothing::TemporalSmoother;
use crate::DB_MIN;
use parking_lot::Mutex;
use std::sync::Arc;

/// One rendered frame, borrowed from the pipeline for the duration of a draw.
pub struct Frame<'a> {
    /// Vertical offsets per output channel, one per column, within
    /// `[0.5, layout.baseline()]`. The second stereo channel is meant to be
    /// drawn mirrored below the baseline.
    pub channels: &'a [Vec<f32>],
    pub layout: Layout,
    /// Smallest offset across all channels (the highest point drawn).
    pub top: f32,
    pub gradient_height: f32,
    pub render_mode: RenderMode,
    pub color_base: [f32; 4],
    pub color_crest: [f32; 4],
}

/// A visualised audio source: capture buffers, analysis state and display
/// mapping behind a single lock.
///
/// `capture` is meant for the host's audio thread and never waits longer than
/// [`CAPTURE_LOCK_TIMEOUT`]; if the lock is busy the audio is dropped. `tick`,
/// `render` and `update` block until they own the whole instance.
pub struct SpectrumSource {
    host: Arc<dyn AudioHost>,
    kernels: Arc<dyn Kernels>,
    state: Mutex<State>,
}

struct State {
    config: Config,
    audio_info: AudioInfo,
    capture_channels: usize,

    capture: CaptureBuffer,
    engine: FftEngine,
    /// Second capture channel when downmixing to mono.
    mix: Vec<f32>,

    //
    // Current visible spectrum per output channel, in dB.
    //
    decibels: Vec<Vec<f32>>,
    smoother: TemporalSmoother,

    mapper: FrequencyMapper,
    filter: Option<SpatialFilter>,
    layout: Layout,
    outputs: Vec<Vec<f32>>,

    attached: bool,
    show: bool,
    last_silent: bool,
    retries: u32,
    next_retry: f32,
}

impl SpectrumSource {
    pub fn new(config: Config, host: Arc<dyn AudioHost>) -> Self {
        Self::with_features(config, host, CpuFeatures::current())
    }

    /// Builds the pipeline with an explicit capability descriptor. The kernel
    /// set chosen here is kept for the instance's lifetime.
    pub fn with_features(config: Config, host: Arc<dyn AudioHost>, features: CpuFeatures) -> Self {
        let kernels = simd::select(&features);
        let state = State::build(config, host.as_ref(), kernels.name());

        Self {
            host,
            kernels,
            state: Mutex::new(state),
        }
    }

    /// Replaces the configuration and rebuilds every derived buffer.
    pub fn update(&self, config: Config) {
        let mut state = self.state.lock();
        state.release(self.host.as_ref());
        *state = State::build(config, self.host.as_ref(), self.kernels.name());
    }

    /// Audio callback. `channels` holds one slice per host channel; anything
    /// beyond the captured channel count is ignored.
    pub fn capture(&self, frames: usize, channels: &[&[f32]], muted: bool) {
        //
        // Audio delivery must not stall behind a slow render; drop the block instead.
        //
        let Some(mut state) = self.state.try_lock_for(CAPTURE_LOCK_TIMEOUT) else {
            return;
        };
        if !state.attached {
            return;
        }

        state.capture.push(frames, channels, muted);
    }

    /// Produces the next spectrum from the newest captured audio.
    pub fn tick(&self, seconds: f32) {
        let mut state = self.state.lock();
        state.tick(self.host.as_ref(), self.kernels.as_ref(), seconds);
    }

    /// Maps the current spectrum onto the display and hands the frame to
    /// `draw`. Returns `None` without calling `draw` while the source is silent.
    ///
    /// The frame borrows the output buffers and `draw` runs with the lock held,
    /// so a capture arriving meanwhile waits out its bounded timeout.
    pub fn render<R>(&self, draw: impl FnOnce(&Frame<'_>) -> R) -> Option<R> {
        let mut state = self.state.lock();
        state.render(self.kernels.as_ref()).map(|frame| draw(&frame))
    }

    pub fn show(&self) {
        self.state.lock().show = true;
    }

    pub fn hide(&self) {
        self.state.lock().show = false;
    }

    pub fn width(&self) -> u32 {
        self.state.lock().config.width
    }

    pub fn height(&self) -> u32 {
        self.state.lock().config.height
    }

    /// The sanitized configuration in effect.
    pub fn config(&self) -> Config {
        self.state.lock().config.clone()
    }

    /// Sample rate reported by the host at the last rebuild, or the fallback.
    pub fn sample_rate(&self) -> u32 {
        self.state.lock().audio_info.sample_rate
    }

    pub fn fft_size(&self) -> usize {
        self.state.lock().engine.size()
    }

    pub fn kernels_name(&self) -> &'static str {
        self.kernels.name()
    }

    pub fn is_silent(&self) -> bool {
        self.state.lock().last_silent
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    pub fn output_channels(&self) -> usize {
        self.state.lock().decibels.len()
    }

    /// Copy of the decibel spectrum for `channel`.
    pub fn spectrum(&self, channel: usize) -> Option<Vec<f32>> {
        self.state.lock().decibels.get(channel).cloned()
    }

    pub fn index_table(&self) -> Vec<f32> {
        self.state.lock().mapper.indices().to_vec()
    }

    /// Bytes queued for `channel`, and the most it may hold.
    pub fn capture_usage(&self, channel: usize) -> (usize, usize) {
        let state = self.state.lock();
        (state.capture.len_bytes(channel), state.capture.max_bytes())
    }
}

impl Drop for SpectrumSource {
    fn drop(&mut self) {
        self.state.get_mut().release(self.host.as_ref());
    }
}

impl State {
    fn build(config: Config, host: &dyn AudioHost, kernels_name: &str) -> Self {
        let config = config.sanitize();

        let (audio_info, fps) = query_environment(host);
        let capture_channels = (audio_info.channels as usize).min(MAX_CHANNELS);
        if capture_channels == 0 {
            log::warn!("Could not determine audio channel count");
        }

        let fft_size = if config.auto_fft_size {
            config::auto_fft_size(audio_info.sample_rate, fps)
        } else {
            config.fft_size
        };
        let bins = fft_size / 2;

        let output_channels = if config.is_stereo() { 2 } else { 1 };
        let layout = Layout::new(&config);
        let mapper = FrequencyMapper::new(
            config.display_mode,
            config.interp_mode,
            layout.index_count(),
            config.log_scale,
            config.cutoff_low as f32,
            config.cutoff_high as f32,
            fft_size,
            audio_info.sample_rate as f32,
        );
        let filter = match config.filter_mode {
            config::FilterMode::Gauss => {
                Some(SpatialFilter::new(config.filter_radius, layout.columns))
            }
            config::FilterMode::None => None,
        };

        log::debug!(
            "Spectrum rebuilt: N={} ({}), {} Hz, bins {:.2}..{:.2}, {} columns, {} kernels",
            fft_size,
            if config.auto_fft_size { "auto" } else { "manual" },
            audio_info.sample_rate,
            mapper.indices().first().copied().unwrap_or(0.0),
            mapper.indices().last().copied().unwrap_or(0.0),
            layout.columns,
            kernels_name,
        );

        let mut state = Self {
            audio_info,
            capture_channels,
            capture: CaptureBuffer::new(capture_channels, fft_size),
            engine: FftEngine::new(fft_size, config.window, config.slope),
            mix: vec![0.0; fft_size],
            decibels: vec![vec![DB_MIN; bins]; output_channels],
            smoother: TemporalSmoother::new(
                config.smoothing,
                config.gravity,
                config.fast_peaks,
                output_channels,
                bins,
            ),
            mapper,
            filter,
            outputs: vec![vec![0.0; layout.columns]; output_channels],
            layout,
            config,
            attached: false,
            show: true,
            last_silent: false,
            retries: 0,
            next_retry: 0.0,
        };

        state.attach(host);
        state.capture.prefill();
        state
    }

    fn attach(&mut self, host: &dyn AudioHost) {
        if self.attached || !self.config.has_source() {
            return;
        }

        if host.attach_audio_source(&self.config.audio_source) {
            self.attached = true;
        } else {
            //
            // Only the first failure of a streak is reported.
            //
            if self.retries == 0 {
                log::warn!("Failed to get audio source: \"{}\"", self.config.audio_source);
            }
            self.retries = self.retries.saturating_add(1);
        }
    }

    fn release(&mut self, host: &dyn AudioHost) {
        if self.attached {
            host.release_audio_source(&self.config.audio_source);
            self.attached = false;
        }
        self.capture.reset();
    }

    fn tick(&mut self, host: &dyn AudioHost, kernels: &dyn Kernels, seconds: f32) {
        if !self.attached && self.config.has_source() {
            self.next_retry -= seconds;
            if self.next_retry <= 0.0 {
                self.attach(host);
                self.next_retry = RETRY_DELAY;
            }
        }

        if !self.show {
            return;
        }

        let silent = self.analyze(kernels);

        for (channel, decibels) in self.decibels.iter_mut().enumerate() {
            self.smoother.apply(kernels, channel, decibels);
        }

        let floor = self.config.floor as f32;
        self.last_silent = silent
            && self
                .decibels
                .iter()
                .all(|channel| channel.iter().all(|&db| db <= floor));
    }

    /// Writes this frame's raw decibels into `self.decibels`. Returns whether
    /// every analysed window was silent.
    fn analyze(&mut self, kernels: &dyn Kernels) -> bool {
        if self.capture_channels == 0 {
            for channel in &mut self.decibels {
                channel.fill(DB_MIN);
            }
            return true;
        }

        if self.config.is_stereo() {
            let mut silent = true;
            for channel in 0..self.decibels.len() {
                let source = channel.min(self.capture_channels - 1);
                if source != channel {
                    //
                    // Single capture channel shown on both sides.
                    //
                    let (first, rest) = self.decibels.split_at_mut(channel);
                    rest[0].copy_from_slice(&first[source]);
                    continue;
                }
                self.capture.latest(source, self.engine.input_mut());
                silent &= self.engine.analyze(kernels, &mut self.decibels[channel]);
            }
            return silent;
        }

        self.capture.latest(0, self.engine.input_mut());
        if self.capture_channels > 1 {
            self.capture.latest(1, &mut self.mix);
            for (sample, other) in self.engine.input_mut().iter_mut().zip(&self.mix) {
                *sample = (*sample + *other) * 0.5;
            }
        }
        self.engine.analyze(kernels, &mut self.decibels[0])
    }

    fn render(&mut self, kernels: &dyn Kernels) -> Option<Frame<'_>> {
        if self.last_silent {
            return None;
        }

        let baseline = self.layout.baseline();
        let ceiling = self.config.ceiling as f32;
        let range = self.config.db_range();
        let mut top = baseline;

        for (decibels, output) in self.decibels.iter().zip(self.outputs.iter_mut()) {
            self.mapper.resample(kernels, decibels, output);
            if let Some(filter) = &mut self.filter {
                filter.apply(kernels, output);
            }

            for value in output.iter_mut() {
                *value = vertical_offset(*value, ceiling, range, baseline);
                top = top.min(*value);
            }
        }

        Some(Frame {
            channels: &self.outputs,
            layout: self.layout,
            top,
            gradient_height: (baseline - top) * self.config.grad_ratio,
            render_mode: self.config.render_mode,
            color_base: unpack_color(self.config.color_base),
            color_crest: unpack_color(self.config.color_crest),
        })
    }
}
