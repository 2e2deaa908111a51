use ringbuf::{HeapRb, Rb};
use std::iter;
use std::mem;

/// Upper bound on captured channels; extra host channels are ignored.
pub const MAX_CHANNELS: usize = 2;

const SAMPLE_BYTES: usize = mem::size_of::<f32>();

/// Per-channel FIFOs holding the most recent raw samples.
///
/// Each ring holds two analysis windows. Pushing past that overwrites the
/// oldest samples, so the newest audio is always kept.
pub struct CaptureBuffer {
    channels: Vec<HeapRb<f32>>,
    window: usize,
}

impl CaptureBuffer {
    /// Allocates `channels` rings (clamped to [`MAX_CHANNELS`]) for an analysis
    /// window of `window` samples.
    pub fn new(channels: usize, window: usize) -> Self {
        let channels = channels.min(MAX_CHANNELS);
        let capacity = (window * 2).max(1);

        Self {
            channels: (0..channels).map(|_| HeapRb::new(capacity)).collect(),
            window,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Appends `frames` samples to every channel. Missing or short channel data,
    /// and muted input, are pushed as silence of the same duration.
    pub fn push(&mut self, frames: usize, data: &[&[f32]], muted: bool) {
        for (i, ring) in self.channels.iter_mut().enumerate() {
            let samples = match data.get(i) {
                Some(samples) if !muted => &samples[..frames.min(samples.len())],
                _ => &[][..],
            };

            ring.push_iter_overwrite(
                samples
                    .iter()
                    .copied()
                    .chain(iter::repeat(0.0).take(frames - samples.len())),
            );
        }
    }

    /// Tops every channel up with leading silence until it holds at least one
    /// full window.
    pub fn prefill(&mut self) {
        for ring in &mut self.channels {
            let missing = self.window.saturating_sub(ring.len());
            if missing > 0 {
                //
                // Re-queue the existing samples behind the padding.
                //
                let existing: Vec<f32> = ring.iter().copied().collect();
                ring.clear();
                ring.push_iter_overwrite(iter::repeat(0.0).take(missing).chain(existing));
            }
        }
    }

    /// Copies the newest `window` samples of `channel` into `dst` and discards
    /// anything older. Zero-pads at the front while history is short.
    pub fn latest(&mut self, channel: usize, dst: &mut [f32]) {
        let window = self.window.min(dst.len());
        let Some(ring) = self.channels.get_mut(channel) else {
            dst.fill(0.0);
            return;
        };

        while ring.len() > window {
            ring.pop();
        }

        let available = ring.len();
        let pad = window - available;
        dst[..pad].fill(0.0);
        for (out, sample) in dst[pad..window].iter_mut().zip(ring.iter()) {
            *out = *sample;
        }
        dst[window..].fill(0.0);
    }

    /// Bytes currently queued on `channel`.
    pub fn len_bytes(&self, channel: usize) -> usize {
        self.channels.get(channel).map_or(0, |ring| ring.len() * SAMPLE_BYTES)
    }

    /// Most bytes a channel may hold: two analysis windows.
    pub fn max_bytes(&self) -> usize {
        self.window * 2 * SAMPLE_BYTES
    }

    pub fn reset(&mut self) {
        for ring in &mut self.channels {
            ring.clear();
        }
    }
}
