//! Short-time Fourier transform with overlap-add resynthesis.
//!
//! [`StftEngine`] turns a per-frame [`SpectralTransform`] into a streaming
//! processor that accepts blocks of any length.
//!
//! # Frame Bookkeeping
//!
//! | Quantity | Value |
//! |----------|-------|
//! | FFT size `N` | one of [`FFT_SIZES`] |
//! | Hop | `N / 4` (75 % overlap) |
//! | Window | periodic Hann, applied at analysis and synthesis |
//! | Latency | exactly `N` samples |
//!
//! Each channel keeps the most recent `N` input samples, an overlap-add
//! accumulator and a `hop`-long queue of finished output. Every incoming sample
//! is appended to the input history while one finished sample is drained from
//! the queue. When `hop` new samples have arrived a frame runs:
//!
//! 1. window the last `N` inputs and FFT them
//! 2. hand the spectrum to the transform
//! 3. inverse FFT, window again, divide by the overlap-add gain and add into
//!    the accumulator
//! 4. move the first `hop` accumulator samples (now complete) to the output
//!    queue and slide the accumulator and input history left by `hop`
//!
//! Output sample `t` therefore reconstructs input sample `t − N`, and the first
//! `N` output samples are silent.

use alloc::vec;
use alloc::vec::Vec;

use crate::fft::Fft;
use crate::window::{hann, overlap_add_gain};

/// Valid FFT sizes.
pub const FFT_SIZES: [usize; 7] = [512, 1024, 2048, 4096, 8192, 16384, 32768];

/// FFT size used when none is configured.
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// Snaps a requested FFT size to the nearest entry of [`FFT_SIZES`].
///
/// Ties resolve to the smaller size; non-finite requests give
/// [`DEFAULT_FFT_SIZE`].
///
/// ```rust
/// use patchrome_spectral::snap_fft_size;
///
/// assert_eq!(snap_fft_size(2000.0), 2048);
/// assert_eq!(snap_fft_size(100.0), 512);
/// assert_eq!(snap_fft_size(1e9), 32768);
/// ```
pub fn snap_fft_size(requested: f32) -> usize {
    if !requested.is_finite() {
        return DEFAULT_FFT_SIZE;
    }
    let requested = libm::roundf(requested);
    let mut best = FFT_SIZES[0];
    for &size in &FFT_SIZES[1..] {
        if libm::fabsf(size as f32 - requested) < libm::fabsf(best as f32 - requested) {
            best = size;
        }
    }
    best
}

/// Geometry of the frame being transformed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// FFT size `N`.
    pub fft_size: usize,
    /// Hop between frames.
    pub hop: usize,
    /// Stream sample rate in Hz.
    pub sample_rate: f32,
}

impl FrameInfo {
    /// Index of the Nyquist bin (`N / 2`).
    pub fn nyquist(&self) -> usize {
        self.fft_size / 2
    }
}

/// Per-frame spectral modification.
///
/// `transform` receives the full `N`-point spectrum of a real frame and must
/// leave it Hermitian (`X[N−k] = conj(X[k])`) so the resynthesized frame stays
/// real.
pub trait SpectralTransform: Send {
    /// Per-channel state retained across frames.
    type State: Send;

    /// Creates fresh per-channel state for a frame geometry.
    fn create_state(&self, frame: FrameInfo) -> Self::State;

    /// Modifies one spectrum in place.
    fn transform(&mut self, state: &mut Self::State, re: &mut [f32], im: &mut [f32], frame: FrameInfo);
}

struct Channel<S> {
    /// Last `N` input samples, oldest first.
    input: Vec<f32>,
    /// Overlap-add accumulator, `N` long.
    accum: Vec<f32>,
    /// Finished output waiting to be drained, `hop` long.
    ready: Vec<f32>,
    /// Samples received since the last frame.
    fill: usize,
    state: S,
}

impl<S> Channel<S> {
    fn new(frame: FrameInfo, state: S) -> Self {
        Self {
            input: vec![0.0; frame.fft_size],
            accum: vec![0.0; frame.fft_size],
            ready: vec![0.0; frame.hop],
            fill: 0,
            state,
        }
    }
}

/// Streaming STFT processor.
pub struct StftEngine<T: SpectralTransform> {
    transform: T,
    fft: Fft,
    window: Vec<f32>,
    synthesis_scale: f32,
    frame: FrameInfo,
    channels: Vec<Channel<T::State>>,
    scratch_re: Vec<f32>,
    scratch_im: Vec<f32>,
}

impl<T: SpectralTransform> StftEngine<T> {
    /// Creates an engine for `channel_count` channels.
    ///
    /// `fft_size` is snapped with [`snap_fft_size`].
    pub fn new(transform: T, fft_size: usize, channel_count: usize, sample_rate: f32) -> Self {
        let mut engine = Self {
            transform,
            fft: Fft::new(2),
            window: Vec::new(),
            synthesis_scale: 1.0,
            frame: FrameInfo {
                fft_size: 0,
                hop: 0,
                sample_rate,
            },
            channels: Vec::new(),
            scratch_re: Vec::new(),
            scratch_im: Vec::new(),
        };
        engine.reinitialize(snap_fft_size(fft_size as f32), channel_count);
        engine
    }

    fn reinitialize(&mut self, fft_size: usize, channel_count: usize) {
        let hop = fft_size / 4;
        self.frame.fft_size = fft_size;
        self.frame.hop = hop;
        self.fft = Fft::new(fft_size);
        self.window = hann(fft_size);
        self.synthesis_scale = 1.0 / overlap_add_gain(&self.window, hop);
        self.scratch_re = vec![0.0; fft_size];
        self.scratch_im = vec![0.0; fft_size];
        let frame = self.frame;
        self.channels = (0..channel_count)
            .map(|_| Channel::new(frame, self.transform.create_state(frame)))
            .collect();
    }

    /// Current FFT size.
    pub fn fft_size(&self) -> usize {
        self.frame.fft_size
    }

    /// Samples between frames.
    pub fn hop_size(&self) -> usize {
        self.frame.hop
    }

    /// Input-to-output delay in samples.
    pub fn latency(&self) -> usize {
        self.frame.fft_size
    }

    /// Number of channels with state.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Current frame geometry.
    pub fn frame(&self) -> FrameInfo {
        self.frame
    }

    /// The per-frame transform.
    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Mutable access to the per-frame transform (parameter updates).
    pub fn transform_mut(&mut self) -> &mut T {
        &mut self.transform
    }

    /// Changes the FFT size, snapping to [`FFT_SIZES`].
    ///
    /// A change reinitializes every per-channel buffer (history, accumulator
    /// and transform state). Returns `true` if the size changed.
    pub fn set_fft_size(&mut self, requested: f32) -> bool {
        let size = snap_fft_size(requested);
        if size == self.frame.fft_size {
            return false;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(from = self.frame.fft_size, to = size, "stft: fft size change");
        let channels = self.channels.len();
        self.reinitialize(size, channels);
        true
    }

    /// Clears all buffers and transform state.
    pub fn reset(&mut self) {
        let (size, channels) = (self.frame.fft_size, self.channels.len());
        self.reinitialize(size, channels);
    }

    /// Pushes one sample into `channel` and returns one output sample.
    ///
    /// Channels beyond [`channel_count`](Self::channel_count) pass through.
    #[inline]
    pub fn process_sample(&mut self, channel: usize, sample: f32) -> f32 {
        let hop = self.frame.hop;
        let n = self.frame.fft_size;
        let Some(ch) = self.channels.get_mut(channel) else {
            return sample;
        };

        ch.input[n - hop + ch.fill] = sample;
        let out = ch.ready[ch.fill];
        ch.fill += 1;

        if ch.fill == hop {
            ch.fill = 0;
            let re = &mut self.scratch_re;
            let im = &mut self.scratch_im;

            for ((r, i), (x, w)) in re
                .iter_mut()
                .zip(im.iter_mut())
                .zip(ch.input.iter().zip(&self.window))
            {
                *r = x * w;
                *i = 0.0;
            }

            self.fft.forward(re, im);
            self.transform.transform(&mut ch.state, re, im, self.frame);
            self.fft.inverse(re, im);

            for ((acc, r), w) in ch.accum.iter_mut().zip(re.iter()).zip(&self.window) {
                *acc += r * w * self.synthesis_scale;
            }

            ch.ready.copy_from_slice(&ch.accum[..hop]);
            ch.accum.copy_within(hop.., 0);
            ch.accum[n - hop..].fill(0.0);
            ch.input.copy_within(hop.., 0);
        }

        out
    }

    /// Processes planar blocks.
    ///
    /// Handles `min(inputs.len(), outputs.len())` channels; extra output
    /// channels are left untouched. Each input sample is multiplied by
    /// `input_gain` before analysis.
    pub fn process_block(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], input_gain: f32) {
        for (ch, (input, output)) in inputs.iter().zip(outputs.iter_mut()).enumerate() {
            for (x, y) in input.iter().zip(output.iter_mut()) {
                *y = self.process_sample(ch, x * input_gain);
            }
        }
    }
}

/// Pass-through transform, useful for measuring reconstruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl SpectralTransform for Identity {
    type State = ();

    fn create_state(&self, _frame: FrameInfo) -> Self::State {}

    fn transform(&mut self, _state: &mut (), _re: &mut [f32], _im: &mut [f32], _frame: FrameInfo) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(n: usize) -> Vec<f32> {
        (0..n).map(|i| libm::sinf(i as f32 * 0.05) * 0.5).collect()
    }

    #[test]
    fn snapping() {
        assert_eq!(snap_fft_size(768.0), 512);
        assert_eq!(snap_fft_size(769.0), 1024);
        assert_eq!(snap_fft_size(f32::NAN), DEFAULT_FFT_SIZE);
        assert_eq!(snap_fft_size(-5.0), 512);
    }

    #[test]
    fn identity_reconstructs_with_latency() {
        let mut engine = StftEngine::new(Identity, 512, 1, 48000.0);
        let input = sine(4096);
        let output: Vec<f32> = input.iter().map(|&x| engine.process_sample(0, x)).collect();
        for y in &output[..512] {
            assert!(y.abs() < 1e-4);
        }
        for t in 512..4096 {
            assert!(
                (output[t] - input[t - 512]).abs() < 1e-4,
                "t={t}: {} vs {}",
                output[t],
                input[t - 512]
            );
        }
    }

    #[test]
    fn fft_size_change_reinitializes() {
        let mut engine = StftEngine::new(Identity, 2048, 2, 48000.0);
        for x in sine(3000) {
            engine.process_sample(0, x);
        }
        assert!(engine.set_fft_size(1000.0));
        assert_eq!(engine.fft_size(), 1024);
        assert_eq!(engine.hop_size(), 256);
        assert_eq!(engine.channel_count(), 2);
        // Fresh buffers: output is silent again
        assert_eq!(engine.process_sample(0, 1.0), 0.0);
        assert!(!engine.set_fft_size(1024.0));
    }

    #[test]
    fn extra_channels_pass_through() {
        let mut engine = StftEngine::new(Identity, 512, 1, 48000.0);
        assert_eq!(engine.process_sample(3, 0.25), 0.25);
    }
}
