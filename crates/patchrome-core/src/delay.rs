//! Delay line for time-based effects.
//!
//! Provides a circular buffer-based delay line with linear interpolation.
//!
//! # Use Cases
//!
//! | Effect | Delay Range | Modulation |
//! |--------|-------------|------------|
//! | Flanger | 1-20ms | Yes (LFO) |
//! | Delay node | 128 samples - 2s | Optional |
//! | Spectral pitch dry path | FFT size | No |
//!
//! # Interpolation
//!
//! For modulated delays use [`InterpolatedDelay::read`] with fractional delay
//! times to avoid zipper noise.

use alloc::vec;
use alloc::vec::Vec;

/// Interpolated delay line using a circular buffer (heap-allocated).
///
/// # Memory
///
/// The buffer is heap-allocated during construction but never reallocates.
/// No allocations occur during audio processing.
///
/// # Example
///
/// ```rust
/// use patchrome_core::InterpolatedDelay;
///
/// // 20ms max delay at 48kHz
/// let mut delay = InterpolatedDelay::from_time(48000.0, 0.02);
///
/// delay.write(1.0);
/// delay.write(0.0);
/// // The impulse was written one sample before the last write
/// assert_eq!(delay.read(1.0), 1.0);
/// assert_eq!(delay.read(0.5), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct InterpolatedDelay {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl InterpolatedDelay {
    /// Creates a new delay line holding `max_delay_samples` samples.
    ///
    /// A zero capacity is bumped to one sample.
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples.max(1)],
            write_pos: 0,
        }
    }

    /// Creates a delay line from sample rate and max delay time in seconds.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        let max_samples = (sample_rate * max_seconds.max(0.0)) as usize + 2;
        Self::new(max_samples)
    }

    /// Reads a delayed sample with linear interpolation.
    ///
    /// `delay_samples` counts back from the most recently written sample:
    /// `read(0.0)` returns the last write.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay_clamped = delay_samples.clamp(0.0, (len - 1) as f32);

        let delay_int = delay_clamped as usize;
        let frac = delay_clamped - delay_int as f32;

        // Points to the sample `delay_int` samples before the last written.
        let read_pos = (self.write_pos + len - delay_int - 1) % len;
        let next_pos = (read_pos + len - 1) % len;
        let a = self.buffer[read_pos];
        let b = self.buffer[next_pos];
        crate::lerp(a, b, frac)
    }

    /// Writes a sample to the delay line and advances the write position.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Writes `sample`, then returns the input from `delay_samples` ago.
    ///
    /// A delay of zero returns `sample` itself.
    #[inline]
    pub fn process(&mut self, sample: f32, delay_samples: f32) -> f32 {
        self.write(sample);
        self.read(delay_samples)
    }

    /// Clears the delay line (sets all samples to 0).
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Returns the capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_delay_is_exact() {
        let mut d = InterpolatedDelay::new(64);
        let mut out = Vec::new();
        for i in 0..20 {
            out.push(d.process(if i == 0 { 1.0 } else { 0.0 }, 5.0));
        }
        assert_eq!(out[5], 1.0);
        assert_eq!(out.iter().filter(|&&s| s != 0.0).count(), 1);
    }

    #[test]
    fn zero_delay_passes_through() {
        let mut d = InterpolatedDelay::new(8);
        assert_eq!(d.process(0.7, 0.0), 0.7);
    }

    #[test]
    fn fractional_read_interpolates() {
        let mut d = InterpolatedDelay::new(8);
        d.write(1.0);
        d.write(0.0);
        assert!((d.read(0.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn read_clamps_to_capacity() {
        let mut d = InterpolatedDelay::new(4);
        for s in [1.0, 2.0, 3.0, 4.0] {
            d.write(s);
        }
        assert_eq!(d.read(100.0), 1.0);
    }

    #[test]
    fn clear_resets() {
        let mut d = InterpolatedDelay::new(4);
        d.write(1.0);
        d.clear();
        assert_eq!(d.read(0.0), 0.0);
    }
}
