//! Uniformly partitioned FFT convolution (overlap-save).
//!
//! The impulse is cut into partitions of one render quantum `B`. Each
//! partition is zero-padded to `2B` and transformed once at creation. Per
//! quantum the last `2B` input samples are transformed, pushed onto a
//! frequency-domain delay line, multiplied against the partition spectra and
//! summed; the second half of the inverse transform is the output. The result
//! is exact linear convolution with no added latency.

use std::sync::Arc;

use patchrome_core::RENDER_QUANTUM;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

const BLOCK: usize = RENDER_QUANTUM;
const FFT_LEN: usize = 2 * BLOCK;

/// Browser calibration gain applied after normalisation (−58 dB).
const GAIN_CALIBRATION: f32 = 0.001_258_925_4;
/// Sample rate the calibration gain was measured at.
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
/// Floor on the measured impulse power.
const MIN_POWER: f32 = 0.000_125;

/// Equal-power normalisation scale for an impulse response.
///
/// `1 / rms` over every channel and sample, times the calibration gain,
/// rescaled for the engine's sample rate.
pub fn normalization_scale(impulse: &[Vec<f32>], sample_rate: f32) -> f32 {
    let samples: usize = impulse.iter().map(Vec::len).sum();
    if samples == 0 {
        return 1.0;
    }
    let energy: f32 = impulse.iter().flatten().map(|s| s * s).sum();
    let mut power = (energy / samples as f32).sqrt();
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }
    GAIN_CALIBRATION * GAIN_CALIBRATION_SAMPLE_RATE / sample_rate / power
}

struct ChannelState {
    partitions: Arc<[Vec<Complex<f32>>]>,
    delay_line: Vec<Vec<Complex<f32>>>,
    position: usize,
    previous: [f32; BLOCK],
}

/// Stereo partitioned convolver.
pub(crate) struct Convolver {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    channels: Vec<ChannelState>,
    work: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    /// Prepares the partition spectra.
    ///
    /// A single-channel impulse is shared by both channels; channels past the
    /// second are ignored.
    pub(crate) fn new(impulse: &[Vec<f32>], normalize: bool, sample_rate: f32) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(FFT_LEN);
        let inverse = planner.plan_fft_inverse(FFT_LEN);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        let mut scratch = vec![Complex::default(); scratch_len];

        let gain = if normalize {
            normalization_scale(impulse, sample_rate)
        } else {
            1.0
        };
        let scale = gain / FFT_LEN as f32;

        let spectra: Vec<Arc<[Vec<Complex<f32>>]>> = impulse
            .iter()
            .take(2)
            .map(|channel| {
                channel
                    .chunks(BLOCK)
                    .map(|segment| {
                        let mut buf = vec![Complex::default(); FFT_LEN];
                        for (dst, &src) in buf.iter_mut().zip(segment) {
                            dst.re = src * scale;
                        }
                        forward.process_with_scratch(&mut buf, &mut scratch);
                        buf
                    })
                    .collect::<Vec<_>>()
                    .into()
            })
            .collect();

        let channels = (0..2)
            .map(|ch| {
                let partitions = spectra
                    .get(ch)
                    .or_else(|| spectra.first())
                    .cloned()
                    .unwrap_or_else(|| Vec::new().into());
                ChannelState {
                    delay_line: vec![vec![Complex::default(); FFT_LEN]; partitions.len()],
                    partitions,
                    position: 0,
                    previous: [0.0; BLOCK],
                }
            })
            .collect();

        Self {
            forward,
            inverse,
            channels,
            work: vec![Complex::default(); FFT_LEN],
            accum: vec![Complex::default(); FFT_LEN],
            scratch,
        }
    }

    /// Convolves one quantum of channel `ch`.
    pub(crate) fn process(&mut self, ch: usize, input: &[f32; BLOCK], output: &mut [f32; BLOCK]) {
        let Some(state) = self.channels.get_mut(ch) else {
            output.fill(0.0);
            return;
        };
        let count = state.partitions.len();
        if count == 0 {
            output.fill(0.0);
            return;
        }

        for (dst, &src) in self.work.iter_mut().zip(state.previous.iter().chain(input)) {
            *dst = Complex::new(src, 0.0);
        }
        state.previous = *input;
        self.forward
            .process_with_scratch(&mut self.work, &mut self.scratch);
        state.delay_line[state.position].copy_from_slice(&self.work);

        // Real input: only bins 0..=B are independent
        self.accum[..=BLOCK].fill(Complex::default());
        for p in 0..count {
            let spectrum = &state.delay_line[(state.position + count - p) % count];
            let partition = &state.partitions[p];
            for k in 0..=BLOCK {
                self.accum[k] += spectrum[k] * partition[k];
            }
        }
        for k in BLOCK + 1..FFT_LEN {
            self.accum[k] = self.accum[FFT_LEN - k].conj();
        }
        state.position = (state.position + 1) % count;

        self.inverse
            .process_with_scratch(&mut self.accum, &mut self.scratch);
        for (dst, src) in output.iter_mut().zip(&self.accum[BLOCK..]) {
            *dst = src.re;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(conv: &mut Convolver, input: &[f32]) -> Vec<f32> {
        let mut out = Vec::new();
        for chunk in input.chunks(BLOCK) {
            let mut block = [0.0; BLOCK];
            block[..chunk.len()].copy_from_slice(chunk);
            let mut y = [0.0; BLOCK];
            conv.process(0, &block, &mut y);
            out.extend_from_slice(&y);
        }
        out
    }

    #[test]
    fn matches_direct_convolution() {
        let impulse: Vec<f32> = (0..300).map(|i| ((i * 37) % 17) as f32 / 17.0 - 0.5).collect();
        let input: Vec<f32> = (0..1024).map(|i| ((i * 13) % 11) as f32 / 11.0 - 0.5).collect();
        let mut conv = Convolver::new(&[impulse.clone()], false, 48000.0);
        let out = run(&mut conv, &input);

        for n in 0..1024 {
            let expected: f32 = (0..impulse.len().min(n + 1))
                .map(|k| impulse[k] * input[n - k])
                .sum();
            assert!((out[n] - expected).abs() < 1e-3, "n={n}: {} vs {expected}", out[n]);
        }
    }

    #[test]
    fn unit_impulse_is_identity() {
        let mut conv = Convolver::new(&[vec![1.0]], false, 48000.0);
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin()).collect();
        let out = run(&mut conv, &input);
        for (a, b) in out.iter().zip(&input) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn normalization_is_inverse_rms() {
        let impulse = vec![vec![0.5; 100]];
        let scale = normalization_scale(&impulse, 44100.0);
        assert!((scale - GAIN_CALIBRATION / 0.5).abs() < 1e-7);
        assert_eq!(normalization_scale(&[], 48000.0), 1.0);
    }
}
