//! Phase-vocoder pitch shifter.
//!
//! ## Parameters
//!
//! | Name | Range | Default |
//! |------|-------|---------|
//! | `pitch` | -1200 to 1200 cents | 0 |
//! | `mix` | 0 to 100 % | 100 % |
//! | `fftSize` | 512 to 32768 | 2048 |
//!
//! ## Algorithm
//!
//! Per frame, for each source bin `k` in `0..=N/2`:
//!
//! 1. split `X[k]` into magnitude and phase
//! 2. `dest = round(k · ratio)` with `ratio = 2^(cents/1200)`; skip if
//!    `dest` is DC or above `N/2` (its `last_phase` is left as is)
//! 3. `delta = phase − last_phase[k]`, minus the expected advance
//!    `2π·hop·k/N`, wrapped to `[−π, π]`; the true frequency is the expected
//!    advance plus that residual
//! 4. `sum_phase[dest] += true_freq · ratio` (kept wrapped) and the
//!    destination accumulates `magnitude·(cos, sin)(sum_phase[dest])`
//!
//! The upper half is then rebuilt as the conjugate mirror. At `pitch = 0` the
//! accumulated phase reproduces the analysis phase exactly, so the transform is
//! an identity up to STFT reconstruction error.
//!
//! The dry signal is delayed by the STFT latency before mixing so both paths
//! line up.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::f32::consts::PI;
use libm::{atan2f, cosf, powf, roundf, sinf, sqrtf};
use patchrome_core::{
    BlockProcessor, InterpolatedDelay, ParamDescriptor, ParamUnit, ProcessorDescriptor,
};

use crate::stft::{DEFAULT_FFT_SIZE, FrameInfo, SpectralTransform, StftEngine};
use crate::{CHANNELS, fft_size_param};

/// Registered processor name.
pub const NAME: &str = "spectral-pitch-processor";

/// Parameter table, in processing order.
pub static PARAMS: [ParamDescriptor; 3] = [
    ParamDescriptor::new("pitch", ParamUnit::Cents, -1200.0, 1200.0, 0.0),
    ParamDescriptor::mix(100.0),
    fft_size_param(),
];

const PITCH: usize = 0;
const MIX: usize = 1;
const FFT_SIZE: usize = 2;

/// Registration record.
pub static DESCRIPTOR: ProcessorDescriptor = ProcessorDescriptor {
    name: NAME,
    params: &PARAMS,
    factory: create,
};

fn create(sample_rate: f32) -> Box<dyn BlockProcessor> {
    Box::new(SpectralPitch::new(sample_rate))
}

/// Wraps a phase into `[−π, π]`.
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    phase - 2.0 * PI * roundf(phase / (2.0 * PI))
}

/// Per-channel phase-vocoder state.
#[derive(Debug, Clone)]
pub struct VocoderState {
    last_phase: Vec<f32>,
    sum_phase: Vec<f32>,
    magnitude: Vec<f32>,
    phase: Vec<f32>,
}

/// Bin remapping with phase propagation.
#[derive(Debug, Clone, Copy)]
pub struct PitchTransform {
    ratio: f32,
}

impl Default for PitchTransform {
    fn default() -> Self {
        Self { ratio: 1.0 }
    }
}

impl PitchTransform {
    /// Sets the shift in cents.
    pub fn set_cents(&mut self, cents: f32) {
        self.ratio = powf(2.0, cents / 1200.0);
    }

    /// Frequency ratio applied to every bin.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }
}

impl SpectralTransform for PitchTransform {
    type State = VocoderState;

    fn create_state(&self, frame: FrameInfo) -> Self::State {
        let bins = frame.nyquist() + 1;
        VocoderState {
            last_phase: vec![0.0; bins],
            sum_phase: vec![0.0; bins],
            magnitude: vec![0.0; bins],
            phase: vec![0.0; bins],
        }
    }

    fn transform(&mut self, state: &mut VocoderState, re: &mut [f32], im: &mut [f32], frame: FrameInfo) {
        let n = frame.fft_size;
        let nyquist = frame.nyquist();
        let expected = 2.0 * PI * frame.hop as f32 / n as f32;

        for k in 0..=nyquist {
            state.magnitude[k] = sqrtf(re[k] * re[k] + im[k] * im[k]);
            state.phase[k] = atan2f(im[k], re[k]);
        }
        re[..n].fill(0.0);
        im[..n].fill(0.0);

        for k in 0..=nyquist {
            let dest = roundf(k as f32 * self.ratio) as usize;
            if dest == 0 || dest > nyquist {
                continue;
            }

            let delta = state.phase[k] - state.last_phase[k];
            state.last_phase[k] = state.phase[k];
            let bin_advance = k as f32 * expected;
            let true_freq = bin_advance + wrap_phase(delta - bin_advance);

            let sum = wrap_phase(state.sum_phase[dest] + true_freq * self.ratio);
            state.sum_phase[dest] = sum;
            re[dest] += state.magnitude[k] * cosf(sum);
            im[dest] += state.magnitude[k] * sinf(sum);
        }

        // DC and Nyquist of a real signal carry no imaginary part
        im[0] = 0.0;
        im[nyquist] = 0.0;
        for k in 1..nyquist {
            re[n - k] = re[k];
            im[n - k] = -im[k];
        }
    }
}

/// Spectral pitch-shift block processor with internal dry/wet mix.
pub struct SpectralPitch {
    engine: StftEngine<PitchTransform>,
    dry: Vec<InterpolatedDelay>,
    sample_rate: f32,
}

impl SpectralPitch {
    /// Creates a stereo pitch shifter with default parameters.
    pub fn new(sample_rate: f32) -> Self {
        let engine = StftEngine::new(
            PitchTransform::default(),
            DEFAULT_FFT_SIZE,
            CHANNELS,
            sample_rate,
        );
        let dry = Self::dry_lines(engine.latency());
        Self {
            engine,
            dry,
            sample_rate,
        }
    }

    fn dry_lines(latency: usize) -> Vec<InterpolatedDelay> {
        (0..CHANNELS)
            .map(|_| InterpolatedDelay::new(latency + 1))
            .collect()
    }

    /// Current FFT size.
    pub fn fft_size(&self) -> usize {
        self.engine.fft_size()
    }

    /// Sample rate the processor was created for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl BlockProcessor for SpectralPitch {
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], params: &[f32]) -> bool {
        let read = |i: usize| params.get(i).copied().unwrap_or(PARAMS[i].default);

        self.engine.transform_mut().set_cents(read(PITCH));
        if self.engine.set_fft_size(read(FFT_SIZE)) {
            self.dry = Self::dry_lines(self.engine.latency());
        }
        let mix = read(MIX) / 100.0;
        let latency = self.engine.latency() as f32;

        for (ch, (input, output)) in inputs.iter().zip(outputs.iter_mut()).enumerate() {
            for (&x, y) in input.iter().zip(output.iter_mut()) {
                let wet = self.engine.process_sample(ch, x);
                let dry = match self.dry.get_mut(ch) {
                    Some(line) => line.process(x, latency),
                    None => x,
                };
                *y = dry * (1.0 - mix) + wet * mix;
            }
        }
        true
    }

    fn reset(&mut self) {
        self.engine.reset();
        for line in &mut self.dry {
            line.clear();
        }
    }

    fn latency_samples(&self) -> usize {
        self.engine.latency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_stays_in_range() {
        for p in [-10.0_f32, -3.5, 0.0, 3.5, 10.0, 100.0] {
            let w = wrap_phase(p);
            assert!((-PI - 1e-5..=PI + 1e-5).contains(&w), "{p} -> {w}");
            assert!((libm::sinf(w) - libm::sinf(p)).abs() < 1e-3);
        }
    }

    #[test]
    fn cents_to_ratio() {
        let mut t = PitchTransform::default();
        t.set_cents(1200.0);
        assert!((t.ratio() - 2.0).abs() < 1e-6);
        t.set_cents(-1200.0);
        assert!((t.ratio() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn octave_up_moves_energy_to_double_bin() {
        let frame = FrameInfo {
            fft_size: 16,
            hop: 4,
            sample_rate: 48000.0,
        };
        let mut t = PitchTransform::default();
        t.set_cents(1200.0);
        let mut state = t.create_state(frame);
        let mut re = [0.0_f32; 16];
        let mut im = [0.0_f32; 16];
        re[3] = 4.0;
        re[13] = 4.0;
        t.transform(&mut state, &mut re, &mut im, frame);
        let mag6 = sqrtf(re[6] * re[6] + im[6] * im[6]);
        assert!((mag6 - 4.0).abs() < 1e-4);
        assert!(re[3].abs() < 1e-6);
        assert_eq!(re[10], re[6]);
        assert_eq!(im[10], -im[6]);
    }

    #[test]
    fn dc_is_never_resynthesized() {
        let frame = FrameInfo {
            fft_size: 16,
            hop: 4,
            sample_rate: 48000.0,
        };
        let mut t = PitchTransform::default();
        let mut state = t.create_state(frame);
        let mut re = [0.0_f32; 16];
        let mut im = [0.0_f32; 16];
        re[0] = 4.0;
        re[2] = 1.0;
        re[14] = 1.0;
        t.transform(&mut state, &mut re, &mut im, frame);
        assert_eq!(re[0], 0.0);
        assert_eq!(state.last_phase[0], 0.0);
        assert!((re[2] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn dry_only_mix_is_delayed_input() {
        let mut p = SpectralPitch::new(48000.0);
        let input: Vec<f32> = (0..4096).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut out = vec![0.0_f32; 4096];
        {
            let inputs: [&[f32]; 1] = [&input];
            let mut outputs: [&mut [f32]; 1] = [&mut out];
            p.process(&inputs, &mut outputs, &[700.0, 0.0, 2048.0]);
        }
        for t in 2048..4096 {
            assert!((out[t] - input[t - 2048]).abs() < 1e-6);
        }
    }
}
