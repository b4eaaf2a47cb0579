//! Spectral compressor: per-bin downward compression with attack/release.
//!
//! ## Parameters
//!
//! | Name | Range | Default |
//! |------|-------|---------|
//! | `attack` | 0.1 to 100 ms | 30 ms |
//! | `release` | 1 to 500 ms | 200 ms |
//! | `inputGain` | -24 to 24 dB | 10 dB |
//! | `threshold` | -60 to 0 dB | -45.1 dB |
//! | `ratio` | 0.5 to 1.5 | 1.2 |
//! | `fftSize` | 512 to 32768 | 2048 |
//!
//! ## Algorithm
//!
//! For each bin `0..=N/2` of a frame:
//!
//! ```text
//! level_db  = 20·log10(max(1e-10, |X|))
//! out_db    = level_db > threshold ? threshold + (level_db − threshold)/ratio : level_db
//! target    = 10^((out_db − level_db)/20)
//! coeff     = target < gain ? attack_coeff : release_coeff
//! gain      = target + (gain − target)·coeff
//! X        *= gain
//! ```
//!
//! with `coeff = exp(−1 / max(1, ms·sr / (1000·hop)))`, i.e. time constants
//! counted in frames. Gains start at 1.0 and persist across frames. The input
//! gain is applied to the raw samples before analysis.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use libm::{expf, log10f, powf, sqrtf};
use patchrome_core::{BlockProcessor, ParamDescriptor, ParamUnit, ProcessorDescriptor, db_to_linear};

use crate::stft::{DEFAULT_FFT_SIZE, FrameInfo, SpectralTransform, StftEngine};
use crate::{CHANNELS, fft_size_param};

/// Registered processor name.
pub const NAME: &str = "spectral-compressor-processor";

/// Parameter table, in processing order.
pub static PARAMS: [ParamDescriptor; 6] = [
    ParamDescriptor::new("attack", ParamUnit::Milliseconds, 0.1, 100.0, 30.0),
    ParamDescriptor::new("release", ParamUnit::Milliseconds, 1.0, 500.0, 200.0),
    ParamDescriptor::new("inputGain", ParamUnit::Decibels, -24.0, 24.0, 10.0),
    ParamDescriptor::new("threshold", ParamUnit::Decibels, -60.0, 0.0, -45.1),
    ParamDescriptor::new("ratio", ParamUnit::Ratio, 0.5, 1.5, 1.2),
    fft_size_param(),
];

const ATTACK: usize = 0;
const RELEASE: usize = 1;
const INPUT_GAIN: usize = 2;
const THRESHOLD: usize = 3;
const RATIO: usize = 4;
const FFT_SIZE: usize = 5;

/// Registration record.
pub static DESCRIPTOR: ProcessorDescriptor = ProcessorDescriptor {
    name: NAME,
    params: &PARAMS,
    factory: create,
};

fn create(sample_rate: f32) -> Box<dyn BlockProcessor> {
    Box::new(SpectralCompressor::new(sample_rate))
}

/// Per-bin compression curve and gain smoothing.
#[derive(Debug, Clone, Copy)]
pub struct CompressorTransform {
    /// Threshold in dB.
    pub threshold_db: f32,
    /// Compression ratio (n:1).
    pub ratio: f32,
    /// Attack time in ms.
    pub attack_ms: f32,
    /// Release time in ms.
    pub release_ms: f32,
}

impl Default for CompressorTransform {
    fn default() -> Self {
        Self {
            threshold_db: PARAMS[THRESHOLD].default,
            ratio: PARAMS[RATIO].default,
            attack_ms: PARAMS[ATTACK].default,
            release_ms: PARAMS[RELEASE].default,
        }
    }
}

impl CompressorTransform {
    /// Output level in dB for an input level in dB.
    #[inline]
    pub fn curve(&self, level_db: f32) -> f32 {
        if level_db > self.threshold_db {
            self.threshold_db + (level_db - self.threshold_db) / self.ratio
        } else {
            level_db
        }
    }

    fn frame_coeff(ms: f32, frame: FrameInfo) -> f32 {
        let frames = ms * frame.sample_rate / (1000.0 * frame.hop as f32);
        expf(-1.0 / frames.max(1.0))
    }
}

impl SpectralTransform for CompressorTransform {
    /// Smoothed gain per bin `0..=N/2`.
    type State = Vec<f32>;

    fn create_state(&self, frame: FrameInfo) -> Self::State {
        vec![1.0; frame.nyquist() + 1]
    }

    fn transform(&mut self, gains: &mut Vec<f32>, re: &mut [f32], im: &mut [f32], frame: FrameInfo) {
        let n = frame.fft_size;
        let attack = Self::frame_coeff(self.attack_ms, frame);
        let release = Self::frame_coeff(self.release_ms, frame);

        for (k, gain) in gains.iter_mut().enumerate() {
            let magnitude = sqrtf(re[k] * re[k] + im[k] * im[k]);
            let level_db = 20.0 * log10f(magnitude.max(1e-10));
            let target = powf(10.0, (self.curve(level_db) - level_db) / 20.0);

            let coeff = if target < *gain { attack } else { release };
            *gain = target + (*gain - target) * coeff;

            re[k] *= *gain;
            im[k] *= *gain;
            if k > 0 && k < n / 2 {
                re[n - k] = re[k];
                im[n - k] = -im[k];
            }
        }
    }
}

/// Spectral compressor block processor.
pub struct SpectralCompressor {
    engine: StftEngine<CompressorTransform>,
    input_gain: f32,
}

impl SpectralCompressor {
    /// Creates a stereo compressor with default parameters.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            engine: StftEngine::new(
                CompressorTransform::default(),
                DEFAULT_FFT_SIZE,
                CHANNELS,
                sample_rate,
            ),
            input_gain: db_to_linear(PARAMS[INPUT_GAIN].default),
        }
    }

    /// The compression settings.
    pub fn settings(&self) -> &CompressorTransform {
        self.engine.transform()
    }
}

impl BlockProcessor for SpectralCompressor {
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], params: &[f32]) -> bool {
        let read = |i: usize| params.get(i).copied().unwrap_or(PARAMS[i].default);

        let settings = self.engine.transform_mut();
        settings.attack_ms = read(ATTACK);
        settings.release_ms = read(RELEASE);
        settings.threshold_db = read(THRESHOLD);
        settings.ratio = read(RATIO).max(1e-3);
        self.input_gain = db_to_linear(read(INPUT_GAIN));
        self.engine.set_fft_size(read(FFT_SIZE));

        self.engine.process_block(inputs, outputs, self.input_gain);
        true
    }

    fn reset(&mut self) {
        self.engine.reset();
    }

    fn latency_samples(&self) -> usize {
        self.engine.latency()
    }
}
