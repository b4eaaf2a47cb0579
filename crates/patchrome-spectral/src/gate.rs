//! Spectral gate: zero every bin quieter than a cutoff.
//!
//! ## Parameters
//!
//! | Name | Range | Default |
//! |------|-------|---------|
//! | `cutoff` | -60 to 24 dB | -20 dB |
//! | `fftSize` | 512 to 32768 | 2048 |
//!
//! The cutoff is compared with the raw (unnormalized) bin magnitude of the
//! Hann-windowed frame. A bin-centred sine of amplitude `A` peaks at
//! `A·N/4`, so the effective level threshold scales with the FFT size.

use alloc::boxed::Box;
use libm::{powf, sqrtf};
use patchrome_core::{BlockProcessor, ParamDescriptor, ParamUnit, ProcessorDescriptor};

use crate::stft::{DEFAULT_FFT_SIZE, FrameInfo, SpectralTransform, StftEngine};
use crate::{CHANNELS, fft_size_param};

/// Registered processor name.
pub const NAME: &str = "spectral-gate-processor";

/// Parameter table, in processing order.
pub static PARAMS: [ParamDescriptor; 2] = [
    ParamDescriptor::new("cutoff", ParamUnit::Decibels, -60.0, 24.0, -20.0),
    fft_size_param(),
];

const CUTOFF: usize = 0;
const FFT_SIZE: usize = 1;

/// Registration record.
pub static DESCRIPTOR: ProcessorDescriptor = ProcessorDescriptor {
    name: NAME,
    params: &PARAMS,
    factory: create,
};

fn create(sample_rate: f32) -> Box<dyn BlockProcessor> {
    Box::new(SpectralGate::new(sample_rate))
}

/// Per-bin gate.
#[derive(Debug, Clone, Copy)]
pub struct GateTransform {
    threshold: f32,
}

impl GateTransform {
    /// Creates a gate at `cutoff_db`.
    pub fn new(cutoff_db: f32) -> Self {
        let mut gate = Self { threshold: 0.0 };
        gate.set_cutoff_db(cutoff_db);
        gate
    }

    /// Sets the cutoff in dB.
    pub fn set_cutoff_db(&mut self, cutoff_db: f32) {
        self.threshold = powf(10.0, cutoff_db / 20.0);
    }

    /// Linear magnitude threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl SpectralTransform for GateTransform {
    type State = ();

    fn create_state(&self, _frame: FrameInfo) -> Self::State {}

    fn transform(&mut self, _state: &mut (), re: &mut [f32], im: &mut [f32], frame: FrameInfo) {
        let n = frame.fft_size;
        for k in 0..=frame.nyquist() {
            let magnitude = sqrtf(re[k] * re[k] + im[k] * im[k]);
            if magnitude < self.threshold {
                re[k] = 0.0;
                im[k] = 0.0;
                if k > 0 && k < n / 2 {
                    re[n - k] = 0.0;
                    im[n - k] = 0.0;
                }
            }
        }
    }
}

/// Spectral gate block processor.
pub struct SpectralGate {
    engine: StftEngine<GateTransform>,
}

impl SpectralGate {
    /// Creates a stereo gate with default parameters.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            engine: StftEngine::new(
                GateTransform::new(PARAMS[CUTOFF].default),
                DEFAULT_FFT_SIZE,
                CHANNELS,
                sample_rate,
            ),
        }
    }

    /// Current FFT size.
    pub fn fft_size(&self) -> usize {
        self.engine.fft_size()
    }
}

impl BlockProcessor for SpectralGate {
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], params: &[f32]) -> bool {
        if let Some(&cutoff) = params.get(CUTOFF) {
            self.engine.transform_mut().set_cutoff_db(cutoff);
        }
        if let Some(&size) = params.get(FFT_SIZE) {
            self.engine.set_fft_size(size);
        }
        self.engine.process_block(inputs, outputs, 1.0);
        true
    }

    fn reset(&mut self) {
        self.engine.reset();
    }

    fn latency_samples(&self) -> usize {
        self.engine.latency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_from_db() {
        let gate = GateTransform::new(-20.0);
        assert!((gate.threshold() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn quiet_bins_and_mirrors_are_zeroed() {
        let frame = FrameInfo {
            fft_size: 8,
            hop: 2,
            sample_rate: 48000.0,
        };
        let mut gate = GateTransform::new(0.0);
        let mut re = [2.0, 0.5, 3.0, 0.1, 5.0, 0.1, 3.0, 0.5];
        let mut im = [0.0; 8];
        gate.transform(&mut (), &mut re, &mut im, frame);
        assert_eq!(re, [2.0, 0.0, 3.0, 0.0, 5.0, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn params_drive_fft_size() {
        let mut gate = SpectralGate::new(48000.0);
        let input = [0.0_f32; 128];
        let mut out = [0.0_f32; 128];
        let inputs: [&[f32]; 1] = [&input];
        let mut outputs: [&mut [f32]; 1] = [&mut out];
        gate.process(&inputs, &mut outputs, &[-20.0, 4096.0]);
        assert_eq!(gate.fft_size(), 4096);
        assert_eq!(gate.latency_samples(), 4096);
    }
}
