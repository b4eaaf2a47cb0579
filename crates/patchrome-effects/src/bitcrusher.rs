//! Bitcrusher: sample-and-hold rate reduction plus amplitude quantisation.
//!
//! ## Parameters
//!
//! | Name | Range | Default |
//! |------|-------|---------|
//! | `rate` | 1000 to 48000 Hz | 30000 Hz |
//! | `bits` | 1 to 16 | 8 |
//!
//! A new target is latched once `sample_rate / rate` samples have elapsed.
//! The held value glides toward the target (`held·0.999 + target·0.001`),
//! then snaps to the nearest multiple of `0.5^bits`.

use alloc::boxed::Box;
use libm::{powf, roundf};
use patchrome_core::{BlockProcessor, ParamDescriptor, ParamUnit, ProcessorDescriptor};

use crate::{CHANNELS, for_each_frame};

/// Registered processor name.
pub const NAME: &str = "bitcrusher-processor";

/// Parameter table, in processing order.
pub static PARAMS: [ParamDescriptor; 2] = [
    ParamDescriptor::new("rate", ParamUnit::Hertz, 1000.0, 48000.0, 30000.0),
    ParamDescriptor::new("bits", ParamUnit::Bits, 1.0, 16.0, 8.0),
];

const RATE: usize = 0;
const BITS: usize = 1;

/// Weight of the previous held value in the glide.
const GLIDE: f32 = 0.999;

/// Registration record.
pub static DESCRIPTOR: ProcessorDescriptor = ProcessorDescriptor {
    name: NAME,
    params: &PARAMS,
    factory: create,
};

fn create(sample_rate: f32) -> Box<dyn BlockProcessor> {
    Box::new(Bitcrusher::new(sample_rate))
}

/// Quantisation step for a bit depth.
#[inline]
pub fn step_size(bits: f32) -> f32 {
    powf(0.5, bits)
}

/// Bitcrusher block processor.
#[derive(Debug, Clone)]
pub struct Bitcrusher {
    counter: f32,
    target: [f32; CHANNELS],
    held: [f32; CHANNELS],
    sample_rate: f32,
}

impl Bitcrusher {
    /// Creates a bitcrusher with cleared hold state.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            counter: 0.0,
            target: [0.0; CHANNELS],
            held: [0.0; CHANNELS],
            sample_rate,
        }
    }
}

impl BlockProcessor for Bitcrusher {
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], params: &[f32]) -> bool {
        let read = |i: usize| params.get(i).copied().unwrap_or(PARAMS[i].default);
        let hold = self.sample_rate / read(RATE).max(1.0);
        let step = step_size(read(BITS));

        for_each_frame(inputs, outputs, |frame| {
            let latch = self.counter >= hold;
            if latch {
                self.counter = 0.0;
            }
            for (ch, sample) in frame.iter_mut().enumerate() {
                if latch {
                    self.target[ch] = *sample;
                }
                self.held[ch] = self.held[ch] * GLIDE + self.target[ch] * (1.0 - GLIDE);
                *sample = roundf(self.held[ch] / step) * step;
            }
            self.counter += 1.0;
        });
        true
    }

    fn reset(&mut self) {
        self.counter = 0.0;
        self.target = [0.0; CHANNELS];
        self.held = [0.0; CHANNELS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn steps() {
        assert_eq!(step_size(1.0), 0.5);
        assert_eq!(step_size(8.0), 1.0 / 256.0);
    }

    #[test]
    fn output_lands_on_the_grid() {
        let mut crusher = Bitcrusher::new(48000.0);
        let input = vec![0.8_f32; 20000];
        let mut out = vec![0.0_f32; 20000];
        {
            let inputs: [&[f32]; 1] = [&input];
            let mut outputs: [&mut [f32]; 1] = [&mut out];
            crusher.process(&inputs, &mut outputs, &[8000.0, 4.0]);
        }
        let step = step_size(4.0);
        for s in &out {
            let q = s / step;
            assert!((q - roundf(q)).abs() < 1e-5);
        }
        // Glide has converged on the constant input
        assert!((out[19999] - 0.8125).abs() < 1e-6, "{}", out[19999]);
    }

    #[test]
    fn first_latch_waits_for_the_hold_period() {
        let mut crusher = Bitcrusher::new(48000.0);
        let input = vec![1.0_f32; 8];
        let mut out = vec![0.0_f32; 8];
        {
            let inputs: [&[f32]; 1] = [&input];
            let mut outputs: [&mut [f32]; 1] = [&mut out];
            // Hold of 6 samples, 16-bit grid
            crusher.process(&inputs, &mut outputs, &[8000.0, 16.0]);
        }
        assert!(out[..6].iter().all(|&s| s == 0.0));
        assert!(out[6] > 0.0);
    }
}
