//! Phaser with four LFO-swept all-pass stages.
//!
//! The processor produces the wet signal only; the graph mixes it with the
//! dry path through its own gain stages.
//!
//! ## Parameters
//!
//! | Name | Range | Default |
//! |------|-------|---------|
//! | `rate` | 0.1 to 10 Hz | 0.5 Hz |
//! | `depth` | 0 to 100 % | 50 % |
//! | `feedback` | 0 to 100 % | 0 % |
//!
//! # Algorithm
//!
//! Stage `i` is an RBJ all-pass (Q = 1) centred at `1000 + 500·i` Hz. A sine
//! LFO adds `lfo · depth/100 · 1000` Hz to every centre. The last stage's
//! output is fed back into the first with gain `feedback/100 · 0.7`.

use alloc::boxed::Box;
use patchrome_core::{
    Biquad, BiquadType, BlockProcessor, Lfo, ParamDescriptor, ParamUnit, ProcessorDescriptor,
    coefficients, flush_denormal,
};

use crate::{CHANNELS, for_each_frame};

/// Registered processor name.
pub const NAME: &str = "phaser-processor";

/// Parameter table, in processing order.
pub static PARAMS: [ParamDescriptor; 3] = [
    ParamDescriptor::new("rate", ParamUnit::Hertz, 0.1, 10.0, 0.5),
    ParamDescriptor::new("depth", ParamUnit::Percent, 0.0, 100.0, 50.0),
    ParamDescriptor::new("feedback", ParamUnit::Percent, 0.0, 100.0, 0.0),
];

const RATE: usize = 0;
const DEPTH: usize = 1;
const FEEDBACK: usize = 2;

/// Registration record.
pub static DESCRIPTOR: ProcessorDescriptor = ProcessorDescriptor {
    name: NAME,
    params: &PARAMS,
    factory: create,
};

fn create(sample_rate: f32) -> Box<dyn BlockProcessor> {
    Box::new(Phaser::new(sample_rate))
}

/// Number of all-pass stages.
pub const STAGES: usize = 4;

/// How many samples between all-pass coefficient updates.
const COEFF_UPDATE_INTERVAL: u32 = 32;

/// All-pass Q (the browser default for a biquad).
const STAGE_Q: f32 = 1.0;

/// Centre frequency of stage `i` before modulation.
pub fn stage_center(i: usize) -> f32 {
    1000.0 + 500.0 * i as f32
}

/// Phaser block processor.
#[derive(Debug, Clone)]
pub struct Phaser {
    stages: [[Biquad; STAGES]; CHANNELS],
    feedback_sample: [f32; CHANNELS],
    lfo: Lfo,
    sample_rate: f32,
    update_counter: u32,
}

impl Phaser {
    /// Creates a phaser at the default settings.
    pub fn new(sample_rate: f32) -> Self {
        let mut phaser = Self {
            stages: Default::default(),
            feedback_sample: [0.0; CHANNELS],
            lfo: Lfo::new(sample_rate, PARAMS[RATE].default),
            sample_rate,
            update_counter: 0,
        };
        phaser.update_coefficients(0.0);
        phaser
    }

    fn update_coefficients(&mut self, sweep_hz: f32) {
        for i in 0..STAGES {
            let coeffs = coefficients(
                BiquadType::Allpass,
                stage_center(i) + sweep_hz,
                STAGE_Q,
                0.0,
                self.sample_rate,
            );
            for channel in &mut self.stages {
                channel[i].set(coeffs);
            }
        }
    }
}

impl BlockProcessor for Phaser {
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], params: &[f32]) -> bool {
        let read = |i: usize| params.get(i).copied().unwrap_or(PARAMS[i].default);
        self.lfo.set_frequency(read(RATE));
        let excursion = read(DEPTH) / 100.0 * 1000.0;
        let feedback = read(FEEDBACK) / 100.0 * 0.7;

        for_each_frame(inputs, outputs, |frame| {
            let lfo = self.lfo.advance();
            if self.update_counter == 0 {
                self.update_coefficients(lfo * excursion);
            }
            self.update_counter = (self.update_counter + 1) % COEFF_UPDATE_INTERVAL;

            for (ch, sample) in frame.iter_mut().enumerate().take(CHANNELS) {
                let mut x = *sample + self.feedback_sample[ch] * feedback;
                for stage in &mut self.stages[ch] {
                    x = stage.process(x);
                }
                self.feedback_sample[ch] = flush_denormal(x);
                *sample = x;
            }
        });
        true
    }

    fn reset(&mut self) {
        for channel in &mut self.stages {
            for stage in channel {
                stage.clear();
            }
        }
        self.feedback_sample = [0.0; CHANNELS];
        self.lfo.reset();
        self.update_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_centers() {
        assert_eq!(stage_center(0), 1000.0);
        assert_eq!(stage_center(3), 2500.0);
    }

    #[test]
    fn no_depth_no_feedback_preserves_level() {
        let mut phaser = Phaser::new(48000.0);
        let input: alloc::vec::Vec<f32> = (0..48000)
            .map(|i| libm::sinf(2.0 * core::f32::consts::PI * 440.0 * i as f32 / 48000.0))
            .collect();
        let mut out = alloc::vec![0.0_f32; 48000];
        {
            let inputs: [&[f32]; 1] = [&input];
            let mut outputs: [&mut [f32]; 1] = [&mut out];
            phaser.process(&inputs, &mut outputs, &[0.5, 0.0, 0.0]);
        }
        let peak = out[24000..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!((peak - 1.0).abs() < 0.01, "peak {peak}");
    }
}
