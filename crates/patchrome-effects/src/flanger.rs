//! Flanger: a short LFO-modulated delay with feedback.
//!
//! Produces the wet (delayed) signal only.
//!
//! ## Parameters
//!
//! | Name | Range | Default |
//! |------|-------|---------|
//! | `rate` | 0.1 to 10 Hz | 0.5 Hz |
//! | `delay` | 0.1 to 20 ms | 5 ms |
//! | `depth` | 0 to 100 % | 50 % |
//! | `feedback` | 0 to 100 % | 0 % |
//!
//! The read position is `delay + lfo · depth/100 · delay · 0.5` milliseconds,
//! so the sweep never crosses zero. Feedback gain is `feedback/100 · 0.8`.

use alloc::boxed::Box;
use patchrome_core::{
    BlockProcessor, InterpolatedDelay, Lfo, ParamDescriptor, ParamUnit, ProcessorDescriptor,
    flush_denormal, ms_to_samples,
};

use crate::{CHANNELS, for_each_frame};

/// Registered processor name.
pub const NAME: &str = "flanger-processor";

/// Parameter table, in processing order.
pub static PARAMS: [ParamDescriptor; 4] = [
    ParamDescriptor::new("rate", ParamUnit::Hertz, 0.1, 10.0, 0.5),
    ParamDescriptor::new("delay", ParamUnit::Milliseconds, 0.1, MAX_DELAY_MS, 5.0),
    ParamDescriptor::new("depth", ParamUnit::Percent, 0.0, 100.0, 50.0),
    ParamDescriptor::new("feedback", ParamUnit::Percent, 0.0, 100.0, 0.0),
];

const RATE: usize = 0;
const DELAY: usize = 1;
const DEPTH: usize = 2;
const FEEDBACK: usize = 3;

/// Longest base delay in milliseconds.
pub const MAX_DELAY_MS: f32 = 20.0;

/// Registration record.
pub static DESCRIPTOR: ProcessorDescriptor = ProcessorDescriptor {
    name: NAME,
    params: &PARAMS,
    factory: create,
};

fn create(sample_rate: f32) -> Box<dyn BlockProcessor> {
    Box::new(Flanger::new(sample_rate))
}

/// Flanger block processor.
#[derive(Debug, Clone)]
pub struct Flanger {
    delays: [InterpolatedDelay; CHANNELS],
    feedback_sample: [f32; CHANNELS],
    lfo: Lfo,
    sample_rate: f32,
}

impl Flanger {
    /// Creates a flanger at the default settings.
    pub fn new(sample_rate: f32) -> Self {
        // Base delay plus the widest sweep is 1.5x the maximum
        let max_seconds = MAX_DELAY_MS * 1.5 / 1000.0;
        Self {
            delays: core::array::from_fn(|_| InterpolatedDelay::from_time(sample_rate, max_seconds)),
            feedback_sample: [0.0; CHANNELS],
            lfo: Lfo::new(sample_rate, PARAMS[RATE].default),
            sample_rate,
        }
    }
}

impl BlockProcessor for Flanger {
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], params: &[f32]) -> bool {
        let read = |i: usize| params.get(i).copied().unwrap_or(PARAMS[i].default);
        self.lfo.set_frequency(read(RATE));
        let base_ms = read(DELAY);
        let sweep_ms = read(DEPTH) / 100.0 * base_ms * 0.5;
        let feedback = read(FEEDBACK) / 100.0 * 0.8;

        for_each_frame(inputs, outputs, |frame| {
            let delay_ms = base_ms + self.lfo.advance() * sweep_ms;
            let delay_samples = ms_to_samples(delay_ms, self.sample_rate);

            for (ch, sample) in frame.iter_mut().enumerate() {
                let line = &mut self.delays[ch];
                line.write(*sample + self.feedback_sample[ch] * feedback);
                let wet = line.read(delay_samples);
                self.feedback_sample[ch] = flush_denormal(wet);
                *sample = wet;
            }
        });
        true
    }

    fn reset(&mut self) {
        for line in &mut self.delays {
            line.clear();
        }
        self.feedback_sample = [0.0; CHANNELS];
        self.lfo.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn zero_depth_is_a_plain_delay() {
        let mut flanger = Flanger::new(48000.0);
        let mut input = vec![0.0_f32; 1024];
        input[0] = 1.0;
        let mut out = vec![0.0_f32; 1024];
        {
            let inputs: [&[f32]; 1] = [&input];
            let mut outputs: [&mut [f32]; 1] = [&mut out];
            // 5 ms at 48 kHz = 240 samples
            flanger.process(&inputs, &mut outputs, &[0.5, 5.0, 0.0, 0.0]);
        }
        assert!((out[240] - 1.0).abs() < 1e-5, "out[240] = {}", out[240]);
        assert!(out[..240].iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn feedback_repeats_the_echo() {
        let mut flanger = Flanger::new(48000.0);
        let mut input = vec![0.0_f32; 1024];
        input[0] = 1.0;
        let mut out = vec![0.0_f32; 1024];
        {
            let inputs: [&[f32]; 1] = [&input];
            let mut outputs: [&mut [f32]; 1] = [&mut out];
            flanger.process(&inputs, &mut outputs, &[0.5, 5.0, 0.0, 50.0]);
        }
        // Feedback re-enters one sample after the echo is read
        assert!((out[481] - 0.4).abs() < 1e-4, "out[481] = {}", out[481]);
    }
}
