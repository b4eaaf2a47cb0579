//! Feed-forward compressor with a quadratic soft knee.
//!
//! Detection is linked across channels (the louder channel drives both), so
//! the stereo image does not shift under gain reduction.

use patchrome_core::{db_to_linear, linear_to_db};

/// Static compression curve.
#[derive(Debug, Clone, Copy)]
struct GainComputer {
    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
}

impl GainComputer {
    /// Gain change in dB (never positive) for a detector level.
    #[inline]
    fn compute_gain_db(&self, input_db: f32) -> f32 {
        let overshoot = input_db - self.threshold_db;
        let slope = 1.0 - 1.0 / self.ratio;

        if overshoot <= -self.knee_db / 2.0 {
            0.0
        } else if overshoot > self.knee_db / 2.0 {
            -overshoot * slope
        } else {
            let knee_factor = (overshoot + self.knee_db / 2.0) / self.knee_db;
            -knee_factor * knee_factor * overshoot * slope
        }
    }
}

/// Compressor state for one node.
#[derive(Debug, Clone)]
pub(crate) struct Compressor {
    computer: GainComputer,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
    sample_rate: f32,
}

fn time_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    let samples = seconds * sample_rate;
    if samples <= 0.0 {
        0.0
    } else {
        (-1.0 / samples).exp()
    }
}

impl Compressor {
    pub(crate) fn new(
        sample_rate: f32,
        threshold: f32,
        knee: f32,
        ratio: f32,
        attack: f32,
        release: f32,
    ) -> Self {
        let mut comp = Self {
            computer: GainComputer {
                threshold_db: 0.0,
                ratio: 1.0,
                knee_db: 0.0,
            },
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
            sample_rate,
        };
        comp.set_threshold(threshold);
        comp.set_knee(knee);
        comp.set_ratio(ratio);
        comp.set_attack(attack);
        comp.set_release(release);
        comp
    }

    pub(crate) fn set_threshold(&mut self, db: f32) {
        self.computer.threshold_db = db.clamp(-100.0, 0.0);
    }

    pub(crate) fn set_knee(&mut self, db: f32) {
        self.computer.knee_db = db.clamp(0.0, 40.0);
    }

    pub(crate) fn set_ratio(&mut self, ratio: f32) {
        self.computer.ratio = ratio.clamp(1.0, 20.0);
    }

    pub(crate) fn set_attack(&mut self, seconds: f32) {
        self.attack_coeff = time_coefficient(seconds.clamp(0.0, 1.0), self.sample_rate);
    }

    pub(crate) fn set_release(&mut self, seconds: f32) {
        self.release_coeff = time_coefficient(seconds.clamp(0.0, 1.0), self.sample_rate);
    }

    /// Compresses one stereo frame.
    #[inline]
    pub(crate) fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let level = left.abs().max(right.abs());
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = level + coeff * (self.envelope - level);

        let gain_db = self.computer.compute_gain_db(linear_to_db(self.envelope));
        let gain = db_to_linear(gain_db);
        (left * gain, right * gain)
    }
}
