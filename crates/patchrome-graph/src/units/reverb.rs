//! Convolution reverb with a synthetic impulse response.

use patchrome_engine::{AudioEngine, NodeHandle, Primitive};

use super::{Assembly, MixStage, connect, link, release};
use crate::error::GraphError;
use crate::params::{NodeParams, Patch, ReverbParams};

/// Early reflections as `(seconds, gain)` before size scaling.
const EARLY_REFLECTIONS: [(f32, f32); 4] = [(0.015, 0.25), (0.025, 0.15), (0.035, 0.1), (0.045, 0.075)];

/// Fixed noise seed: identical parameters give identical impulses.
const NOISE_SEED: u32 = 0x5EED_1234;

/// Linear congruential noise in `[0, 1)`.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 8) as f32 / 16_777_216.0
    }

    fn bipolar(&mut self) -> f32 {
        self.next() * 2.0 - 1.0
    }
}

/// Builds the stereo impulse for `size` (0-100) and `decay` (ms).
///
/// The impulse lasts `0.1 + size/100·1.9` seconds. Four early reflections at
/// size-scaled offsets sit on a noise tail shaped by
/// `(1 - i/len)^decayRate`, and the second channel is decorrelated by a
/// per-sample factor in `[0.9, 1.1)`.
pub fn reverb_impulse(sample_rate: f32, size: f32, decay: f32) -> Vec<Vec<f32>> {
    let size = size.clamp(0.0, 100.0);
    let duration = 0.1 + size / 100.0 * 1.9;
    let length = (sample_rate * duration) as usize;
    let decay_rate = (10.0 - decay / 1000.0 * 4.0).max(1.0);
    let size_multiplier = 0.5 + size / 100.0 * 0.5;
    let reflections = EARLY_REFLECTIONS
        .map(|(time, gain)| ((time * size_multiplier * sample_rate) as usize, gain));

    let mut noise = Lcg(NOISE_SEED);
    (0..2)
        .map(|channel| {
            (0..length)
                .map(|i| {
                    let mut sample = 0.0;
                    for &(at, gain) in &reflections {
                        if i == at {
                            sample += if noise.next() < 0.5 { -gain } else { gain };
                        }
                    }
                    let envelope = (1.0 - i as f32 / length as f32).powf(decay_rate);
                    sample += noise.bipolar() * envelope * 0.25;
                    if channel == 1 {
                        sample *= 0.9 + noise.next() * 0.2;
                    }
                    sample
                })
                .collect()
        })
        .collect()
}

/// Reverb unit.
#[derive(Debug)]
pub struct Reverb {
    /// Wet/dry stage.
    pub mix: MixStage,
    /// Current convolver; replaced when the impulse changes.
    pub convolver: NodeHandle,
    /// Snapshot.
    pub params: ReverbParams,
}

impl Reverb {
    pub(crate) fn create(asm: &mut Assembly<'_>, params: ReverbParams) -> Result<Self, GraphError> {
        let sample_rate = asm.engine().sample_rate();
        let mix = MixStage::create(asm, params.mix)?;
        asm.link(mix.input, mix.dry);
        let convolver = asm.create(Primitive::Convolver {
            impulse: reverb_impulse(sample_rate, params.size, params.decay),
            normalize: true,
        })?;
        asm.link(mix.input, convolver);
        asm.queue(convolver, mix.wet);
        Ok(Self {
            mix,
            convolver,
            params,
        })
    }

    pub(crate) fn update(&mut self, engine: &mut dyn AudioEngine, patch: &Patch<'_>) -> bool {
        let mut next = self.params;
        next.apply(patch);
        if next == self.params {
            return false;
        }
        if next.mix != self.params.mix {
            self.mix.set_mix(engine, next.mix);
        }
        if (next.size != self.params.size || next.decay != self.params.decay)
            && !self.swap_impulse(engine, next.size, next.decay)
        {
            next.size = self.params.size;
            next.decay = self.params.decay;
        }
        self.params = next;
        true
    }

    /// Regenerates the impulse and hot-swaps the convolver between the
    /// input and the wet gain.
    fn swap_impulse(&mut self, engine: &mut dyn AudioEngine, size: f32, decay: f32) -> bool {
        let impulse = reverb_impulse(engine.sample_rate(), size, decay);
        let replacement = match engine.create(Primitive::Convolver {
            impulse,
            normalize: true,
        }) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(%err, "graph: reverb impulse swap failed");
                return false;
            }
        };
        release(engine, self.convolver);
        connect(engine, link(self.mix.input, replacement));
        connect(engine, link(replacement, self.mix.wet));
        self.convolver = replacement;
        tracing::debug!(size, decay, "graph: reverb impulse regenerated");
        true
    }

    pub(crate) fn nodes(&self) -> Vec<NodeHandle> {
        let mut nodes = self.mix.nodes().to_vec();
        nodes.push(self.convolver);
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_length_follows_size() {
        let small = reverb_impulse(48000.0, 0.0, 1000.0);
        let large = reverb_impulse(48000.0, 100.0, 1000.0);
        assert_eq!(small.len(), 2);
        assert_eq!(small[0].len(), 4800);
        assert_eq!(large[0].len(), 96000);
        assert!(large[0].len() > small[0].len());
    }

    #[test]
    fn impulse_is_deterministic() {
        let a = reverb_impulse(44100.0, 37.0, 1500.0);
        let b = reverb_impulse(44100.0, 37.0, 1500.0);
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn left_channel_is_bounded() {
        let ir = reverb_impulse(48000.0, 0.0, 1000.0);
        // Strongest reflection plus full-scale tail noise
        assert!(ir[0].iter().all(|s| s.abs() <= 0.5));
    }

    #[test]
    fn tail_decays() {
        let ir = reverb_impulse(48000.0, 50.0, 0.0);
        let len = ir[0].len();
        let head: f32 = ir[0][..len / 10].iter().map(|s| s * s).sum();
        let tail: f32 = ir[0][len - len / 10..].iter().map(|s| s * s).sum();
        assert!(tail < head * 1e-3);
    }
}
