//! Oscillator source.

use patchrome_engine::{AudioEngine, AudioParam, NodeHandle, NodeOption, Primitive};

use super::{Assembly, set, set_option};
use crate::error::GraphError;
use crate::params::{NodeParams, Patch, ToneGeneratorParams};

/// Plain dB to linear; the generator has no mute floor.
fn level(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// `oscillator → gain`, started at creation. Has no input port.
#[derive(Debug)]
pub struct ToneGenerator {
    /// Free-running oscillator.
    pub oscillator: NodeHandle,
    /// Level and the unit's output.
    pub gain: NodeHandle,
    /// Snapshot.
    pub params: ToneGeneratorParams,
}

impl ToneGenerator {
    pub(crate) fn create(
        asm: &mut Assembly<'_>,
        params: ToneGeneratorParams,
    ) -> Result<Self, GraphError> {
        let oscillator = asm.create(Primitive::Oscillator {
            waveform: params.waveform,
            frequency: params.frequency,
        })?;
        let gain = asm.gain(level(params.volume))?;
        asm.link(oscillator, gain);
        if let Err(err) = asm.engine().start(oscillator) {
            tracing::warn!(%err, "graph: oscillator did not start");
        }
        Ok(Self {
            oscillator,
            gain,
            params,
        })
    }

    pub(crate) fn update(&mut self, engine: &mut dyn AudioEngine, patch: &Patch<'_>) -> bool {
        let mut next = self.params;
        next.apply(patch);
        if next == self.params {
            return false;
        }
        if next.waveform != self.params.waveform {
            set_option(engine, self.oscillator, NodeOption::Waveform(next.waveform));
        }
        if next.frequency != self.params.frequency {
            set(engine, self.oscillator, AudioParam::Frequency, next.frequency);
        }
        if next.volume != self.params.volume {
            set(engine, self.gain, AudioParam::Gain, level(next.volume));
        }
        self.params = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_has_no_floor() {
        assert!(level(-80.0) > 0.0);
        assert!((level(-20.0) - 0.1).abs() < 1e-6);
    }
}
