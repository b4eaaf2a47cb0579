//! Single-band equalizer.

use patchrome_engine::{AudioEngine, AudioParam, NodeHandle, NodeOption, Primitive};

use super::{Assembly, set, set_option};
use crate::error::GraphError;
use crate::params::{EqualizerParams, NodeParams, Patch};

/// `input → biquad`, no wet/dry split.
#[derive(Debug)]
pub struct Equalizer {
    /// Input gain.
    pub input: NodeHandle,
    /// The filter and the unit's output.
    pub filter: NodeHandle,
    /// Snapshot.
    pub params: EqualizerParams,
}

impl Equalizer {
    pub(crate) fn create(
        asm: &mut Assembly<'_>,
        params: EqualizerParams,
    ) -> Result<Self, GraphError> {
        let input = asm.gain(1.0)?;
        let filter = asm.create(Primitive::BiquadFilter {
            kind: params.filter_type,
            frequency: params.frequency,
            q: params.q,
            gain: params.gain,
        })?;
        asm.link(input, filter);
        Ok(Self {
            input,
            filter,
            params,
        })
    }

    pub(crate) fn update(&mut self, engine: &mut dyn AudioEngine, patch: &Patch<'_>) -> bool {
        let mut next = self.params;
        next.apply(patch);
        if next == self.params {
            return false;
        }
        if next.filter_type != self.params.filter_type {
            set_option(engine, self.filter, NodeOption::FilterType(next.filter_type));
        }
        if next.frequency != self.params.frequency {
            set(engine, self.filter, AudioParam::Frequency, next.frequency);
        }
        if next.q != self.params.q {
            set(engine, self.filter, AudioParam::Q, next.q);
        }
        if next.gain != self.params.gain {
            set(engine, self.filter, AudioParam::FilterGain, next.gain);
        }
        self.params = next;
        true
    }
}
