//! The shared wet/dry stage.

use patchrome_engine::{AudioEngine, AudioParam, NodeHandle};

use super::{Assembly, set};
use crate::error::GraphError;
use crate::params::mix_gains;

/// `input → dry → merger` plus a `wet → merger` landing point.
///
/// The creator owning the stage wires `input` into its wet path and that
/// path into `wet`, and decides how `input` reaches `dry`.
#[derive(Debug, Clone, Copy)]
pub struct MixStage {
    /// Fan-in point and the unit's input port.
    pub input: NodeHandle,
    /// Dry level.
    pub dry: NodeHandle,
    /// Wet level.
    pub wet: NodeHandle,
    /// Sum of both paths and the unit's output port.
    pub merger: NodeHandle,
}

impl MixStage {
    /// Creates the four gains and queues `wet → merger` and `dry → merger`.
    pub fn create(asm: &mut Assembly<'_>, mix: f32) -> Result<Self, GraphError> {
        let (dry_gain, wet_gain) = mix_gains(mix);
        let input = asm.gain(1.0)?;
        let dry = asm.gain(dry_gain)?;
        let wet = asm.gain(wet_gain)?;
        let merger = asm.gain(1.0)?;
        asm.queue(wet, merger);
        asm.queue(dry, merger);
        Ok(Self {
            input,
            dry,
            wet,
            merger,
        })
    }

    /// Sets both levels from a 0-100 mix.
    pub fn set_mix(&self, engine: &mut dyn AudioEngine, mix: f32) {
        let (dry, wet) = mix_gains(mix);
        set(engine, self.dry, AudioParam::Gain, dry);
        set(engine, self.wet, AudioParam::Gain, wet);
    }

    /// The four gains.
    pub fn nodes(&self) -> [NodeHandle; 4] {
        [self.input, self.dry, self.wet, self.merger]
    }
}
