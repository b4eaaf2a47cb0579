//! Brickwall limiter.

use patchrome_engine::{AudioEngine, AudioParam, NodeHandle, Primitive};

use super::{Assembly, set};
use crate::error::GraphError;
use crate::params::{LimiterParams, NodeParams, Patch};

const KNEE: f32 = 0.0;
const RATIO: f32 = 20.0;
const ATTACK_SECONDS: f32 = 0.003;
const RELEASE_SECONDS: f32 = 0.1;

/// `input → compressor`; only the threshold moves.
#[derive(Debug)]
pub struct Limiter {
    /// Input gain.
    pub input: NodeHandle,
    /// Hard-knee compressor and the unit's output.
    pub compressor: NodeHandle,
    /// Snapshot.
    pub params: LimiterParams,
}

impl Limiter {
    pub(crate) fn create(asm: &mut Assembly<'_>, params: LimiterParams) -> Result<Self, GraphError> {
        let input = asm.gain(1.0)?;
        let compressor = asm.create(Primitive::DynamicsCompressor {
            threshold: params.threshold,
            knee: KNEE,
            ratio: RATIO,
            attack: ATTACK_SECONDS,
            release: RELEASE_SECONDS,
        })?;
        asm.link(input, compressor);
        Ok(Self {
            input,
            compressor,
            params,
        })
    }

    pub(crate) fn update(&mut self, engine: &mut dyn AudioEngine, patch: &Patch<'_>) -> bool {
        let mut next = self.params;
        next.apply(patch);
        if next == self.params {
            return false;
        }
        set(engine, self.compressor, AudioParam::Threshold, next.threshold);
        self.params = next;
        true
    }
}
