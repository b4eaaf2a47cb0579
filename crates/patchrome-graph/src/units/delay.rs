//! Feedback delay.

use patchrome_engine::{AudioEngine, AudioParam, NodeHandle, Primitive};

use super::{Assembly, MixStage, set};
use crate::error::GraphError;
use crate::params::{DelayParams, NodeParams, Patch};

/// Longest delay the line is created with.
const MAX_DELAY_SECONDS: f32 = 2.0;

/// `input → delay → wet` with `delay → feedback → delay`.
#[derive(Debug)]
pub struct FeedbackDelay {
    /// Wet/dry stage.
    pub mix: MixStage,
    /// Delay line.
    pub delay: NodeHandle,
    /// Loop gain.
    pub feedback: NodeHandle,
    /// Snapshot.
    pub params: DelayParams,
}

impl FeedbackDelay {
    pub(crate) fn create(asm: &mut Assembly<'_>, params: DelayParams) -> Result<Self, GraphError> {
        let mix = MixStage::create(asm, params.mix)?;
        let delay = asm.create(Primitive::Delay {
            max_seconds: MAX_DELAY_SECONDS,
            delay_seconds: params.delay_time / 1000.0,
        })?;
        let feedback = asm.gain(params.feedback / 100.0)?;
        asm.link(mix.input, mix.dry);
        asm.link(mix.input, delay);
        asm.queue(delay, feedback);
        asm.queue(feedback, delay);
        asm.queue(delay, mix.wet);
        Ok(Self {
            mix,
            delay,
            feedback,
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
        if next.delay_time != self.params.delay_time {
            set(engine, self.delay, AudioParam::DelayTime, next.delay_time / 1000.0);
        }
        if next.feedback != self.params.feedback {
            set(engine, self.feedback, AudioParam::Gain, next.feedback / 100.0);
        }
        self.params = next;
        true
    }

    pub(crate) fn nodes(&self) -> Vec<NodeHandle> {
        let mut nodes = self.mix.nodes().to_vec();
        nodes.extend([self.delay, self.feedback]);
        nodes
    }
}
