//! Gain, pan and per-channel phase inversion.
//!
//! The phase chain `splitter → left/right phase → merger → panner` is always
//! wired. Whether audio takes it depends only on where `gain` points: flat
//! routing is `gain → panner`, reversed routing is `gain → splitter`.

use patchrome_engine::{AudioEngine, AudioParam, Connection, NodeHandle, Primitive};

use super::{Assembly, connect, disconnect, link, set};
use crate::error::GraphError;
use crate::params::{NodeParams, Patch, UtilityParams, volume_gain};

fn phase(reversed: bool) -> f32 {
    if reversed { -1.0 } else { 1.0 }
}

fn reversed(params: &UtilityParams) -> bool {
    params.reverse_l || params.reverse_r
}

/// Utility unit.
#[derive(Debug)]
pub struct Utility {
    /// Input gain.
    pub input: NodeHandle,
    /// Volume stage.
    pub gain: NodeHandle,
    /// Stereo panner and the unit's output.
    pub panner: NodeHandle,
    /// Splits the volume stage into channels.
    pub splitter: NodeHandle,
    /// Rejoins the phase gains.
    pub merger: NodeHandle,
    /// Left sign.
    pub left_phase: NodeHandle,
    /// Right sign.
    pub right_phase: NodeHandle,
    /// Snapshot.
    pub params: UtilityParams,
}

impl Utility {
    pub(crate) fn create(asm: &mut Assembly<'_>, params: UtilityParams) -> Result<Self, GraphError> {
        let input = asm.gain(1.0)?;
        let gain = asm.gain(volume_gain(params.volume))?;
        let panner = asm.create(Primitive::StereoPanner {
            pan: params.pan / 100.0,
        })?;
        let splitter = asm.create(Primitive::ChannelSplitter)?;
        let merger = asm.create(Primitive::ChannelMerger)?;
        let left_phase = asm.gain(phase(params.reverse_l))?;
        let right_phase = asm.gain(phase(params.reverse_r))?;

        asm.link(input, gain);
        asm.link_ports(splitter, 0, left_phase, 0);
        asm.link_ports(splitter, 1, right_phase, 0);
        asm.link_ports(left_phase, 0, merger, 0);
        asm.link_ports(right_phase, 0, merger, 1);
        asm.link(merger, panner);
        if reversed(&params) {
            asm.link(gain, splitter);
        } else {
            asm.link(gain, panner);
        }

        Ok(Self {
            input,
            gain,
            panner,
            splitter,
            merger,
            left_phase,
            right_phase,
            params,
        })
    }

    pub(crate) fn update(&mut self, engine: &mut dyn AudioEngine, patch: &Patch<'_>) -> bool {
        let mut next = self.params;
        next.apply(patch);
        if next == self.params {
            return false;
        }
        if next.volume != self.params.volume {
            set(engine, self.gain, AudioParam::Gain, volume_gain(next.volume));
        }
        if next.pan != self.params.pan {
            set(engine, self.panner, AudioParam::Pan, next.pan / 100.0);
        }
        if next.reverse_l != self.params.reverse_l {
            set(engine, self.left_phase, AudioParam::Gain, phase(next.reverse_l));
        }
        if next.reverse_r != self.params.reverse_r {
            set(engine, self.right_phase, AudioParam::Gain, phase(next.reverse_r));
        }
        if reversed(&next) != reversed(&self.params) {
            self.route(engine, reversed(&next));
        }
        self.params = next;
        true
    }

    /// Points the volume stage at the phase chain or straight at the panner.
    fn route(&self, engine: &mut dyn AudioEngine, through_phase: bool) {
        let (stale, fresh) = if through_phase {
            (self.panner, self.splitter)
        } else {
            (self.splitter, self.panner)
        };
        disconnect(engine, self.gain, stale);
        connect(engine, link(self.gain, fresh));
        tracing::debug!(through_phase, "graph: utility rerouted");
    }

    /// Connection currently carrying the volume stage.
    pub fn route_connection(&self) -> Connection {
        if reversed(&self.params) {
            link(self.gain, self.splitter)
        } else {
            link(self.gain, self.panner)
        }
    }

    pub(crate) fn nodes(&self) -> Vec<NodeHandle> {
        vec![
            self.input,
            self.gain,
            self.panner,
            self.splitter,
            self.merger,
            self.left_phase,
            self.right_phase,
        ]
    }
}
