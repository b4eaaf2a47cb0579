//! Wave-shaper distortion.

use core::f32::consts::PI;

use patchrome_engine::{AudioEngine, NodeHandle, Oversample, Primitive};

use super::{Assembly, MixStage};
use crate::error::GraphError;
use crate::params::{DistortionParams, NodeParams, Patch};

/// Curve resolution over `[-1, 1]`.
pub const CURVE_POINTS: usize = 44100;

/// Soft-clip transfer curve for a 0-100 `drive`.
///
/// `curve[i] = (3 + k)·x·20°/(π + k·|x|)` with `k = 2.5·drive` and `x`
/// stepping from -1 towards 1.
pub fn distortion_curve(drive: f32) -> Vec<f32> {
    let k = drive * 2.5;
    let degrees = 20.0 * PI / 180.0;
    (0..CURVE_POINTS)
        .map(|i| {
            let x = i as f32 * 2.0 / CURVE_POINTS as f32 - 1.0;
            (3.0 + k) * x * degrees / (PI + k * x.abs())
        })
        .collect()
}

/// `input → shaper → wet` beside the dry path.
#[derive(Debug)]
pub struct Distortion {
    /// Wet/dry stage.
    pub mix: MixStage,
    /// 4x oversampled shaper.
    pub shaper: NodeHandle,
    /// Snapshot.
    pub params: DistortionParams,
}

impl Distortion {
    pub(crate) fn create(
        asm: &mut Assembly<'_>,
        params: DistortionParams,
    ) -> Result<Self, GraphError> {
        let mix = MixStage::create(asm, params.mix)?;
        let shaper = asm.create(Primitive::WaveShaper {
            curve: distortion_curve(params.drive),
            oversample: Oversample::X4,
        })?;
        asm.link(mix.input, mix.dry);
        asm.link(mix.input, shaper);
        asm.queue(shaper, mix.wet);
        Ok(Self {
            mix,
            shaper,
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
        if next.drive != self.params.drive {
            if let Err(err) = engine.set_curve(self.shaper, distortion_curve(next.drive)) {
                tracing::warn!(%err, "graph: distortion curve rejected");
                next.drive = self.params.drive;
            }
        }
        self.params = next;
        true
    }

    pub(crate) fn nodes(&self) -> Vec<NodeHandle> {
        let mut nodes = self.mix.nodes().to_vec();
        nodes.push(self.shaper);
        nodes
    }
}
