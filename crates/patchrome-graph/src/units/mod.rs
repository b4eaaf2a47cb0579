//! The effect module library.
//!
//! Every effect type is a variant of [`EffectUnit`] carrying its typed
//! parameter snapshot and the handles of the primitives it owns. A creator
//! builds the sub-topology through an [`Assembly`]; connections that must
//! wait for the inter-node edges are queued there and realized by the
//! builder afterwards.
//!
//! Wet/dry effects share [`MixStage`]: `input` fans out to a dry gain and to
//! the effect's wet path, and both land on `merger`, the unit's output.

mod delay;
mod distortion;
mod dynamics;
mod equalizer;
mod mix;
mod processor;
mod reverb;
mod tone;
mod utility;

pub use delay::FeedbackDelay;
pub use distortion::{CURVE_POINTS, Distortion, distortion_curve};
pub use dynamics::Limiter;
pub use equalizer::Equalizer;
pub use mix::MixStage;
pub use processor::{Modulation, ProcessorParams, Spectral, SpectralPitch};
pub use reverb::{Reverb, reverb_impulse};
pub use tone::ToneGenerator;
pub use utility::Utility;

use patchrome_engine::{AudioEngine, AudioParam, Connection, NodeHandle, NodeOption, Primitive};

use crate::description::ParamMap;
use crate::error::GraphError;
use crate::node_type::NodeType;
use crate::params::{
    BitcrusherParams, FlangerParams, NodeParams, Patch, PhaserParams, SpectralCompressorParams,
    SpectralGateParams,
};

/// Engine access for a creator.
///
/// Records every primitive it creates so a creator that fails half way can
/// be rolled back, and collects the internal connections to realize once the
/// inter-node edges exist.
pub struct Assembly<'a> {
    engine: &'a mut dyn AudioEngine,
    node: &'a str,
    created: Vec<NodeHandle>,
    queued: Vec<Connection>,
}

impl<'a> Assembly<'a> {
    /// Starts assembling the unit for node `node`.
    pub fn new(engine: &'a mut dyn AudioEngine, node: &'a str) -> Self {
        Self {
            engine,
            node,
            created: Vec::new(),
            queued: Vec::new(),
        }
    }

    /// The engine being built into.
    pub fn engine(&mut self) -> &mut dyn AudioEngine {
        &mut *self.engine
    }

    /// Creates a primitive.
    pub fn create(&mut self, primitive: Primitive) -> Result<NodeHandle, GraphError> {
        let name = primitive.type_name();
        let handle = self
            .engine
            .create(primitive)
            .map_err(|source| GraphError::Create {
                node: self.node.to_string(),
                primitive: name,
                source,
            })?;
        self.created.push(handle);
        Ok(handle)
    }

    /// Creates a gain stage.
    pub fn gain(&mut self, gain: f32) -> Result<NodeHandle, GraphError> {
        self.create(Primitive::Gain { gain })
    }

    /// Connects port 0 to port 0 now.
    pub fn link(&mut self, from: NodeHandle, to: NodeHandle) {
        self.link_ports(from, 0, to, 0);
    }

    /// Connects two specific ports now.
    pub fn link_ports(&mut self, from: NodeHandle, output: usize, to: NodeHandle, input: usize) {
        connect(
            &mut *self.engine,
            Connection {
                from,
                output,
                to,
                input,
            },
        );
    }

    /// Queues a port-0 connection until after the inter-node edges.
    pub fn queue(&mut self, from: NodeHandle, to: NodeHandle) {
        self.queued.push(link(from, to));
    }

    /// Finishes a successful creator, yielding its queued connections.
    pub fn finish(self) -> Vec<Connection> {
        self.queued
    }

    /// Releases everything a failed creator made.
    pub fn abandon(self) {
        for handle in self.created {
            release(&mut *self.engine, handle);
        }
    }
}

/// Port 0 to port 0.
pub(crate) fn link(from: NodeHandle, to: NodeHandle) -> Connection {
    Connection {
        from,
        output: 0,
        to,
        input: 0,
    }
}

/// Best-effort connection. A rejection is logged and reported as `false`.
pub(crate) fn connect(engine: &mut dyn AudioEngine, link: Connection) -> bool {
    match engine.connect(link.from, link.output, link.to, link.input) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(%err, from = %link.from, to = %link.to, "graph: connection rejected");
            false
        }
    }
}

/// Best-effort parameter write.
pub(crate) fn set(engine: &mut dyn AudioEngine, node: NodeHandle, param: AudioParam, value: f32) {
    if let Err(err) = engine.set_param(node, param, value) {
        tracing::warn!(%err, "graph: parameter rejected");
    }
}

/// Best-effort option write.
pub(crate) fn set_option(engine: &mut dyn AudioEngine, node: NodeHandle, option: NodeOption) {
    if let Err(err) = engine.set_option(node, option) {
        tracing::warn!(%err, "graph: option rejected");
    }
}

/// Best-effort disconnect of one link.
pub(crate) fn disconnect(engine: &mut dyn AudioEngine, from: NodeHandle, to: NodeHandle) {
    if let Err(err) = engine.disconnect_from(from, to) {
        tracing::warn!(%err, "graph: disconnect rejected");
    }
}

/// Best-effort release.
pub(crate) fn release(engine: &mut dyn AudioEngine, node: NodeHandle) {
    if let Err(err) = engine.release(node) {
        tracing::debug!(%err, "graph: release of a dead node");
    }
}

/// One instantiated effect.
#[derive(Debug)]
pub enum EffectUnit {
    /// Convolution reverb.
    Reverb(Reverb),
    /// Feedback delay.
    Delay(FeedbackDelay),
    /// Gain, pan, phase inversion.
    Utility(Utility),
    /// Brickwall compressor.
    Limiter(Limiter),
    /// Wave-shaper distortion.
    Distortion(Distortion),
    /// Oscillator.
    ToneGenerator(ToneGenerator),
    /// Biquad filter.
    Equalizer(Equalizer),
    /// Phaser processor.
    Phaser(Modulation<PhaserParams>),
    /// Flanger processor.
    Flanger(Modulation<FlangerParams>),
    /// Bitcrusher processor.
    Bitcrusher(Modulation<BitcrusherParams>),
    /// Spectral gate processor.
    SpectralGate(Spectral<SpectralGateParams>),
    /// Spectral compressor processor.
    SpectralCompressor(Spectral<SpectralCompressorParams>),
    /// Spectral pitch processor with external dry path.
    SpectralPitch(SpectralPitch),
}

impl EffectUnit {
    /// Runs the creator for `kind`.
    ///
    /// Returns `None` for the terminal types, which are not effects.
    pub fn create(
        kind: NodeType,
        asm: &mut Assembly<'_>,
        patch: &Patch<'_>,
    ) -> Option<Result<Self, GraphError>> {
        let unit = match kind {
            NodeType::Input | NodeType::Output => return None,
            NodeType::Reverb => Reverb::create(asm, NodeParams::from_patch(patch)).map(Self::Reverb),
            NodeType::Delay => {
                FeedbackDelay::create(asm, NodeParams::from_patch(patch)).map(Self::Delay)
            }
            NodeType::Utility => {
                Utility::create(asm, NodeParams::from_patch(patch)).map(Self::Utility)
            }
            NodeType::Limiter => {
                Limiter::create(asm, NodeParams::from_patch(patch)).map(Self::Limiter)
            }
            NodeType::Distortion => {
                Distortion::create(asm, NodeParams::from_patch(patch)).map(Self::Distortion)
            }
            NodeType::ToneGenerator => {
                ToneGenerator::create(asm, NodeParams::from_patch(patch)).map(Self::ToneGenerator)
            }
            NodeType::Equalizer => {
                Equalizer::create(asm, NodeParams::from_patch(patch)).map(Self::Equalizer)
            }
            NodeType::Phaser => {
                Modulation::create(asm, NodeParams::from_patch(patch)).map(Self::Phaser)
            }
            NodeType::Flanger => {
                Modulation::create(asm, NodeParams::from_patch(patch)).map(Self::Flanger)
            }
            NodeType::Bitcrusher => {
                Modulation::create(asm, NodeParams::from_patch(patch)).map(Self::Bitcrusher)
            }
            NodeType::SpectralGate => {
                Spectral::create(asm, NodeParams::from_patch(patch)).map(Self::SpectralGate)
            }
            NodeType::SpectralCompressor => {
                Spectral::create(asm, NodeParams::from_patch(patch)).map(Self::SpectralCompressor)
            }
            NodeType::SpectralPitch => {
                SpectralPitch::create(asm, NodeParams::from_patch(patch)).map(Self::SpectralPitch)
            }
        };
        Some(unit)
    }

    /// Applies a partial parameter patch; returns whether anything changed.
    pub fn update(&mut self, engine: &mut dyn AudioEngine, patch: &Patch<'_>) -> bool {
        match self {
            Self::Reverb(u) => u.update(engine, patch),
            Self::Delay(u) => u.update(engine, patch),
            Self::Utility(u) => u.update(engine, patch),
            Self::Limiter(u) => u.update(engine, patch),
            Self::Distortion(u) => u.update(engine, patch),
            Self::ToneGenerator(u) => u.update(engine, patch),
            Self::Equalizer(u) => u.update(engine, patch),
            Self::Phaser(u) => u.update(engine, patch),
            Self::Flanger(u) => u.update(engine, patch),
            Self::Bitcrusher(u) => u.update(engine, patch),
            Self::SpectralGate(u) => u.update(engine, patch),
            Self::SpectralCompressor(u) => u.update(engine, patch),
            Self::SpectralPitch(u) => u.update(engine, patch),
        }
    }

    /// Type tag.
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Reverb(_) => NodeType::Reverb,
            Self::Delay(_) => NodeType::Delay,
            Self::Utility(_) => NodeType::Utility,
            Self::Limiter(_) => NodeType::Limiter,
            Self::Distortion(_) => NodeType::Distortion,
            Self::ToneGenerator(_) => NodeType::ToneGenerator,
            Self::Equalizer(_) => NodeType::Equalizer,
            Self::Phaser(_) => NodeType::Phaser,
            Self::Flanger(_) => NodeType::Flanger,
            Self::Bitcrusher(_) => NodeType::Bitcrusher,
            Self::SpectralGate(_) => NodeType::SpectralGate,
            Self::SpectralCompressor(_) => NodeType::SpectralCompressor,
            Self::SpectralPitch(_) => NodeType::SpectralPitch,
        }
    }

    /// Where upstream connections attach. Generators have none.
    pub fn input(&self) -> Option<NodeHandle> {
        match self {
            Self::Reverb(u) => Some(u.mix.input),
            Self::Delay(u) => Some(u.mix.input),
            Self::Utility(u) => Some(u.input),
            Self::Limiter(u) => Some(u.input),
            Self::Distortion(u) => Some(u.mix.input),
            Self::ToneGenerator(_) => None,
            Self::Equalizer(u) => Some(u.input),
            Self::Phaser(u) => Some(u.mix.input),
            Self::Flanger(u) => Some(u.mix.input),
            Self::Bitcrusher(u) => Some(u.mix.input),
            Self::SpectralGate(u) => Some(u.input),
            Self::SpectralCompressor(u) => Some(u.input),
            Self::SpectralPitch(u) => Some(u.mix.input),
        }
    }

    /// Where downstream connections attach.
    pub fn output(&self) -> NodeHandle {
        match self {
            Self::Reverb(u) => u.mix.merger,
            Self::Delay(u) => u.mix.merger,
            Self::Utility(u) => u.panner,
            Self::Limiter(u) => u.compressor,
            Self::Distortion(u) => u.mix.merger,
            Self::ToneGenerator(u) => u.gain,
            Self::Equalizer(u) => u.filter,
            Self::Phaser(u) => u.mix.merger,
            Self::Flanger(u) => u.mix.merger,
            Self::Bitcrusher(u) => u.mix.merger,
            Self::SpectralGate(u) => u.merger,
            Self::SpectralCompressor(u) => u.merger,
            Self::SpectralPitch(u) => u.mix.merger,
        }
    }

    /// Parameter snapshot.
    pub fn params(&self) -> ParamMap {
        match self {
            Self::Reverb(u) => u.params.to_params(),
            Self::Delay(u) => u.params.to_params(),
            Self::Utility(u) => u.params.to_params(),
            Self::Limiter(u) => u.params.to_params(),
            Self::Distortion(u) => u.params.to_params(),
            Self::ToneGenerator(u) => u.params.to_params(),
            Self::Equalizer(u) => u.params.to_params(),
            Self::Phaser(u) => u.params.to_params(),
            Self::Flanger(u) => u.params.to_params(),
            Self::Bitcrusher(u) => u.params.to_params(),
            Self::SpectralGate(u) => u.params.to_params(),
            Self::SpectralCompressor(u) => u.params.to_params(),
            Self::SpectralPitch(u) => u.params.to_params(),
        }
    }

    /// Every primitive the unit owns.
    pub fn nodes(&self) -> Vec<NodeHandle> {
        match self {
            Self::Reverb(u) => u.nodes(),
            Self::Delay(u) => u.nodes(),
            Self::Utility(u) => u.nodes(),
            Self::Limiter(u) => vec![u.input, u.compressor],
            Self::Distortion(u) => u.nodes(),
            Self::ToneGenerator(u) => vec![u.oscillator, u.gain],
            Self::Equalizer(u) => vec![u.input, u.filter],
            Self::Phaser(u) => u.nodes(),
            Self::Flanger(u) => u.nodes(),
            Self::Bitcrusher(u) => u.nodes(),
            Self::SpectralGate(u) => u.nodes(),
            Self::SpectralCompressor(u) => u.nodes(),
            Self::SpectralPitch(u) => u.nodes(),
        }
    }

    /// Stops self-driving primitives and releases every owned primitive.
    pub fn teardown(self, engine: &mut dyn AudioEngine) {
        if let Self::ToneGenerator(tone) = &self {
            if let Err(err) = engine.stop(tone.oscillator) {
                tracing::debug!(%err, "graph: oscillator already gone");
            }
        }
        for node in self.nodes() {
            release(engine, node);
        }
    }
}
