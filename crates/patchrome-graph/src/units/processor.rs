//! Units backed by registered block processors.
//!
//! A processor that is not registered does not fail the build: the unit
//! keeps its ports and passes audio through unchanged.

use patchrome_engine::{AudioEngine, AudioParam, NodeHandle, Primitive};
use patchrome_spectral::{FFT_SIZES, snap_fft_size};

use super::{Assembly, MixStage, set};
use crate::error::GraphError;
use crate::params::{
    BitcrusherParams, FlangerParams, NodeParams, Patch, PhaserParams, SpectralCompressorParams,
    SpectralGateParams, SpectralPitchParams,
};

/// Parameters forwarded to a block processor.
pub trait ProcessorParams: NodeParams + Copy {
    /// Registered processor name.
    const PROCESSOR: &'static str;

    /// Values the processor sees, by processor parameter name.
    fn processor_values(&self) -> Vec<(&'static str, f32)>;

    /// Wet percentage realized outside the processor.
    fn mix(&self) -> f32 {
        100.0
    }
}

impl ProcessorParams for PhaserParams {
    const PROCESSOR: &'static str = patchrome_effects::phaser::NAME;

    fn processor_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("rate", self.rate),
            ("depth", self.depth),
            ("feedback", self.feedback),
        ]
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

impl ProcessorParams for FlangerParams {
    const PROCESSOR: &'static str = patchrome_effects::flanger::NAME;

    fn processor_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("rate", self.rate),
            ("delay", self.delay),
            ("depth", self.depth),
            ("feedback", self.feedback),
        ]
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

impl ProcessorParams for BitcrusherParams {
    const PROCESSOR: &'static str = patchrome_effects::bitcrusher::NAME;

    fn processor_values(&self) -> Vec<(&'static str, f32)> {
        vec![("rate", self.rate), ("bits", self.bits)]
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

impl ProcessorParams for SpectralGateParams {
    const PROCESSOR: &'static str = patchrome_spectral::gate::NAME;

    fn processor_values(&self) -> Vec<(&'static str, f32)> {
        vec![("cutoff", self.cutoff), ("fftSize", self.fft_size)]
    }
}

impl ProcessorParams for SpectralCompressorParams {
    const PROCESSOR: &'static str = patchrome_spectral::compressor::NAME;

    fn processor_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("attack", self.attack),
            ("release", self.release),
            ("inputGain", self.input_gain),
            ("threshold", self.threshold),
            ("ratio", self.ratio),
            ("fftSize", self.fft_size),
        ]
    }
}

impl ProcessorParams for SpectralPitchParams {
    const PROCESSOR: &'static str = patchrome_spectral::pitch::NAME;

    // Dry/wet is mixed outside so the dry path can be delayed
    fn processor_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("pitch", self.pitch),
            ("mix", 100.0),
            ("fftSize", self.fft_size),
        ]
    }

    fn mix(&self) -> f32 {
        self.mix
    }
}

/// Creates the worklet, or logs why it could not be.
fn worklet<P: ProcessorParams>(asm: &mut Assembly<'_>, params: &P) -> Option<NodeHandle> {
    match asm.create(Primitive::Worklet {
        processor: P::PROCESSOR,
        params: params.processor_values(),
    }) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!(%err, processor = P::PROCESSOR, "graph: falling back to pass-through");
            None
        }
    }
}

/// Forwards the processor values that differ between two snapshots.
fn forward_changes<P: ProcessorParams>(
    engine: &mut dyn AudioEngine,
    worklet: Option<NodeHandle>,
    old: &P,
    new: &P,
) {
    let Some(node) = worklet else {
        return;
    };
    for ((name, before), (_, after)) in old.processor_values().into_iter().zip(new.processor_values()) {
        if before != after {
            set(engine, node, AudioParam::Processor(name), after);
        }
    }
}

/// Wet/dry unit around a processor: `input → worklet → wet`.
#[derive(Debug)]
pub struct Modulation<P> {
    /// Wet/dry stage.
    pub mix: MixStage,
    /// The processor; `None` when it was not registered.
    pub worklet: Option<NodeHandle>,
    /// Snapshot.
    pub params: P,
}

impl<P: ProcessorParams> Modulation<P> {
    pub(crate) fn create(asm: &mut Assembly<'_>, params: P) -> Result<Self, GraphError> {
        let mix = MixStage::create(asm, params.mix())?;
        asm.link(mix.input, mix.dry);
        let worklet = worklet(asm, &params);
        match worklet {
            Some(node) => {
                asm.link(mix.input, node);
                asm.queue(node, mix.wet);
            }
            None => asm.link(mix.input, mix.wet),
        }
        Ok(Self {
            mix,
            worklet,
            params,
        })
    }

    pub(crate) fn update(&mut self, engine: &mut dyn AudioEngine, patch: &Patch<'_>) -> bool {
        let mut next = self.params;
        next.apply(patch);
        if next == self.params {
            return false;
        }
        if next.mix() != self.params.mix() {
            self.mix.set_mix(engine, next.mix());
        }
        forward_changes(engine, self.worklet, &self.params, &next);
        self.params = next;
        true
    }

    pub(crate) fn nodes(&self) -> Vec<NodeHandle> {
        let mut nodes = self.mix.nodes().to_vec();
        nodes.extend(self.worklet);
        nodes
    }
}

/// Spectral unit without a dry path: `input → worklet → merger`.
#[derive(Debug)]
pub struct Spectral<P> {
    /// Input gain.
    pub input: NodeHandle,
    /// Output gain.
    pub merger: NodeHandle,
    /// The processor; `None` when it was not registered.
    pub worklet: Option<NodeHandle>,
    /// Snapshot.
    pub params: P,
}

impl<P: ProcessorParams> Spectral<P> {
    pub(crate) fn create(asm: &mut Assembly<'_>, params: P) -> Result<Self, GraphError> {
        let input = asm.gain(1.0)?;
        let merger = asm.gain(1.0)?;
        let worklet = worklet(asm, &params);
        match worklet {
            Some(node) => {
                asm.link(input, node);
                asm.queue(node, merger);
            }
            None => asm.queue(input, merger),
        }
        Ok(Self {
            input,
            merger,
            worklet,
            params,
        })
    }

    pub(crate) fn update(&mut self, engine: &mut dyn AudioEngine, patch: &Patch<'_>) -> bool {
        let mut next = self.params;
        next.apply(patch);
        if next == self.params {
            return false;
        }
        forward_changes(engine, self.worklet, &self.params, &next);
        self.params = next;
        true
    }

    pub(crate) fn nodes(&self) -> Vec<NodeHandle> {
        let mut nodes = vec![self.input, self.merger];
        nodes.extend(self.worklet);
        nodes
    }
}

/// Seconds of STFT latency for a requested FFT size.
fn latency(fft_size: f32, sample_rate: f32) -> f32 {
    snap_fft_size(fft_size) as f32 / sample_rate
}

/// Phase-vocoder pitch shifter with an external, latency-matched dry path.
///
/// The worklet always runs fully wet; `input → dry delay → dry` lines the
/// dry signal up with the worklet's output before the two are mixed.
#[derive(Debug)]
pub struct SpectralPitch {
    /// Wet/dry stage.
    pub mix: MixStage,
    /// Delays the dry path by one FFT frame.
    pub dry_delay: Option<NodeHandle>,
    /// The processor; `None` when it was not registered.
    pub worklet: Option<NodeHandle>,
    /// Snapshot.
    pub params: SpectralPitchParams,
}

impl SpectralPitch {
    pub(crate) fn create(
        asm: &mut Assembly<'_>,
        params: SpectralPitchParams,
    ) -> Result<Self, GraphError> {
        let sample_rate = asm.engine().sample_rate();
        let mix = MixStage::create(asm, params.mix)?;
        let Some(node) = worklet(asm, &params) else {
            asm.queue(mix.input, mix.merger);
            return Ok(Self {
                mix,
                dry_delay: None,
                worklet: None,
                params,
            });
        };
        let largest = FFT_SIZES[FFT_SIZES.len() - 1] as f32;
        let dry_delay = asm.create(Primitive::Delay {
            max_seconds: latency(largest, sample_rate).max(1.0),
            delay_seconds: latency(params.fft_size, sample_rate),
        })?;
        asm.link(mix.input, dry_delay);
        asm.link(dry_delay, mix.dry);
        asm.link(mix.input, node);
        asm.queue(node, mix.wet);
        Ok(Self {
            mix,
            dry_delay: Some(dry_delay),
            worklet: Some(node),
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
        forward_changes(engine, self.worklet, &self.params, &next);
        if next.fft_size != self.params.fft_size {
            if let Some(delay) = self.dry_delay {
                let seconds = latency(next.fft_size, engine.sample_rate());
                set(engine, delay, AudioParam::DelayTime, seconds);
            }
        }
        self.params = next;
        true
    }

    pub(crate) fn nodes(&self) -> Vec<NodeHandle> {
        let mut nodes = self.mix.nodes().to_vec();
        nodes.extend(self.dry_delay);
        nodes.extend(self.worklet);
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_worklet_always_runs_wet() {
        let params = SpectralPitchParams {
            mix: 30.0,
            ..SpectralPitchParams::default()
        };
        assert!(params.processor_values().contains(&("mix", 100.0)));
        assert_eq!(ProcessorParams::mix(&params), 30.0);
    }

    #[test]
    fn latency_snaps_fft_size() {
        assert!((latency(2000.0, 48000.0) - 2048.0 / 48000.0).abs() < 1e-9);
    }

    #[test]
    fn spectral_params_have_no_external_mix() {
        assert_eq!(ProcessorParams::mix(&SpectralGateParams::default()), 100.0);
    }
}
