//! Reference block renderer implementing [`AudioEngine`].
//!
//! [`RenderEngine`] keeps every primitive in an arena indexed by
//! [`NodeHandle`] and renders in fixed quanta of [`RENDER_QUANTUM`] frames,
//! always in stereo.
//!
//! # Scheduling
//!
//! Connections are sorted with Kahn's algorithm, ignoring edges that enter a
//! delay node: a delay emits what it buffered earlier at the start of the
//! quantum and consumes its input only after every other node has rendered.
//! A feedback loop through a delay therefore has a well-defined order. Any
//! other cycle is broken arbitrarily; the node that runs first hears the
//! previous quantum's output of its upstream peers.
//!
//! The schedule is recompiled lazily on the first render after a topology
//! change.

mod convolver;
mod dynamics;
mod node;
mod oversample;

use std::collections::HashMap;

use patchrome_core::{Lfo, ParamChannel, ProcessorDescriptor, RENDER_QUANTUM};

use crate::engine::AudioEngine;
use crate::error::EngineError;
use crate::handle::NodeHandle;
use crate::media::MediaElement;
use crate::primitive::{AudioParam, NodeOption, Primitive};

pub use convolver::normalization_scale;
pub use oversample::shape;

use convolver::Convolver;
use dynamics::Compressor;
use node::{
    BiquadNode, DelayNode, NodeKind, OscillatorNode, SILENCE, StereoBlock, WaveShaperNode,
    WorkletNode,
};

/// A realized connection between two ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Upstream node.
    pub from: NodeHandle,
    /// Output port on `from`.
    pub output: usize,
    /// Downstream node.
    pub to: NodeHandle,
    /// Input port on `to`.
    pub input: usize,
}

struct RenderNode {
    kind: NodeKind,
    inputs: usize,
    outputs: Vec<StereoBlock>,
}

impl RenderNode {
    fn new(kind: NodeKind, inputs: usize, outputs: usize) -> Self {
        Self {
            kind,
            inputs,
            outputs: vec![SILENCE; outputs],
        }
    }
}

/// Compiled render order plus per-node incoming connections.
#[derive(Default)]
struct Schedule {
    order: Vec<usize>,
    delays: Vec<usize>,
    /// `(from, output, input)` per node index.
    incoming: Vec<Vec<(usize, usize, usize)>>,
}

/// Default upper bound on any delay line, in seconds.
pub const DEFAULT_MAX_DELAY_SECONDS: f32 = 180.0;

/// In-process stereo renderer with browser-compatible primitive semantics.
pub struct RenderEngine {
    sample_rate: f32,
    max_delay_seconds: f32,
    nodes: Vec<Option<RenderNode>>,
    connections: Vec<Connection>,
    schedule: Schedule,
    dirty: bool,
    processors: HashMap<&'static str, &'static ProcessorDescriptor>,
    destination: NodeHandle,
    input_scratch: [StereoBlock; 2],
    mix: StereoBlock,
    mix_pos: usize,
}

impl RenderEngine {
    /// Creates an engine containing only its destination node.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_max_delay(sample_rate, DEFAULT_MAX_DELAY_SECONDS)
    }

    /// Creates an engine whose delay lines never exceed `max_delay_seconds`.
    pub fn with_max_delay(sample_rate: f32, max_delay_seconds: f32) -> Self {
        let destination = RenderNode::new(NodeKind::Destination, 1, 0);
        Self {
            sample_rate,
            max_delay_seconds: max_delay_seconds.max(0.0),
            nodes: vec![Some(destination)],
            connections: Vec::new(),
            schedule: Schedule::default(),
            dirty: true,
            processors: HashMap::new(),
            destination: NodeHandle::from_raw(0),
            input_scratch: [SILENCE; 2],
            mix: SILENCE,
            mix_pos: RENDER_QUANTUM,
        }
    }

    /// Number of live nodes, the destination included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Every realized connection.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Whether any output of `from` feeds any input of `to`.
    pub fn is_connected(&self, from: NodeHandle, to: NodeHandle) -> bool {
        self.connections.iter().any(|c| c.from == from && c.to == to)
    }

    /// Type name of a live node.
    pub fn node_type(&self, node: NodeHandle) -> Option<&'static str> {
        self.slot(node).ok().map(|n| n.kind.type_name())
    }

    /// Processor a live worklet node runs.
    pub fn processor_name(&self, node: NodeHandle) -> Option<&'static str> {
        self.slot(node).ok().and_then(|n| n.kind.processor_name())
    }

    /// Renders into both channels; any length is accepted.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = left.len().min(right.len());
        let mut written = 0;
        while written < len {
            if self.mix_pos == RENDER_QUANTUM {
                self.render_quantum();
                self.mix_pos = 0;
            }
            let n = (RENDER_QUANTUM - self.mix_pos).min(len - written);
            left[written..written + n].copy_from_slice(&self.mix[0][self.mix_pos..self.mix_pos + n]);
            right[written..written + n]
                .copy_from_slice(&self.mix[1][self.mix_pos..self.mix_pos + n]);
            self.mix_pos += n;
            written += n;
        }
    }

    fn render_quantum(&mut self) {
        if self.dirty {
            self.compile();
        }

        for &idx in &self.schedule.order {
            let Some(node) = self.nodes[idx].as_ref() else {
                continue;
            };
            let ports = node.inputs.min(2);
            for port in 0..ports {
                gather(
                    &self.nodes,
                    &self.schedule.incoming[idx],
                    port,
                    &mut self.input_scratch[port],
                );
            }
            if let Some(node) = self.nodes[idx].as_mut() {
                node.kind
                    .process(self.sample_rate, &self.input_scratch[..ports], &mut node.outputs);
            }
        }

        for &idx in &self.schedule.delays {
            let mut input = SILENCE;
            gather(&self.nodes, &self.schedule.incoming[idx], 0, &mut input);
            if let Some(RenderNode {
                kind: NodeKind::Delay(delay),
                ..
            }) = self.nodes[idx].as_mut()
            {
                delay.consume(&input);
            }
        }

        let dest = self.destination.index() as usize;
        let mut mix = SILENCE;
        gather(&self.nodes, &self.schedule.incoming[dest], 0, &mut mix);
        self.mix = mix;
    }

    fn compile(&mut self) {
        let n = self.nodes.len();
        let mut incoming = vec![Vec::new(); n];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0u32; n];
        let is_delay =
            |i: usize| matches!(self.nodes[i].as_ref().map(|n| &n.kind), Some(NodeKind::Delay(_)));

        for c in &self.connections {
            let (from, to) = (c.from.index() as usize, c.to.index() as usize);
            incoming[to].push((from, c.output, c.input));
            if !is_delay(to) && from != to {
                outgoing[from].push(to);
                in_degree[to] += 1;
            }
        }

        let mut queue: Vec<usize> = (0..n)
            .filter(|&i| self.nodes[i].is_some() && in_degree[i] == 0)
            .collect();
        queue.reverse();
        let mut order = Vec::with_capacity(n);
        let mut placed = vec![false; n];
        while let Some(idx) = queue.pop() {
            order.push(idx);
            placed[idx] = true;
            for &to in &outgoing[idx] {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push(to);
                }
            }
        }
        let cyclic: Vec<usize> = (0..n)
            .filter(|&i| self.nodes[i].is_some() && !placed[i])
            .collect();
        if !cyclic.is_empty() {
            tracing::debug!(nodes = cyclic.len(), "render: cycle without delay, using previous quantum");
        }
        order.extend(cyclic);

        let delays = (0..n).filter(|&i| is_delay(i)).collect();
        tracing::debug!(
            nodes = order.len(),
            connections = self.connections.len(),
            "render: schedule compiled"
        );
        self.schedule = Schedule {
            order,
            delays,
            incoming,
        };
        self.dirty = false;
    }

    fn slot(&self, node: NodeHandle) -> Result<&RenderNode, EngineError> {
        self.nodes
            .get(node.index() as usize)
            .and_then(Option::as_ref)
            .ok_or(EngineError::UnknownNode(node))
    }

    fn slot_mut(&mut self, node: NodeHandle) -> Result<&mut RenderNode, EngineError> {
        self.nodes
            .get_mut(node.index() as usize)
            .and_then(Option::as_mut)
            .ok_or(EngineError::UnknownNode(node))
    }

    fn insert(&mut self, node: RenderNode) -> NodeHandle {
        let handle = NodeHandle::from_raw(self.nodes.len() as u32);
        tracing::trace!(
            node = %handle,
            kind = node.kind.type_name(),
            processor = node.kind.processor_name(),
            "render: node created"
        );
        self.nodes.push(Some(node));
        self.dirty = true;
        handle
    }

    fn build_kind(&self, primitive: Primitive) -> Result<NodeKind, EngineError> {
        let sr = self.sample_rate;
        Ok(match primitive {
            Primitive::Gain { gain } => NodeKind::Gain(gain),
            Primitive::BiquadFilter {
                kind,
                frequency,
                q,
                gain,
            } => NodeKind::Biquad(BiquadNode::new(kind, frequency, q, gain)),
            Primitive::Convolver { impulse, normalize } => {
                NodeKind::Convolver(Box::new(Convolver::new(&impulse, normalize, sr)))
            }
            Primitive::Delay {
                max_seconds,
                delay_seconds,
            } => {
                let max = max_seconds.clamp(0.0, self.max_delay_seconds);
                NodeKind::Delay(DelayNode::new(sr, max, delay_seconds))
            }
            Primitive::DynamicsCompressor {
                threshold,
                knee,
                ratio,
                attack,
                release,
            } => NodeKind::Compressor(Compressor::new(sr, threshold, knee, ratio, attack, release)),
            Primitive::Oscillator {
                waveform,
                frequency,
            } => {
                let mut lfo = Lfo::new(sr, frequency);
                lfo.set_waveform(waveform);
                NodeKind::Oscillator(OscillatorNode {
                    lfo,
                    started: false,
                    stopped: false,
                })
            }
            Primitive::WaveShaper { curve, oversample } => {
                NodeKind::WaveShaper(WaveShaperNode::new(curve, oversample))
            }
            Primitive::ChannelSplitter => NodeKind::Splitter,
            Primitive::ChannelMerger => NodeKind::Merger,
            Primitive::StereoPanner { pan } => NodeKind::Panner(pan.clamp(-1.0, 1.0)),
            Primitive::Worklet { processor, params } => {
                let descriptor = self
                    .processors
                    .get(processor)
                    .ok_or_else(|| EngineError::ProcessorNotRegistered(processor.to_string()))?;
                let channel = ParamChannel::new(descriptor.params);
                for (name, value) in params {
                    if !channel.set_by_name(name, value) {
                        tracing::warn!(processor, param = name, "render: unknown worklet parameter");
                    }
                }
                NodeKind::Worklet(WorkletNode::new(
                    descriptor.name,
                    descriptor.instantiate(sr),
                    channel,
                ))
            }
        })
    }
}

/// Sums every connection into `port` of a node.
fn gather(
    nodes: &[Option<RenderNode>],
    incoming: &[(usize, usize, usize)],
    port: usize,
    out: &mut StereoBlock,
) {
    *out = SILENCE;
    for &(from, output, input) in incoming {
        if input != port {
            continue;
        }
        let Some(block) = nodes
            .get(from)
            .and_then(Option::as_ref)
            .and_then(|n| n.outputs.get(output))
        else {
            continue;
        };
        for ch in 0..2 {
            for (acc, &x) in out[ch].iter_mut().zip(&block[ch]) {
                *acc += x;
            }
        }
    }
}

impl AudioEngine for RenderEngine {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn destination(&self) -> NodeHandle {
        self.destination
    }

    fn create(&mut self, primitive: Primitive) -> Result<NodeHandle, EngineError> {
        let inputs = primitive.input_count();
        let outputs = primitive.output_count();
        let kind = self.build_kind(primitive)?;
        Ok(self.insert(RenderNode::new(kind, inputs, outputs)))
    }

    fn create_media_source(&mut self, element: &MediaElement) -> Result<NodeHandle, EngineError> {
        let signal = element
            .capture()
            .ok_or(EngineError::SourceAlreadyCaptured(element.id()))?;
        tracing::debug!(element = %element.id(), "render: media element captured");
        Ok(self.insert(RenderNode::new(NodeKind::MediaSource(signal), 0, 1)))
    }

    fn connect(
        &mut self,
        from: NodeHandle,
        output: usize,
        to: NodeHandle,
        input: usize,
    ) -> Result<(), EngineError> {
        let source = self.slot(from)?;
        if output >= source.outputs.len() {
            return Err(EngineError::output_out_of_range(from, output, source.outputs.len()));
        }
        let target = self.slot(to)?;
        if target.inputs == 0 {
            return Err(EngineError::NotAnInput(to));
        }
        if input >= target.inputs {
            return Err(EngineError::input_out_of_range(to, input, target.inputs));
        }

        let connection = Connection {
            from,
            output,
            to,
            input,
        };
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
            self.dirty = true;
        }
        Ok(())
    }

    fn disconnect(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.slot(node)?;
        self.connections.retain(|c| c.from != node);
        self.dirty = true;
        Ok(())
    }

    fn disconnect_from(&mut self, node: NodeHandle, to: NodeHandle) -> Result<(), EngineError> {
        self.slot(node)?;
        self.slot(to)?;
        self.connections.retain(|c| !(c.from == node && c.to == to));
        self.dirty = true;
        Ok(())
    }

    fn set_param(
        &mut self,
        node: NodeHandle,
        param: AudioParam,
        value: f32,
    ) -> Result<(), EngineError> {
        let slot = self.slot_mut(node)?;
        let applied = match (&mut slot.kind, param) {
            (NodeKind::Gain(gain), AudioParam::Gain) => {
                *gain = value;
                true
            }
            (NodeKind::Biquad(b), AudioParam::Frequency) => {
                b.frequency = value;
                b.invalidate();
                true
            }
            (NodeKind::Biquad(b), AudioParam::Q) => {
                b.q = value;
                b.invalidate();
                true
            }
            (NodeKind::Biquad(b), AudioParam::FilterGain) => {
                b.gain = value;
                b.invalidate();
                true
            }
            (NodeKind::Delay(d), AudioParam::DelayTime) => {
                d.delay_seconds = value.clamp(0.0, d.max_seconds);
                true
            }
            (NodeKind::Panner(pan), AudioParam::Pan) => {
                *pan = value.clamp(-1.0, 1.0);
                true
            }
            (NodeKind::Compressor(c), AudioParam::Threshold) => {
                c.set_threshold(value);
                true
            }
            (NodeKind::Compressor(c), AudioParam::Knee) => {
                c.set_knee(value);
                true
            }
            (NodeKind::Compressor(c), AudioParam::Ratio) => {
                c.set_ratio(value);
                true
            }
            (NodeKind::Compressor(c), AudioParam::Attack) => {
                c.set_attack(value);
                true
            }
            (NodeKind::Compressor(c), AudioParam::Release) => {
                c.set_release(value);
                true
            }
            (NodeKind::Oscillator(osc), AudioParam::Frequency) => {
                osc.lfo.set_frequency(value);
                true
            }
            (NodeKind::Worklet(w), AudioParam::Processor(name)) => w.channel.set_by_name(name, value),
            _ => false,
        };
        if applied {
            Ok(())
        } else {
            Err(EngineError::not_applicable(node, param.name()))
        }
    }

    fn set_option(&mut self, node: NodeHandle, option: NodeOption) -> Result<(), EngineError> {
        let slot = self.slot_mut(node)?;
        match (&mut slot.kind, option) {
            (NodeKind::Biquad(b), NodeOption::FilterType(kind)) => {
                b.kind = kind;
                b.invalidate();
                Ok(())
            }
            (NodeKind::Oscillator(osc), NodeOption::Waveform(waveform)) => {
                osc.lfo.set_waveform(waveform);
                Ok(())
            }
            _ => Err(EngineError::not_applicable(node, option.name())),
        }
    }

    fn set_curve(&mut self, node: NodeHandle, curve: Vec<f32>) -> Result<(), EngineError> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::WaveShaper(shaper) => {
                shaper.curve = curve;
                Ok(())
            }
            _ => Err(EngineError::not_applicable(node, "curve")),
        }
    }

    fn start(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::Oscillator(osc) => {
                osc.started = true;
                Ok(())
            }
            _ => Err(EngineError::not_applicable(node, "start")),
        }
    }

    fn stop(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        match &mut self.slot_mut(node)?.kind {
            NodeKind::Oscillator(osc) => {
                osc.stopped = true;
                Ok(())
            }
            _ => Err(EngineError::not_applicable(node, "stop")),
        }
    }

    fn release(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.slot(node)?;
        self.connections.retain(|c| c.from != node && c.to != node);
        if node != self.destination {
            self.nodes[node.index() as usize] = None;
        }
        self.dirty = true;
        Ok(())
    }

    fn register_processor(&mut self, descriptor: &'static ProcessorDescriptor) {
        tracing::debug!(name = descriptor.name, "render: processor registered");
        self.processors.insert(descriptor.name, descriptor);
    }

    fn is_registered(&self, name: &str) -> bool {
        self.processors.contains_key(name)
    }

    fn param_channel(&self, node: NodeHandle) -> Option<ParamChannel> {
        match &self.slot(node).ok()?.kind {
            NodeKind::Worklet(w) => Some(w.channel.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::SourceId;
    use crate::media::BufferSource;

    #[test]
    fn destination_is_silent_when_unconnected() {
        let mut engine = RenderEngine::new(48000.0);
        let mut l = [1.0; 300];
        let mut r = [1.0; 300];
        engine.render(&mut l, &mut r);
        assert!(l.iter().chain(&r).all(|&s| s == 0.0));
    }

    #[test]
    fn duplicate_connections_are_ignored() {
        let mut engine = RenderEngine::new(48000.0);
        let g = engine.create(Primitive::Gain { gain: 1.0 }).unwrap();
        let dest = engine.destination();
        engine.connect(g, 0, dest, 0).unwrap();
        engine.connect(g, 0, dest, 0).unwrap();
        assert_eq!(engine.connections().len(), 1);
    }

    #[test]
    fn connect_validates_ports() {
        let mut engine = RenderEngine::new(48000.0);
        let g = engine.create(Primitive::Gain { gain: 1.0 }).unwrap();
        let osc = engine
            .create(Primitive::Oscillator {
                waveform: patchrome_core::Waveform::Sine,
                frequency: 440.0,
            })
            .unwrap();
        assert_eq!(engine.connect(g, 0, osc, 0), Err(EngineError::NotAnInput(osc)));
        assert!(matches!(
            engine.connect(g, 1, engine.destination(), 0),
            Err(EngineError::PortOutOfRange { .. })
        ));
        let stale = NodeHandle::from_raw(99);
        assert_eq!(engine.connect(stale, 0, g, 0), Err(EngineError::UnknownNode(stale)));
    }

    #[test]
    fn released_handles_stay_dead() {
        let mut engine = RenderEngine::new(48000.0);
        let g = engine.create(Primitive::Gain { gain: 1.0 }).unwrap();
        engine.connect(g, 0, engine.destination(), 0).unwrap();
        engine.release(g).unwrap();
        assert_eq!(engine.node_count(), 1);
        assert!(engine.connections().is_empty());
        assert_eq!(engine.release(g), Err(EngineError::UnknownNode(g)));
        let next = engine.create(Primitive::Gain { gain: 1.0 }).unwrap();
        assert_ne!(next, g);
    }

    #[test]
    fn media_source_is_captured_once() {
        let element = MediaElement::with_signal(SourceId::new(4), BufferSource::mono(vec![0.5; 4]));
        let mut a = RenderEngine::new(48000.0);
        let mut b = RenderEngine::new(48000.0);
        assert!(a.create_media_source(&element).is_ok());
        assert_eq!(
            b.create_media_source(&element),
            Err(EngineError::SourceAlreadyCaptured(SourceId::new(4)))
        );
    }

    #[test]
    fn unregistered_worklet_is_rejected() {
        let mut engine = RenderEngine::new(48000.0);
        let err = engine
            .create(Primitive::Worklet {
                processor: "missing-processor",
                params: Vec::new(),
            })
            .unwrap_err();
        assert_eq!(err, EngineError::ProcessorNotRegistered("missing-processor".into()));
    }

    #[test]
    fn params_are_type_checked() {
        let mut engine = RenderEngine::new(48000.0);
        let g = engine.create(Primitive::Gain { gain: 1.0 }).unwrap();
        assert!(engine.set_param(g, AudioParam::Gain, 0.5).is_ok());
        assert!(matches!(
            engine.set_param(g, AudioParam::DelayTime, 0.5),
            Err(EngineError::ParamNotApplicable { .. })
        ));
        assert!(engine.set_curve(g, vec![0.0]).is_err());
        assert!(engine.start(g).is_err());
    }
}
