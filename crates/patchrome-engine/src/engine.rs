//! The audio-engine seam.
//!
//! Everything above this trait (graph building, updates, the attachment
//! lifecycle) talks to an engine only through [`AudioEngine`]. The engine
//! owns the primitives; callers hold [`NodeHandle`]s.

use std::sync::Arc;

use parking_lot::Mutex;
use patchrome_core::{ParamChannel, ProcessorDescriptor};

use crate::error::EngineError;
use crate::handle::NodeHandle;
use crate::media::MediaElement;
use crate::primitive::{AudioParam, NodeOption, Primitive};

/// Operations an audio engine provides to the graph layer.
///
/// Every fallible call is local: a rejected connection or parameter leaves
/// the rest of the engine untouched.
pub trait AudioEngine: Send {
    /// Engine sample rate in Hz.
    fn sample_rate(&self) -> f32;

    /// The node whose input is heard.
    fn destination(&self) -> NodeHandle;

    /// Instantiates a primitive.
    fn create(&mut self, primitive: Primitive) -> Result<NodeHandle, EngineError>;

    /// Wraps a media element as a source node.
    ///
    /// Fails with [`EngineError::SourceAlreadyCaptured`] if the element
    /// already feeds a source node in any engine.
    fn create_media_source(&mut self, element: &MediaElement) -> Result<NodeHandle, EngineError>;

    /// Connects output port `output` of `from` to input port `input` of `to`.
    ///
    /// Connecting the same pair of ports twice is a no-op.
    fn connect(
        &mut self,
        from: NodeHandle,
        output: usize,
        to: NodeHandle,
        input: usize,
    ) -> Result<(), EngineError>;

    /// Removes every outgoing connection of `node`.
    fn disconnect(&mut self, node: NodeHandle) -> Result<(), EngineError>;

    /// Removes every connection from `node` to `to`.
    fn disconnect_from(&mut self, node: NodeHandle, to: NodeHandle) -> Result<(), EngineError>;

    /// Sets a numeric parameter.
    fn set_param(&mut self, node: NodeHandle, param: AudioParam, value: f32)
    -> Result<(), EngineError>;

    /// Sets an enumerated option.
    fn set_option(&mut self, node: NodeHandle, option: NodeOption) -> Result<(), EngineError>;

    /// Replaces a wave-shaper's transfer curve.
    fn set_curve(&mut self, node: NodeHandle, curve: Vec<f32>) -> Result<(), EngineError>;

    /// Starts a source-less generator.
    fn start(&mut self, node: NodeHandle) -> Result<(), EngineError>;

    /// Stops a source-less generator for good.
    fn stop(&mut self, node: NodeHandle) -> Result<(), EngineError>;

    /// Disconnects `node` in both directions and frees it.
    fn release(&mut self, node: NodeHandle) -> Result<(), EngineError>;

    /// Makes a block processor available to [`Primitive::Worklet`].
    fn register_processor(&mut self, descriptor: &'static ProcessorDescriptor);

    /// Whether `name` was registered.
    fn is_registered(&self, name: &str) -> bool;

    /// Parameter channel of a worklet node.
    fn param_channel(&self, node: NodeHandle) -> Option<ParamChannel>;
}

/// An engine shared between a control thread and a render thread.
pub type SharedEngine<E> = Arc<Mutex<E>>;

impl<E: AudioEngine> AudioEngine for Arc<Mutex<E>> {
    fn sample_rate(&self) -> f32 {
        self.lock().sample_rate()
    }

    fn destination(&self) -> NodeHandle {
        self.lock().destination()
    }

    fn create(&mut self, primitive: Primitive) -> Result<NodeHandle, EngineError> {
        self.lock().create(primitive)
    }

    fn create_media_source(&mut self, element: &MediaElement) -> Result<NodeHandle, EngineError> {
        self.lock().create_media_source(element)
    }

    fn connect(
        &mut self,
        from: NodeHandle,
        output: usize,
        to: NodeHandle,
        input: usize,
    ) -> Result<(), EngineError> {
        self.lock().connect(from, output, to, input)
    }

    fn disconnect(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.lock().disconnect(node)
    }

    fn disconnect_from(&mut self, node: NodeHandle, to: NodeHandle) -> Result<(), EngineError> {
        self.lock().disconnect_from(node, to)
    }

    fn set_param(
        &mut self,
        node: NodeHandle,
        param: AudioParam,
        value: f32,
    ) -> Result<(), EngineError> {
        self.lock().set_param(node, param, value)
    }

    fn set_option(&mut self, node: NodeHandle, option: NodeOption) -> Result<(), EngineError> {
        self.lock().set_option(node, option)
    }

    fn set_curve(&mut self, node: NodeHandle, curve: Vec<f32>) -> Result<(), EngineError> {
        self.lock().set_curve(node, curve)
    }

    fn start(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.lock().start(node)
    }

    fn stop(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.lock().stop(node)
    }

    fn release(&mut self, node: NodeHandle) -> Result<(), EngineError> {
        self.lock().release(node)
    }

    fn register_processor(&mut self, descriptor: &'static ProcessorDescriptor) {
        self.lock().register_processor(descriptor);
    }

    fn is_registered(&self, name: &str) -> bool {
        self.lock().is_registered(name)
    }

    fn param_channel(&self, node: NodeHandle) -> Option<ParamChannel> {
        self.lock().param_channel(node)
    }
}
