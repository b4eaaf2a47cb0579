//! Patchrome Engine - the audio-engine seam and a reference renderer
//!
//! The graph layer never touches samples directly. It creates primitives,
//! wires ports and sets parameters through [`AudioEngine`], holding only
//! opaque [`NodeHandle`]s. Block processors (the spectral and modulation
//! effects) are made available by name with
//! [`AudioEngine::register_processor`] and instantiated as
//! [`Primitive::Worklet`] nodes whose parameters flow through a lock-free
//! [`ParamChannel`](patchrome_core::ParamChannel).
//!
//! # Key Types
//!
//! - [`AudioEngine`] - create / connect / disconnect / set / release
//! - [`Primitive`], [`AudioParam`], [`NodeOption`] - what can be created and
//!   changed
//! - [`MediaElement`] - a playing element: [`PlaybackControl`] plus the
//!   [`SignalSource`] a source node captures exactly once
//! - [`RenderEngine`] - in-process stereo renderer with a 128-frame quantum
//!
//! # Example
//!
//! ```rust
//! use patchrome_engine::{AudioEngine, Primitive, RenderEngine};
//!
//! let mut engine = RenderEngine::new(48000.0);
//! let gain = engine.create(Primitive::Gain { gain: 0.5 }).unwrap();
//! engine.connect(gain, 0, engine.destination(), 0).unwrap();
//!
//! let mut left = vec![0.0; 256];
//! let mut right = vec![0.0; 256];
//! engine.render(&mut left, &mut right);
//! ```

pub mod engine;
pub mod error;
pub mod handle;
pub mod media;
pub mod primitive;
pub mod render;

pub use engine::{AudioEngine, SharedEngine};
pub use error::EngineError;
pub use handle::{NodeHandle, SourceId};
pub use media::{AtomicPlayback, BufferSource, MediaElement, PlaybackControl, SignalSource};
pub use primitive::{AudioParam, NodeOption, Oversample, Primitive};
pub use render::{Connection, RenderEngine};
