//! Patchrome Graph - declarative effect graphs on top of an audio engine
//!
//! A [`GraphDescription`] (nodes with typed parameters plus edges) is turned
//! into a [`LiveGraph`] of engine primitives by [`build`], and tuned in place
//! by [`update`]. Topology changes are not updates: compare
//! [`TopologyKey`]s and rebuild.
//!
//! # Node Types
//!
//! | Type | Unit | Ports |
//! |------|------|-------|
//! | `input` | media source | output |
//! | `output` | destination | input |
//! | `reverb` | [`units::Reverb`] | input, output |
//! | `delay` | [`units::FeedbackDelay`] | input, output |
//! | `utility` | [`units::Utility`] | input, output |
//! | `limiter` | [`units::Limiter`] | input, output |
//! | `distortion` | [`units::Distortion`] | input, output |
//! | `tonegenerator` | [`units::ToneGenerator`] | output |
//! | `equalizer` | [`units::Equalizer`] | input, output |
//! | `phaser`, `flanger`, `bitcrusher` | [`units::Modulation`] | input, output |
//! | `spectralgate`, `spectralcompressor` | [`units::Spectral`] | input, output |
//! | `spectralpitch` | [`units::SpectralPitch`] | input, output |
//!
//! # Failure Policy
//!
//! Building is best effort. Unsupported nodes, unresolvable edges and
//! rejected connections are logged with `tracing` and skipped; the rest of
//! the graph is still wired.
//!
//! # Example
//!
//! ```rust
//! use patchrome_engine::{AudioEngine, BufferSource, MediaElement, RenderEngine, SourceId};
//! use patchrome_graph::{GraphDescription, build, register_processors};
//!
//! let mut engine = RenderEngine::new(48000.0);
//! register_processors(&mut engine);
//! let element = MediaElement::with_signal(SourceId::new(1), BufferSource::mono(vec![0.5; 256]));
//! let source = engine.create_media_source(&element).unwrap();
//! let destination = engine.destination();
//!
//! let graph = build(&mut engine, source, &GraphDescription::passthrough(), destination, true);
//! assert_eq!(graph.edges().len(), 1);
//! ```

pub mod builder;
pub mod description;
pub mod error;
pub mod live;
pub mod node_type;
pub mod params;
pub mod units;
pub mod updater;

pub use builder::{build, processor_descriptors, register_processors};
pub use description::{GraphDescription, GraphEdge, GraphNode, ParamMap, ParamValue};
pub use error::GraphError;
pub use live::{LiveGraph, LiveUnit, TopologyKey};
pub use node_type::NodeType;
pub use params::{NodeParams, Patch, defaults};
pub use units::EffectUnit;
pub use updater::{PITCH_LOCK_TOLERANCE, ParamChange, apply_speed, update};
