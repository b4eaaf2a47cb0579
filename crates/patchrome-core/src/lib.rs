//! Patchrome Core - DSP primitives and the block-processor contract
//!
//! This crate provides the building blocks shared by every patchrome audio
//! crate, designed for real-time processing with zero allocation in the audio
//! path.
//!
//! # Core Abstractions
//!
//! ## Block Processing
//!
//! - [`BlockProcessor`] - Object-safe trait for custom block processors (the
//!   spectral effects, phaser, flanger and bitcrusher)
//! - [`ProcessorDescriptor`] - Registration record: processor name, parameter
//!   table and factory
//! - [`ParamChannel`] - Lock-free parameter store written by the control thread
//!   and sampled once per block by the audio thread
//!
//! ## Parameters
//!
//! - [`ParamDescriptor`] - Name, range, default and automation rate of one
//!   processor parameter
//!
//! ## Filters, Delays, Oscillators
//!
//! - [`Biquad`] / [`BiquadType`] - Second-order IIR filter with the eight RBJ
//!   cookbook responses
//! - [`InterpolatedDelay`] - Variable-length delay with linear interpolation
//! - [`Lfo`] / [`Waveform`] - Phase-accumulating oscillator
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`lerp`],
//!   [`flush_denormal`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! patchrome-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations in audio processing paths
//! - **No dependencies on std**: Pure `no_std` with `libm` for math
//! - **Object-safe traits**: Processors are registered and created by name

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod biquad;
pub mod delay;
pub mod lfo;
pub mod math;
pub mod param_channel;
pub mod param_info;
pub mod processor;

// Re-export main types at crate root
pub use biquad::{Biquad, BiquadType, Coefficients, coefficients};
pub use delay::InterpolatedDelay;
pub use lfo::{Lfo, Waveform};
pub use math::{db_to_linear, flush_denormal, lerp, linear_to_db, ms_to_samples};
pub use param_channel::ParamChannel;
pub use param_info::{AutomationRate, ParamDescriptor, ParamUnit};
pub use processor::{BlockProcessor, ProcessorDescriptor, ProcessorFactory, RENDER_QUANTUM};
