//! Patchrome Spectral - frequency-domain block processors
//!
//! Three effects have no counterpart among the engine's built-in primitives
//! and are implemented as [`BlockProcessor`]s on top of a shared STFT
//! overlap-add engine:
//!
//! | Processor | Transform |
//! |-----------|-----------|
//! | [`SpectralGate`] | zero bins below a magnitude cutoff |
//! | [`SpectralCompressor`] | per-bin compression with attack/release smoothing |
//! | [`SpectralPitch`] | phase-vocoder pitch shift with dry/wet mix |
//!
//! # Building Blocks
//!
//! - [`Fft`] - in-place radix-2 FFT with precomputed twiddles
//! - [`window::hann`] - periodic Hann window
//! - [`StftEngine`] - streaming analysis/transform/resynthesis for any
//!   [`SpectralTransform`], accepting blocks of any length
//!
//! # Registration
//!
//! [`DESCRIPTORS`] lists the three processors with their parameter tables, in
//! the form the engine's processor registry expects.
//!
//! [`BlockProcessor`]: patchrome_core::BlockProcessor

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod compressor;
pub mod fft;
pub mod gate;
pub mod pitch;
pub mod stft;
pub mod window;

pub use compressor::{CompressorTransform, SpectralCompressor};
pub use fft::Fft;
pub use gate::{GateTransform, SpectralGate};
pub use pitch::{PitchTransform, SpectralPitch};
pub use stft::{
    DEFAULT_FFT_SIZE, FFT_SIZES, FrameInfo, Identity, SpectralTransform, StftEngine, snap_fft_size,
};

use patchrome_core::{ParamDescriptor, ParamUnit, ProcessorDescriptor};

/// Channels every spectral processor keeps state for.
pub const CHANNELS: usize = 2;

/// Shared `fftSize` parameter descriptor.
pub const fn fft_size_param() -> ParamDescriptor {
    ParamDescriptor::new(
        "fftSize",
        ParamUnit::Samples,
        FFT_SIZES[0] as f32,
        FFT_SIZES[FFT_SIZES.len() - 1] as f32,
        DEFAULT_FFT_SIZE as f32,
    )
}

/// Registration records for the spectral processors.
pub static DESCRIPTORS: [&ProcessorDescriptor; 3] = [
    &gate::DESCRIPTOR,
    &compressor::DESCRIPTOR,
    &pitch::DESCRIPTOR,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_names() {
        let names: alloc::vec::Vec<&str> = DESCRIPTORS.iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "spectral-gate-processor",
                "spectral-compressor-processor",
                "spectral-pitch-processor"
            ]
        );
    }

    #[test]
    fn every_table_carries_fft_size() {
        for d in DESCRIPTORS {
            let p = d.param("fftSize").unwrap();
            assert_eq!((p.min, p.max, p.default), (512.0, 32768.0, 2048.0));
        }
    }
}
