//! Patchrome Effects - modulated and lo-fi block processors
//!
//! The phaser, flanger and bitcrusher units run as custom processors inside
//! the graph. Each produces only its wet signal; the graph owns the input,
//! dry and wet gains and sums the two paths.
//!
//! | Processor | Name |
//! |-----------|------|
//! | [`Phaser`] | `phaser-processor` |
//! | [`Flanger`] | `flanger-processor` |
//! | [`Bitcrusher`] | `bitcrusher-processor` |
//!
//! Processors keep state for up to [`CHANNELS`] channels; any further input
//! channels are ignored and their outputs left untouched.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod bitcrusher;
pub mod flanger;
pub mod phaser;

pub use bitcrusher::Bitcrusher;
pub use flanger::Flanger;
pub use phaser::Phaser;

use patchrome_core::ProcessorDescriptor;

/// Channels every effect processor keeps state for.
pub const CHANNELS: usize = 2;

/// Registration records for the effect processors.
pub static DESCRIPTORS: [&ProcessorDescriptor; 3] = [
    &phaser::DESCRIPTOR,
    &flanger::DESCRIPTOR,
    &bitcrusher::DESCRIPTOR,
];

/// Walks the common channels frame by frame.
///
/// `f` receives the input samples of one frame and overwrites them with the
/// output samples. Only channels present on both sides (capped at
/// [`CHANNELS`]) are visited, up to the shortest channel length.
pub(crate) fn for_each_frame(
    inputs: &[&[f32]],
    outputs: &mut [&mut [f32]],
    mut f: impl FnMut(&mut [f32]),
) {
    let channels = inputs.len().min(outputs.len()).min(CHANNELS);
    if channels == 0 {
        return;
    }
    let len = inputs[..channels]
        .iter()
        .map(|c| c.len())
        .chain(outputs[..channels].iter().map(|c| c.len()))
        .min()
        .unwrap_or(0);

    let mut frame = [0.0_f32; CHANNELS];
    for i in 0..len {
        for ch in 0..channels {
            frame[ch] = inputs[ch][i];
        }
        f(&mut frame[..channels]);
        for ch in 0..channels {
            outputs[ch][i] = frame[ch];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_names() {
        let names: alloc::vec::Vec<&str> = DESCRIPTORS.iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            ["phaser-processor", "flanger-processor", "bitcrusher-processor"]
        );
    }

    #[test]
    fn frames_visit_common_channels_only() {
        let a = [1.0_f32, 2.0, 3.0];
        let b = [10.0_f32, 20.0];
        let mut out_a = [0.0_f32; 3];
        let mut out_b = [0.0_f32; 3];
        let inputs: [&[f32]; 2] = [&a, &b];
        let mut outputs: [&mut [f32]; 2] = [&mut out_a, &mut out_b];
        let mut frames = 0;
        for_each_frame(&inputs, &mut outputs, |frame| {
            frames += 1;
            for s in frame.iter_mut() {
                *s *= 2.0;
            }
        });
        assert_eq!(frames, 2);
        assert_eq!(out_a, [2.0, 4.0, 0.0]);
        assert_eq!(out_b, [20.0, 40.0, 0.0]);
    }
}
