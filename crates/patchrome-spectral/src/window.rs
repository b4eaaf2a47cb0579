//! Analysis/synthesis windows.

use alloc::vec::Vec;
use core::f32::consts::PI;
use libm::cosf;

/// Periodic Hann window `0.5·(1 − cos(2πn/N))`.
///
/// The periodic form (denominator `N`, not `N − 1`) sums to a constant under
/// 75 % overlap, which the overlap-add resynthesis relies on.
pub fn hann(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 * (1.0 - cosf(2.0 * PI * n as f32 / size as f32)))
        .collect()
}

/// Gain of windowed analysis + windowed synthesis overlap-add at `hop`.
///
/// Equals `Σ w[n]² / hop`; 1.5 for a periodic Hann window at `hop = N/4`.
pub fn overlap_add_gain(window: &[f32], hop: usize) -> f32 {
    let energy: f32 = window.iter().map(|w| w * w).sum();
    energy / hop.max(1) as f32
}
