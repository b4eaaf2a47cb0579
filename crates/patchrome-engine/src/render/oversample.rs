//! Wave-shaper with optional oversampling around the curve lookup.
//!
//! Upsampling interpolates linearly between the previous and current input;
//! downsampling runs a 16-tap windowed-sinc FIR and keeps the last sample of
//! each group (decimation).

use crate::primitive::Oversample;

const FILTER_TAPS: usize = 16;

/// Largest supported factor.
const MAX_FACTOR: usize = 4;

/// Half-band lowpass, cutoff 0.4 × oversampled Nyquist.
#[allow(clippy::excessive_precision)]
#[rustfmt::skip]
static COEFFS_2X: [f32; FILTER_TAPS] = [
    -0.00152541,  0.00000000,  0.01309369,  0.00000000,
    -0.05738920,  0.00000000,  0.29581875,  0.50000434,
     0.29581875,  0.00000000, -0.05738920,  0.00000000,
     0.01309369,  0.00000000, -0.00152541,  0.00000000,
];

/// Lowpass, cutoff 0.2 × oversampled Nyquist.
#[allow(clippy::excessive_precision)]
#[rustfmt::skip]
static COEFFS_4X: [f32; FILTER_TAPS] = [
    0.0018645282, 0.0068257641, 0.0172712655, 0.0342604001,
    0.0571166576, 0.0830896230, 0.1078345458, 0.1260221675,
    0.1332946246, 0.1260221675, 0.1078345458, 0.0830896230,
    0.0571166576, 0.0342604001, 0.0172712655, 0.0068257641,
];

/// Looks `x` up on a curve sampled over `[-1, 1]`.
///
/// The fractional index is `(len − 1)·(x + 1)/2`, clamped to the curve, with
/// linear interpolation between neighbours. An empty curve passes `x`.
#[inline]
pub fn shape(curve: &[f32], x: f32) -> f32 {
    match curve.len() {
        0 => x,
        1 => curve[0],
        len => {
            let last = (len - 1) as f32;
            let pos = (last * (x + 1.0) * 0.5).clamp(0.0, last);
            let i = pos as usize;
            let frac = pos - i as f32;
            let a = curve[i];
            let b = curve[(i + 1).min(len - 1)];
            a + (b - a) * frac
        }
    }
}

/// Per-channel oversampling state.
#[derive(Debug, Clone)]
pub(crate) struct Oversampler {
    factor: usize,
    prev_sample: f32,
    downsample_state: [f32; FILTER_TAPS],
    work_buffer: [f32; MAX_FACTOR],
}

impl Oversampler {
    pub(crate) fn new(oversample: Oversample) -> Self {
        Self {
            factor: oversample.factor(),
            prev_sample: 0.0,
            downsample_state: [0.0; FILTER_TAPS],
            work_buffer: [0.0; MAX_FACTOR],
        }
    }

    fn coefficients(&self) -> &'static [f32; FILTER_TAPS] {
        if self.factor == 2 { &COEFFS_2X } else { &COEFFS_4X }
    }

    /// Shapes one input sample through the curve at the oversampled rate.
    #[inline]
    pub(crate) fn process(&mut self, curve: &[f32], input: f32) -> f32 {
        if self.factor == 1 {
            return shape(curve, input);
        }

        let step = 1.0 / self.factor as f32;
        for i in 0..self.factor {
            let t = (i as f32 + 1.0) * step;
            let upsampled = self.prev_sample + t * (input - self.prev_sample);
            self.work_buffer[i] = shape(curve, upsampled);
        }
        self.prev_sample = input;

        let coeffs = self.coefficients();
        let mut output = 0.0;
        for i in 0..self.factor {
            self.downsample_state.copy_within(0..FILTER_TAPS - 1, 1);
            self.downsample_state[0] = self.work_buffer[i];
            if i == self.factor - 1 {
                output = self
                    .downsample_state
                    .iter()
                    .zip(coeffs)
                    .map(|(s, c)| s * c)
                    .sum();
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_lookup_interpolates() {
        let curve = [-1.0, 0.0, 1.0];
        assert_eq!(shape(&curve, -1.0), -1.0);
        assert_eq!(shape(&curve, 0.0), 0.0);
        assert_eq!(shape(&curve, 0.5), 0.5);
        assert_eq!(shape(&curve, 3.0), 1.0);
        assert_eq!(shape(&[], 0.3), 0.3);
        assert_eq!(shape(&[0.25], 0.9), 0.25);
    }

    #[test]
    fn oversampled_identity_settles_to_dc() {
        let identity = [-1.0, 1.0];
        for factor in [Oversample::X2, Oversample::X4] {
            let mut os = Oversampler::new(factor);
            let mut out = 0.0;
            for _ in 0..64 {
                out = os.process(&identity, 0.5);
            }
            assert!((out - 0.5).abs() < 0.01, "{factor:?}: {out}");
        }
    }
}
