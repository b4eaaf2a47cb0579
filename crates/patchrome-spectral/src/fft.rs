//! In-place iterative radix-2 FFT.
//!
//! Operates on split real/imaginary arrays. The forward transform uses the
//! `e^{-2πik/N}` kernel with no scaling; the inverse uses the conjugate kernel
//! and scales by `1/N`, so `inverse(forward(x)) == x` up to rounding.
//!
//! Twiddle factors and the bit-reversal permutation are computed once per
//! size in [`Fft::new`]; transforms never allocate.

use alloc::vec::Vec;
use core::f32::consts::PI;
use libm::{cosf, sinf};

/// Precomputed radix-2 FFT plan for one size.
#[derive(Debug, Clone)]
pub struct Fft {
    size: usize,
    /// `cos(-2πk/N)` for `k < N/2`
    twiddle_re: Vec<f32>,
    /// `sin(-2πk/N)` for `k < N/2`
    twiddle_im: Vec<f32>,
    bit_reverse: Vec<u32>,
}

impl Fft {
    /// Builds a plan for `size` points.
    ///
    /// Sizes that are not a power of two are rounded up to the next one; the
    /// minimum size is 2.
    pub fn new(size: usize) -> Self {
        let size = size.max(2).next_power_of_two();
        let bits = size.trailing_zeros();

        let half = size / 2;
        let mut twiddle_re = Vec::with_capacity(half);
        let mut twiddle_im = Vec::with_capacity(half);
        for k in 0..half {
            let angle = -2.0 * PI * k as f32 / size as f32;
            twiddle_re.push(cosf(angle));
            twiddle_im.push(sinf(angle));
        }

        let bit_reverse = (0..size as u32)
            .map(|i| i.reverse_bits() >> (32 - bits))
            .collect();

        Self {
            size,
            twiddle_re,
            twiddle_im,
            bit_reverse,
        }
    }

    /// Transform length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform in place.
    ///
    /// Both slices must hold at least [`size`](Self::size) elements; only the
    /// first `size` are transformed.
    pub fn forward(&self, re: &mut [f32], im: &mut [f32]) {
        self.transform(re, im, false);
    }

    /// Inverse transform in place, including the `1/N` scaling.
    pub fn inverse(&self, re: &mut [f32], im: &mut [f32]) {
        self.transform(re, im, true);
        let scale = 1.0 / self.size as f32;
        for (r, i) in re[..self.size].iter_mut().zip(im[..self.size].iter_mut()) {
            *r *= scale;
            *i *= scale;
        }
    }

    fn transform(&self, re: &mut [f32], im: &mut [f32], inverse: bool) {
        let n = self.size;
        let re = &mut re[..n];
        let im = &mut im[..n];

        for (i, &j) in self.bit_reverse.iter().enumerate() {
            let j = j as usize;
            if j > i {
                re.swap(i, j);
                im.swap(i, j);
            }
        }

        let sign = if inverse { -1.0 } else { 1.0 };
        let mut span = 2;
        while span <= n {
            let half = span / 2;
            let stride = n / span;
            for start in (0..n).step_by(span) {
                for k in 0..half {
                    let w_re = self.twiddle_re[k * stride];
                    let w_im = sign * self.twiddle_im[k * stride];

                    let even = start + k;
                    let odd = even + half;

                    let t_re = w_re * re[odd] - w_im * im[odd];
                    let t_im = w_re * im[odd] + w_im * re[odd];

                    re[odd] = re[even] - t_re;
                    im[odd] = im[even] - t_im;
                    re[even] += t_re;
                    im[even] += t_im;
                }
            }
            span *= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn rounds_up_to_power_of_two() {
        assert_eq!(Fft::new(1000).size(), 1024);
        assert_eq!(Fft::new(0).size(), 2);
        assert_eq!(Fft::new(512).size(), 512);
    }

    #[test]
    fn impulse_is_flat() {
        let fft = Fft::new(16);
        let mut re = vec![0.0; 16];
        let mut im = vec![0.0; 16];
        re[0] = 1.0;
        fft.forward(&mut re, &mut im);
        for k in 0..16 {
            assert!((re[k] - 1.0).abs() < 1e-6);
            assert!(im[k].abs() < 1e-6);
        }
    }

    #[test]
    fn cosine_lands_in_its_bin() {
        let n = 64;
        let fft = Fft::new(n);
        let mut re: Vec<f32> = (0..n)
            .map(|i| cosf(2.0 * PI * 5.0 * i as f32 / n as f32))
            .collect();
        let mut im = vec![0.0; n];
        fft.forward(&mut re, &mut im);
        assert!((re[5] - n as f32 / 2.0).abs() < 1e-3);
        assert!((re[n - 5] - n as f32 / 2.0).abs() < 1e-3);
        assert!(re[6].abs() < 1e-3);
    }

    #[test]
    fn round_trip() {
        let fft = Fft::new(256);
        let original: Vec<f32> = (0..256).map(|i| sinf(i as f32 * 0.37) * 0.8).collect();
        let mut re = original.clone();
        let mut im = vec![0.0; 256];
        fft.forward(&mut re, &mut im);
        fft.inverse(&mut re, &mut im);
        for (a, b) in re.iter().zip(&original) {
            assert!((a - b).abs() < 1e-5);
        }
        assert!(im.iter().all(|v| v.abs() < 1e-5));
    }
}
