//! Biquad (bi-quadratic) filter structure.
//!
//! Provides a generic second-order IIR filter that can be configured
//! for the eight filter responses a browser-style `BiquadFilterNode` offers.
//!
//! Coefficient calculation uses the RBJ Audio EQ Cookbook formulas with the
//! Web Audio conventions for `Q`:
//!
//! | Type | `Q` meaning | Uses `gain` |
//! |------|-------------|-------------|
//! | lowpass, highpass | resonance in dB | no |
//! | bandpass, notch, allpass | linear quality factor | no |
//! | peaking | linear quality factor | yes |
//! | lowshelf, highshelf | ignored (shelf slope 1) | yes |

use core::f32::consts::{PI, SQRT_2};
use core::fmt;
use core::str::FromStr;
use libm::{cosf, powf, sinf, sqrtf};

/// Normalized-ready biquad coefficients `(b0, b1, b2, a0, a1, a2)`.
pub type Coefficients = (f32, f32, f32, f32, f32, f32);

/// Generic biquad filter coefficients and state.
///
/// Implements the Direct Form I biquad structure:
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    /// Input delay line: x[n-1], x[n-2]
    x1: f32,
    x2: f32,

    /// Output delay line: y[n-1], y[n-2]
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a new biquad with passthrough coefficients.
    ///
    /// Initial state: `y[n] = x[n]` (no filtering)
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Sets the biquad coefficients.
    ///
    /// Normalizes by `a0` internally.
    pub fn set_coefficients(&mut self, b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }

    /// Applies a coefficient tuple from [`coefficients`].
    pub fn set(&mut self, c: Coefficients) {
        self.set_coefficients(c.0, c.1, c.2, c.3, c.4, c.5);
    }

    /// Processes a single sample through the biquad filter.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = crate::flush_denormal(output);

        output
    }

    /// Clears the filter state (delay lines).
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter response of a [`Biquad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BiquadType {
    /// Second-order low-pass.
    #[default]
    Lowpass,
    /// Second-order high-pass.
    Highpass,
    /// Constant 0 dB peak band-pass.
    Bandpass,
    /// Low shelf (boost/cut below the corner).
    Lowshelf,
    /// High shelf (boost/cut above the corner).
    Highshelf,
    /// Peaking EQ bell.
    Peaking,
    /// Band-reject.
    Notch,
    /// Unity-magnitude phase shifter.
    Allpass,
}

impl BiquadType {
    /// All filter types in their canonical order.
    pub const ALL: [BiquadType; 8] = [
        BiquadType::Lowpass,
        BiquadType::Highpass,
        BiquadType::Bandpass,
        BiquadType::Lowshelf,
        BiquadType::Highshelf,
        BiquadType::Peaking,
        BiquadType::Notch,
        BiquadType::Allpass,
    ];

    /// The lowercase name used in graph descriptions.
    pub const fn as_str(self) -> &'static str {
        match self {
            BiquadType::Lowpass => "lowpass",
            BiquadType::Highpass => "highpass",
            BiquadType::Bandpass => "bandpass",
            BiquadType::Lowshelf => "lowshelf",
            BiquadType::Highshelf => "highshelf",
            BiquadType::Peaking => "peaking",
            BiquadType::Notch => "notch",
            BiquadType::Allpass => "allpass",
        }
    }
}

impl fmt::Display for BiquadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a filter type name is not recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownFilterType;

impl fmt::Display for UnknownFilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown filter type")
    }
}

impl FromStr for BiquadType {
    type Err = UnknownFilterType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BiquadType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(UnknownFilterType)
    }
}

/// Calculates coefficients for any [`BiquadType`].
///
/// `frequency` is clamped to `[10, 0.49 * sample_rate]` so the bilinear
/// transform stays well conditioned.
///
/// # Arguments
///
/// * `kind` - Filter response
/// * `frequency` - Cutoff/center frequency in Hz
/// * `q` - Quality factor (dB for lowpass/highpass, see module table)
/// * `gain_db` - Gain for peaking and shelving types
/// * `sample_rate` - Sample rate in Hz
pub fn coefficients(
    kind: BiquadType,
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> Coefficients {
    let frequency = frequency.clamp(10.0, sample_rate * 0.49);
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cosf(omega);
    let sin_omega = sinf(omega);

    match kind {
        BiquadType::Lowpass | BiquadType::Highpass => {
            let alpha = sin_omega / (2.0 * powf(10.0, q / 20.0));
            let (b0, b1) = if kind == BiquadType::Lowpass {
                ((1.0 - cos_omega) / 2.0, 1.0 - cos_omega)
            } else {
                ((1.0 + cos_omega) / 2.0, -(1.0 + cos_omega))
            };
            (b0, b1, b0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
        }
        BiquadType::Bandpass => {
            let alpha = sin_omega / (2.0 * q.max(1e-4));
            (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
        }
        BiquadType::Notch => {
            let alpha = sin_omega / (2.0 * q.max(1e-4));
            (
                1.0,
                -2.0 * cos_omega,
                1.0,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            )
        }
        BiquadType::Allpass => {
            let alpha = sin_omega / (2.0 * q.max(1e-4));
            (
                1.0 - alpha,
                -2.0 * cos_omega,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            )
        }
        BiquadType::Peaking => {
            let a = powf(10.0, gain_db / 40.0);
            let alpha = sin_omega / (2.0 * q.max(1e-4));
            (
                1.0 + alpha * a,
                -2.0 * cos_omega,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_omega,
                1.0 - alpha / a,
            )
        }
        BiquadType::Lowshelf => {
            let a = powf(10.0, gain_db / 40.0);
            // Shelf slope S = 1
            let two_sqrt_a_alpha = 2.0 * sqrtf(a) * (sin_omega / 2.0 * SQRT_2);
            (
                a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                (a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha,
            )
        }
        BiquadType::Highshelf => {
            let a = powf(10.0, gain_db / 40.0);
            let two_sqrt_a_alpha = 2.0 * sqrtf(a) * (sin_omega / 2.0 * SQRT_2);
            (
                a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
            )
        }
    }
}
