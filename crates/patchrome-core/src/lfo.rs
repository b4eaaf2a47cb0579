//! Phase-accumulating oscillator.
//!
//! Drives the modulated effects (phaser sweep, flanger delay) at sub-audio
//! rates and doubles as the tone-generator oscillator at audio rates.

use core::f32::consts::PI;
use core::fmt;
use core::str::FromStr;
use libm::sinf;

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Waveform {
    /// Smooth, natural modulation
    #[default]
    Sine,
    /// Binary on/off
    Square,
    /// Rising ramp, abrupt reset
    Sawtooth,
    /// Linear ramps
    Triangle,
}

impl Waveform {
    /// The lowercase name used in graph descriptions.
    pub const fn as_str(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a waveform name is not recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownWaveform;

impl fmt::Display for UnknownWaveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown waveform")
    }
}

impl FromStr for Waveform {
    type Err = UnknownWaveform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            _ => Err(UnknownWaveform),
        }
    }
}

/// Phase-accumulating oscillator.
///
/// # Example
///
/// ```rust
/// use patchrome_core::{Lfo, Waveform};
///
/// let mut lfo = Lfo::new(44100.0, 2.0); // 2 Hz
/// lfo.set_waveform(Waveform::Triangle);
///
/// // Generate modulation values in [-1.0, 1.0]
/// let value = lfo.advance();
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    waveform: Waveform,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Create new oscillator with given sample rate and frequency
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
            waveform: Waveform::Sine,
        }
    }

    /// Set frequency in Hz
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz / self.sample_rate;
    }

    /// Get current frequency in Hz
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Set waveform
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Get current waveform
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Reset phase to 0
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Get current phase (0.0 - 1.0)
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Get next value (-1.0 to 1.0)
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let output = match self.waveform {
            Waveform::Sine => sinf(self.phase * 2.0 * PI),
            Waveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };

        self.phase += self.phase_inc;
        // Audio-rate frequencies near Nyquist can step past more than one cycle
        while self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        while self.phase < 0.0 {
            self.phase += 1.0;
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_accumulation() {
        let mut lfo = Lfo::new(44100.0, 1.0);
        for _ in 0..44100 {
            lfo.advance();
        }
        let phase_error = lfo.phase.min((lfo.phase - 1.0).abs());
        assert!(phase_error < 0.01);
    }

    #[test]
    fn output_range() {
        let mut lfo = Lfo::new(44100.0, 5.0);
        for waveform in [
            Waveform::Sine,
            Waveform::Triangle,
            Waveform::Sawtooth,
            Waveform::Square,
        ] {
            lfo.set_waveform(waveform);
            for _ in 0..10000 {
                let v = lfo.advance();
                assert!((-1.0..=1.0).contains(&v), "{waveform} produced {v}");
            }
        }
    }

    #[test]
    fn audio_rate_sine_has_expected_period() {
        let mut lfo = Lfo::new(48000.0, 480.0);
        let first: Vec<f32> = (0..100).map(|_| lfo.advance()).collect();
        let second: Vec<f32> = (0..100).map(|_| lfo.advance()).collect();
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn waveform_names() {
        assert_eq!("sawtooth".parse::<Waveform>(), Ok(Waveform::Sawtooth));
        assert!("noise".parse::<Waveform>().is_err());
        assert_eq!(Waveform::Triangle.to_string(), "triangle");
    }
}
