//! Primitive node descriptions and their settable values.
//!
//! A [`Primitive`] is what the graph layer asks an engine to create. Values
//! that change later go through [`AudioParam`] (numbers) or [`NodeOption`]
//! (enumerated settings); everything else is fixed at creation.

use core::fmt;

use patchrome_core::{BiquadType, Waveform};

/// Wave-shaper oversampling factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversample {
    /// Shape at the base rate.
    #[default]
    None,
    /// Shape at twice the base rate.
    X2,
    /// Shape at four times the base rate.
    X4,
}

impl Oversample {
    /// Oversampling factor as a multiplier.
    pub const fn factor(self) -> usize {
        match self {
            Self::None => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }
}

/// A signal-processing primitive the engine can instantiate.
///
/// Times are in seconds, levels in dB and frequencies in Hz, matching the
/// conventions of browser audio graphs.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Linear gain.
    Gain {
        /// Linear multiplier.
        gain: f32,
    },
    /// Second-order IIR filter.
    BiquadFilter {
        /// Response type.
        kind: BiquadType,
        /// Centre or corner frequency.
        frequency: f32,
        /// Resonance (dB for low/highpass, bandwidth Q otherwise).
        q: f32,
        /// Shelf or peak gain in dB.
        gain: f32,
    },
    /// FFT convolution against an impulse response.
    Convolver {
        /// One buffer per channel; a single buffer is used for both channels.
        impulse: Vec<Vec<f32>>,
        /// Apply equal-power normalisation to the impulse.
        normalize: bool,
    },
    /// Variable delay line.
    Delay {
        /// Longest delay the line can hold.
        max_seconds: f32,
        /// Initial delay.
        delay_seconds: f32,
    },
    /// Feed-forward compressor.
    DynamicsCompressor {
        /// Threshold in dB.
        threshold: f32,
        /// Knee width in dB.
        knee: f32,
        /// Compression ratio.
        ratio: f32,
        /// Attack time in seconds.
        attack: f32,
        /// Release time in seconds.
        release: f32,
    },
    /// Free-running oscillator. Silent until started.
    Oscillator {
        /// Wave shape.
        waveform: Waveform,
        /// Frequency in Hz.
        frequency: f32,
    },
    /// Transfer-curve distortion.
    WaveShaper {
        /// Curve sampled over `[-1, 1]`; empty means pass-through.
        curve: Vec<f32>,
        /// Oversampling applied around the curve lookup.
        oversample: Oversample,
    },
    /// One stereo input to two outputs, one per channel.
    ChannelSplitter,
    /// Two inputs to one stereo output, one input per channel.
    ChannelMerger,
    /// Equal-power stereo panner.
    StereoPanner {
        /// Position in `[-1, 1]`.
        pan: f32,
    },
    /// Registered block processor.
    Worklet {
        /// Name the processor was registered under.
        processor: &'static str,
        /// Initial parameter values by name.
        params: Vec<(&'static str, f32)>,
    },
}

impl Primitive {
    /// Short type name, for logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Gain { .. } => "gain",
            Self::BiquadFilter { .. } => "biquad",
            Self::Convolver { .. } => "convolver",
            Self::Delay { .. } => "delay",
            Self::DynamicsCompressor { .. } => "compressor",
            Self::Oscillator { .. } => "oscillator",
            Self::WaveShaper { .. } => "waveshaper",
            Self::ChannelSplitter => "splitter",
            Self::ChannelMerger => "merger",
            Self::StereoPanner { .. } => "panner",
            Self::Worklet { .. } => "worklet",
        }
    }

    /// Number of input ports.
    pub fn input_count(&self) -> usize {
        match self {
            Self::Oscillator { .. } => 0,
            Self::ChannelMerger => 2,
            _ => 1,
        }
    }

    /// Number of output ports.
    pub fn output_count(&self) -> usize {
        match self {
            Self::ChannelSplitter => 2,
            _ => 1,
        }
    }
}

/// A numeric value that can change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioParam {
    /// Gain multiplier.
    Gain,
    /// Filter or oscillator frequency.
    Frequency,
    /// Filter Q.
    Q,
    /// Filter shelf/peak gain.
    FilterGain,
    /// Delay time in seconds.
    DelayTime,
    /// Panner position.
    Pan,
    /// Compressor threshold.
    Threshold,
    /// Compressor knee.
    Knee,
    /// Compressor ratio.
    Ratio,
    /// Compressor attack.
    Attack,
    /// Compressor release.
    Release,
    /// Named parameter of a worklet processor.
    Processor(&'static str),
}

impl AudioParam {
    /// Parameter name as used in browser audio graphs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gain => "gain",
            Self::Frequency => "frequency",
            Self::Q => "Q",
            Self::FilterGain => "filterGain",
            Self::DelayTime => "delayTime",
            Self::Pan => "pan",
            Self::Threshold => "threshold",
            Self::Knee => "knee",
            Self::Ratio => "ratio",
            Self::Attack => "attack",
            Self::Release => "release",
            Self::Processor(name) => name,
        }
    }
}

impl fmt::Display for AudioParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-numeric setting that can change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOption {
    /// Biquad response type.
    FilterType(BiquadType),
    /// Oscillator wave shape.
    Waveform(Waveform),
}

impl NodeOption {
    /// Option name, for errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::FilterType(_) => "type",
            Self::Waveform(_) => "waveform",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_counts() {
        assert_eq!(Primitive::ChannelSplitter.output_count(), 2);
        assert_eq!(Primitive::ChannelMerger.input_count(), 2);
        let osc = Primitive::Oscillator {
            waveform: Waveform::Sine,
            frequency: 440.0,
        };
        assert_eq!(osc.input_count(), 0);
        assert_eq!(osc.output_count(), 1);
        assert_eq!(Primitive::Gain { gain: 1.0 }.input_count(), 1);
    }

    #[test]
    fn param_names() {
        assert_eq!(AudioParam::DelayTime.to_string(), "delayTime");
        assert_eq!(AudioParam::Processor("cutoff").to_string(), "cutoff");
        assert_eq!(Oversample::X4.factor(), 4);
    }
}
