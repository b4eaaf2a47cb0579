//! The closed set of node types a graph description may declare.

use core::fmt;
use core::str::FromStr;

/// Type tag of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Wraps the media source.
    Input,
    /// Wraps the destination.
    Output,
    /// Convolution reverb with a synthetic impulse.
    Reverb,
    /// Feedback delay.
    Delay,
    /// Gain, pan and per-channel phase inversion.
    Utility,
    /// Hard-knee brickwall compressor.
    Limiter,
    /// Soft-clipping wave shaper.
    Distortion,
    /// Free-running oscillator.
    ToneGenerator,
    /// Single biquad filter.
    Equalizer,
    /// Swept all-pass phaser.
    Phaser,
    /// Modulated comb flanger.
    Flanger,
    /// Sample-rate and bit-depth reducer.
    Bitcrusher,
    /// Per-bin noise gate.
    SpectralGate,
    /// Per-bin compressor.
    SpectralCompressor,
    /// Phase-vocoder pitch shifter.
    SpectralPitch,
}

impl NodeType {
    /// Every node type.
    pub const ALL: [NodeType; 15] = [
        NodeType::Input,
        NodeType::Output,
        NodeType::Reverb,
        NodeType::Delay,
        NodeType::Utility,
        NodeType::Limiter,
        NodeType::Distortion,
        NodeType::ToneGenerator,
        NodeType::Equalizer,
        NodeType::Phaser,
        NodeType::Flanger,
        NodeType::Bitcrusher,
        NodeType::SpectralGate,
        NodeType::SpectralCompressor,
        NodeType::SpectralPitch,
    ];

    /// Name used in graph descriptions.
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeType::Input => "input",
            NodeType::Output => "output",
            NodeType::Reverb => "reverb",
            NodeType::Delay => "delay",
            NodeType::Utility => "utility",
            NodeType::Limiter => "limiter",
            NodeType::Distortion => "distortion",
            NodeType::ToneGenerator => "tonegenerator",
            NodeType::Equalizer => "equalizer",
            NodeType::Phaser => "phaser",
            NodeType::Flanger => "flanger",
            NodeType::Bitcrusher => "bitcrusher",
            NodeType::SpectralGate => "spectralgate",
            NodeType::SpectralCompressor => "spectralcompressor",
            NodeType::SpectralPitch => "spectralpitch",
        }
    }

    /// Whether this is an effect rather than a terminal.
    pub const fn is_effect(self) -> bool {
        !matches!(self, NodeType::Input | NodeType::Output)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a node type name is not recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownNodeType;

impl fmt::Display for UnknownNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown node type")
    }
}

impl std::error::Error for UnknownNodeType {}

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(UnknownNodeType)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for t in NodeType::ALL {
            assert_eq!(t.as_str().parse::<NodeType>(), Ok(t));
        }
        assert_eq!("chorus".parse::<NodeType>(), Err(UnknownNodeType));
    }

    #[test]
    fn terminals_are_not_effects() {
        let effects = NodeType::ALL.iter().filter(|t| t.is_effect()).count();
        assert_eq!(effects, 13);
        assert!(!NodeType::Input.is_effect());
    }
}
