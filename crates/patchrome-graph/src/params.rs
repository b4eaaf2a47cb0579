//! Typed parameter structs and the per-type defaults table.
//!
//! Each node type owns a struct whose [`Default`] is its row of the defaults
//! table. A struct doubles as the live unit's snapshot: the updater applies a
//! patch to a copy and acts only on the fields that differ.
//!
//! A value of the wrong JSON type never propagates. At build time the field
//! keeps its default, during an update it keeps its current value; both log a
//! warning.

use core::str::FromStr;

use patchrome_core::{BiquadType, Waveform};

use crate::description::{ParamMap, ParamValue};
use crate::node_type::NodeType;

/// Type-checked read access to one node's parameters.
#[derive(Debug, Clone, Copy)]
pub struct Patch<'a> {
    node: &'a str,
    params: &'a ParamMap,
}

impl<'a> Patch<'a> {
    /// Wraps the parameters of node `node`.
    pub fn new(node: &'a str, params: &'a ParamMap) -> Self {
        Self { node, params }
    }

    /// Node id the patch belongs to.
    pub fn node(&self) -> &'a str {
        self.node
    }

    /// Whether `key` is present at all.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// A finite number.
    pub fn number(&self, key: &str) -> Option<f32> {
        let value = self.params.get(key)?;
        value.as_f32().or_else(|| self.reject(key, value))
    }

    /// A boolean. `0` and `1` are accepted as numbers.
    pub fn flag(&self, key: &str) -> Option<bool> {
        let value = self.params.get(key)?;
        match value {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(n) if *n == 0.0 || *n == 1.0 => Some(*n != 0.0),
            _ => self.reject(key, value),
        }
    }

    /// Text.
    pub fn text(&self, key: &str) -> Option<&'a str> {
        let value = self.params.get(key)?;
        value.as_str().or_else(|| self.reject(key, value))
    }

    /// Text parsed as `T`.
    pub fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let text = self.text(key)?;
        text.parse().ok().or_else(|| {
            tracing::warn!(node = self.node, param = key, value = text, "graph: unrecognized value");
            None
        })
    }

    fn reject<T>(&self, key: &str, value: &ParamValue) -> Option<T> {
        tracing::warn!(
            node = self.node,
            param = key,
            value = %value,
            "graph: ignoring parameter of the wrong type"
        );
        None
    }
}

/// A node type's typed parameters.
pub trait NodeParams: Default + Clone + PartialEq {
    /// Overwrites every field that is present and well typed in `patch`.
    fn apply(&mut self, patch: &Patch<'_>);

    /// Every field as a parameter map.
    fn to_params(&self) -> ParamMap;

    /// Defaults overridden by `patch`.
    fn from_patch(patch: &Patch<'_>) -> Self {
        let mut params = Self::default();
        params.apply(patch);
        params
    }
}

/// Declares a struct of `f32` parameters with its defaults row.
macro_rules! numeric_params {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$fmeta:meta])* $field:ident : $key:literal = $default:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name {
            $($(#[$fmeta])* pub $field: f32,)+
        }

        impl Default for $name {
            fn default() -> Self {
                Self { $($field: $default,)+ }
            }
        }

        impl NodeParams for $name {
            fn apply(&mut self, patch: &Patch<'_>) {
                $(if let Some(v) = patch.number($key) {
                    self.$field = v;
                })+
            }

            fn to_params(&self) -> ParamMap {
                let mut map = ParamMap::new();
                $(map.insert($key.to_string(), ParamValue::from(self.$field));)+
                map
            }
        }
    };
}

numeric_params! {
    /// Input node.
    InputParams {
        /// Playback rate.
        speed: "speed" = 1.0,
    }
}

numeric_params! {
    /// Convolution reverb.
    ReverbParams {
        /// Wet percentage.
        mix: "mix" = 0.0,
        /// Decay in ms; longer decays flatten the tail envelope.
        decay: "decay" = 1000.0,
        /// 0-100, maps to a 0.1-2.0 s impulse.
        size: "size" = 50.0,
    }
}

numeric_params! {
    /// Feedback delay.
    DelayParams {
        /// Wet percentage.
        mix: "mix" = 0.0,
        /// Delay in ms.
        delay_time: "delayTime" = 500.0,
        /// Feedback percentage.
        feedback: "feedback" = 50.0,
    }
}

numeric_params! {
    /// Limiter.
    LimiterParams {
        /// Threshold in dB.
        threshold: "threshold" = -6.0,
    }
}

numeric_params! {
    /// Soft-clip distortion.
    DistortionParams {
        /// 0-100 drive.
        drive: "drive" = 50.0,
        /// Wet percentage.
        mix: "mix" = 0.0,
    }
}

numeric_params! {
    /// Phaser.
    PhaserParams {
        /// LFO rate in Hz.
        rate: "rate" = 0.5,
        /// Sweep depth percentage.
        depth: "depth" = 50.0,
        /// Feedback percentage.
        feedback: "feedback" = 0.0,
        /// Wet percentage.
        mix: "mix" = 0.0,
    }
}

numeric_params! {
    /// Flanger.
    FlangerParams {
        /// LFO rate in Hz.
        rate: "rate" = 0.5,
        /// Base delay in ms.
        delay: "delay" = 5.0,
        /// Sweep depth percentage.
        depth: "depth" = 50.0,
        /// Feedback percentage.
        feedback: "feedback" = 0.0,
        /// Wet percentage.
        mix: "mix" = 0.0,
    }
}

numeric_params! {
    /// Bitcrusher.
    BitcrusherParams {
        /// Hold rate in Hz.
        rate: "rate" = 30000.0,
        /// Bit depth.
        bits: "bits" = 8.0,
        /// Wet percentage.
        mix: "mix" = 0.0,
    }
}

numeric_params! {
    /// Spectral gate.
    SpectralGateParams {
        /// Bin magnitude cutoff in dB.
        cutoff: "cutoff" = -20.0,
        /// FFT size.
        fft_size: "fftSize" = 2048.0,
    }
}

numeric_params! {
    /// Spectral compressor.
    SpectralCompressorParams {
        /// Attack in ms.
        attack: "attack" = 30.0,
        /// Release in ms.
        release: "release" = 200.0,
        /// Pre-gain in dB.
        input_gain: "inputGain" = 10.0,
        /// Threshold in dB.
        threshold: "threshold" = -45.1,
        /// Compression ratio.
        ratio: "ratio" = 1.2,
        /// FFT size.
        fft_size: "fftSize" = 2048.0,
    }
}

numeric_params! {
    /// Spectral pitch shifter.
    SpectralPitchParams {
        /// Shift in cents.
        pitch: "pitch" = 0.0,
        /// Wet percentage.
        mix: "mix" = 100.0,
        /// FFT size.
        fft_size: "fftSize" = 2048.0,
    }
}

/// Utility: gain, pan and phase inversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilityParams {
    /// Gain in dB; at or below -60 the gain is exactly zero.
    pub volume: f32,
    /// -100 (left) to 100 (right).
    pub pan: f32,
    /// Invert the left channel.
    pub reverse_l: bool,
    /// Invert the right channel.
    pub reverse_r: bool,
}

impl Default for UtilityParams {
    fn default() -> Self {
        Self {
            volume: 0.0,
            pan: 0.0,
            reverse_l: false,
            reverse_r: false,
        }
    }
}

impl NodeParams for UtilityParams {
    fn apply(&mut self, patch: &Patch<'_>) {
        if let Some(v) = patch.number("volume") {
            self.volume = v;
        }
        if let Some(v) = patch.number("pan") {
            self.pan = v;
        }
        if let Some(v) = patch.flag("reverseL") {
            self.reverse_l = v;
        }
        if let Some(v) = patch.flag("reverseR") {
            self.reverse_r = v;
        }
    }

    fn to_params(&self) -> ParamMap {
        ParamMap::from([
            ("volume".to_string(), ParamValue::from(self.volume)),
            ("pan".to_string(), ParamValue::from(self.pan)),
            ("reverseL".to_string(), ParamValue::from(self.reverse_l)),
            ("reverseR".to_string(), ParamValue::from(self.reverse_r)),
        ])
    }
}

/// Tone generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneGeneratorParams {
    /// Oscillator shape.
    pub waveform: Waveform,
    /// Frequency in Hz.
    pub frequency: f32,
    /// Level in dB.
    pub volume: f32,
}

impl Default for ToneGeneratorParams {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency: 440.0,
            volume: -12.0,
        }
    }
}

impl NodeParams for ToneGeneratorParams {
    fn apply(&mut self, patch: &Patch<'_>) {
        if let Some(w) = patch.parsed("waveform") {
            self.waveform = w;
        }
        if let Some(v) = patch.number("frequency") {
            self.frequency = v;
        }
        if let Some(v) = patch.number("volume") {
            self.volume = v;
        }
    }

    fn to_params(&self) -> ParamMap {
        ParamMap::from([
            ("waveform".to_string(), ParamValue::from(self.waveform.as_str())),
            ("frequency".to_string(), ParamValue::from(self.frequency)),
            ("volume".to_string(), ParamValue::from(self.volume)),
        ])
    }
}

/// Equalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualizerParams {
    /// Filter response.
    pub filter_type: BiquadType,
    /// Corner or centre frequency in Hz.
    pub frequency: f32,
    /// Resonance.
    pub q: f32,
    /// Shelf or peak gain in dB.
    pub gain: f32,
}

impl Default for EqualizerParams {
    fn default() -> Self {
        Self {
            filter_type: BiquadType::Lowpass,
            frequency: 1000.0,
            q: 1.0,
            gain: 0.0,
        }
    }
}

impl NodeParams for EqualizerParams {
    fn apply(&mut self, patch: &Patch<'_>) {
        if patch.contains("filterType") {
            // Unknown names fall back to lowpass
            self.filter_type = patch.parsed("filterType").unwrap_or(BiquadType::Lowpass);
        }
        if let Some(v) = patch.number("frequency") {
            self.frequency = v;
        }
        if let Some(v) = patch.number("q") {
            self.q = v;
        }
        if let Some(v) = patch.number("gain") {
            self.gain = v;
        }
    }

    fn to_params(&self) -> ParamMap {
        ParamMap::from([
            ("filterType".to_string(), ParamValue::from(self.filter_type.as_str())),
            ("frequency".to_string(), ParamValue::from(self.frequency)),
            ("q".to_string(), ParamValue::from(self.q)),
            ("gain".to_string(), ParamValue::from(self.gain)),
        ])
    }
}

/// The defaults row for `kind`.
pub fn defaults(kind: NodeType) -> ParamMap {
    match kind {
        NodeType::Input => InputParams::default().to_params(),
        NodeType::Output => ParamMap::new(),
        NodeType::Reverb => ReverbParams::default().to_params(),
        NodeType::Delay => DelayParams::default().to_params(),
        NodeType::Utility => UtilityParams::default().to_params(),
        NodeType::Limiter => LimiterParams::default().to_params(),
        NodeType::Distortion => DistortionParams::default().to_params(),
        NodeType::ToneGenerator => ToneGeneratorParams::default().to_params(),
        NodeType::Equalizer => EqualizerParams::default().to_params(),
        NodeType::Phaser => PhaserParams::default().to_params(),
        NodeType::Flanger => FlangerParams::default().to_params(),
        NodeType::Bitcrusher => BitcrusherParams::default().to_params(),
        NodeType::SpectralGate => SpectralGateParams::default().to_params(),
        NodeType::SpectralCompressor => SpectralCompressorParams::default().to_params(),
        NodeType::SpectralPitch => SpectralPitchParams::default().to_params(),
    }
}

/// `(dry, wet)` gains for a 0-100 mix.
pub fn mix_gains(mix: f32) -> (f32, f32) {
    let wet = mix / 100.0;
    (1.0 - wet, wet)
}

/// dB to linear gain with a hard mute at or below -60 dB.
pub fn volume_gain(db: f32) -> f32 {
    if db <= -60.0 {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}
