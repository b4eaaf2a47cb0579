//! Parameter descriptors for registered block processors.
//!
//! Every block processor publishes a static table of [`ParamDescriptor`]s.
//! The table is the processor's external contract: hosts read it to learn the
//! parameter names, ranges and defaults, and the [`ParamChannel`] that feeds a
//! running processor is laid out in table order.
//!
//! With the `serde` feature a descriptor serializes to the worklet-style
//! shape:
//!
//! ```json
//! { "name": "cutoff", "defaultValue": -20.0, "minValue": -60.0,
//!   "maxValue": 24.0, "automationRate": "k-rate" }
//! ```
//!
//! # Example
//!
//! ```rust
//! use patchrome_core::{ParamDescriptor, ParamUnit};
//!
//! const CUTOFF: ParamDescriptor =
//!     ParamDescriptor::new("cutoff", ParamUnit::Decibels, -60.0, 24.0, -20.0);
//!
//! assert_eq!(CUTOFF.clamp(100.0), 24.0);
//! ```
//!
//! [`ParamChannel`]: crate::ParamChannel

/// How often a parameter value may change.
///
/// Processors in this workspace sample their parameters once per render
/// quantum, so every built-in descriptor is [`AutomationRate::KRate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutomationRate {
    /// Per-sample values.
    ARate,
    /// One value per render quantum.
    #[default]
    KRate,
}

impl AutomationRate {
    /// Host-facing name (`"a-rate"` / `"k-rate"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            AutomationRate::ARate => "a-rate",
            AutomationRate::KRate => "k-rate",
        }
    }
}

/// Units of measurement for parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamUnit {
    /// Decibels (dB) - for gain, threshold, and level parameters.
    Decibels,
    /// Hertz (Hz) - for frequency parameters like LFO rate.
    Hertz,
    /// Milliseconds (ms) - for time parameters like delay, attack, release.
    Milliseconds,
    /// Percentage (%) - for mix, depth and feedback.
    Percent,
    /// Ratio (n:1) - for compressor ratios.
    Ratio,
    /// Cents - for pitch shift amounts.
    Cents,
    /// Bits - for quantizer resolution.
    Bits,
    /// Samples - for sizes expressed in samples (FFT size).
    Samples,
    /// No unit - for dimensionless parameters.
    #[default]
    None,
}

impl ParamUnit {
    /// Returns the unit suffix string for display.
    ///
    /// ```rust
    /// use patchrome_core::ParamUnit;
    ///
    /// assert_eq!(ParamUnit::Decibels.suffix(), " dB");
    /// assert_eq!(ParamUnit::None.suffix(), "");
    /// ```
    pub const fn suffix(&self) -> &'static str {
        match self {
            ParamUnit::Decibels => " dB",
            ParamUnit::Hertz => " Hz",
            ParamUnit::Milliseconds => " ms",
            ParamUnit::Percent => "%",
            ParamUnit::Ratio => ":1",
            ParamUnit::Cents => " ct",
            ParamUnit::Bits => " bit",
            ParamUnit::Samples => " smp",
            ParamUnit::None => "",
        }
    }
}

/// Metadata describing one processor parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Parameter name as addressed by hosts (e.g. `"cutoff"`, `"fftSize"`).
    pub name: &'static str,
    /// Unit type for formatting the parameter value.
    pub unit: ParamUnit,
    /// Minimum allowed value.
    pub min: f32,
    /// Maximum allowed value.
    pub max: f32,
    /// Value a fresh processor starts with.
    pub default: f32,
    /// Automation rate advertised to hosts.
    pub automation_rate: AutomationRate,
}

impl ParamDescriptor {
    /// Creates a k-rate descriptor.
    pub const fn new(
        name: &'static str,
        unit: ParamUnit,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            unit,
            min,
            max,
            default,
            automation_rate: AutomationRate::KRate,
        }
    }

    /// 0-100 % wet/dry mix.
    pub const fn mix(default: f32) -> Self {
        Self::new("mix", ParamUnit::Percent, 0.0, 100.0, default)
    }

    /// Overrides the automation rate.
    pub const fn with_automation_rate(mut self, rate: AutomationRate) -> Self {
        self.automation_rate = rate;
        self
    }

    /// Clamps `value` into `[min, max]`. NaN maps to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ParamDescriptor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("ParamDescriptor", 5)?;
        s.serialize_field("name", self.name)?;
        s.serialize_field("defaultValue", &self.default)?;
        s.serialize_field("minValue", &self.min)?;
        s.serialize_field("maxValue", &self.max)?;
        s.serialize_field("automationRate", self.automation_rate.as_str())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_range() {
        let d = ParamDescriptor::new("ratio", ParamUnit::Ratio, 0.5, 1.5, 1.2);
        assert_eq!(d.clamp(0.0), 0.5);
        assert_eq!(d.clamp(3.0), 1.5);
        assert_eq!(d.clamp(1.0), 1.0);
        assert_eq!(d.clamp(f32::NAN), 1.2);
    }

    #[test]
    fn mix_shortcut() {
        let d = ParamDescriptor::mix(100.0);
        assert_eq!(d.name, "mix");
        assert_eq!((d.min, d.max, d.default), (0.0, 100.0, 100.0));
        assert_eq!(d.automation_rate, AutomationRate::KRate);
    }

    #[test]
    fn automation_rate_names() {
        assert_eq!(AutomationRate::ARate.as_str(), "a-rate");
        assert_eq!(AutomationRate::KRate.as_str(), "k-rate");
    }
}
