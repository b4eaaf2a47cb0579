//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings an engine and its session are created with.
///
/// Every field has a default, so an empty file is a valid configuration.
///
/// # TOML Format
///
/// ```toml
/// sample_rate = 44100.0
/// render_quantum = 256
/// poll_interval_ms = 50
/// max_delay_seconds = 180.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine sample rate in Hz.
    pub sample_rate: f32,
    /// Frames handed to the engine per host callback.
    pub render_quantum: usize,
    /// Interval of the playback enforcer's poll.
    pub poll_interval_ms: u64,
    /// Upper bound on any delay line an engine allocates.
    pub max_delay_seconds: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            render_quantum: 128,
            poll_interval_ms: 50,
            max_delay_seconds: 180.0,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects values no engine can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::invalid("sample_rate", "must be positive"));
        }
        if self.render_quantum == 0 {
            return Err(ConfigError::invalid("render_quantum", "must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval_ms", "must be at least 1"));
        }
        if !(self.max_delay_seconds.is_finite() && self.max_delay_seconds >= 0.0) {
            return Err(ConfigError::invalid("max_delay_seconds", "must be non-negative"));
        }
        Ok(())
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = EngineConfig::from_toml("sample_rate = 44100.0\nrender_quantum = 512").unwrap();
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.render_quantum, 512);
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("engine.toml");
        let config = EngineConfig {
            poll_interval_ms: 20,
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = EngineConfig::load(temp_dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_toml("sample_rate = 0.0"),
            Err(ConfigError::Invalid { field: "sample_rate", .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml("poll_interval_ms = 0"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml("render_quantum = \"big\""),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
