//! Shared CLI helpers used across multiple commands.

use std::path::Path;

use anyhow::Context;
use patchrome_graph::GraphDescription;
use patchrome_session::Settings;

/// Loads settings from a JSON file.
///
/// A file holding a bare graph description (no `audioGraph` key) is
/// accepted too and treated as enabled settings around that graph.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_settings(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parses settings JSON, falling back to a bare graph description.
pub fn parse_settings(text: &str) -> anyhow::Result<Settings> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.get("audioGraph").is_some() || value.get("enabled").is_some() {
        Ok(Settings::from_json(text)?)
    } else {
        Ok(Settings::new(GraphDescription::from_json(text)?))
    }
}

/// Settings from `path`, or the default pass-through when absent.
pub fn settings_or_default(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => load_settings(path),
        None => Ok(Settings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_graph_is_enabled_settings() {
        let text = GraphDescription::passthrough().to_json().unwrap();
        let settings = parse_settings(&text).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.audio_graph, GraphDescription::passthrough());
    }

    #[test]
    fn settings_keep_their_switch() {
        let text = Settings::default().with_enabled(false).to_json().unwrap();
        assert!(!parse_settings(&text).unwrap().enabled);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_settings("not json").is_err());
        assert!(parse_settings("{\"nodes\": 3}").is_err());
    }
}
