//! User settings and how a change between two of them is applied.

use std::path::Path;

use patchrome_graph::params::InputParams;
use patchrome_graph::{GraphDescription, NodeParams, NodeType, ParamChange, Patch, TopologyKey};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

fn enabled_by_default() -> bool {
    true
}

/// The settings the session applies to every attachment.
///
/// ```json
/// { "enabled": true, "audioGraph": { "nodes": [...], "edges": [...] } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Global switch. When off every graph is a bypass.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// The graph to build.
    #[serde(default = "GraphDescription::passthrough")]
    pub audio_graph: GraphDescription,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            audio_graph: GraphDescription::passthrough(),
        }
    }
}

impl Settings {
    /// Settings with processing on.
    pub fn new(audio_graph: GraphDescription) -> Self {
        Self {
            enabled: true,
            audio_graph,
        }
    }

    /// Same settings with the switch set.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Parses the JSON form.
    pub fn from_json(text: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads the JSON form from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SessionError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Playback speed of the graph's input node, 1.0 if there is none.
    pub fn input_speed(&self) -> f32 {
        self.audio_graph
            .nodes
            .iter()
            .find(|n| n.node_type() == Some(NodeType::Input))
            .map_or(1.0, |n| InputParams::from_patch(&Patch::new(&n.id, &n.params)).speed)
    }
}

/// What moving from one [`Settings`] to another takes.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsChange {
    /// Nothing differs.
    Unchanged,
    /// Same topology and switch; these parameters changed.
    Params(Vec<ParamChange>),
    /// The switch or the topology changed; graphs must be rebuilt.
    Rebuild,
}

impl SettingsChange {
    /// Classifies the move from `previous` to `next`.
    pub fn between(previous: &Settings, next: &Settings) -> Self {
        if previous.enabled != next.enabled
            || TopologyKey::of(&previous.audio_graph) != TopologyKey::of(&next.audio_graph)
        {
            return Self::Rebuild;
        }
        let changes = ParamChange::between(&previous.audio_graph, &next.audio_graph);
        if changes.is_empty() {
            Self::Unchanged
        } else {
            Self::Params(changes)
        }
    }

    /// Whether graphs must be rebuilt.
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, Self::Rebuild)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchrome_graph::{GraphEdge, GraphNode, ParamValue};

    fn reverb_graph(mix: f64) -> GraphDescription {
        GraphDescription::default()
            .with_node(GraphNode::new("input", NodeType::Input))
            .with_node(GraphNode::new("r", NodeType::Reverb).with_param("mix", mix))
            .with_node(GraphNode::new("output", NodeType::Output))
            .with_edge(GraphEdge::new("input", "r"))
            .with_edge(GraphEdge::new("r", "output"))
    }

    #[test]
    fn json_uses_camel_case() {
        let settings = Settings::from_json(
            r#"{"enabled": false, "audioGraph": {"nodes": [{"id": "input", "type": "input"}], "edges": []}}"#,
        )
        .unwrap();
        assert!(!settings.enabled);
        assert_eq!(settings.audio_graph.nodes.len(), 1);
        assert!(settings.to_json().unwrap().contains("\"audioGraph\""));
    }

    #[test]
    fn missing_fields_default() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn input_speed_reads_the_input_node() {
        let mut settings = Settings::default();
        assert_eq!(settings.input_speed(), 1.0);
        if let Some(node) = settings.audio_graph.node_mut("input") {
            node.params.insert("speed".into(), ParamValue::from(0.75));
        }
        assert_eq!(settings.input_speed(), 0.75);
    }

    #[test]
    fn classification() {
        let a = Settings::new(reverb_graph(10.0));
        assert_eq!(SettingsChange::between(&a, &a), SettingsChange::Unchanged);

        let b = Settings::new(reverb_graph(20.0));
        match SettingsChange::between(&a, &b) {
            SettingsChange::Params(changes) => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].node_id, "r");
            }
            other => panic!("expected a parameter change, got {other:?}"),
        }

        assert!(SettingsChange::between(&a, &a.clone().with_enabled(false)).needs_rebuild());
        assert!(SettingsChange::between(&a, &Settings::default()).needs_rebuild());
    }
}
