//! Declarative graph descriptions as delivered by the settings layer.
//!
//! The JSON shape is
//!
//! ```json
//! {
//!   "nodes": [{ "id": "in", "type": "input", "params": { "speed": 1.0 } }, ...],
//!   "edges": [{ "id": "e1", "source": "in", "target": "out" }, ...]
//! }
//! ```
//!
//! Node types are kept as strings so an unsupported type survives parsing
//! and is skipped by the builder rather than rejecting the whole graph.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::node_type::NodeType;

/// One parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `true` / `false`.
    Bool(bool),
    /// Any JSON number.
    Number(f64),
    /// Enumerated settings such as waveform or filter type.
    Text(String),
}

impl ParamValue {
    /// The value as `f32` if it is a finite number.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ParamValue::Number(n) => Some(*n as f32).filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// The value if it is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f32> for ParamValue {
    /// Widens through the shortest decimal form, so `0.1_f32` serializes as
    /// `0.1` rather than `0.10000000149011612`.
    fn from(v: f32) -> Self {
        ParamValue::Number(v.to_string().parse().unwrap_or(f64::from(v)))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Parameters of one node, by name.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// A declared node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique within its graph.
    pub id: String,
    /// Type name; see [`NodeType`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Parameter overrides. Missing entries take the type's default.
    #[serde(default)]
    pub params: ParamMap,
}

impl GraphNode {
    /// Creates a node with no parameter overrides.
    pub fn new(id: impl Into<String>, kind: NodeType) -> Self {
        Self {
            id: id.into(),
            kind: kind.as_str().to_string(),
            params: ParamMap::new(),
        }
    }

    /// Adds a parameter override.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Parsed type, or `None` if unsupported.
    pub fn node_type(&self) -> Option<NodeType> {
        self.kind.parse().ok()
    }
}

/// A declared connection from one node's output to another's input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Edge id.
    pub id: String,
    /// Upstream node id.
    pub source: String,
    /// Downstream node id.
    pub target: String,
}

impl GraphEdge {
    /// Creates an edge with an id derived from its endpoints.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{source}->{target}"),
            source,
            target,
        }
    }
}

/// Nodes plus edges.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDescription {
    /// Declared nodes, in declaration order.
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// Declared edges.
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphDescription {
    /// `input → output` with default parameters.
    pub fn passthrough() -> Self {
        Self::default()
            .with_node(GraphNode::new("input", NodeType::Input))
            .with_node(GraphNode::new("output", NodeType::Output))
            .with_edge(GraphEdge::new("input", "output"))
    }

    /// Parses the JSON form.
    pub fn from_json(text: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Appends a node.
    pub fn with_node(mut self, node: GraphNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Appends an edge.
    pub fn with_edge(mut self, edge: GraphEdge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Mutable lookup by id.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Every problem the builder would silently work around.
    ///
    /// None of these stop a build; they are reported for tooling.
    pub fn issues(&self) -> Vec<GraphError> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                issues.push(GraphError::DuplicateNode(node.id.clone()));
            }
            if node.node_type().is_none() {
                issues.push(GraphError::unsupported(&node.id, &node.kind));
            }
        }

        for kind in [NodeType::Input, NodeType::Output] {
            let count = self
                .nodes
                .iter()
                .filter(|n| n.node_type() == Some(kind))
                .count();
            if count != 1 {
                issues.push(GraphError::TerminalCount { kind, count });
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !seen.contains(endpoint.as_str()) {
                    issues.push(GraphError::dangling(&edge.id, endpoint));
                }
            }
        }
        issues
    }

    /// Fails with the first entry of [`issues`](Self::issues).
    pub fn validate(&self) -> Result<(), GraphError> {
        match self.issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "nodes": [
            { "id": "in", "type": "input", "params": { "speed": 1.25 } },
            { "id": "eq", "type": "equalizer", "params": { "filterType": "highpass", "q": 2 } },
            { "id": "u", "type": "utility", "params": { "reverseL": true } },
            { "id": "out", "type": "output" }
        ],
        "edges": [
            { "id": "a", "source": "in", "target": "eq" },
            { "id": "b", "source": "eq", "target": "out", "sourceHandle": "x" }
        ]
    }"#;

    #[test]
    fn parses_mixed_param_types() {
        let graph = GraphDescription::from_json(JSON).unwrap();
        assert_eq!(graph.nodes.len(), 4);
        let eq = graph.node("eq").unwrap();
        assert_eq!(eq.node_type(), Some(NodeType::Equalizer));
        assert_eq!(eq.params["filterType"].as_str(), Some("highpass"));
        assert_eq!(eq.params["q"].as_f32(), Some(2.0));
        assert_eq!(graph.node("u").unwrap().params["reverseL"].as_bool(), Some(true));
        assert!(graph.node("out").unwrap().params.is_empty());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn json_round_trip() {
        let graph = GraphDescription::from_json(JSON).unwrap();
        let again = GraphDescription::from_json(&graph.to_json().unwrap()).unwrap();
        assert_eq!(graph, again);
    }

    #[test]
    fn f32_widening_is_clean() {
        assert_eq!(ParamValue::from(0.1_f32), ParamValue::Number(0.1));
        assert_eq!(ParamValue::from(-45.1_f32), ParamValue::Number(-45.1));
    }

    #[test]
    fn issues_are_collected() {
        let graph = GraphDescription::default()
            .with_node(GraphNode::new("in", NodeType::Input))
            .with_node(GraphNode::new("in", NodeType::Reverb))
            .with_node(GraphNode {
                id: "x".into(),
                kind: "chorus".into(),
                params: ParamMap::new(),
            })
            .with_edge(GraphEdge::new("in", "nowhere"));
        let issues = graph.issues();
        assert!(matches!(&issues[0], GraphError::DuplicateNode(id) if id == "in"));
        assert!(matches!(&issues[1], GraphError::UnsupportedType { kind, .. } if kind == "chorus"));
        assert!(matches!(issues[2], GraphError::TerminalCount { kind: NodeType::Output, count: 0 }));
        assert!(matches!(&issues[3], GraphError::DanglingEdge { node, .. } if node == "nowhere"));
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn passthrough_is_valid() {
        let graph = GraphDescription::passthrough();
        assert!(graph.validate().is_ok());
        assert_eq!(graph.edges[0].id, "input->output");
    }
}
