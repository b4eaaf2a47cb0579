//! Error types for graph descriptions and unit construction.

use patchrome_engine::EngineError;
use thiserror::Error;

use crate::node_type::NodeType;

/// Errors raised while parsing, validating or instantiating a graph.
///
/// Building never fails as a whole: construction errors are logged and the
/// affected node is skipped. These values surface through
/// [`GraphDescription::validate`](crate::GraphDescription::validate) and in
/// log records.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The JSON text is not a graph description.
    #[error("failed to parse graph description: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two nodes share an id.
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// A graph needs exactly one input and one output node.
    #[error("expected exactly one {kind} node, found {count}")]
    TerminalCount {
        /// `input` or `output`.
        kind: NodeType,
        /// How many were declared.
        count: usize,
    },

    /// A node's type is not one the builder knows.
    #[error("node '{id}' has unsupported type '{kind}'")]
    UnsupportedType {
        /// Node id.
        id: String,
        /// Declared type.
        kind: String,
    },

    /// An edge references a node id that is not declared.
    #[error("edge '{edge}' references unknown node '{node}'")]
    DanglingEdge {
        /// Edge id.
        edge: String,
        /// The missing endpoint.
        node: String,
    },

    /// The engine refused to create one of a unit's primitives.
    #[error("failed to create {primitive} for node '{node}'")]
    Create {
        /// Node id.
        node: String,
        /// Primitive type name.
        primitive: &'static str,
        /// Engine rejection.
        #[source]
        source: EngineError,
    },
}

impl GraphError {
    /// Create a dangling edge error.
    pub fn dangling(edge: impl Into<String>, node: impl Into<String>) -> Self {
        GraphError::DanglingEdge {
            edge: edge.into(),
            node: node.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported(id: impl Into<String>, kind: impl Into<String>) -> Self {
        GraphError::UnsupportedType {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchrome_engine::NodeHandle;
    use std::error::Error as _;

    #[test]
    fn messages() {
        assert_eq!(
            GraphError::dangling("e1", "ghost").to_string(),
            "edge 'e1' references unknown node 'ghost'"
        );
        assert_eq!(
            GraphError::TerminalCount {
                kind: NodeType::Output,
                count: 2
            }
            .to_string(),
            "expected exactly one output node, found 2"
        );
    }

    #[test]
    fn create_error_chains_engine_error() {
        let err = GraphError::Create {
            node: "verb".into(),
            primitive: "worklet",
            source: EngineError::UnknownNode(NodeHandle::from_raw(3)),
        };
        assert_eq!(err.to_string(), "failed to create worklet for node 'verb'");
        assert!(err.source().is_some());
    }
}
