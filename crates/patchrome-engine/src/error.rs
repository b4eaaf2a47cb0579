//! Error types for engine operations.

use thiserror::Error;

use crate::handle::{NodeHandle, SourceId};

/// Reasons the engine rejects an operation.
///
/// None of these are fatal; callers on the graph-building path log and skip
/// the failed step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The handle does not name a live node
    #[error("unknown node {0}")]
    UnknownNode(NodeHandle),

    /// Output or input index beyond the node's port count
    #[error("{direction} port {port} out of range for node {node} ({count} available)")]
    PortOutOfRange {
        /// Node the port was requested on.
        node: NodeHandle,
        /// `"output"` or `"input"`.
        direction: &'static str,
        /// Requested port index.
        port: usize,
        /// Number of ports the node has.
        count: usize,
    },

    /// Connection target produces audio but accepts none
    #[error("node {0} has no inputs")]
    NotAnInput(NodeHandle),

    /// Worklet requested for a name that was never registered
    #[error("processor not registered: {0}")]
    ProcessorNotRegistered(String),

    /// The media element already feeds a source node
    #[error("media element {0} is already captured by a source node")]
    SourceAlreadyCaptured(SourceId),

    /// Parameter or option that the node type does not carry
    #[error("parameter '{param}' does not apply to node {node}")]
    ParamNotApplicable {
        /// Node the parameter was set on.
        node: NodeHandle,
        /// Parameter name.
        param: String,
    },
}

impl EngineError {
    /// Create a parameter-not-applicable error.
    pub fn not_applicable(node: NodeHandle, param: impl Into<String>) -> Self {
        EngineError::ParamNotApplicable {
            node,
            param: param.into(),
        }
    }

    /// Create an output port range error.
    pub fn output_out_of_range(node: NodeHandle, port: usize, count: usize) -> Self {
        EngineError::PortOutOfRange {
            node,
            direction: "output",
            port,
            count,
        }
    }

    /// Create an input port range error.
    pub fn input_out_of_range(node: NodeHandle, port: usize, count: usize) -> Self {
        EngineError::PortOutOfRange {
            node,
            direction: "input",
            port,
            count,
        }
    }
}
