//! The instantiated graph.

use patchrome_engine::{AudioEngine, NodeHandle};
use serde::Serialize;

use crate::description::{GraphDescription, GraphEdge, GraphNode, ParamMap};
use crate::node_type::NodeType;
use crate::params::{InputParams, NodeParams};
use crate::units::EffectUnit;

/// Runtime instantiation of one declared node.
#[derive(Debug)]
pub enum LiveUnit {
    /// Stands in for the whole graph when processing is disabled.
    Bypass {
        /// Wired straight to the destination.
        source: NodeHandle,
    },
    /// The media source itself.
    Input {
        /// Source handle; also the unit's output port.
        source: NodeHandle,
        /// Snapshot.
        params: InputParams,
    },
    /// The destination itself.
    Output {
        /// Destination handle; also the unit's input port.
        destination: NodeHandle,
    },
    /// Any effect.
    Effect(EffectUnit),
}

impl LiveUnit {
    /// Type tag. The bypass unit has none.
    pub fn node_type(&self) -> Option<NodeType> {
        match self {
            Self::Bypass { .. } => None,
            Self::Input { .. } => Some(NodeType::Input),
            Self::Output { .. } => Some(NodeType::Output),
            Self::Effect(unit) => Some(unit.node_type()),
        }
    }

    /// Where upstream edges attach.
    pub fn input_port(&self) -> Option<NodeHandle> {
        match self {
            Self::Bypass { .. } | Self::Input { .. } => None,
            Self::Output { destination } => Some(*destination),
            Self::Effect(unit) => unit.input(),
        }
    }

    /// Where downstream edges attach.
    pub fn output_port(&self) -> Option<NodeHandle> {
        match self {
            Self::Bypass { .. } | Self::Output { .. } => None,
            Self::Input { source, .. } => Some(*source),
            Self::Effect(unit) => Some(unit.output()),
        }
    }

    /// Parameter snapshot.
    pub fn params(&self) -> ParamMap {
        match self {
            Self::Input { params, .. } => params.to_params(),
            Self::Effect(unit) => unit.params(),
            Self::Bypass { .. } | Self::Output { .. } => ParamMap::new(),
        }
    }

    /// The effect, if this is one.
    pub fn effect(&self) -> Option<&EffectUnit> {
        match self {
            Self::Effect(unit) => Some(unit),
            _ => None,
        }
    }
}

/// Everything that forces a rebuild when it changes: the `{id, type}` of
/// every node and every edge, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyKey {
    nodes: Vec<(String, String)>,
    edges: Vec<(String, String, String)>,
}

impl TopologyKey {
    /// Key of a description.
    pub fn of(description: &GraphDescription) -> Self {
        Self {
            nodes: description
                .nodes
                .iter()
                .map(|n| (n.id.clone(), n.kind.clone()))
                .collect(),
            edges: description
                .edges
                .iter()
                .map(|e| (e.id.clone(), e.source.clone(), e.target.clone()))
                .collect(),
        }
    }
}

/// A built graph between one source and one destination.
///
/// Holds at most one unit per declared node id, the edges that were
/// actually realized, and the two endpoints it does not own.
#[derive(Debug)]
pub struct LiveGraph {
    pub(crate) units: Vec<(String, LiveUnit)>,
    pub(crate) edges: Vec<GraphEdge>,
    pub(crate) source: NodeHandle,
    pub(crate) destination: NodeHandle,
    pub(crate) bypassed: bool,
}

impl LiveGraph {
    /// Looks up a unit by node id.
    pub fn unit(&self, id: &str) -> Option<&LiveUnit> {
        self.units.iter().find(|(uid, _)| uid == id).map(|(_, u)| u)
    }

    /// Mutable lookup by node id.
    pub fn unit_mut(&mut self, id: &str) -> Option<&mut LiveUnit> {
        self.units
            .iter_mut()
            .find(|(uid, _)| uid == id)
            .map(|(_, u)| u)
    }

    /// Units in build order.
    pub fn units(&self) -> impl Iterator<Item = (&str, &LiveUnit)> {
        self.units.iter().map(|(id, u)| (id.as_str(), u))
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit was built.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Edges that were connected.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Whether this is the disabled-mode bypass.
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// The media source node.
    pub fn source(&self) -> NodeHandle {
        self.source
    }

    /// The destination node.
    pub fn destination(&self) -> NodeHandle {
        self.destination
    }

    /// Current state as a description: built nodes with their snapshots and
    /// the realized edges.
    pub fn to_description(&self) -> GraphDescription {
        let nodes = self
            .units
            .iter()
            .filter_map(|(id, unit)| {
                let kind = unit.node_type()?;
                Some(GraphNode {
                    id: id.clone(),
                    kind: kind.as_str().to_string(),
                    params: unit.params(),
                })
            })
            .collect();
        GraphDescription {
            nodes,
            edges: self.edges.clone(),
        }
    }

    /// Topology of what was built.
    pub fn topology(&self) -> TopologyKey {
        TopologyKey::of(&self.to_description())
    }

    /// Severs and frees everything the graph owns.
    ///
    /// The source keeps existing with no outgoing connections so the next
    /// build can reuse it; the destination is never touched.
    pub fn teardown(self, engine: &mut dyn AudioEngine) {
        if let Err(err) = engine.disconnect(self.source) {
            tracing::warn!(%err, "graph: source disconnect failed");
        }
        let mut released = 0;
        for (_, unit) in self.units {
            if let LiveUnit::Effect(effect) = unit {
                released += effect.nodes().len();
                effect.teardown(engine);
            }
        }
        tracing::debug!(released, "graph: torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::GraphEdge;

    #[test]
    fn topology_ignores_params() {
        let a = GraphDescription::passthrough();
        let mut b = GraphDescription::passthrough();
        if let Some(node) = b.node_mut("input") {
            node.params.insert("speed".into(), 1.5_f32.into());
        }
        assert_eq!(TopologyKey::of(&a), TopologyKey::of(&b));
    }

    #[test]
    fn topology_sees_edges_and_types() {
        let a = GraphDescription::passthrough();
        let b = a.clone().with_edge(GraphEdge::new("input", "output"));
        assert_ne!(TopologyKey::of(&a), TopologyKey::of(&b));

        let mut c = a.clone();
        c.nodes[1].kind = "reverb".into();
        assert_ne!(TopologyKey::of(&a), TopologyKey::of(&c));
    }
}
