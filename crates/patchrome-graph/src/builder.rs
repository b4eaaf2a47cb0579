//! Builds a [`LiveGraph`] from a description.
//!
//! Three passes: instantiate every node, connect every declared edge, then
//! realize the internal connections the creators queued. Nothing here fails
//! as a whole; each skipped node, edge or connection is logged and the rest
//! of the graph is still built.

use std::collections::HashSet;

use patchrome_core::ProcessorDescriptor;
use patchrome_engine::{AudioEngine, Connection, NodeHandle};

use crate::description::GraphDescription;
use crate::live::{LiveGraph, LiveUnit};
use crate::node_type::NodeType;
use crate::params::{InputParams, NodeParams, Patch};
use crate::units::{Assembly, EffectUnit, connect, link};

/// Every block processor a graph may instantiate.
pub fn processor_descriptors() -> impl Iterator<Item = &'static ProcessorDescriptor> {
    patchrome_spectral::DESCRIPTORS
        .iter()
        .chain(patchrome_effects::DESCRIPTORS.iter())
        .copied()
}

/// Registers every block processor with `engine`.
pub fn register_processors(engine: &mut dyn AudioEngine) {
    for descriptor in processor_descriptors() {
        engine.register_processor(descriptor);
    }
}

/// Builds `description` between `source` and `destination`.
///
/// With `enabled` false the source is wired straight to the destination and
/// the graph holds a single bypass unit.
pub fn build(
    engine: &mut dyn AudioEngine,
    source: NodeHandle,
    description: &GraphDescription,
    destination: NodeHandle,
    enabled: bool,
) -> LiveGraph {
    if !enabled {
        connect(engine, link(source, destination));
        tracing::debug!(%source, "graph: bypassed");
        return LiveGraph {
            units: vec![("bypass".to_string(), LiveUnit::Bypass { source })],
            edges: Vec::new(),
            source,
            destination,
            bypassed: true,
        };
    }

    let mut units: Vec<(String, LiveUnit)> = Vec::with_capacity(description.nodes.len());
    let mut seen = HashSet::new();
    let mut internal: Vec<Connection> = Vec::new();

    for node in &description.nodes {
        if !seen.insert(node.id.as_str()) {
            tracing::warn!(node = %node.id, "graph: duplicate node id, skipping");
            continue;
        }
        let Some(kind) = node.node_type() else {
            tracing::warn!(node = %node.id, kind = %node.kind, "graph: unsupported node type, skipping");
            continue;
        };
        let patch = Patch::new(&node.id, &node.params);
        let unit = match kind {
            NodeType::Input => LiveUnit::Input {
                source,
                params: InputParams::from_patch(&patch),
            },
            NodeType::Output => LiveUnit::Output { destination },
            _ => {
                let mut asm = Assembly::new(&mut *engine, &node.id);
                match EffectUnit::create(kind, &mut asm, &patch) {
                    Some(Ok(effect)) => {
                        internal.extend(asm.finish());
                        LiveUnit::Effect(effect)
                    }
                    Some(Err(err)) => {
                        tracing::warn!(%err, "graph: node construction failed, skipping");
                        asm.abandon();
                        continue;
                    }
                    None => continue,
                }
            }
        };
        tracing::debug!(node = %node.id, %kind, "graph: unit created");
        units.push((node.id.clone(), unit));
    }

    let find = |id: &str| units.iter().find(|(uid, _)| uid == id).map(|(_, u)| u);
    let mut edges = Vec::with_capacity(description.edges.len());
    for edge in &description.edges {
        let from = find(&edge.source).and_then(LiveUnit::output_port);
        let to = find(&edge.target).and_then(LiveUnit::input_port);
        let (Some(from), Some(to)) = (from, to) else {
            tracing::warn!(edge = %edge.id, "graph: unresolvable edge, skipping");
            continue;
        };
        if connect(engine, link(from, to)) {
            tracing::debug!(edge = %edge.id, "graph: edge connected");
            edges.push(edge.clone());
        }
    }

    for connection in internal {
        connect(engine, connection);
    }

    tracing::debug!(units = units.len(), edges = edges.len(), "graph: built");
    LiveGraph {
        units,
        edges,
        source,
        destination,
        bypassed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_processors_are_known() {
        let names: Vec<&str> = processor_descriptors().map(|d| d.name).collect();
        assert_eq!(names.len(), 6);
        assert!(names.contains(&"spectral-pitch-processor"));
        assert!(names.contains(&"bitcrusher-processor"));
    }
}
