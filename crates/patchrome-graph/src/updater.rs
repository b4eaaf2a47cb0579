//! In-place parameter updates.
//!
//! The updater never changes topology. Callers compare
//! [`TopologyKey`](crate::TopologyKey)s and rebuild when nodes or edges
//! differ; everything else arrives here as per-node parameter changes.

use patchrome_engine::{AudioEngine, PlaybackControl};

use crate::description::{GraphDescription, ParamMap};
use crate::live::{LiveGraph, LiveUnit};
use crate::params::{NodeParams, Patch};

/// Speeds this close to 1.0 keep the host's natural-pitch time-stretching.
pub const PITCH_LOCK_TOLERANCE: f32 = 0.01;

/// New parameters for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamChange {
    /// Target node id.
    pub node_id: String,
    /// Parameters to apply; fields equal to the snapshot are no-ops.
    pub params: ParamMap,
}

impl ParamChange {
    /// Creates a change.
    pub fn new(node_id: impl Into<String>, params: ParamMap) -> Self {
        Self {
            node_id: node_id.into(),
            params,
        }
    }

    /// One change per node of `new` whose parameters differ from the node
    /// with the same id in `old`, carrying the full new parameter map.
    pub fn between(old: &GraphDescription, new: &GraphDescription) -> Vec<Self> {
        new.nodes
            .iter()
            .filter(|node| old.node(&node.id).is_none_or(|prev| prev.params != node.params))
            .map(|node| Self::new(node.id.clone(), node.params.clone()))
            .collect()
    }
}

/// Pushes a playback speed to a media element.
///
/// Pitch preservation stays on only near normal speed, so any real speed
/// change is heard as a pitch change.
pub fn apply_speed(playback: &dyn PlaybackControl, speed: f32) {
    playback.set_playback_rate(speed);
    playback.set_preserves_pitch((speed - 1.0).abs() < PITCH_LOCK_TOLERANCE);
}

/// Applies `changes` to `graph`; returns how many units changed.
///
/// Unknown node ids are skipped. A speed change on the input unit goes to
/// `playback` when one is given.
pub fn update(
    graph: &mut LiveGraph,
    engine: &mut dyn AudioEngine,
    changes: &[ParamChange],
    playback: Option<&dyn PlaybackControl>,
) -> usize {
    let mut changed = 0;
    for change in changes {
        let Some(unit) = graph.unit_mut(&change.node_id) else {
            tracing::debug!(node = %change.node_id, "graph: update for unknown node, skipping");
            continue;
        };
        let patch = Patch::new(&change.node_id, &change.params);
        let touched = match unit {
            LiveUnit::Input { params, .. } => {
                let mut next = *params;
                next.apply(&patch);
                if patch.contains("speed") {
                    if let Some(playback) = playback {
                        apply_speed(playback, next.speed);
                    }
                }
                let touched = next != *params;
                *params = next;
                touched
            }
            LiveUnit::Effect(effect) => effect.update(engine, &patch),
            LiveUnit::Bypass { .. } | LiveUnit::Output { .. } => false,
        };
        if touched {
            tracing::debug!(node = %change.node_id, "graph: parameters updated");
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::{GraphNode, ParamValue};
    use crate::node_type::NodeType;
    use patchrome_engine::AtomicPlayback;

    #[test]
    fn speed_toggles_pitch_lock() {
        let playback = AtomicPlayback::new();
        apply_speed(&playback, 1.5);
        assert_eq!(playback.playback_rate(), 1.5);
        assert!(!playback.preserves_pitch());
        apply_speed(&playback, 1.005);
        assert!(playback.preserves_pitch());
    }

    #[test]
    fn changes_between_descriptions() {
        let old = GraphDescription::passthrough()
            .with_node(GraphNode::new("r", NodeType::Reverb).with_param("mix", 10.0));
        let mut new = old.clone();
        if let Some(node) = new.node_mut("r") {
            node.params.insert("mix".into(), ParamValue::from(20.0));
        }
        let changes = ParamChange::between(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].node_id, "r");
        assert_eq!(changes[0].params["mix"], ParamValue::from(20.0));
        assert!(ParamChange::between(&new, &new).is_empty());
    }
}
