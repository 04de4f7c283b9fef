//! The per-group snapshot the engine is fed (spec.md §5: "every worker
//! must load a consistent snapshot of the group before calling
//! `evaluate`").

use quorumkeeper_types::{FormationRecord, GroupId, NodeRecord};

/// Every node currently registered in one group, plus the formation
/// record that governs it. `quorumkeeper-engine::evaluate` takes exactly
/// this shape as input.
#[derive(Debug, Clone)]
pub struct GroupSnapshot {
    pub group_id: GroupId,
    pub formation: FormationRecord,
    pub nodes: Vec<NodeRecord>,
}

impl GroupSnapshot {
    pub fn node(&self, id: quorumkeeper_types::NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.node_id == id)
    }
}
