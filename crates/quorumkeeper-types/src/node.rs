//! The in-memory representation of a node row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{FormationId, GroupId, NodeId};
use crate::state::{HealthTag, ReplicationState, SyncState};

/// A single node's reported state, goal state, health, lag, and timers.
///
/// Mutated only by the report ingress (all fields except `goalState`)
/// and by the transition engine's caller (`goalState`, `stateChangeTime`)
/// per spec.md §3 "Lifecycle".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub formation_id: FormationId,
    pub group_id: GroupId,
    pub name: String,
    pub port: u16,

    /// Last state the agent confirmed it has reached.
    pub reported_state: ReplicationState,
    /// Last state the coordinator assigned.
    pub goal_state: ReplicationState,

    /// Monotonically non-decreasing replay position (opaque).
    pub reported_lsn: u64,
    pub sync_state: SyncState,
    pub pg_is_running: bool,

    pub health: HealthTag,
    /// Non-negative; zero means never-promote.
    pub candidate_priority: u32,
    /// Participates in synchronous-replication quorum.
    pub replication_quorum: bool,

    pub report_time: DateTime<Utc>,
    pub health_check_time: DateTime<Utc>,
    pub state_change_time: DateTime<Utc>,
}

impl NodeRecord {
    /// `IsCurrentState(n, s)` from spec.md §4.2 "Tie-breaking and edge
    /// cases": the node has converged to `s` on both its reported and
    /// goal state. Every rule guards on this to avoid racing ahead of an
    /// in-flight assignment.
    pub fn is_current_state(&self, s: ReplicationState) -> bool {
        self.reported_state == s && self.goal_state == s
    }

    /// Assigns a new goal state, bumping `stateChangeTime` to `now`.
    /// Invariant 6 (LSN non-decreasing) is enforced by the report
    /// ingress, not here; this only ever touches `goalState`.
    pub fn assign_goal(&mut self, goal: ReplicationState, now: DateTime<Utc>) {
        self.goal_state = goal;
        self.state_change_time = now;
    }
}
