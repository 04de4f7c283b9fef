//! The `GroupStore` trait: the persistence seam spec.md §1 places out of
//! scope ("the durable storage backend") but whose boundary spec.md §5
//! and §6 require every operation to go through.

use chrono::{DateTime, Utc};
use quorumkeeper_types::{FormationId, FormationRecord, GroupId, NodeId, NodeRecord, ReplicationState, SyncState};

use crate::error::Result;
use crate::event::Event;
use crate::snapshot::GroupSnapshot;

/// Whether a report's `reportedLSN` was accepted or rejected as a
/// regression (spec.md §7 error kind 3). Either way every other field on
/// the report — `reportedState`, `syncState`, `pgIsRunning`, `reportTime`
/// — is applied; only the LSN update itself is rejected when stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// `reportedLsn` was >= the stored value and was applied.
    Accepted,
    /// `reportedLsn` was a regression; the stored LSN is unchanged. The
    /// caller must not run the transition engine for this report (spec.md
    /// §7: "no assignments produced").
    StaleLsn,
}

/// Durable storage for formations, groups, and nodes, plus the atomic
/// "apply assignments" step a worker performs after calling
/// `quorumkeeper_engine::evaluate`.
///
/// Implementations must make `commit_assignments` atomic with respect to
/// concurrent `load_group` calls on the same group (spec.md §5: "two
/// workers racing on the same group must not both act on the same stale
/// snapshot") — the in-memory implementation here does so with a single
/// whole-store lock; a durable backend would use a row-level transaction.
#[async_trait::async_trait]
pub trait GroupStore: Send + Sync {
    /// Loads every node in `group_id` plus its formation record.
    async fn load_group(&self, group_id: GroupId) -> Result<GroupSnapshot>;

    /// Looks up a formation record by id.
    async fn load_formation(&self, formation_id: FormationId) -> Result<FormationRecord>;

    /// Resolves which group a node belongs to, so a caller that only has
    /// a bare node id (as every report does) can load the right group
    /// snapshot.
    async fn node_group(&self, node_id: NodeId) -> Result<GroupId>;

    /// Registers a new node row. Returns `Err` if a node with this id
    /// already exists.
    async fn register_node(&self, node: NodeRecord) -> Result<()>;

    /// Removes a node row entirely (spec.md §6 `RemoveNode`).
    async fn remove_node(&self, node_id: NodeId) -> Result<()>;

    /// Applies a health/state report from an agent. Enforces invariant 6
    /// (reportedLSN is non-decreasing) by rejecting an LSN regression
    /// while still applying every other reported field, and tells the
    /// caller which happened via [`ReportOutcome`] rather than erroring.
    async fn apply_report(
        &self,
        node_id: NodeId,
        reported_state: ReplicationState,
        reported_lsn: u64,
        sync_state: SyncState,
        pg_is_running: bool,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome>;

    /// Updates a node's candidate priority and synchronous-replication
    /// quorum membership (spec.md §6 `SetReplicationSettings`), without
    /// touching its goal state.
    async fn update_replication_settings(
        &self,
        node_id: NodeId,
        candidate_priority: u32,
        replication_quorum: bool,
    ) -> Result<()>;

    /// Atomically writes the goal-state assignments produced by one
    /// `evaluate` call and persists the accompanying events.
    async fn commit_assignments(
        &self,
        group_id: GroupId,
        assignments: &[quorumkeeper_engine::Assignment],
        events: &[Event],
        now: DateTime<Utc>,
    ) -> Result<()>;
}
