//! An in-process `GroupStore` reference implementation, useful for
//! embedding the coordinator in a single binary and for tests. Not
//! durable: data lives only as long as the process.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use quorumkeeper_types::{FormationId, FormationRecord, GroupId, NodeId, NodeRecord, ReplicationState, SyncState};

use crate::error::{Result, StoreError};
use crate::event::Event;
use crate::snapshot::GroupSnapshot;
use crate::store::{GroupStore, ReportOutcome};

#[derive(Default)]
struct Inner {
    formations: HashMap<FormationId, FormationRecord>,
    nodes: HashMap<NodeId, NodeRecord>,
}

/// `GroupStore` backed by a single `parking_lot::RwLock`. Groups are
/// small (spec.md never describes more than a handful of nodes per
/// group) so one lock for the whole store is simpler than per-group
/// sharding and still gives `commit_assignments` the atomicity the
/// trait requires.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a formation record; intended for test and bootstrap setup,
    /// not part of the `GroupStore` trait itself.
    pub fn seed_formation(&self, formation: FormationRecord) {
        self.inner.write().formations.insert(formation.formation_id, formation);
    }
}

#[async_trait::async_trait]
impl GroupStore for InMemoryStore {
    async fn load_group(&self, group_id: GroupId) -> Result<GroupSnapshot> {
        let inner = self.inner.read();
        let nodes: Vec<NodeRecord> = inner.nodes.values().filter(|n| n.group_id == group_id).cloned().collect();
        let formation_id = nodes.first().map(|n| n.formation_id).ok_or(StoreError::GroupNotFound(group_id))?;
        let formation = inner
            .formations
            .get(&formation_id)
            .copied()
            .ok_or(StoreError::FormationNotFound(formation_id))?;
        Ok(GroupSnapshot { group_id, formation, nodes })
    }

    async fn load_formation(&self, formation_id: FormationId) -> Result<FormationRecord> {
        self.inner
            .read()
            .formations
            .get(&formation_id)
            .copied()
            .ok_or(StoreError::FormationNotFound(formation_id))
    }

    async fn node_group(&self, node_id: NodeId) -> Result<GroupId> {
        self.inner
            .read()
            .nodes
            .get(&node_id)
            .map(|n| n.group_id)
            .ok_or(StoreError::NodeNotFound(node_id))
    }

    async fn register_node(&self, node: NodeRecord) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.formations.contains_key(&node.formation_id) {
            return Err(StoreError::FormationNotFound(node.formation_id));
        }
        if inner.nodes.contains_key(&node.node_id) {
            return Err(StoreError::Backend(format!("node {} already registered", node.node_id)));
        }
        inner.nodes.insert(node.node_id, node);
        Ok(())
    }

    async fn remove_node(&self, node_id: NodeId) -> Result<()> {
        let mut inner = self.inner.write();
        inner.nodes.remove(&node_id).ok_or(StoreError::NodeNotFound(node_id))?;
        Ok(())
    }

    async fn apply_report(
        &self,
        node_id: NodeId,
        reported_state: ReplicationState,
        reported_lsn: u64,
        sync_state: SyncState,
        pg_is_running: bool,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome> {
        let mut inner = self.inner.write();
        let node = inner.nodes.get_mut(&node_id).ok_or(StoreError::NodeNotFound(node_id))?;
        node.reported_state = reported_state;
        node.sync_state = sync_state;
        node.pg_is_running = pg_is_running;
        node.report_time = now;
        if reported_lsn < node.reported_lsn {
            return Ok(ReportOutcome::StaleLsn);
        }
        node.reported_lsn = reported_lsn;
        Ok(ReportOutcome::Accepted)
    }

    async fn update_replication_settings(&self, node_id: NodeId, candidate_priority: u32, replication_quorum: bool) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner.nodes.get_mut(&node_id).ok_or(StoreError::NodeNotFound(node_id))?;
        node.candidate_priority = candidate_priority;
        node.replication_quorum = replication_quorum;
        Ok(())
    }

    async fn commit_assignments(
        &self,
        group_id: GroupId,
        assignments: &[quorumkeeper_engine::Assignment],
        _events: &[Event],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        for assignment in assignments {
            let node = inner
                .nodes
                .get_mut(&assignment.node_id)
                .ok_or(StoreError::NodeNotFound(assignment.node_id))?;
            if node.group_id != group_id {
                return Err(StoreError::Backend(format!(
                    "node {} does not belong to group {group_id}",
                    assignment.node_id
                )));
            }
            node.assign_goal(assignment.new_goal_state, now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use quorumkeeper_types::{FormationKind, HealthTag, SyncState};

    use super::*;

    fn node(id: i64, formation: FormationId, group: GroupId, state: ReplicationState) -> NodeRecord {
        let now = Utc::now();
        NodeRecord {
            node_id: NodeId::new(id),
            formation_id: formation,
            group_id: group,
            name: format!("n{id}"),
            port: 5432,
            reported_state: state,
            goal_state: state,
            reported_lsn: 0,
            sync_state: SyncState::Async,
            pg_is_running: true,
            health: HealthTag::Good,
            candidate_priority: 100,
            replication_quorum: true,
            report_time: now,
            health_check_time: now,
            state_change_time: now,
        }
    }

    #[tokio::test]
    async fn register_then_load_group_round_trips() {
        let store = InMemoryStore::new();
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord {
            formation_id,
            kind: FormationKind::Plain,
            ..FormationRecord::plain(formation_id)
        });
        store
            .register_node(node(1, formation_id, group_id, ReplicationState::Single))
            .await
            .unwrap();

        let snapshot = store.load_group(group_id).await.unwrap();
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.formation.formation_id, formation_id);
    }

    #[tokio::test]
    async fn load_group_for_unknown_group_fails() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.load_group(GroupId::new(99)).await,
            Err(StoreError::GroupNotFound(_))
        ));
    }

    #[tokio::test]
    async fn apply_report_rejects_lsn_regression_but_applies_other_fields() {
        let store = InMemoryStore::new();
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        let mut n = node(1, formation_id, group_id, ReplicationState::Single);
        n.reported_lsn = 100;
        store.register_node(n).await.unwrap();

        let now = Utc::now();
        let outcome = store
            .apply_report(NodeId::new(1), ReplicationState::WaitPrimary, 50, SyncState::Sync, false, now)
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::StaleLsn);

        let snapshot = store.load_group(group_id).await.unwrap();
        let n = &snapshot.nodes[0];
        assert_eq!(n.reported_lsn, 100, "LSN regression must be rejected");
        assert_eq!(n.reported_state, ReplicationState::WaitPrimary, "other fields still apply");
        assert_eq!(n.sync_state, SyncState::Sync);
        assert!(!n.pg_is_running);
        assert_eq!(n.report_time, now);
    }

    #[tokio::test]
    async fn apply_report_accepts_non_decreasing_lsn() {
        let store = InMemoryStore::new();
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        store.register_node(node(1, formation_id, group_id, ReplicationState::Single)).await.unwrap();

        let outcome = store
            .apply_report(NodeId::new(1), ReplicationState::Single, 10, SyncState::Async, true, Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::Accepted);

        let snapshot = store.load_group(group_id).await.unwrap();
        assert_eq!(snapshot.nodes[0].reported_lsn, 10);
    }

    #[tokio::test]
    async fn update_replication_settings_changes_priority_and_quorum_only() {
        let store = InMemoryStore::new();
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        store
            .register_node(node(1, formation_id, group_id, ReplicationState::Secondary))
            .await
            .unwrap();

        store.update_replication_settings(NodeId::new(1), 0, false).await.unwrap();

        let snapshot = store.load_group(group_id).await.unwrap();
        let n = &snapshot.nodes[0];
        assert_eq!(n.candidate_priority, 0);
        assert!(!n.replication_quorum);
        assert_eq!(n.goal_state, ReplicationState::Secondary, "goal state is untouched");
    }

    #[tokio::test]
    async fn commit_assignments_updates_goal_state() {
        let store = InMemoryStore::new();
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        store
            .register_node(node(1, formation_id, group_id, ReplicationState::WaitPrimary))
            .await
            .unwrap();

        let assignment = quorumkeeper_engine::Assignment::new(NodeId::new(1), ReplicationState::Single, "sole node");
        store
            .commit_assignments(group_id, std::slice::from_ref(&assignment), &[], Utc::now())
            .await
            .unwrap();

        let snapshot = store.load_group(group_id).await.unwrap();
        assert_eq!(snapshot.nodes[0].goal_state, ReplicationState::Single);
    }
}
