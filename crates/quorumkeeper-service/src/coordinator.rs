//! The `CoordinatorService`: wires report ingress, the pure engine, the
//! store, and event emission together (spec.md §6).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quorumkeeper_engine::Clock;
use quorumkeeper_store::{Event, GroupStore, NotificationSink, ReportOutcome};
use quorumkeeper_types::{GroupId, NodeId, NodeRecord, ReplicationState, SyncState};
use tracing::{info, instrument, warn};

use crate::error::{Result, ServiceError};

/// The coordinator's public surface: the four operations spec.md §6
/// names (`RegisterNode`, `NodeActive`, `RemoveNode`,
/// `SetReplicationSettings`), each driving one `load_group` /
/// `evaluate` / `commit_assignments` cycle.
pub struct CoordinatorService<S, N, C> {
    store: Arc<S>,
    notifications: Arc<N>,
    clock: C,
    process_start_time: DateTime<Utc>,
}

impl<S, N, C> CoordinatorService<S, N, C>
where
    S: GroupStore,
    N: NotificationSink,
    C: Clock,
{
    pub fn new(store: Arc<S>, notifications: Arc<N>, clock: C) -> Self {
        let process_start_time = clock.now();
        Self {
            store,
            notifications,
            clock,
            process_start_time,
        }
    }

    /// Registers a brand-new node row. The first node in a group starts
    /// in `wait_standby` and is driven toward `single` by the first
    /// `node_active` call that follows (spec.md §8 S1), matching the
    /// teacher's pattern of separating "this node exists" from "this
    /// node is live".
    #[instrument(skip(self, node), fields(formation_id = %node.formation_id, group_id = %node.group_id, node_id = %node.node_id))]
    pub async fn register_node(&self, formation_kind: quorumkeeper_types::FormationKind, node: NodeRecord) -> Result<()> {
        let formation = self.store.load_formation(node.formation_id).await?;
        if formation.kind != formation_kind {
            return Err(ServiceError::FormationKindMismatch {
                formation_id: node.formation_id,
                declared_kind: formation.kind,
                group_id: node.group_id,
            });
        }
        self.store.register_node(node).await?;
        info!("node registered");
        Ok(())
    }

    /// Removes a node entirely (spec.md §6 `RemoveNode`). No engine
    /// evaluation follows removal: the next `node_active` from a
    /// remaining node re-evaluates the shrunken group on its own.
    #[instrument(skip(self))]
    pub async fn remove_node(&self, node_id: NodeId) -> Result<()> {
        self.store.remove_node(node_id).await?;
        info!("node removed");
        Ok(())
    }

    /// The core report-ingress path (spec.md §6 `NodeActive`): records
    /// the agent's report, loads a consistent group snapshot, runs the
    /// pure engine, and commits whatever assignments it returns. A
    /// report whose `reportedLsn` regresses (spec.md §7 error kind 3) has
    /// its other fields applied by the store but is not handed to the
    /// engine — "no assignments produced" is the defined outcome, not an
    /// error.
    #[instrument(skip(self), fields(node_id = %node_id))]
    pub async fn node_active(
        &self,
        node_id: NodeId,
        reported_state: ReplicationState,
        reported_lsn: u64,
        sync_state: SyncState,
        pg_is_running: bool,
    ) -> Result<()> {
        let now = self.clock.now();
        let outcome = self
            .store
            .apply_report(node_id, reported_state, reported_lsn, sync_state, pg_is_running, now)
            .await?;
        if outcome == ReportOutcome::StaleLsn {
            warn!(%node_id, reported_lsn, "rejected an LSN regression; other report fields still applied");
            return Ok(());
        }
        self.evaluate_and_commit(node_id, now).await
    }

    /// spec.md §6 `SetReplicationSettings`: updates `candidatePriority`
    /// and `replicationQuorum` on the target node and, if it is currently
    /// the primary, assigns it `apply_settings` to force a round-trip
    /// through the engine (R13 returns it to `primary` once the agent
    /// reports back). This assignment is made directly rather than via
    /// `evaluate`, since no rule reacts to a settings change by itself —
    /// the same way `register_node` assigns a node's initial goal state
    /// directly.
    #[instrument(skip(self), fields(node_id = %node_id))]
    pub async fn set_replication_settings(&self, node_id: NodeId, candidate_priority: u32, replication_quorum: bool) -> Result<()> {
        let now = self.clock.now();
        self.store.update_replication_settings(node_id, candidate_priority, replication_quorum).await?;

        let group_id = self.group_of(node_id).await?;
        let snapshot = self.store.load_group(group_id).await?;
        let node = snapshot.node(node_id).ok_or(ServiceError::Store(quorumkeeper_store::StoreError::NodeNotFound(node_id)))?;
        if node.reported_state != ReplicationState::Primary {
            return Ok(());
        }

        let assignment = quorumkeeper_engine::Assignment::new(
            node_id,
            ReplicationState::ApplySettings,
            format!("{} applying updated replication settings", node.name),
        );
        let event = self.build_event(node, ReplicationState::ApplySettings, assignment.description.clone(), now);

        self.store.commit_assignments(group_id, std::slice::from_ref(&assignment), std::slice::from_ref(&event), now).await?;
        self.notifications.publish_state(&event).await;
        self.notifications.publish_log(&event).await;
        Ok(())
    }

    async fn evaluate_and_commit(&self, reporting_id: NodeId, now: DateTime<Utc>) -> Result<()> {
        let group_id = self.group_of(reporting_id).await?;
        let snapshot = self.store.load_group(group_id).await?;
        let output = quorumkeeper_engine::evaluate(reporting_id, &snapshot.nodes, &snapshot.formation, now, self.process_start_time);

        if let Some(diagnostic) = output.diagnostic {
            warn!(?diagnostic, "engine reported an inconsistent snapshot");
            return Err(ServiceError::InconsistentSnapshot(reporting_id, diagnostic));
        }
        if output.assignments.is_empty() {
            return Ok(());
        }

        let events: Vec<Event> = output
            .assignments
            .iter()
            .filter_map(|a| {
                let node = snapshot.node(a.node_id)?;
                Some(self.build_event(node, a.new_goal_state, a.description.clone(), now))
            })
            .collect();

        self.store.commit_assignments(group_id, &output.assignments, &events, now).await?;
        for event in &events {
            self.notifications.publish_state(event).await;
            self.notifications.publish_log(event).await;
        }
        Ok(())
    }

    /// Builds the structured event spec.md §4.3 describes for one
    /// assignment, from the snapshot's pre-assignment view of `node`.
    fn build_event(&self, node: &NodeRecord, new_goal_state: ReplicationState, description: String, now: DateTime<Utc>) -> Event {
        Event {
            formation_id: node.formation_id,
            group_id: node.group_id,
            node_id: node.node_id,
            node_name: node.name.clone(),
            node_port: node.port,
            previous_reported_state: node.reported_state,
            new_goal_state,
            sync_state: node.sync_state,
            reported_lsn: node.reported_lsn,
            candidate_priority: node.candidate_priority,
            replication_quorum: node.replication_quorum,
            description,
            recorded_at: now,
        }
    }

    async fn group_of(&self, node_id: NodeId) -> Result<GroupId> {
        self.store.node_group(node_id).await.map_err(ServiceError::from)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use quorumkeeper_engine::VirtualClock;
    use quorumkeeper_store::{BroadcastSink, InMemoryStore};
    use quorumkeeper_types::{FormationId, FormationKind, FormationRecord, GroupId, HealthTag, SyncState};

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

    fn service(
        store: Arc<InMemoryStore>,
        sink: Arc<BroadcastSink>,
    ) -> CoordinatorService<InMemoryStore, BroadcastSink, VirtualClock> {
        CoordinatorService::new(store, sink, VirtualClock::at(Utc::now()))
    }

    #[tokio::test]
    async fn register_node_rejects_formation_kind_mismatch() {
        let store = Arc::new(InMemoryStore::new());
        let formation_id = FormationId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        let svc = service(store, Arc::new(BroadcastSink::default()));

        let n = node(1, formation_id, GroupId::new(1), ReplicationState::WaitStandby);
        let err = svc.register_node(FormationKind::Sharded, n).await.unwrap_err();
        assert!(matches!(err, ServiceError::FormationKindMismatch { .. }));
    }

    #[tokio::test]
    async fn node_active_on_sole_node_triggers_r1_and_emits_an_event() {
        let store = Arc::new(InMemoryStore::new());
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        let svc = service(store.clone(), Arc::new(BroadcastSink::default()));

        svc.register_node(
            FormationKind::Plain,
            node(1, formation_id, group_id, ReplicationState::WaitStandby),
        )
        .await
        .unwrap();

        svc.node_active(NodeId::new(1), ReplicationState::WaitStandby, 0, SyncState::Async, true)
            .await
            .unwrap();

        let snapshot = store.load_group(group_id).await.unwrap();
        assert_eq!(snapshot.nodes[0].goal_state, ReplicationState::Single);
    }

    #[tokio::test]
    async fn node_active_with_no_matching_rule_is_a_silent_no_op() {
        let store = Arc::new(InMemoryStore::new());
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        let svc = service(store.clone(), Arc::new(BroadcastSink::default()));

        svc.register_node(FormationKind::Plain, node(1, formation_id, group_id, ReplicationState::Single))
            .await
            .unwrap();

        svc.node_active(NodeId::new(1), ReplicationState::Single, 0, SyncState::Async, true)
            .await
            .unwrap();

        let snapshot = store.load_group(group_id).await.unwrap();
        assert_eq!(snapshot.nodes[0].goal_state, ReplicationState::Single);
    }

    #[tokio::test]
    async fn node_active_with_stale_lsn_still_applies_other_fields_but_produces_no_assignment() {
        let store = Arc::new(InMemoryStore::new());
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        let mut n = node(1, formation_id, group_id, ReplicationState::Secondary);
        n.reported_lsn = 200;
        store.register_node(n).await.unwrap();
        let svc = service(store.clone(), Arc::new(BroadcastSink::default()));

        svc.node_active(NodeId::new(1), ReplicationState::Secondary, 100, SyncState::Sync, true)
            .await
            .unwrap();

        let snapshot = store.load_group(group_id).await.unwrap();
        let n = &snapshot.nodes[0];
        assert_eq!(n.reported_lsn, 200, "LSN regression is rejected");
        assert_eq!(n.sync_state, SyncState::Sync, "other reported fields still apply");
        assert_eq!(n.goal_state, ReplicationState::Secondary, "no assignment produced for a stale report");
    }

    #[tokio::test]
    async fn set_replication_settings_updates_fields_and_assigns_apply_settings_to_the_primary() {
        let store = Arc::new(InMemoryStore::new());
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        store
            .register_node(node(1, formation_id, group_id, ReplicationState::Primary))
            .await
            .unwrap();
        let svc = service(store.clone(), Arc::new(BroadcastSink::default()));

        svc.set_replication_settings(NodeId::new(1), 50, false).await.unwrap();

        let snapshot = store.load_group(group_id).await.unwrap();
        let n = &snapshot.nodes[0];
        assert_eq!(n.candidate_priority, 50);
        assert!(!n.replication_quorum);
        assert_eq!(n.goal_state, ReplicationState::ApplySettings);
    }

    #[tokio::test]
    async fn set_replication_settings_on_a_non_primary_updates_fields_without_a_goal_change() {
        let store = Arc::new(InMemoryStore::new());
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        store
            .register_node(node(1, formation_id, group_id, ReplicationState::Secondary))
            .await
            .unwrap();
        let svc = service(store.clone(), Arc::new(BroadcastSink::default()));

        svc.set_replication_settings(NodeId::new(1), 0, false).await.unwrap();

        let snapshot = store.load_group(group_id).await.unwrap();
        let n = &snapshot.nodes[0];
        assert_eq!(n.candidate_priority, 0);
        assert!(!n.replication_quorum);
        assert_eq!(n.goal_state, ReplicationState::Secondary, "only the primary is round-tripped through apply_settings");
    }

    #[tokio::test]
    async fn set_replication_settings_round_trips_through_r13_once_the_primary_reports_back() {
        let store = Arc::new(InMemoryStore::new());
        let formation_id = FormationId::new(1);
        let group_id = GroupId::new(1);
        store.seed_formation(FormationRecord::plain(formation_id));
        store
            .register_node(node(1, formation_id, group_id, ReplicationState::Primary))
            .await
            .unwrap();
        let svc = service(store.clone(), Arc::new(BroadcastSink::default()));

        svc.set_replication_settings(NodeId::new(1), 50, true).await.unwrap();
        svc.node_active(NodeId::new(1), ReplicationState::ApplySettings, 0, SyncState::Async, true)
            .await
            .unwrap();

        let snapshot = store.load_group(group_id).await.unwrap();
        assert_eq!(snapshot.nodes[0].goal_state, ReplicationState::Primary);
    }
}
