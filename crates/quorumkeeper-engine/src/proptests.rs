//! Property tests for the quantified invariants of spec.md §8.
//!
//! Snapshots are generated so that invariant 1 (at most one primary-like
//! *goal* state per group) already holds before `evaluate` runs — the
//! engine's contract is to preserve invariants across a transition, not
//! to repair snapshots that were already broken by some other bug.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use quorumkeeper_types::{
    FormationId, FormationKind, FormationRecord, GroupId, HealthTag, NodeId, NodeRecord, ReplicationState, SyncState,
};

use crate::evaluate;

const PRIMARY_LIKE: [ReplicationState; 5] = [
    ReplicationState::Single,
    ReplicationState::WaitPrimary,
    ReplicationState::Primary,
    ReplicationState::JoinPrimary,
    ReplicationState::ApplySettings,
];

const NON_PRIMARY_LIKE: [ReplicationState; 8] = [
    ReplicationState::WaitStandby,
    ReplicationState::CatchingUp,
    ReplicationState::Secondary,
    ReplicationState::PreparePromotion,
    ReplicationState::StopReplication,
    ReplicationState::DemoteTimeout,
    ReplicationState::Draining,
    ReplicationState::Demoted,
];

fn formation_strategy() -> impl Strategy<Value = FormationRecord> {
    prop_oneof![Just(FormationKind::Plain), Just(FormationKind::Sharded)].prop_map(|kind| FormationRecord {
        formation_id: FormationId::new(1),
        kind,
        enable_sync_lag_threshold: 16 * 1024 * 1024,
        promote_lag_threshold: 16 * 1024 * 1024,
        drain_timeout_ms: 30_000,
        unhealthy_timeout_ms: 20_000,
        startup_grace_ms: 10_000,
    })
}

#[allow(clippy::too_many_arguments)]
fn mk_node(
    id: i64,
    state: ReplicationState,
    lsn: u64,
    healthy: bool,
    priority: u32,
    quorum: bool,
    now: DateTime<Utc>,
) -> NodeRecord {
    NodeRecord {
        node_id: NodeId::new(id),
        formation_id: FormationId::new(1),
        group_id: GroupId::new(1),
        name: format!("n{id}"),
        port: 5432,
        reported_state: state,
        goal_state: state,
        reported_lsn: lsn,
        sync_state: SyncState::Async,
        pg_is_running: healthy,
        health: if healthy { HealthTag::Good } else { HealthTag::Bad },
        candidate_priority: priority,
        replication_quorum: quorum,
        report_time: now,
        health_check_time: now,
        state_change_time: now,
    }
}

/// A group of 1–4 nodes with at most one primary-like node, converged
/// (`reportedState == goalState`), ready to feed into `evaluate`.
fn group_strategy() -> impl Strategy<Value = Vec<NodeRecord>> {
    (1usize..=4, 0..PRIMARY_LIKE.len(), proptest::bool::ANY).prop_flat_map(|(count, primary_idx, has_primary)| {
        let lsn_strategy = 0u64..200;
        let health_strategy = proptest::bool::ANY;
        let priority_strategy = 0u32..200;
        let quorum_strategy = proptest::bool::ANY;
        let non_primary_idx_strategy = 0..NON_PRIMARY_LIKE.len();

        (
            Just(count),
            Just(primary_idx),
            has_primary,
            proptest::collection::vec(lsn_strategy.clone(), count),
            proptest::collection::vec(health_strategy, count),
            proptest::collection::vec(priority_strategy, count),
            proptest::collection::vec(quorum_strategy, count),
            proptest::collection::vec(non_primary_idx_strategy, count),
        )
            .prop_map(
                move |(count, primary_idx, has_primary, lsns, healths, priorities, quorums, non_primary_idxs)| {
                    let now = Utc::now();
                    let mut nodes = Vec::with_capacity(count);
                    for i in 0..count {
                        let state = if has_primary && i == 0 {
                            PRIMARY_LIKE[primary_idx]
                        } else {
                            NON_PRIMARY_LIKE[non_primary_idxs[i]]
                        };
                        nodes.push(mk_node(
                            i as i64 + 1,
                            state,
                            lsns[i],
                            healths[i],
                            priorities[i],
                            quorums[i],
                            now,
                        ));
                    }
                    nodes
                },
            )
    })
}

fn primary_like_goal_count(nodes: &[NodeRecord]) -> usize {
    nodes.iter().filter(|n| n.goal_state.is_primary_like()).count()
}

fn apply(nodes: &[NodeRecord], assignments: &[crate::Assignment]) -> Vec<NodeRecord> {
    let mut out = nodes.to_vec();
    for a in assignments {
        if let Some(n) = out.iter_mut().find(|n| n.node_id == a.node_id) {
            n.goal_state = a.new_goal_state;
        }
    }
    out
}

proptest! {
    /// Invariant 1: at most one node's goal state is primary-like, both
    /// before and after a transition.
    #[test]
    fn at_most_one_primary_like_goal(nodes in group_strategy(), formation in formation_strategy()) {
        prop_assume!(primary_like_goal_count(&nodes) <= 1);
        let now = Utc::now();
        let process_start = now - Duration::hours(1);
        for reporter in &nodes {
            let out = evaluate(reporter.node_id, &nodes, &formation, now, process_start);
            let after = apply(&nodes, &out.assignments);
            prop_assert!(primary_like_goal_count(&after) <= 1);
        }
    }

    /// Invariant 2: a `secondary` goal implies some primary-like goal
    /// exists in the same group.
    #[test]
    fn secondary_implies_a_primary_exists(nodes in group_strategy(), formation in formation_strategy()) {
        prop_assume!(primary_like_goal_count(&nodes) <= 1);
        let now = Utc::now();
        let process_start = now - Duration::hours(1);
        for reporter in &nodes {
            let out = evaluate(reporter.node_id, &nodes, &formation, now, process_start);
            let after = apply(&nodes, &out.assignments);
            let has_secondary = after.iter().any(|n| n.goal_state == ReplicationState::Secondary);
            let has_primary = primary_like_goal_count(&after) >= 1;
            prop_assert!(!has_secondary || has_primary);
        }
    }

    /// The engine is deterministic and pure: calling it twice with the
    /// same snapshot (which it never mutates) yields identical output.
    #[test]
    fn deterministic_and_pure(nodes in group_strategy(), formation in formation_strategy()) {
        let now = Utc::now();
        let process_start = now - Duration::hours(1);
        for reporter in &nodes {
            let before = nodes.clone();
            let first = evaluate(reporter.node_id, &nodes, &formation, now, process_start);
            prop_assert_eq!(&nodes, &before, "evaluate must not mutate its snapshot");
            let second = evaluate(reporter.node_id, &nodes, &formation, now, process_start);
            prop_assert_eq!(first, second);
        }
    }

    /// Invariant 3: `stop_replication` is only ever assigned alongside a
    /// simultaneous `demote_timeout` for some other node in the same
    /// invocation.
    #[test]
    fn stop_replication_implies_simultaneous_demote_timeout(nodes in group_strategy(), formation in formation_strategy()) {
        prop_assume!(primary_like_goal_count(&nodes) <= 1);
        let now = Utc::now();
        let process_start = now - Duration::hours(1);
        for reporter in &nodes {
            let out = evaluate(reporter.node_id, &nodes, &formation, now, process_start);
            let assigns_stop_replication = out.assignments.iter().any(|a| a.new_goal_state == ReplicationState::StopReplication);
            if assigns_stop_replication {
                let assigns_demote_timeout = out.assignments.iter().any(|a| a.new_goal_state == ReplicationState::DemoteTimeout);
                prop_assert!(assigns_demote_timeout);
            }
        }
    }

    /// Invariant 5: a standby with priority 0 or quorum=false is never
    /// assigned `prepare_promotion`.
    #[test]
    fn never_promotes_non_candidates(nodes in group_strategy(), formation in formation_strategy()) {
        prop_assume!(primary_like_goal_count(&nodes) <= 1);
        let now = Utc::now();
        let process_start = now - Duration::hours(1);
        for reporter in &nodes {
            let out = evaluate(reporter.node_id, &nodes, &formation, now, process_start);
            for a in &out.assignments {
                if a.new_goal_state == ReplicationState::PreparePromotion {
                    let n = nodes.iter().find(|n| n.node_id == a.node_id).unwrap();
                    prop_assert!(n.candidate_priority > 0 && n.replication_quorum);
                }
            }
        }
    }
}
