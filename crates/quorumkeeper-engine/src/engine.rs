//! The transition engine (spec.md §4.2): a pure function from a group
//! snapshot plus a reporting node to a list of goal-state assignments.
//!
//! Rules are evaluated in the numeric order of spec.md §4.2 (R1..R13);
//! the first matching rule fires and `evaluate` returns immediately. At
//! most one rule fires per invocation, except R12, which can itself
//! produce several `catchingup` demotions alongside at most one
//! primary-like reassignment (spec.md: "At most one primary-like
//! assignment is produced per invocation").

use chrono::{DateTime, Utc};
use quorumkeeper_types::{FormationKind, FormationRecord, NodeId, NodeRecord, ReplicationState};

use crate::assignment::{Assignment, Diagnostic, EngineOutput};
use crate::predicates::{drain_expired, is_healthy, is_unhealthy, lag_within};

use ReplicationState::*;

/// Scans for "P", the group's primary — current or in the process of
/// being retired. spec.md §4.2 defines P as "the current primary-like
/// node", but R5–R9 assign P through `draining`/`demote_timeout`/
/// `demoted`, none of which are primary-like; a literal reading of the
/// definition would lose track of P the moment R4 demotes it. P is
/// therefore any node on the primary line — primary-like *or* in the
/// ex-primary retirement chain — since exactly one node occupies that
/// line at a time and a reporting standby is never on it.
/// `reporting_id` is excluded from the search: a reporting node whose
/// own state happens to be on the primary line (e.g. `demoted` rejoining
/// in R9, or the terminal states an ex-primary reports through) must
/// never be mistaken for its own P.
fn find_primary_like(nodes: &[NodeRecord], reporting_id: NodeId) -> Option<&NodeRecord> {
    fn on_primary_line(s: ReplicationState) -> bool {
        s.is_primary_like() || s.is_terminal()
    }
    nodes
        .iter()
        .filter(|n| n.node_id != reporting_id)
        .find(|n| on_primary_line(n.reported_state) || on_primary_line(n.goal_state))
}

/// Runs the transition engine for one report.
///
/// `nodes` must include `reporting_id` itself (spec.md §4.2 signature:
/// "the full list of nodes in its group, including itself").
pub fn evaluate(
    reporting_id: NodeId,
    nodes: &[NodeRecord],
    formation: &FormationRecord,
    now: DateTime<Utc>,
    process_start_time: DateTime<Utc>,
) -> EngineOutput {
    let Some(reporting) = nodes.iter().find(|n| n.node_id == reporting_id) else {
        return EngineOutput::with_diagnostic(Diagnostic::ReportingNodeNotFound);
    };

    // R1 — sole node collapse. Evaluated unconditionally first: it is
    // the one rule that legitimately fires regardless of whether the
    // reporting node currently looks primary-like (spec.md §9 Open
    // Question (b) notes the source is inconsistent about which rules
    // the "reporting is/isn't primary-like" grouping applies to; R1's
    // own guard is unambiguous and takes priority as rule #1).
    if nodes.len() == 1 && reporting.reported_state != Single {
        return EngineOutput::single(Assignment::new(
            reporting.node_id,
            Single,
            format!("{} is the only node in the group; collapsing to single", reporting.name),
        ));
    }

    let primary = find_primary_like(nodes, reporting.node_id);

    // Rules R2, R3, R4, R6, R7, R9 all require a locatable primary-like
    // node. When the reporting node's own state makes one of them the
    // rule that *should* fire, but no primary can be found, that is
    // spec.md §7 error kind 1 ("inconsistent snapshot"), not a normal
    // unmatched transition.
    let needs_primary = matches!(
        reporting.reported_state,
        WaitStandby | CatchingUp | Secondary | PreparePromotion | StopReplication | Demoted
    );
    if needs_primary && primary.is_none() {
        return EngineOutput::with_diagnostic(Diagnostic::PrimaryNotLocatable);
    }

    // R2 — standby admitted. Guards on P's own `is_current_state`, so a
    // primary that was just assigned `wait_primary` by R10 in this same
    // report cycle (reported state not yet converged) will not admit a
    // standby until its agent reports `wait_primary` back. A caller that
    // processes one report to completion before the next (spec.md §5)
    // sees this resolve on the primary's very next heartbeat.
    if reporting.is_current_state(WaitStandby) {
        if let Some(p) = primary {
            if p.is_current_state(WaitPrimary) || p.is_current_state(JoinPrimary) {
                return EngineOutput::single(Assignment::new(
                    reporting.node_id,
                    CatchingUp,
                    format!("{} admitted by primary; starting catch-up", reporting.name),
                ));
            }
        }
    }

    // R3 — caught up.
    if reporting.is_current_state(CatchingUp) {
        if let Some(p) = primary {
            if (p.is_current_state(WaitPrimary) || p.is_current_state(JoinPrimary))
                && is_healthy(reporting)
                && lag_within(Some(reporting), Some(p), formation.enable_sync_lag_threshold)
            {
                return EngineOutput {
                    assignments: vec![
                        Assignment::new(
                            reporting.node_id,
                            Secondary,
                            format!("{} caught up; now a synchronous standby", reporting.name),
                        ),
                        Assignment::new(
                            p.node_id,
                            Primary,
                            format!("{} has a synchronous standby; enabling synchronous replication", p.name),
                        ),
                    ],
                    diagnostic: None,
                };
            }
        }
    }

    // R4 — primary failed, standby will take over.
    if reporting.is_current_state(Secondary) {
        if let Some(p) = primary {
            if p.goal_state.is_primary_like()
                && is_unhealthy(p, now, process_start_time, formation.unhealthy_timeout_ms, formation.startup_grace_ms)
                && is_healthy(reporting)
                && lag_within(Some(reporting), Some(p), formation.promote_lag_threshold)
                && reporting.candidate_priority > 0
                && reporting.replication_quorum
            {
                return EngineOutput {
                    assignments: vec![
                        Assignment::new(
                            reporting.node_id,
                            PreparePromotion,
                            format!("{} promoting after {} became unhealthy", reporting.name, p.name),
                        ),
                        Assignment::new(p.node_id, Draining, format!("{} draining ahead of failover", p.name)),
                    ],
                    diagnostic: None,
                };
            }
        }
    }

    // R5 — sharded short-cut out of prepare_promotion.
    if reporting.is_current_state(PreparePromotion) && formation.kind == FormationKind::Sharded && reporting.group_id.is_positive() {
        let p = primary.expect("checked by needs_primary above");
        return EngineOutput {
            assignments: vec![
                Assignment::new(
                    reporting.node_id,
                    WaitPrimary,
                    format!("{} promoted; routing layer already fenced old primary", reporting.name),
                ),
                Assignment::new(p.node_id, Demoted, format!("{} demoted (sharded short-cut)", p.name)),
            ],
            diagnostic: None,
        };
    }

    // R6 — promotion commit (general case).
    if reporting.is_current_state(PreparePromotion) {
        let p = primary.expect("checked by needs_primary above");
        return EngineOutput {
            assignments: vec![
                Assignment::new(
                    reporting.node_id,
                    StopReplication,
                    format!("{} stopping replication ahead of promotion", reporting.name),
                ),
                Assignment::new(p.node_id, DemoteTimeout, format!("{} given bounded window to self-fence", p.name)),
            ],
            diagnostic: None,
        };
    }

    // R7 — drain complete.
    if reporting.is_current_state(StopReplication) {
        if let Some(p) = primary {
            if p.is_current_state(DemoteTimeout) || drain_expired(p, now, formation.drain_timeout_ms) {
                return EngineOutput {
                    assignments: vec![
                        Assignment::new(reporting.node_id, WaitPrimary, format!("{} now accepting writes", reporting.name)),
                        Assignment::new(p.node_id, Demoted, format!("{} fully demoted", p.name)),
                    ],
                    diagnostic: None,
                };
            }
        }
    }

    // R8 — sharded short-cut from stop_replication.
    if reporting.is_current_state(StopReplication) && formation.kind == FormationKind::Sharded && reporting.group_id.is_positive() {
        let p = primary.expect("checked by needs_primary above");
        return EngineOutput {
            assignments: vec![
                Assignment::new(
                    reporting.node_id,
                    WaitPrimary,
                    format!("{} promoted; routing layer already fenced old primary", reporting.name),
                ),
                Assignment::new(p.node_id, Demoted, format!("{} demoted (sharded short-cut)", p.name)),
            ],
            diagnostic: None,
        };
    }

    // R9 — rejoin.
    if reporting.is_current_state(Demoted) {
        if let Some(p) = primary {
            if p.is_current_state(WaitPrimary) {
                return EngineOutput::single(Assignment::new(
                    reporting.node_id,
                    CatchingUp,
                    format!("{} rejoining as a standby", reporting.name),
                ));
            }
        }
    }

    // R10 — first standby joins.
    if reporting.is_current_state(Single) {
        let joined = nodes.iter().find(|o| o.node_id != reporting.node_id && o.is_current_state(WaitStandby));
        if joined.is_some() {
            return EngineOutput::single(Assignment::new(
                reporting.node_id,
                WaitPrimary,
                format!("{} admitting its first standby", reporting.name),
            ));
        }
    }

    // R11 — additional standby joins.
    if reporting.is_current_state(Primary) {
        let joined = nodes.iter().find(|o| o.node_id != reporting.node_id && o.is_current_state(WaitStandby));
        if joined.is_some() {
            return EngineOutput::single(Assignment::new(
                reporting.node_id,
                JoinPrimary,
                format!("{} preparing replication slot for a new standby", reporting.name),
            ));
        }
    }

    // R12 — standby-health bookkeeping and synchronous-replication guard.
    if reporting.is_current_state(Primary) {
        let others: Vec<&NodeRecord> = nodes.iter().filter(|o| o.node_id != reporting.node_id).collect();
        let mut count = others.len() as i64;
        let mut assignments = Vec::new();
        let mut wait_primary_assigned = false;

        for o in &others {
            if o.is_current_state(Secondary)
                && is_unhealthy(o, now, process_start_time, formation.unhealthy_timeout_ms, formation.startup_grace_ms)
            {
                assignments.push(Assignment::new(
                    o.node_id,
                    CatchingUp,
                    format!("{} became unhealthy; demoting out of the sync quorum", o.name),
                ));
                count -= 1;
            } else if !o.replication_quorum || o.candidate_priority == 0 {
                count -= 1;
            }

            if count <= 0 && !wait_primary_assigned {
                assignments.push(Assignment::new(
                    reporting.node_id,
                    WaitPrimary,
                    format!("{} has no healthy quorum standby left; disabling synchronous replication", reporting.name),
                ));
                wait_primary_assigned = true;
            }
        }

        if !assignments.is_empty() {
            return EngineOutput {
                assignments,
                diagnostic: None,
            };
        }
    }

    // R13 — settings applied.
    if reporting.is_current_state(ApplySettings) {
        return EngineOutput::single(Assignment::new(reporting.node_id, Primary, format!("{} finished applying replication settings", reporting.name)));
    }

    // No rule fired: spec.md §7 error kind 4, a normal outcome.
    EngineOutput::empty()
}
