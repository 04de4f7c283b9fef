//! Health, unhealth, lag, and drain predicates (spec.md §4.1).
//!
//! Every predicate here is a pure function of one or two node records plus
//! the clock readings and formation timers the caller supplies. None of
//! them read a clock themselves (spec.md §9 "Global timers": unit tests
//! inject a virtual clock).

use chrono::{DateTime, Duration, Utc};
use quorumkeeper_types::{NodeRecord, ReplicationState};

/// `isHealthy(n) ≡ n.health = good ∧ n.pgIsRunning`.
pub fn is_healthy(n: &NodeRecord) -> bool {
    n.health == quorumkeeper_types::HealthTag::Good && n.pg_is_running
}

/// `isUnhealthy(n)`, including the startup-grace clause that prevents
/// false positives right after the coordinator restarts.
pub fn is_unhealthy(
    n: &NodeRecord,
    now: DateTime<Utc>,
    process_start_time: DateTime<Utc>,
    unhealthy_timeout_ms: i64,
    startup_grace_ms: i64,
) -> bool {
    if !n.pg_is_running {
        return true;
    }
    let report_stale = now - n.report_time > Duration::milliseconds(unhealthy_timeout_ms);
    let is_bad = n.health == quorumkeeper_types::HealthTag::Bad;
    let checked_since_start = n.health_check_time > process_start_time;
    let grace_elapsed = now - process_start_time > Duration::milliseconds(startup_grace_ms);
    report_stale && is_bad && checked_since_start && grace_elapsed
}

/// `lagWithin(a, b, δ)`. Takes `Option` because the vacuous case ("if
/// both nodes are absent, returns true") only makes sense when a or b
/// may not exist — callers that always have both nodes in hand should
/// just wrap them in `Some`.
pub fn lag_within(a: Option<&NodeRecord>, b: Option<&NodeRecord>, threshold: u64) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.reported_lsn != 0 && b.reported_lsn != 0 && a.reported_lsn.abs_diff(b.reported_lsn) <= threshold
        }
        _ => false,
    }
}

/// `drainExpired(n) ≡ n.goalState = demote_timeout ∧ (now − n.stateChangeTime > drainTimeoutMs)`.
pub fn drain_expired(n: &NodeRecord, now: DateTime<Utc>, drain_timeout_ms: i64) -> bool {
    n.goal_state == ReplicationState::DemoteTimeout
        && now - n.state_change_time > Duration::milliseconds(drain_timeout_ms)
}
