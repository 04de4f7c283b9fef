//! The closed replication-state vocabulary.
//!
//! [`ReplicationState`] is the total enumeration of node lifecycle
//! positions. Every transition rule in `quorumkeeper-engine` matches
//! exhaustively over this type; adding a variant without updating the
//! engine's rule set is a compile error there, not a silent gap here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node's lifecycle position, as either its `reportedState` (last
/// confirmed by the agent) or its `goalState` (last assigned by the
/// coordinator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationState {
    /// Sole node in the group; accepts writes; no replication.
    Single,
    /// Writable primary with no synchronously-connected healthy standby.
    WaitPrimary,
    /// Writable primary with at least one healthy synchronous standby.
    Primary,
    /// Primary preparing a replication slot and auth entries for a joiner.
    JoinPrimary,
    /// Primary applying a change in replication properties.
    ApplySettings,
    /// New node waiting for the primary to admit it.
    WaitStandby,
    /// Standby streaming but not yet caught up to the lag threshold.
    #[serde(rename = "catchingup")]
    CatchingUp,
    /// Healthy standby, caught up, eligible for promotion.
    Secondary,
    /// Chosen standby finishing replay before cutting off replication.
    PreparePromotion,
    /// Chosen standby has stopped replaying, about to accept writes.
    StopReplication,
    /// Former primary given a bounded window to self-fence.
    DemoteTimeout,
    /// Former primary shutting down writes.
    Draining,
    /// Former primary fully down; eligible to rejoin as standby.
    Demoted,
}

impl ReplicationState {
    /// All states a node can be assigned, in declaration order. Used by
    /// property tests to enumerate the closed set exhaustively.
    pub const ALL: [ReplicationState; 13] = [
        ReplicationState::Single,
        ReplicationState::WaitPrimary,
        ReplicationState::Primary,
        ReplicationState::JoinPrimary,
        ReplicationState::ApplySettings,
        ReplicationState::WaitStandby,
        ReplicationState::CatchingUp,
        ReplicationState::Secondary,
        ReplicationState::PreparePromotion,
        ReplicationState::StopReplication,
        ReplicationState::DemoteTimeout,
        ReplicationState::Draining,
        ReplicationState::Demoted,
    ];

    /// `true` for the states in which a node is, or is becoming, the
    /// writable primary (invariant 1: at most one per group).
    pub fn is_primary_like(self) -> bool {
        matches!(
            self,
            ReplicationState::Single
                | ReplicationState::WaitPrimary
                | ReplicationState::Primary
                | ReplicationState::JoinPrimary
                | ReplicationState::ApplySettings
        )
    }

    /// `true` for the states a standby passes through on its way to, or
    /// while holding, `secondary`/promotion-candidate status.
    pub fn is_standby_like(self) -> bool {
        matches!(
            self,
            ReplicationState::WaitStandby
                | ReplicationState::CatchingUp
                | ReplicationState::Secondary
                | ReplicationState::PreparePromotion
                | ReplicationState::StopReplication
        )
    }

    /// `true` for the states a former primary passes through while being
    /// fenced and retired, on its way to rejoining as a standby.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReplicationState::DemoteTimeout | ReplicationState::Draining | ReplicationState::Demoted
        )
    }
}

impl fmt::Display for ReplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReplicationState::Single => "single",
            ReplicationState::WaitPrimary => "wait_primary",
            ReplicationState::Primary => "primary",
            ReplicationState::JoinPrimary => "join_primary",
            ReplicationState::ApplySettings => "apply_settings",
            ReplicationState::WaitStandby => "wait_standby",
            ReplicationState::CatchingUp => "catchingup",
            ReplicationState::Secondary => "secondary",
            ReplicationState::PreparePromotion => "prepare_promotion",
            ReplicationState::StopReplication => "stop_replication",
            ReplicationState::DemoteTimeout => "demote_timeout",
            ReplicationState::Draining => "draining",
            ReplicationState::Demoted => "demoted",
        };
        f.write_str(s)
    }
}

/// The synchronous-replication role a standby reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Async,
    Potential,
    Sync,
    Quorum,
}

/// A node's externally-observed health, as last seen by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthTag {
    Good,
    Bad,
    #[default]
    Unknown,
}

/// Whether a formation is a plain replica set or one shard group among
/// several sharing a routing layer (rules R5, R8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationKind {
    Plain,
    Sharded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_like_and_standby_like_and_terminal_are_disjoint() {
        for s in ReplicationState::ALL {
            let flags = [s.is_primary_like(), s.is_standby_like(), s.is_terminal()];
            assert!(
                flags.iter().filter(|f| **f).count() <= 1,
                "state {s} belongs to more than one exclusive set"
            );
        }
    }

    #[test]
    fn display_round_trips_through_serde_rename() {
        for s in ReplicationState::ALL {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{s}\""));
        }
    }
}
