//! # quorumkeeper-types: Core data model for the Quorumkeeper failover coordinator
//!
//! Shared types used across the coordinator:
//! - Identifiers ([`FormationId`], [`GroupId`], [`NodeId`])
//! - Replication vocabulary ([`ReplicationState`], [`SyncState`], [`HealthTag`])
//! - Formation kind and thresholds ([`FormationKind`], [`FormationRecord`])
//! - Node rows ([`NodeRecord`])
//!
//! This crate has no I/O and no async; it is plain data plus the pure
//! predicates that only depend on a single record (`is_primary_like`,
//! `is_standby_like`, `is_terminal`, `is_current_state`). The transition
//! engine that reasons across multiple records lives in
//! `quorumkeeper-engine`.

mod formation;
mod ids;
mod node;
mod state;

pub use formation::FormationRecord;
pub use ids::{FormationId, GroupId, NodeId};
pub use node::NodeRecord;
pub use state::{FormationKind, HealthTag, ReplicationState, SyncState};
