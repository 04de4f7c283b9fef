//! Errors for the persistence/notification seam (spec.md §7).

use quorumkeeper_types::{FormationId, GroupId, NodeId};
use thiserror::Error;

/// Errors a `GroupStore` implementation can surface.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No row exists for this node id.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// No formation row exists for this formation id.
    #[error("formation {0} not found")]
    FormationNotFound(FormationId),

    /// No group snapshot could be assembled (group has been torn down
    /// between load and use, or id was never valid).
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    /// spec.md §7 error kind 2: a node row carries a state outside the
    /// closed enumeration. The typed `ReplicationState` this crate and
    /// `quorumkeeper-engine` use makes this unrepresentable in memory;
    /// an implementation backed by an external store surfaces this when
    /// a stored string fails to parse back into `ReplicationState`.
    #[error("node {0} carries a replication state outside the closed enumeration: {1:?}")]
    UnknownStateValue(NodeId, String),

    /// The underlying storage backend failed (connection, I/O, etc).
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
