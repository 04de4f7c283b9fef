//! Errors for the coordinator service layer.

use std::path::PathBuf;

use quorumkeeper_types::{FormationId, NodeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Store(#[from] quorumkeeper_store::StoreError),

    #[error("formation {formation_id} is {declared_kind:?}-kind; group id {group_id} requires a sharded formation")]
    FormationKindMismatch {
        formation_id: FormationId,
        declared_kind: quorumkeeper_types::FormationKind,
        group_id: quorumkeeper_types::GroupId,
    },

    #[error("node {0} reported a replication state outside the closed enumeration: {1:?}")]
    UnknownStateValue(NodeId, String),

    /// The engine reported spec.md §7 error kind 1: the snapshot handed
    /// to `evaluate` was inconsistent (no primary could be located, or
    /// the reporting node itself was missing from its own group).
    #[error("inconsistent snapshot for node {0}: {1:?}")]
    InconsistentSnapshot(NodeId, quorumkeeper_engine::Diagnostic),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
