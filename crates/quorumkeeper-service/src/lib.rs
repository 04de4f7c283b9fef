//! # quorumkeeper-service: the coordinator shell
//!
//! Combines `quorumkeeper-engine`'s pure transition logic with
//! `quorumkeeper-store`'s persistence/notification seam into the four
//! operator-facing operations spec.md §6 names, plus TOML configuration
//! loading and a `clap`-derived CLI binary.

mod config;
mod coordinator;
mod error;

pub use config::{FormationConfig, FormationConfigKind, ServiceConfig};
pub use coordinator::CoordinatorService;
pub use error::{Result, ServiceError};
