//! On-disk configuration for the coordinator service.

use std::fs;
use std::path::Path;

use quorumkeeper_types::{FormationId, FormationKind};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Top-level service configuration: every formation the coordinator
/// manages, loaded from a single TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the coordinator's report-ingress listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    pub formations: Vec<FormationConfig>,
}

fn default_bind_address() -> String {
    "127.0.0.1:8431".to_string()
}

/// One formation's durable configuration (spec.md §3 `FormationRecord`,
/// minus the id which is assigned at registration time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationConfig {
    pub formation_id: i64,
    #[serde(default)]
    pub kind: FormationConfigKind,
    #[serde(default = "default_lag_threshold")]
    pub enable_sync_lag_threshold: u64,
    #[serde(default = "default_lag_threshold")]
    pub promote_lag_threshold: u64,
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: i64,
    #[serde(default = "default_unhealthy_timeout_ms")]
    pub unhealthy_timeout_ms: i64,
    #[serde(default = "default_startup_grace_ms")]
    pub startup_grace_ms: i64,
}

fn default_lag_threshold() -> u64 {
    16 * 1024 * 1024
}

fn default_drain_timeout_ms() -> i64 {
    30_000
}

fn default_unhealthy_timeout_ms() -> i64 {
    20_000
}

fn default_startup_grace_ms() -> i64 {
    10_000
}

/// The wire/TOML-facing mirror of `quorumkeeper_types::FormationKind`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationConfigKind {
    #[default]
    Plain,
    Sharded,
}

impl From<FormationConfigKind> for FormationKind {
    fn from(value: FormationConfigKind) -> Self {
        match value {
            FormationConfigKind::Plain => FormationKind::Plain,
            FormationConfigKind::Sharded => FormationKind::Sharded,
        }
    }
}

impl FormationConfig {
    pub fn to_record(&self) -> quorumkeeper_types::FormationRecord {
        quorumkeeper_types::FormationRecord {
            formation_id: FormationId::new(self.formation_id),
            kind: self.kind.into(),
            enable_sync_lag_threshold: self.enable_sync_lag_threshold,
            promote_lag_threshold: self.promote_lag_threshold,
            drain_timeout_ms: self.drain_timeout_ms,
            unhealthy_timeout_ms: self.unhealthy_timeout_ms,
            startup_grace_ms: self.startup_grace_ms,
        }
    }
}

impl ServiceConfig {
    /// Loads service configuration from a TOML file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ServiceError::ConfigNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(ServiceError::Io)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Writes service configuration to a TOML file, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ServiceError::Io)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(ServiceError::Io)?;
        Ok(())
    }
}
