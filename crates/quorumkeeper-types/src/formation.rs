//! Formation-scoped configuration: kind, lag thresholds, and timers.

use serde::{Deserialize, Serialize};

use crate::ids::FormationId;
use crate::state::FormationKind;

/// Thresholds and timers the transition engine treats as inputs, not
/// constants (spec.md §3). Units are milliseconds for timers and opaque
/// LSN distance for thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationRecord {
    pub formation_id: FormationId,
    pub kind: FormationKind,
    pub enable_sync_lag_threshold: u64,
    pub promote_lag_threshold: u64,
    pub drain_timeout_ms: i64,
    pub unhealthy_timeout_ms: i64,
    pub startup_grace_ms: i64,
}

impl FormationRecord {
    /// A plain (unsharded) formation with the literal thresholds used by
    /// spec.md §8's end-to-end scenarios.
    pub fn plain(formation_id: FormationId) -> Self {
        Self {
            formation_id,
            kind: FormationKind::Plain,
            enable_sync_lag_threshold: 16 * 1024 * 1024,
            promote_lag_threshold: 16 * 1024 * 1024,
            drain_timeout_ms: 30_000,
            unhealthy_timeout_ms: 20_000,
            startup_grace_ms: 10_000,
        }
    }
}
