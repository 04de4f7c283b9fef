//! Structured events (spec.md §4.3) and the notification sink seam.

use chrono::{DateTime, Utc};
use quorumkeeper_types::{FormationId, GroupId, NodeId, ReplicationState, SyncState};

/// One structured event emitted per assignment produced by the engine.
/// Carries exactly the fields spec.md §4.3 lists.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub formation_id: FormationId,
    pub group_id: GroupId,
    pub node_id: NodeId,
    pub node_name: String,
    pub node_port: u16,
    pub previous_reported_state: ReplicationState,
    pub new_goal_state: ReplicationState,
    pub sync_state: SyncState,
    pub reported_lsn: u64,
    pub candidate_priority: u32,
    pub replication_quorum: bool,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

/// A human-readable duplicate of an [`Event`] for the `log` channel
/// (spec.md §4.3: "a human-readable duplicate for observers without
/// direct log access").
impl Event {
    pub fn to_log_line(&self) -> String {
        format!(
            "[{formation}/{group}] {name}:{port} {prev} -> {goal} ({description})",
            formation = self.formation_id,
            group = self.group_id,
            name = self.node_name,
            port = self.node_port,
            prev = self.previous_reported_state,
            goal = self.new_goal_state,
            description = self.description,
        )
    }
}

/// The two logical notification channels spec.md §4.3 and §6 name:
/// `state` (structured) and `log` (textual). A real deployment's
/// transport (the notification channel named in spec.md §1's
/// out-of-scope list) implements this over whatever pub/sub mechanism
/// it uses; `quorumkeeper-store` ships only the in-process channel
/// implementation below.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Publishes one event on the `state` channel.
    async fn publish_state(&self, event: &Event);

    /// Publishes the same event's textual rendering on the `log` channel.
    async fn publish_log(&self, event: &Event) {
        tracing::info!(target: "quorumkeeper::log", "{}", event.to_log_line());
    }
}

/// A `NotificationSink` backed by `tokio::sync::broadcast`, for
/// embedding the coordinator in a single process or for tests. Lagging
/// subscribers simply miss events, as with any broadcast channel;
/// durable delivery is the external notification transport's job.
pub struct BroadcastSink {
    state_tx: tokio::sync::broadcast::Sender<Event>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (state_tx, _rx) = tokio::sync::broadcast::channel(capacity);
        Self { state_tx }
    }

    pub fn subscribe_state(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.state_tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait::async_trait]
impl NotificationSink for BroadcastSink {
    async fn publish_state(&self, event: &Event) {
        // A send error here only means there are currently no
        // subscribers; the event was still persisted by the caller
        // before this call, so nothing is lost that matters.
        let _ = self.state_tx.send(event.clone());
    }
}
