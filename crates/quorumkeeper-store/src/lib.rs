//! # quorumkeeper-store: persistence and notification seam
//!
//! Defines the `GroupStore` and `NotificationSink` traits a worker uses
//! to load a consistent group snapshot, hand it to
//! `quorumkeeper_engine::evaluate`, and durably apply the result
//! (spec.md §5, §6). Ships one in-process reference implementation of
//! each (`InMemoryStore`, `BroadcastSink`); a production deployment's
//! durable backend and notification transport are out of scope
//! (spec.md §1) and live in whatever crate wires this one up.

mod error;
mod event;
mod memory;
mod snapshot;
mod store;

pub use error::{Result, StoreError};
pub use event::{BroadcastSink, Event, NotificationSink};
pub use memory::InMemoryStore;
pub use snapshot::GroupSnapshot;
pub use store::{GroupStore, ReportOutcome};
