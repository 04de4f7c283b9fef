//! Clock abstraction (spec.md §9 "Global timers").
//!
//! The engine itself never reads a clock; `now` and `processStartTime`
//! are parameters to `evaluate`. This trait exists for the shell
//! (`quorumkeeper-service`) so production code reads the wall clock and
//! tests inject a virtual one.

use chrono::{DateTime, Utc};

/// Produces the current time. Implemented by `SystemClock` in
/// production and by a fixed/advance-able clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that returns a fixed, externally-advanced instant. Used by
/// unit and property tests that need deterministic control over
/// `isUnhealthy`/`drainExpired` timing without sleeping.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    now: std::sync::Arc<std::sync::atomic::AtomicI64>,
}

impl VirtualClock {
    pub fn at(initial: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Arc::new(std::sync::atomic::AtomicI64::new(initial.timestamp_millis())),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.now
            .store(instant.timestamp_millis(), std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.now.load(std::sync::atomic::Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).expect("virtual clock millis always in range")
    }
}
