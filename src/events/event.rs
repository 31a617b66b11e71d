//! # Lifecycle events emitted by the registry.
//!
//! The [`EventKind`] enum classifies events in three groups:
//! - **Registration events**: services added, removed or pruned
//! - **Per-service startup events**: starting, started, failed, timed out, ready
//! - **Cohort events**: a `start(prefix)` cycle beginning and completing
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use registrar::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StartTimeoutHit)
//!     .with_service("db")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::StartTimeoutHit);
//! assert_eq!(ev.service.as_deref(), Some("db"));
//! assert_eq!(ev.timeout_ms, Some(5000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registration ===
    /// A service object was registered (possibly replacing another).
    ///
    /// Sets: `service`
    ServiceRegistered,

    /// A service object was unregistered.
    ///
    /// Sets: `service`
    ServiceUnregistered,

    /// A service was removed because one of its requirements is missing.
    ///
    /// Sets: `service`, `reason` (missing requirement names)
    ServicePruned,

    // === Startup cycle ===
    /// A `start(prefix)` cycle selected its cohort and is about to invoke `start`.
    ///
    /// Sets: `prefix`
    CohortStarting,

    /// `start` is being invoked on a service.
    ///
    /// Sets: `service`
    ServiceStarting,

    /// A service's `start` fulfilled.
    ///
    /// Sets: `service`
    ServiceStarted,

    /// A service's `start` failed or was rejected.
    ///
    /// Sets: `service`, `reason`
    ServiceStartFailed,

    /// A service's `start` exceeded `Config::start_timeout`
    /// (always followed by `ServiceStartFailed`).
    ///
    /// Sets: `service`, `timeout_ms`
    StartTimeoutHit,

    /// `ready` was dispatched to a service.
    ///
    /// Sets: `service`
    ServiceReady,

    /// The whole cohort finished startup and the registry fired `ready`.
    ///
    /// Sets: `prefix`
    CohortReady,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Service name, if applicable.
    pub service: Option<Arc<str>>,
    /// Cohort prefix, if applicable.
    pub prefix: Option<Arc<str>>,
    /// Human-readable reason (errors, missing requirements).
    pub reason: Option<Arc<str>>,
    /// Start timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            prefix: None,
            reason: None,
            timeout_ms: None,
        }
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a cohort prefix.
    #[inline]
    pub fn with_prefix(mut self, prefix: impl Into<Arc<str>>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Returns `true` for events reporting a failed or timed-out `start`.
    #[inline]
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ServiceStartFailed | EventKind::StartTimeoutHit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::ServiceStarting);
        let b = Event::new(EventKind::ServiceStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn timeout_saturates_at_u32() {
        let ev = Event::new(EventKind::StartTimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
        assert!(ev.is_startup_failure());
    }
}
