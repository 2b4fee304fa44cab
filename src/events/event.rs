//! # Runtime events emitted by the reconciler.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Diagnostic events**: drift detected and corrected
//! - **Lifecycle events**: audit loop started / stopped
//! - **Subscriber events**: a subscriber fell behind and lost events
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! the reported/actual counts and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use countvisor::{Event, EventKind};
//!
//! let ev = Event::count_mismatch(5, 3);
//!
//! assert_eq!(ev.kind, EventKind::CountMismatch);
//! assert_eq!(ev.reported, Some(5));
//! assert_eq!(ev.actual, Some(3));
//! assert_eq!(
//!     ev.reason.as_deref(),
//!     Some("Thread count mismatch detected: reported=5, actual=3. Fixing."),
//! );
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Diagnostic events ===
    /// The live counter disagreed with the registry and was overwritten.
    ///
    /// Never emitted when the server context is quiet.
    ///
    /// Sets:
    /// - `reported`: counter value before correction
    /// - `actual`: number of linked worker records
    /// - `reason`: `Thread count mismatch detected: reported=N, actual=M. Fixing.`
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CountMismatch,

    // === Lifecycle events ===
    /// Audit loop task began running.
    ///
    /// Sets:
    /// - `interval_ms`: audit cadence (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ReconcilerStarted,

    /// Audit loop observed the stop request and exited.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ReconcilerStopped,

    // === Subscriber events ===
    /// A subscriber fell behind the bus and missed events.
    ///
    /// Delivered only to the subscriber that lagged, in place of what it missed.
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `skipped`: number of events lost
    /// - `reason`: `subscriber=<name> skipped=<n>`
    SubscriberLagged,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
///
/// Events are process-level: none of them refer to a single worker or connection.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Counter value observed before a correction.
    pub reported: Option<usize>,
    /// Registry size computed by walking the worker chain.
    pub actual: Option<usize>,
    /// Audit cadence in milliseconds (compact).
    pub interval_ms: Option<u32>,
    /// Human-readable reason (diagnostic text or lag details).
    pub reason: Option<Arc<str>>,
    /// Emitting component, for subscriber events.
    pub source: Option<Arc<str>>,
    /// Events a lagging subscriber missed.
    pub skipped: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            reported: None,
            actual: None,
            interval_ms: None,
            reason: None,
            source: None,
            skipped: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the emitting component name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches the reported/actual pair of an audit.
    #[inline]
    pub fn with_counts(mut self, reported: usize, actual: usize) -> Self {
        self.reported = Some(reported);
        self.actual = Some(actual);
        self
    }

    /// Attaches an audit interval (stored as milliseconds).
    #[inline]
    pub fn with_interval(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.interval_ms = Some(ms);
        self
    }

    /// Creates the drift diagnostic for a corrected counter.
    pub fn count_mismatch(reported: usize, actual: usize) -> Self {
        Event::new(EventKind::CountMismatch)
            .with_counts(reported, actual)
            .with_reason(format!(
                "Thread count mismatch detected: reported={reported}, actual={actual}. Fixing."
            ))
    }

    /// Creates the notice a lagging subscriber receives instead of the events it missed.
    pub fn subscriber_lagged(subscriber: &'static str, skipped: u64) -> Self {
        let mut ev = Event::new(EventKind::SubscriberLagged)
            .with_source(subscriber)
            .with_reason(format!("subscriber={subscriber} skipped={skipped}"));
        ev.skipped = Some(skipped);
        ev
    }

    #[inline]
    pub fn is_count_mismatch(&self) -> bool {
        matches!(self.kind, EventKind::CountMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_text_is_exact() {
        let ev = Event::count_mismatch(5, 3);
        assert_eq!(
            ev.reason.as_deref(),
            Some("Thread count mismatch detected: reported=5, actual=3. Fixing.")
        );
        assert!(ev.is_count_mismatch());
    }

    #[test]
    fn mismatch_text_handles_large_values() {
        let ev = Event::count_mismatch(usize::MAX, 0);
        let text = ev.reason.as_deref().unwrap_or_default();
        assert!(text.contains(&format!("reported={}", usize::MAX)));
        assert!(text.ends_with("actual=0. Fixing."));
    }

    #[test]
    fn lag_notice_names_subscriber() {
        let ev = Event::subscriber_lagged("audit", 7);
        assert_eq!(ev.kind, EventKind::SubscriberLagged);
        assert_eq!(ev.source.as_deref(), Some("audit"));
        assert_eq!(ev.skipped, Some(7));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit skipped=7"));
        assert!(!ev.is_count_mismatch());
    }

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::ReconcilerStarted);
        let b = Event::new(EventKind::ReconcilerStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn interval_saturates_to_u32() {
        let ev = Event::new(EventKind::ReconcilerStarted).with_interval(Duration::from_secs(u64::MAX));
        assert_eq!(ev.interval_ms, Some(u32::MAX));
    }
}
