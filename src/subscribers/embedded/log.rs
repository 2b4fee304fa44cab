//! # LogWriter - tracing-backed event writer
//!
//! Forwards reconciler events to `tracing`. Drift corrections are logged at
//! `WARN`, loop lifecycle at `DEBUG`, lost events at `ERROR`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! WARN countvisor: Thread count mismatch detected: reported=5, actual=3. Fixing. reported=5 actual=3
//! DEBUG countvisor: reconciler started interval_ms=60000
//! DEBUG countvisor: reconciler stopped
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::CountMismatch => {
                tracing::warn!(
                    target: "countvisor",
                    reported = ?e.reported,
                    actual = ?e.actual,
                    "{}",
                    e.reason.as_deref().unwrap_or("thread count mismatch")
                );
            }
            EventKind::ReconcilerStarted => {
                tracing::debug!(target: "countvisor", interval_ms = ?e.interval_ms, "reconciler started");
            }
            EventKind::ReconcilerStopped => {
                tracing::debug!(target: "countvisor", "reconciler stopped");
            }
            EventKind::SubscriberLagged => {
                tracing::error!(
                    target: "countvisor",
                    subscriber = e.source.as_deref().unwrap_or("unknown"),
                    skipped = ?e.skipped,
                    "subscriber lagged behind the bus"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
