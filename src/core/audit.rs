//! # One audit step: compare the live counter with the worker chain.
//!
//! ## Flow
//! ```text
//! lock guard
//!   ├─► actual   = walk chain from head, count records
//!   ├─► reported = live_count
//!   └─► actual != reported:
//!         ├─► live_count := actual
//!         └─► !quiet → publish CountMismatch{reported, actual}
//! unlock guard
//! ```
//!
//! ## Rules
//! - The walk, the read and the overwrite are one critical section.
//! - Nothing awaits while the guard is held (`Bus::publish` is non-blocking).
//! - Chain membership is never modified.

use crate::events::{Bus, Event};
use crate::server::{ServerContext, Workers};

/// Result of comparing the counter with the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Audit {
    /// Counter value before the audit.
    pub reported: usize,
    /// Records reachable from the head.
    pub actual: usize,
}

impl Audit {
    /// True if the counter had drifted (and was overwritten).
    pub fn corrected(&self) -> bool {
        self.reported != self.actual
    }
}

/// Compares and, on drift, overwrites the counter. Caller holds the guard.
pub(crate) fn reconcile(workers: &mut Workers) -> Audit {
    let actual = workers.count_linked();
    let reported = workers.live_count();
    if actual != reported {
        workers.set_live_count(actual);
    }
    Audit { reported, actual }
}

/// Runs one audit step against `ctx`, publishing the diagnostic on drift.
pub(crate) async fn audit_once(ctx: &ServerContext, bus: &Bus) -> Audit {
    let mut workers = ctx.lock().await;
    let audit = reconcile(&mut workers);
    if audit.corrected() && !ctx.is_quiet() {
        bus.publish(Event::count_mismatch(audit.reported, audit.actual));
    }
    audit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use tokio::sync::broadcast::error::TryRecvError;

    async fn ctx_with(records: usize, live_count: usize, quiet: bool) -> std::sync::Arc<ServerContext> {
        let ctx = ServerContext::new(quiet);
        for i in 0..records {
            ctx.admit(format!("w{i}")).await;
        }
        ctx.lock().await.set_live_count(live_count);
        ctx
    }

    #[tokio::test]
    async fn corrects_overcount_and_reports() {
        let ctx = ctx_with(3, 5, false).await;
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let audit = audit_once(&ctx, &bus).await;
        assert_eq!(audit, Audit { reported: 5, actual: 3 });
        assert_eq!(ctx.lock().await.live_count(), 3);

        let ev = rx.try_recv().expect("diagnostic");
        assert_eq!(ev.kind, EventKind::CountMismatch);
        assert_eq!(
            ev.reason.as_deref(),
            Some("Thread count mismatch detected: reported=5, actual=3. Fixing.")
        );
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn corrects_undercount() {
        let ctx = ctx_with(4, 1, false).await;
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        audit_once(&ctx, &bus).await;
        assert_eq!(ctx.lock().await.live_count(), 4);
        let ev = rx.try_recv().expect("diagnostic");
        assert_eq!((ev.reported, ev.actual), (Some(1), Some(4)));
    }

    #[tokio::test]
    async fn empty_and_consistent_is_silent() {
        let ctx = ctx_with(0, 0, false).await;
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let audit = audit_once(&ctx, &bus).await;
        assert!(!audit.corrected());
        assert_eq!(ctx.lock().await.live_count(), 0);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn consistent_is_silent_regardless_of_quiet() {
        for quiet in [false, true] {
            let ctx = ctx_with(2, 2, quiet).await;
            let bus = Bus::new(8);
            let mut rx = bus.subscribe();

            audit_once(&ctx, &bus).await;
            assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
        }
    }

    #[tokio::test]
    async fn quiet_corrects_without_diagnostic() {
        let ctx = ctx_with(3, 5, true).await;
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let audit = audit_once(&ctx, &bus).await;
        assert!(audit.corrected());
        assert_eq!(ctx.lock().await.live_count(), 3);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn second_audit_is_a_no_op() {
        let ctx = ctx_with(2, 9, false).await;
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        assert!(audit_once(&ctx, &bus).await.corrected());
        assert!(!audit_once(&ctx, &bus).await.corrected());

        assert!(rx.try_recv().is_ok());
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
        assert_eq!(ctx.lock().await.live_count(), 2);
    }

    #[test]
    fn reconcile_never_touches_membership() {
        let mut w = Workers::new();
        for i in 0..3 {
            w.link(crate::server::WorkerRecord::new(crate::server::WorkerId(i), "x"));
        }
        w.set_live_count(10);

        let audit = reconcile(&mut w);
        assert_eq!(audit, Audit { reported: 10, actual: 3 });
        assert_eq!(w.count_linked(), 3);
        assert_eq!(w.live_count(), 3);
    }
}
