//! # Subscriber workers fed straight from the bus.
//!
//! [`SubscriberSet`] gives every subscriber its own bus receiver and its own
//! worker task. There is no intermediate queue: the bus ring is the only
//! buffer, so a correction published under the server guard never waits on a
//! subscriber.
//!
//! ```text
//! Bus ──rx──► worker 1 ──► sub1.on_event()
//!     ──rx──► worker N ──► subN.on_event()
//! ```
//!
//! ## Rules
//! - Per-subscriber FIFO, no ordering across subscribers.
//! - A worker that falls more than the bus capacity behind gets one
//!   `SubscriberLagged` event in place of what it missed.
//! - A panicking subscriber is logged and keeps receiving.
//! - Workers exit after the bus closes and their receiver is drained.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{runtime::Handle, sync::broadcast::error::RecvError, task::JoinHandle};

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Worker tasks for a group of subscribers attached to one bus.
pub struct SubscriberSet {
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Subscribes each of `subs` to `bus` and spawns its worker on `rt`.
    ///
    /// Receivers are opened before this returns, so every event published
    /// afterwards reaches every subscriber.
    #[must_use]
    pub fn spawn(subs: Vec<Arc<dyn Subscribe>>, bus: &Bus, rt: &Handle) -> Self {
        let workers = subs
            .into_iter()
            .map(|sub| {
                let mut rx = bus.subscribe();
                rt.spawn(async move {
                    loop {
                        let ev = match rx.recv().await {
                            Ok(ev) => ev,
                            Err(RecvError::Lagged(n)) => Event::subscriber_lagged(sub.name(), n),
                            Err(RecvError::Closed) => break,
                        };
                        deliver(sub.as_ref(), &ev).await;
                    }
                })
            })
            .collect();
        Self { workers }
    }

    /// Waits until every worker has drained its receiver and exited.
    ///
    /// Only returns once all senders of the bus are gone.
    pub async fn join(self) {
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// Cancels every worker without draining.
    pub(crate) fn abort(self) {
        for h in self.workers {
            h.abort();
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }
}

async fn deliver(sub: &dyn Subscribe, ev: &Event) {
    if let Err(panic) = AssertUnwindSafe(sub.on_event(ev)).catch_unwind().await {
        let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = panic.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        tracing::error!(
            target: "countvisor",
            subscriber = sub.name(),
            seq = ev.seq,
            info = %info,
            "subscriber panicked"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

    struct Forward(UnboundedSender<Event>);

    #[async_trait]
    impl Subscribe for Forward {
        async fn on_event(&self, ev: &Event) {
            let _ = self.0.send(ev.clone());
        }
        fn name(&self) -> &'static str {
            "forward"
        }
    }

    struct PanicsOnMismatch(UnboundedSender<Event>);

    #[async_trait]
    impl Subscribe for PanicsOnMismatch {
        async fn on_event(&self, ev: &Event) {
            if ev.is_count_mismatch() {
                panic!("boom");
            }
            let _ = self.0.send(ev.clone());
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let (tx, mut rx) = unbounded_channel();
        let bus = Bus::new(8);
        let set = SubscriberSet::spawn(vec![Arc::new(Forward(tx))], &bus, &Handle::current());
        assert_eq!(set.len(), 1);

        let a = Event::new(EventKind::ReconcilerStarted);
        let b = Event::count_mismatch(1, 0);
        let (a_seq, b_seq) = (a.seq, b.seq);
        bus.publish(a);
        bus.publish(b);

        assert_eq!(rx.recv().await.map(|e| e.seq), Some(a_seq));
        assert_eq!(rx.recv().await.map(|e| e.seq), Some(b_seq));
        drop(bus);
        set.join().await;
    }

    #[tokio::test]
    async fn join_returns_after_draining_a_closed_bus() {
        let (tx, mut rx) = unbounded_channel();
        let bus = Bus::new(8);
        let set = SubscriberSet::spawn(vec![Arc::new(Forward(tx))], &bus, &Handle::current());

        bus.publish(Event::new(EventKind::ReconcilerStopped));
        drop(bus);
        set.join().await;

        assert_eq!(
            rx.recv().await.map(|e| e.kind),
            Some(EventKind::ReconcilerStopped)
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn panic_does_not_stop_the_worker() {
        let (tx, mut rx) = unbounded_channel();
        let bus = Bus::new(8);
        let set = SubscriberSet::spawn(
            vec![Arc::new(PanicsOnMismatch(tx))],
            &bus,
            &Handle::current(),
        );

        bus.publish(Event::count_mismatch(3, 2));
        bus.publish(Event::new(EventKind::ReconcilerStopped));
        drop(bus);
        set.join().await;

        assert_eq!(
            rx.recv().await.map(|e| e.kind),
            Some(EventKind::ReconcilerStopped)
        );
    }

    #[tokio::test]
    async fn lagging_worker_gets_one_notice() {
        let (tx, mut rx) = unbounded_channel();
        let bus = Bus::new(2);
        // Current-thread runtime: the worker cannot run until this task yields.
        let set = SubscriberSet::spawn(vec![Arc::new(Forward(tx))], &bus, &Handle::current());

        for n in 0..5 {
            bus.publish(Event::count_mismatch(n + 1, n));
        }
        drop(bus);
        set.join().await;

        let notice = rx.recv().await.expect("lag notice");
        assert_eq!(notice.kind, EventKind::SubscriberLagged);
        assert_eq!(notice.source.as_deref(), Some("forward"));
        assert_eq!(notice.skipped, Some(3));

        assert_eq!(rx.recv().await.and_then(|e| e.reported), Some(4));
        assert_eq!(rx.recv().await.and_then(|e| e.reported), Some(5));
        assert!(rx.recv().await.is_none());
    }
}
