//! # Event bus owned by one reconciler.
//!
//! The audit loop publishes while it still holds the server guard, so the bus
//! must hand events off without waiting. Every subscriber worker and every
//! [`Reconciler::subscribe`](crate::Reconciler::subscribe) caller holds its own
//! receiver on the same ring.
//!
//! ```text
//! audit loop ──publish──► [ ring: capacity N ] ──► receiver per subscriber worker
//!                                              └─► receiver per subscribe() caller
//! ```
//!
//! ## Rules
//! - A receiver sees only events sent after it was created.
//! - A receiver more than `capacity` events behind skips the oldest ones.
//! - Once the reconciler and its loop are gone, receivers drain what is left
//!   and then observe the bus as closed.

use tokio::sync::broadcast;

use super::event::Event;

#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus whose ring holds `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Hands `ev` to every live receiver without waiting.
    ///
    /// Returns `false` when nobody was listening and the event was discarded.
    pub fn publish(&self, ev: Event) -> bool {
        self.tx.send(ev).is_ok()
    }

    /// Opens a receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// True if at least one receiver is open.
    pub fn has_listeners(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn every_receiver_gets_a_copy() {
        let bus = Bus::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert!(bus.publish(Event::count_mismatch(2, 1)));
        assert_eq!(a.recv().await.map(|e| e.reported).ok(), Some(Some(2)));
        assert_eq!(b.recv().await.map(|e| e.actual).ok(), Some(Some(1)));
    }

    #[test]
    fn publish_without_receivers_reports_loss() {
        let bus = Bus::new(0);
        assert!(!bus.has_listeners());
        assert!(!bus.publish(Event::new(EventKind::ReconcilerStarted)));

        let _rx = bus.subscribe();
        assert!(bus.has_listeners());
        assert!(bus.publish(Event::new(EventKind::ReconcilerStarted)));
    }

    #[tokio::test]
    async fn receivers_drain_then_see_close() {
        let bus = Bus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ReconcilerStopped));
        drop(bus);

        assert_eq!(
            rx.recv().await.map(|e| e.kind).ok(),
            Some(EventKind::ReconcilerStopped)
        );
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
