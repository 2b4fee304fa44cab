//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for plugging event handlers into
//! the reconciler. This is how drift diagnostics reach a server's logging
//! pipeline.
//!
//! Each subscriber gets its own worker task and its own bus receiver. Panics are
//! caught and logged; the worker keeps going.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use countvisor::{Event, EventKind, Subscribe};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscribe for Audit {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::CountMismatch) {
//!             // forward ev.reason to the server log
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for reconciler observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this subscriber, which may then see a
///   `SubscriberLagged` event in place of what it missed.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, never while the server guard is held.
    /// Events are delivered in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in lag notices and panic logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
