//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the reconciler.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publisher**: the audit loop (`CountMismatch`, lifecycle).
//! - **Consumers**: one receiver per `SubscriberSet` worker, plus any receiver
//!   from [`Reconciler::subscribe`](crate::Reconciler::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
