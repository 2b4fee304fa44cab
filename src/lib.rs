//! # countvisor
//!
//! **Countvisor** keeps a server's live-worker counter honest.
//!
//! Servers usually track active workers (connection handlers, child threads)
//! with a counter bumped on spawn and dropped on exit. A missed decrement or a
//! race leaves the counter too high, and a server that gates admission on it
//! slowly starves. Countvisor runs a background [`Reconciler`] that, on a fixed
//! cadence, walks the real worker registry and overwrites the counter if the
//! two disagree, emitting a diagnostic event when it does.
//!
//! It is a corrective safety net: it does not prevent drift or find its cause.
//!
//! ## Architecture
//! ```text
//!  worker spawn/exit ──► ServerContext::admit / retire
//!                              │  (guard: chain + live_count)
//!                              ▼
//!                   ┌──────────────────────┐
//!                   │   ServerContext      │
//!                   │   Workers { head ──► rec ──► rec ──► ∅, live_count }
//!                   └──────────▲───────────┘
//!                              │ lock, walk, compare, overwrite
//!                   ┌──────────┴───────────┐
//!                   │  Reconciler loop     │  sleep(interval) → audit → repeat
//!                   └──────────┬───────────┘
//!                              │ CountMismatch / ReconcilerStarted / ReconcilerStopped
//!                              ▼
//!                  Bus ──► SubscriberSet ──► LogWriter, custom subscribers
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                       |
//! |-------------------|----------------------------------------------------------|------------------------------------------|
//! | **Reconciliation**| Periodic audit with start/stop lifecycle.                | [`Reconciler`], [`ReconcilerState`]      |
//! | **Server state**  | Guarded worker chain and live counter.                   | [`ServerContext`], [`Workers`]           |
//! | **Events**        | Drift diagnostics and lifecycle notifications.           | [`Event`], [`EventKind`], [`Subscribe`]  |
//! | **Errors**        | Typed start failures.                                    | [`ReconcileError`]                       |
//! | **Configuration** | Audit cadence (default 60s) and bus sizing.              | [`ReconcilerConfig`]                     |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a `tracing`-backed subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use countvisor::{Reconciler, ReconcilerConfig, ServerContext, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = ServerContext::new(false);
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(countvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let reconciler = Reconciler::builder(ReconcilerConfig::default())
//!         .with_subscribers(subs)
//!         .build(ctx.clone());
//!     reconciler.start()?;
//!
//!     let id = ctx.admit("client 10.0.0.7:51234").await;
//!     ctx.retire(id).await;
//!
//!     reconciler.shutdown().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod server;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    DEFAULT_INTERVAL, Reconciler, ReconcilerBuilder, ReconcilerConfig, ReconcilerState,
};
pub use error::ReconcileError;
pub use events::{Bus, Event, EventKind};
pub use server::{ServerContext, Walk, WorkerId, WorkerRecord, Workers};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: built-in tracing subscriber.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
