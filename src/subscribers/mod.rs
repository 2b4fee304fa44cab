//! # Event subscribers for the reconciler.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] workers,
//! and the built-in [`LogWriter`] (feature `logging`).
//!
//! ## Architecture
//! ```text
//! audit loop ── publish(Event) ──► Bus ──┬──► worker ──► LogWriter
//!                                        ├──► worker ──► Custom
//!                                        └──► Reconciler::subscribe() receivers
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
