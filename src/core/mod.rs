//! Runtime core: the reconciler and its audit loop.
//!
//! The public API from this module is [`Reconciler`] (with its builder, config
//! and state), which periodically heals a server's live-worker counter.
//!
//! Internal modules:
//! - [`audit`]: one guarded compare-and-correct step;
//! - [`reconciler`]: start/stop control surface and the background loop;
//! - [`builder`]: subscriber and runtime wiring;
//! - [`config`]: cadence and bus sizing.

mod audit;
mod builder;
mod config;
mod reconciler;

pub use builder::ReconcilerBuilder;
pub use config::{DEFAULT_INTERVAL, ReconcilerConfig};
pub use reconciler::{Reconciler, ReconcilerState};
