//! Server-side state audited by the reconciler.
//!
//! - [`ServerContext`]: guard + quiet flag + worker lifecycle entry points;
//! - [`Workers`]: the guarded worker chain and live counter;
//! - [`WorkerRecord`], [`WorkerId`]: one linked worker.

mod context;
mod registry;

pub use context::ServerContext;
pub use registry::{Walk, WorkerId, WorkerRecord, Workers};
