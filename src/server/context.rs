//! # Server context shared by workers and the reconciler.
//!
//! [`ServerContext`] bundles the guarded [`Workers`] state (worker chain and
//! live counter) with the server's quiet flag.
//!
//! ## Architecture
//! ```text
//! worker spawn ──► admit()  ─┐                    ┌─► link + increment
//! worker exit  ──► retire() ─┼──► guard (Mutex) ──┼─► unlink + decrement
//! reconciler   ──► lock()   ─┘                    └─► walk + compare + overwrite
//! ```
//!
//! ## Rules
//! - Every read or write of the chain or the counter holds the guard.
//! - Critical sections never await while holding the guard.
//! - `quiet` is read without the guard (atomic).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard};

use super::registry::{WorkerId, WorkerRecord, Workers};

/// Shared state of one server: worker registry, live counter, quiet flag.
#[derive(Debug)]
pub struct ServerContext {
    workers: Mutex<Workers>,
    quiet: AtomicBool,
    next_id: AtomicU64,
}

impl ServerContext {
    /// Creates an empty context. `quiet = true` suppresses drift diagnostics.
    pub fn new(quiet: bool) -> Arc<Self> {
        Arc::new(Self {
            workers: Mutex::new(Workers::new()),
            quiet: AtomicBool::new(quiet),
            next_id: AtomicU64::new(1),
        })
    }

    /// Acquires the guard over the worker chain and counter.
    pub async fn lock(&self) -> MutexGuard<'_, Workers> {
        self.workers.lock().await
    }

    /// Acquires the guard from a plain OS thread.
    ///
    /// # Panics
    /// Panics if called from within an async execution context.
    pub fn blocking_lock(&self) -> MutexGuard<'_, Workers> {
        self.workers.blocking_lock()
    }

    /// Registers a new worker: links its record and increments the counter.
    pub async fn admit(&self, label: impl Into<Arc<str>>) -> WorkerId {
        let id = self.allocate_id();
        let record = WorkerRecord::new(id, label);

        let mut workers = self.workers.lock().await;
        workers.link(record);
        workers.increment();
        id
    }

    /// Deregisters a worker: unlinks its record and decrements the counter.
    ///
    /// Returns `false` (and leaves the counter alone) if `id` is not linked.
    pub async fn retire(&self, id: WorkerId) -> bool {
        let mut workers = self.workers.lock().await;
        if workers.unlink(id).is_some() {
            workers.decrement();
            true
        } else {
            false
        }
    }

    /// Reserves a fresh worker id without linking anything.
    pub fn allocate_id(&self) -> WorkerId {
        WorkerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// True if drift diagnostics are suppressed.
    pub fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::Relaxed)
    }

    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }
}
