//! # Worker registry: singly-linked chain of live worker records.
//!
//! [`Workers`] is the state a server keeps behind its guard: the head of a
//! chain of [`WorkerRecord`]s and the incrementally maintained `live_count`.
//!
//! ## Rules
//! - Worker lifecycle code links a record and increments the counter in the
//!   same critical section, and unlinks + decrements on exit.
//! - The reconciler only walks the chain (`walk`, `count_linked`) and may
//!   overwrite the counter (`set_live_count`); it never changes membership.
//! - `live_count` is bookkeeping, not truth: it can drift from `count_linked()`.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Identifier of a worker, unique within one server context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker#{}", self.0)
    }
}

/// One live worker (connection handler, child thread, ...).
///
/// Opaque to the reconciler beyond being linked into the chain.
#[derive(Debug)]
pub struct WorkerRecord {
    id: WorkerId,
    label: Arc<str>,
    admitted_at: Instant,
    next: Option<Box<WorkerRecord>>,
}

impl WorkerRecord {
    /// Creates an unlinked record.
    pub fn new(id: WorkerId, label: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            label: label.into(),
            admitted_at: Instant::now(),
            next: None,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn admitted_at(&self) -> Instant {
        self.admitted_at
    }

    /// Next record in the chain, if any.
    pub fn next(&self) -> Option<&WorkerRecord> {
        self.next.as_deref()
    }
}

/// Guarded server state: worker chain plus the live counter.
#[derive(Debug, Default)]
pub struct Workers {
    head: Option<Box<WorkerRecord>>,
    live_count: usize,
}

impl Workers {
    /// Creates an empty registry with a zero counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `record` at the head of the chain. Does not touch the counter.
    pub fn link(&mut self, mut record: WorkerRecord) {
        record.next = self.head.take();
        self.head = Some(Box::new(record));
    }

    /// Unlinks the record with `id`. Does not touch the counter.
    ///
    /// Returns the detached record, or `None` if no such worker is linked.
    pub fn unlink(&mut self, id: WorkerId) -> Option<WorkerRecord> {
        let mut cursor = &mut self.head;
        while cursor.as_ref().is_some_and(|node| node.id != id) {
            cursor = &mut cursor.as_mut()?.next;
        }
        let mut node = cursor.take()?;
        *cursor = node.next.take();
        Some(*node)
    }

    /// Iterates the chain from the head, following `next` links.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            next: self.head.as_deref(),
        }
    }

    /// Number of records reachable from the head (ground truth).
    pub fn count_linked(&self) -> usize {
        self.walk().count()
    }

    /// True if no record is linked.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Reported number of live workers.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Overwrites the reported counter.
    pub fn set_live_count(&mut self, count: usize) {
        self.live_count = count;
    }

    pub fn increment(&mut self) {
        self.live_count = self.live_count.saturating_add(1);
    }

    /// Decrements the counter, saturating at zero.
    pub fn decrement(&mut self) {
        self.live_count = self.live_count.saturating_sub(1);
    }
}

impl Drop for Workers {
    // Unlink iteratively so long chains do not recurse through Box drops.
    fn drop(&mut self) {
        let mut cur = self.head.take();
        while let Some(mut node) = cur {
            cur = node.next.take();
        }
    }
}

/// Iterator over linked worker records.
pub struct Walk<'a> {
    next: Option<&'a WorkerRecord>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a WorkerRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next.as_deref();
        Some(node)
    }
}
