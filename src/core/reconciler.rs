//! # Reconciler: periodic audit of a server's live-worker counter.
//!
//! The [`Reconciler`] is a handle bound to one [`ServerContext`]. Once started it
//! owns a background task that sleeps `interval`, walks the worker chain under
//! the server guard, and overwrites the counter if it drifted.
//!
//! ## Lifecycle
//! ```text
//!            start() [CAS idle→owned]           stop() [flag := idle, cancel]
//!   Idle ─────────────────────────────► Running ─────────────────────────────► Stopping
//!    ▲  ▲                                                                         │
//!    │  └───────────────────── loop wakes, sees stop, exits ─────────────────────┘
//!    └── runtime shuts down and drops the loop (from Running or Stopping)
//! ```
//!
//! ## Loop
//! ```text
//! publish ReconcilerStarted
//! loop {
//!   ├─► sleep(interval)        (cancellable)
//!   ├─► stop requested?  ──► break
//!   └─► audit_once(ctx, bus)   (guarded walk + compare + overwrite)
//! }
//! publish ReconcilerStopped
//! ```
//!
//! ## Rules
//! - At most one audit loop per reconciler: concurrent `start()` calls have exactly one winner.
//! - `stop()` never blocks and is safe to call at any time.
//! - The loop never exits on its own because of a mismatch.
//! - Dropping the reconciler stops its loop. Subscriber workers finish the
//!   events already published and then exit; [`Reconciler::shutdown`] waits for that.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use countvisor::{Reconciler, ReconcilerConfig, ServerContext};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = ServerContext::new(false);
//!     let cfg = ReconcilerConfig::default().with_interval(Duration::from_secs(30));
//!
//!     let reconciler = Reconciler::new(cfg, ctx.clone());
//!     reconciler.start()?;
//!
//!     // ... serve connections: ctx.admit(..) / ctx.retire(..) ...
//!
//!     reconciler.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::{runtime::Handle, select, time};
use tokio_util::sync::CancellationToken;

use crate::core::{audit::audit_once, builder::ReconcilerBuilder, config::ReconcilerConfig};
use crate::error::ReconcileError;
use crate::events::{Bus, Event, EventKind};
use crate::server::ServerContext;
use crate::subscribers::{Subscribe, SubscriberSet};

/// `owner` value while no loop holds the running flag.
const IDLE: u64 = 0;

/// Observable lifecycle state of a [`Reconciler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    /// No audit loop is running.
    Idle,
    /// The audit loop is running (or being spawned).
    Running,
    /// Stop was requested; the loop has not exited yet.
    Stopping,
}

/// One spawned audit loop.
struct Generation {
    token: CancellationToken,
    /// Cancelled once the loop future is gone.
    done: CancellationToken,
}

/// State mutated by `start()` / `stop()`; the lock serializes transitions.
struct Control {
    current: Option<Generation>,
    last_id: u64,
    /// Subscribers not yet wired; taken by the first successful start.
    pending: Option<Vec<Arc<dyn Subscribe>>>,
    subscribers: Option<SubscriberSet>,
}

/// Drift-healing reconciler for one server context.
pub struct Reconciler {
    cfg: ReconcilerConfig,
    ctx: Arc<ServerContext>,
    bus: Bus,
    runtime: Option<Handle>,
    /// Running flag: the id of the generation that owns it, or [`IDLE`].
    owner: Arc<AtomicU64>,
    control: Mutex<Control>,
}

/// Moved into the loop future and dropped with it.
///
/// Runs whether the loop returned or its runtime discarded it unpolled.
struct ExitGuard {
    owner: Arc<AtomicU64>,
    id: u64,
    done: CancellationToken,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        // No-op after stop() or once a newer generation owns the flag.
        let _ = self
            .owner
            .compare_exchange(self.id, IDLE, Ordering::AcqRel, Ordering::Acquire);
        self.done.cancel();
    }
}

impl Reconciler {
    /// Creates an idle reconciler for `ctx` with no subscribers.
    ///
    /// Corrections still happen, but their diagnostics reach only receivers
    /// opened with [`subscribe`](Self::subscribe). To route them into a log,
    /// use [`builder`](Self::builder) with `with_subscribers`.
    pub fn new(cfg: ReconcilerConfig, ctx: Arc<ServerContext>) -> Self {
        ReconcilerBuilder::new(cfg).build(ctx)
    }

    /// Returns a builder for subscribers / runtime selection.
    pub fn builder(cfg: ReconcilerConfig) -> ReconcilerBuilder {
        ReconcilerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: ReconcilerConfig,
        ctx: Arc<ServerContext>,
        subscribers: Vec<Arc<dyn Subscribe>>,
        runtime: Option<Handle>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let pending = if subscribers.is_empty() {
            None
        } else {
            Some(subscribers)
        };
        Self {
            cfg,
            ctx,
            bus,
            runtime,
            owner: Arc::new(AtomicU64::new(IDLE)),
            control: Mutex::new(Control {
                current: None,
                last_id: IDLE,
                pending,
                subscribers: None,
            }),
        }
    }

    /// Starts the background audit loop.
    ///
    /// Returns immediately. Fails with [`ReconcileError::AlreadyRunning`] if a loop
    /// is already owned by this reconciler, or [`ReconcileError::SpawnFailure`] if
    /// no live tokio runtime can host it. On failure the running flag is rolled
    /// back and a later `start()` may succeed.
    pub fn start(&self) -> Result<(), ReconcileError> {
        let mut control = self.control();
        let id = control.last_id + 1;

        if self
            .owner
            .compare_exchange(IDLE, id, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ReconcileError::AlreadyRunning);
        }
        control.last_id = id;

        let rt = match self.runtime_handle() {
            Ok(rt) => rt,
            Err(err) => {
                self.owner.store(IDLE, Ordering::Release);
                return Err(err);
            }
        };

        // Receivers open before the loop exists, so subscribers see ReconcilerStarted.
        let subscribers = control
            .pending
            .clone()
            .map(|subs| SubscriberSet::spawn(subs, &self.bus, &rt));

        let token = CancellationToken::new();
        let done = CancellationToken::new();
        rt.spawn(audit_loop(
            Arc::clone(&self.ctx),
            self.bus.clone(),
            self.cfg.interval_clamped(),
            ExitGuard {
                owner: Arc::clone(&self.owner),
                id,
                done: done.clone(),
            },
            token.clone(),
        ));

        // A closed runtime drops the task inside spawn().
        if done.is_cancelled() {
            if let Some(set) = subscribers {
                set.abort();
            }
            let _ = self
                .owner
                .compare_exchange(id, IDLE, Ordering::AcqRel, Ordering::Acquire);
            return Err(ReconcileError::SpawnFailure {
                reason: "runtime is shutting down".to_string(),
            });
        }

        if subscribers.is_some() {
            control.pending = None;
            control.subscribers = subscribers;
        } else if control.subscribers.is_none() && !self.bus.has_listeners() {
            tracing::debug!(
                target: "countvisor",
                "reconciler started with no subscribers; drift diagnostics will not be delivered"
            );
        }
        // A previous generation may still be winding down; its token is already cancelled.
        control.current = Some(Generation { token, done });
        Ok(())
    }

    /// Requests the audit loop to stop. Never blocks; idempotent.
    pub fn stop(&self) {
        let control = self.control();
        self.owner.store(IDLE, Ordering::Release);
        if let Some(generation) = &control.current {
            generation.token.cancel();
        }
    }

    /// Waits for the most recently spawned loop to exit.
    ///
    /// Returns immediately if no loop was spawned. Call after [`stop`](Self::stop);
    /// otherwise this waits until someone else stops the reconciler.
    pub async fn join(&self) {
        let done = self.control().current.as_ref().map(|g| g.done.clone());
        if let Some(done) = done {
            done.cancelled().await;
        }
    }

    /// Stops the loop, drops the reconciler, and waits for subscribers to
    /// handle every event it published, `ReconcilerStopped` included.
    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
        let subscribers = self.control().subscribers.take();
        drop(self);
        if let Some(set) = subscribers {
            set.join().await;
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ReconcilerState {
        if self.is_running() {
            return ReconcilerState::Running;
        }
        match &self.control().current {
            Some(g) if !g.done.is_cancelled() => ReconcilerState::Stopping,
            _ => ReconcilerState::Idle,
        }
    }

    /// True between a successful `start()` and the next `stop()`, or until the
    /// hosting runtime drops the loop.
    pub fn is_running(&self) -> bool {
        self.owner.load(Ordering::Acquire) != IDLE
    }

    /// Receiver for every event this reconciler publishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The audited server context.
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// The effective audit interval.
    pub fn interval(&self) -> Duration {
        self.cfg.interval_clamped()
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        // Control holds only handles and tokens; nothing panics while it is locked.
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn runtime_handle(&self) -> Result<Handle, ReconcileError> {
        match &self.runtime {
            Some(rt) => Ok(rt.clone()),
            None => Handle::try_current().map_err(|e| ReconcileError::SpawnFailure {
                reason: e.to_string(),
            }),
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background audit loop for one generation.
async fn audit_loop(
    ctx: Arc<ServerContext>,
    bus: Bus,
    interval: Duration,
    guard: ExitGuard,
    token: CancellationToken,
) {
    bus.publish(Event::new(EventKind::ReconcilerStarted).with_interval(interval));

    loop {
        let sleep = time::sleep(interval);
        tokio::pin!(sleep);
        select! {
            _ = &mut sleep => {}
            _ = token.cancelled() => break,
        }
        if token.is_cancelled() || guard.owner.load(Ordering::Acquire) != guard.id {
            break;
        }
        audit_once(&ctx, &bus).await;
    }

    bus.publish(Event::new(EventKind::ReconcilerStopped));
}
