use std::sync::Arc;

use tokio::runtime::Handle;

use super::{config::ReconcilerConfig, reconciler::Reconciler};
use crate::{server::ServerContext, subscribers::Subscribe};

/// Builder for constructing a [`Reconciler`] with optional features.
pub struct ReconcilerBuilder {
    cfg: ReconcilerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    runtime: Option<Handle>,
}

impl ReconcilerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: ReconcilerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            runtime: None,
        }
    }

    /// Sets event subscribers (e.g. the server's log sink).
    ///
    /// Each subscriber gets a worker reading the event bus; workers are
    /// spawned on the first successful `start()` and outlive later restarts.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Pins the runtime that hosts the audit loop.
    ///
    /// Without it, `start()` uses the runtime it is called from and fails with
    /// `SpawnFailure` outside of one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds an idle reconciler bound to `ctx`.
    pub fn build(self, ctx: Arc<ServerContext>) -> Reconciler {
        Reconciler::new_internal(self.cfg, ctx, self.subscribers, self.runtime)
    }
}
