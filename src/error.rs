//! Error types returned by the reconciler control surface.
//!
//! Only [`Reconciler::start`](crate::Reconciler::start) can fail. The audit loop
//! itself has no error path: a count mismatch is the condition it corrects,
//! not a failure.

use thiserror::Error;

/// # Errors produced when starting a reconciler.
///
/// Both variants are recoverable. Neither is retried internally; the caller
/// decides whether to log, retry, or carry on without drift protection.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The reconciler already owns a running audit loop; nothing was spawned.
    #[error("reconciler already running")]
    AlreadyRunning,

    /// The background loop could not be spawned (no runtime, or runtime shutting down).
    ///
    /// The running flag has been rolled back, so a later `start()` may succeed.
    #[error("failed to spawn reconciler loop: {reason}")]
    SpawnFailure {
        /// Why the runtime refused the task.
        reason: String,
    },
}

impl ReconcileError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use countvisor::ReconcileError;
    ///
    /// assert_eq!(ReconcileError::AlreadyRunning.as_label(), "reconciler_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ReconcileError::AlreadyRunning => "reconciler_already_running",
            ReconcileError::SpawnFailure { .. } => "reconciler_spawn_failure",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ReconcileError::AlreadyRunning => "already running".to_string(),
            ReconcileError::SpawnFailure { reason } => format!("spawn failed: {reason}"),
        }
    }

    /// True if a later `start()` can succeed without a `stop()` first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconcileError::SpawnFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            ReconcileError::SpawnFailure { reason: "x".into() }.as_label(),
            "reconciler_spawn_failure"
        );
        assert_eq!(
            ReconcileError::AlreadyRunning.as_label(),
            "reconciler_already_running"
        );
    }

    #[test]
    fn display_carries_reason() {
        let err = ReconcileError::SpawnFailure {
            reason: "no runtime".into(),
        };
        assert_eq!(err.to_string(), "failed to spawn reconciler loop: no runtime");
        assert_eq!(err.as_message(), "spawn failed: no runtime");
        assert!(err.is_retryable());
        assert!(!ReconcileError::AlreadyRunning.is_retryable());
    }
}
