//! # Reconciler configuration.
//!
//! Provides [`ReconcilerConfig`], the settings a [`Reconciler`](crate::Reconciler)
//! is built with.
//!
//! ## Sentinel values
//! - `interval = 0s` → clamped to 1ms (the loop never spins)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Default audit cadence.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for one reconciler.
///
/// ## Field semantics
/// - `interval`: sleep between audits (default 60s)
/// - `bus_capacity`: event bus ring buffer size (min 1)
///
/// All fields are public. Prefer the helper accessors over raw field reads
/// so sentinel checks live in one place.
#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    /// Time slept before each audit.
    ///
    /// A stop request is observed as soon as the sleep ends (or is cancelled),
    /// before any audit work is done.
    pub interval: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl ReconcilerConfig {
    /// Returns the audit interval with a 1ms floor.
    #[inline]
    pub fn interval_clamped(&self) -> Duration {
        self.interval.max(Duration::from_millis(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Same configuration with a different interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for ReconcilerConfig {
    /// Default configuration:
    ///
    /// - `interval = 60s`
    /// - `bus_capacity = 64`
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            bus_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ReconcilerConfig::default();
        assert_eq!(cfg.interval, Duration::from_secs(60));
        assert_eq!(cfg.bus_capacity_clamped(), 64);
    }

    #[test]
    fn sentinels_are_clamped() {
        let cfg = ReconcilerConfig {
            interval: Duration::ZERO,
            bus_capacity: 0,
        };
        assert_eq!(cfg.interval_clamped(), Duration::from_millis(1));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
