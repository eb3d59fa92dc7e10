//! Replication lag sources.
//!
//! A [`LagSource`] answers one question: how far behind the primary is this
//! replica right now. `None` means "no lag metric available" (for example a
//! server that is not acting as a replica) and must never be treated as
//! lagging. How a source obtains its value, a `pg_stat_replication` query, a
//! `SHOW REPLICA STATUS` round trip, a metrics endpoint, is the source's own
//! business; this crate only consumes the capability.

use std::time::Duration;

/// A read-only view of one replica's current replication lag.
///
/// Sources may be shared across controllers; they are queried, never mutated.
pub trait LagSource: Send + Sync {
    /// Display label for diagnostics.
    fn label(&self) -> &str;

    /// The current replication lag, or `None` when no lag metric applies.
    fn current_lag(&self) -> Option<Duration>;
}

/// A source reporting a constant lag value. Useful for wiring tests and for
/// representing a server known not to be a replica (`lag = None`).
#[derive(Debug, Clone)]
pub struct FixedLagSource {
    label: String,
    lag: Option<Duration>,
}

impl FixedLagSource {
    /// Creates a source that always reports `lag`.
    pub fn new(label: impl Into<String>, lag: Option<Duration>) -> Self {
        Self {
            label: label.into(),
            lag,
        }
    }
}

impl LagSource for FixedLagSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn current_lag(&self) -> Option<Duration> {
        self.lag
    }
}

/// Adapts a closure into a [`LagSource`].
///
/// This is the intended integration point for real probes: the closure runs a
/// blocking lag query and returns the result, keeping database clients out of
/// this crate.
pub struct FnLagSource<F> {
    label: String,
    poll: F,
}

impl<F> FnLagSource<F>
where
    F: Fn() -> Option<Duration> + Send + Sync,
{
    /// Creates a source that polls `poll` on every check.
    pub fn new(label: impl Into<String>, poll: F) -> Self {
        Self {
            label: label.into(),
            poll,
        }
    }
}

impl<F> LagSource for FnLagSource<F>
where
    F: Fn() -> Option<Duration> + Send + Sync,
{
    fn label(&self) -> &str {
        &self.label
    }

    fn current_lag(&self) -> Option<Duration> {
        (self.poll)()
    }
}
