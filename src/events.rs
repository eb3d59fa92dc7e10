//! Structured diagnostic events emitted by the pacing loop.
//!
//! Every estimate update and every lag-triggered sleep produces an event.
//! Events always go to `tracing` with structured fields; in addition they are
//! handed to an injected [`PaceEventSink`] so embedders and tests can observe
//! the loop without installing a subscriber. The default sink is a no-op.

use std::time::Duration;

/// Emitted after every estimate update, before the pacing hooks run.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimateUpdated {
    /// Number of items the caller processed in the measured chunk.
    pub processed: u64,
    /// Observed wallclock duration of the chunk, in seconds.
    pub elapsed_secs: f64,
    /// Target wallclock duration per chunk, in seconds.
    pub target_secs: f64,
    /// Observed throughput of the chunk, items per second.
    pub observed_rate: f64,
    /// Throughput the new recommendation implies at the target duration.
    pub implied_rate: f64,
    /// The new recommended chunk size.
    pub new_estimate: u64,
    /// Whether the raw recommendation was clipped to the clamp bounds.
    pub clamped: bool,
}

/// Emitted before every lag-triggered sleep.
#[derive(Clone, Debug, PartialEq)]
pub struct LagWait {
    /// Label of the lagging source.
    pub label: String,
    /// The lag observed on the last poll, in seconds.
    pub lag_secs: f64,
    /// How long the loop is about to sleep.
    pub pause: Duration,
    /// Accumulated pause time on this source within the current update,
    /// including the sleep this event announces.
    pub total_paused: Duration,
}

/// Receiver capability for pacing diagnostics.
///
/// All methods default to no-ops so implementors only handle what they care
/// about.
pub trait PaceEventSink: Send + Sync {
    /// Called after every estimate update.
    fn estimate_updated(&self, _event: &EstimateUpdated) {}

    /// Called before every lag-triggered sleep.
    fn lag_wait(&self, _event: &LagWait) {}
}

/// The null-object sink: discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl PaceEventSink for NoopSink {}
