//! Replica-lag-aware pacing.
//!
//! After every estimate update the gate polls its lag sources in configured
//! order. A source above the threshold blocks the caller with repeated
//! fixed-interval sleeps until its lag subsides or the per-source pause
//! budget runs out. Each source is fully resolved before the next one is
//! polled; the budget resets between sources.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::{PaceError, PaceResult};
use crate::events::LagWait;
use crate::lag::LagSource;
use crate::pacing::{PaceContext, PacingHook};

/// Wait-loop state for one source within one update.
#[derive(Debug)]
enum SourceState {
    /// About to poll the source.
    Polling,
    /// The last poll saw this lag above the threshold; sleep and re-check.
    Waiting(Duration),
    /// The source is at or below the threshold, or reports no lag metric.
    Cleared,
    /// The pause budget ran out while the source was still at this lag.
    BudgetExceeded(Duration),
}

/// Pacing hook that stalls the chunk loop while replicas lag.
#[derive(Default)]
pub struct LagGate {
    sources: Vec<Arc<dyn LagSource>>,
}

impl LagGate {
    /// Creates a gate with no sources. A gate without sources never pauses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate watching `sources`, polled in the given order.
    pub fn with_sources(sources: Vec<Arc<dyn LagSource>>) -> Self {
        Self { sources }
    }

    /// Replaces the watched set; order is preserved and is the polling order.
    pub fn replace_sources(&mut self, sources: Vec<Arc<dyn LagSource>>) {
        self.sources = sources;
    }

    /// The currently watched sources.
    pub fn sources(&self) -> &[Arc<dyn LagSource>] {
        &self.sources
    }

    /// Runs the wait loop for one source. Returns whether any sleep happened.
    fn resolve_source(source: &dyn LagSource, cx: &PaceContext<'_>) -> PaceResult<bool> {
        let max_lag = cx.config.max_lag();
        let interval = cx.config.pause_interval();
        let budget = cx.config.max_total_pause();

        let mut total_paused = Duration::ZERO;
        let mut paused = false;
        let mut state = SourceState::Polling;

        loop {
            state = match state {
                SourceState::Polling => match source.current_lag() {
                    // No lag metric means the server is not acting as a
                    // replica; never treated as lagging.
                    None => SourceState::Cleared,
                    Some(lag) if lag <= max_lag => SourceState::Cleared,
                    Some(lag) => SourceState::Waiting(lag),
                },
                SourceState::Waiting(lag) => {
                    paused = true;

                    let event = LagWait {
                        label: source.label().to_string(),
                        lag_secs: lag.as_secs_f64(),
                        pause: interval,
                        total_paused: total_paused + interval,
                    };
                    warn!(
                        source = source.label(),
                        lag_secs = event.lag_secs,
                        pause_ms = interval.as_millis() as u64,
                        total_paused_ms = event.total_paused.as_millis() as u64,
                        "replica lag above threshold, pausing"
                    );
                    cx.sink.lag_wait(&event);

                    cx.clock.sleep(interval);
                    total_paused += interval;

                    if total_paused > budget {
                        SourceState::BudgetExceeded(lag)
                    } else {
                        SourceState::Polling
                    }
                }
                SourceState::Cleared => return Ok(paused),
                SourceState::BudgetExceeded(lag) => {
                    if cx.config.continue_on_timeout {
                        warn!(
                            source = source.label(),
                            lag_secs = lag.as_secs_f64(),
                            waited_ms = total_paused.as_millis() as u64,
                            "pause budget exhausted, continuing without lag recovery"
                        );
                        return Ok(paused);
                    }

                    return Err(PaceError::LagTimeout {
                        label: source.label().to_string(),
                        lag_secs: lag.as_secs_f64(),
                        waited_ms: total_paused.as_millis() as u64,
                    });
                }
            };
        }
    }
}

impl PacingHook for LagGate {
    fn after_update(&mut self, cx: &PaceContext<'_>) -> PaceResult<bool> {
        let mut paused = false;
        for source in &self.sources {
            // Each source resolves completely before the next is polled.
            paused |= Self::resolve_source(source.as_ref(), cx)?;
        }
        Ok(paused)
    }

    fn set_sources(&mut self, sources: Vec<Arc<dyn LagSource>>) -> bool {
        self.replace_sources(sources);
        true
    }
}
