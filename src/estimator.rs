//! Adaptive chunk-size estimation.
//!
//! [`RateEstimator`] converts observed chunk throughput into a chunk-size
//! recommendation: an exponentially weighted moving average of items per
//! second, multiplied by the target chunk duration and clamped to configured
//! bounds. The EWMA smooths transient noise (lock contention, query-plan
//! variance) without a sliding window buffer; the clamp bounds pathological
//! growth or shrink from a single bad sample.

use std::time::Instant;

use tracing::debug;

use crate::clock::Clock;
use crate::config::{PacerConfig, ValidationError};
use crate::error::{PaceError, PaceResult};
use crate::events::EstimateUpdated;

/// Adaptive chunk-size estimator.
///
/// Owned exclusively by one control loop; measurements follow a strict
/// begin → end (or a single `interval`) cycle and every update leaves the
/// in-flight marker cleared.
#[derive(Debug)]
pub struct RateEstimator {
    /// Current recommended chunk size. Always within the clamp bounds used
    /// by the last update.
    estimate: u64,
    /// Desired wallclock duration per chunk, in seconds.
    target: f64,
    /// EWMA of observed items per second.
    average_rate: f64,
    /// Start of the in-flight measurement window, if `begin` was called.
    pending_begin: Option<Instant>,
    /// Whether the last update clipped the raw recommendation.
    clamped: bool,
}

impl RateEstimator {
    /// Creates an estimator seeded so the first recommendation equals
    /// `initial_estimate`: the moving average starts at
    /// `initial_estimate / target_secs` items per second.
    pub fn new(initial_estimate: u64, target_secs: f64) -> Result<Self, ValidationError> {
        if initial_estimate == 0 {
            return Err(ValidationError::InitialEstimateZero);
        }
        if !(target_secs > 0.0 && target_secs.is_finite()) {
            return Err(ValidationError::TargetNotPositive(target_secs));
        }

        Ok(Self {
            estimate: initial_estimate,
            target: target_secs,
            average_rate: initial_estimate as f64 / target_secs,
            pending_begin: None,
            clamped: false,
        })
    }

    /// The current recommended chunk size. Pure read.
    pub fn estimated_size(&self) -> u64 {
        self.estimate
    }

    /// Whether the last update clipped the raw recommendation.
    pub fn clamped(&self) -> bool {
        self.clamped
    }

    /// The current moving average, in items per second.
    pub fn average_rate(&self) -> f64 {
        self.average_rate
    }

    /// The target chunk duration, in seconds.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Changes the target duration for subsequent updates.
    ///
    /// The moving average is not rescaled retroactively.
    pub fn set_target(&mut self, target_secs: f64) -> Result<(), ValidationError> {
        if !(target_secs > 0.0 && target_secs.is_finite()) {
            return Err(ValidationError::TargetNotPositive(target_secs));
        }
        self.target = target_secs;
        Ok(())
    }

    /// Marks the start of a measurement window. Call before doing chunk work.
    pub fn begin(&mut self, clock: &dyn Clock) {
        self.pending_begin = Some(clock.now());
    }

    /// Closes the measurement window opened by [`RateEstimator::begin`] and
    /// updates the recommendation.
    ///
    /// When `processed` is `None` the caller is assumed to have processed
    /// exactly the recommended amount. Gotcha: a caller that processed fewer
    /// items without reporting the count silently inflates the observed rate.
    pub fn end(
        &mut self,
        clock: &dyn Clock,
        processed: Option<u64>,
        config: &PacerConfig,
    ) -> PaceResult<EstimateUpdated> {
        let begin = self
            .pending_begin
            .take()
            .ok_or(PaceError::MeasurementNotStarted)?;
        let elapsed_secs = clock.now().duration_since(begin).as_secs_f64();

        self.apply(elapsed_secs, processed, config)
    }

    /// Updates the recommendation from an explicitly measured elapsed time,
    /// equivalent to `begin` + `end` for callers who time chunks themselves.
    pub fn interval(
        &mut self,
        elapsed_secs: f64,
        processed: Option<u64>,
        config: &PacerConfig,
    ) -> PaceResult<EstimateUpdated> {
        // An explicit elapsed time supersedes any open measurement window.
        self.pending_begin = None;

        self.apply(elapsed_secs, processed, config)
    }

    fn apply(
        &mut self,
        elapsed_secs: f64,
        processed: Option<u64>,
        config: &PacerConfig,
    ) -> PaceResult<EstimateUpdated> {
        // Validate before touching the average: a zero or NaN elapsed must
        // never reach the division below.
        if !(elapsed_secs > 0.0 && elapsed_secs.is_finite()) {
            return Err(PaceError::InvalidElapsed(elapsed_secs));
        }

        let processed = processed.unwrap_or(self.estimate);
        let observed_rate = processed as f64 / elapsed_secs;

        let smoothing = config.smoothing;
        self.average_rate = smoothing * observed_rate + (1.0 - smoothing) * self.average_rate;

        let raw = (self.average_rate * self.target).round();
        let (min, max) = config.clamp_bounds();
        let clipped = raw.clamp(min as f64, max as f64);

        self.clamped = clipped != raw;
        self.estimate = clipped as u64;

        let event = EstimateUpdated {
            processed,
            elapsed_secs,
            target_secs: self.target,
            observed_rate,
            implied_rate: self.estimate as f64 / self.target,
            new_estimate: self.estimate,
            clamped: self.clamped,
        };

        debug!(
            processed,
            elapsed_secs,
            target_secs = self.target,
            observed_rate,
            average_rate = self.average_rate,
            new_estimate = self.estimate,
            clamped = self.clamped,
            "updated chunk size estimate"
        );

        Ok(event)
    }
}
