//! The chunk pacing facade held by callers.
//!
//! [`ChunkController`] combines one [`RateEstimator`] with an ordered list of
//! pacing hooks. The caller's loop is strictly sequential: ask for the
//! current size, do that much work, report the outcome, and let the
//! controller pace before the next iteration:
//!
//! ```
//! use chunkpace::{ChunkController, PacerConfig};
//!
//! let mut controller = ChunkController::new(500, 0.5, PacerConfig::default())?;
//!
//! for _ in 0..3 {
//!     let chunk_size = controller.estimated_size();
//!     controller.begin();
//!     // ... process `chunk_size` rows ...
//!     std::thread::sleep(std::time::Duration::from_millis(5));
//!     controller.end(Some(chunk_size))?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{OptionValue, PacerConfig, ValidationError};
use crate::error::{PaceError, PaceResult};
use crate::estimator::RateEstimator;
use crate::events::{EstimateUpdated, NoopSink, PaceEventSink};
use crate::lag::LagSource;
use crate::pacing::{FixedPause, LagGate, PaceContext, PacingHook};

/// Paces a caller-driven loop of chunked work.
///
/// One controller owns one estimator and its hooks and must not be shared
/// across concurrent loops; run one controller per thread when overlapping
/// independent operations. Lag sources, by contrast, may be shared freely.
pub struct ChunkController {
    config: PacerConfig,
    estimator: RateEstimator,
    hooks: Vec<Box<dyn PacingHook>>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn PaceEventSink>,
    paused: bool,
}

impl ChunkController {
    /// Creates a controller with no pacing hooks.
    ///
    /// Clamp bounds missing from `config` are computed from
    /// `initial_estimate` (1% and 3x).
    pub fn new(
        initial_estimate: u64,
        target_secs: f64,
        config: PacerConfig,
    ) -> Result<Self, ValidationError> {
        let config = config.resolve(initial_estimate);
        config.validate()?;
        let estimator = RateEstimator::new(initial_estimate, target_secs)?;

        Ok(Self {
            config,
            estimator,
            hooks: Vec::new(),
            clock: Arc::new(SystemClock),
            sink: Arc::new(NoopSink),
            paused: false,
        })
    }

    /// Registers the fixed post-update pause hook.
    pub fn with_fixed_pause(mut self) -> Self {
        self.hooks.push(Box::new(FixedPause));
        self
    }

    /// Registers a lag gate watching `sources`.
    pub fn with_lag_gate(mut self, sources: Vec<Arc<dyn LagSource>>) -> Self {
        self.hooks.push(Box::new(LagGate::with_sources(sources)));
        self
    }

    /// Registers an arbitrary pacing hook; hooks run in registration order.
    pub fn push_hook(&mut self, hook: Box<dyn PacingHook>) {
        self.hooks.push(hook);
    }

    /// Replaces the clock used for measurements and pacing sleeps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the diagnostic event sink.
    pub fn with_sink(mut self, sink: Arc<dyn PaceEventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The current recommended chunk size. Pure read.
    pub fn estimated_size(&self) -> u64 {
        self.estimator.estimated_size()
    }

    /// Whether the most recent update blocked on any pacing hook.
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Whether the most recent update clipped the raw recommendation.
    pub fn clamped(&self) -> bool {
        self.estimator.clamped()
    }

    /// Marks the start of a chunk. Call before doing the chunk's work.
    pub fn begin(&mut self) {
        self.estimator.begin(self.clock.as_ref());
    }

    /// Marks the end of a chunk, updates the recommendation and paces.
    ///
    /// When `processed` is `None` the caller is assumed to have processed
    /// exactly the recommended amount; see [`RateEstimator::end`] for the
    /// gotcha this carries.
    pub fn end(&mut self, processed: Option<u64>) -> PaceResult<()> {
        let event = self
            .estimator
            .end(self.clock.as_ref(), processed, &self.config)?;
        self.finish_update(event)
    }

    /// Reports a chunk with an explicitly measured duration, then paces.
    /// Equivalent to `begin` + `end` for callers who time chunks themselves.
    pub fn interval(&mut self, elapsed_secs: f64, processed: Option<u64>) -> PaceResult<()> {
        let event = self
            .estimator
            .interval(elapsed_secs, processed, &self.config)?;
        self.finish_update(event)
    }

    /// Changes the target chunk duration for subsequent updates.
    pub fn set_target(&mut self, target_secs: f64) -> Result<(), ValidationError> {
        self.estimator.set_target(target_secs)
    }

    /// Installs replica lag sources on the registered lag gate, creating and
    /// registering one if no lag-aware hook exists yet.
    pub fn set_sources(&mut self, sources: Vec<Arc<dyn LagSource>>) {
        for hook in &mut self.hooks {
            if hook.set_sources(sources.clone()) {
                return;
            }
        }
        self.hooks.push(Box::new(LagGate::with_sources(sources)));
    }

    /// Reads a configuration value by name.
    ///
    /// Unknown names are a usage error.
    pub fn option(&self, name: &str) -> PaceResult<OptionValue> {
        let (min, max) = self.config.clamp_bounds();
        match name {
            "min" => Ok(OptionValue::Integer(min)),
            "max" => Ok(OptionValue::Integer(max)),
            "smoothing" => Ok(OptionValue::Float(self.config.smoothing)),
            "pause_always_ms" => Ok(OptionValue::Integer(self.config.pause_always_ms)),
            "max_lag_secs" => Ok(OptionValue::Float(self.config.max_lag_secs)),
            "pause_interval_ms" => Ok(OptionValue::Integer(self.config.pause_interval_ms)),
            "max_total_pause_ms" => Ok(OptionValue::Integer(self.config.max_total_pause_ms)),
            "continue_on_timeout" => Ok(OptionValue::Flag(self.config.continue_on_timeout)),
            other => Err(PaceError::UnknownOption(other.to_string())),
        }
    }

    /// Updates a configuration value by name, applied to subsequent updates.
    ///
    /// Unknown names and wrongly typed values are usage errors; updates that
    /// would produce an invalid configuration are rejected whole.
    pub fn set_option(&mut self, name: &str, value: OptionValue) -> PaceResult<()> {
        let mut candidate = self.config.clone();

        match name {
            "min" => candidate.min = Some(expect_integer(name, value)?),
            "max" => candidate.max = Some(expect_integer(name, value)?),
            "smoothing" => candidate.smoothing = expect_float(name, value)?,
            "pause_always_ms" => candidate.pause_always_ms = expect_integer(name, value)?,
            "max_lag_secs" => candidate.max_lag_secs = expect_float(name, value)?,
            "pause_interval_ms" => candidate.pause_interval_ms = expect_integer(name, value)?,
            "max_total_pause_ms" => candidate.max_total_pause_ms = expect_integer(name, value)?,
            "continue_on_timeout" => candidate.continue_on_timeout = expect_flag(name, value)?,
            other => return Err(PaceError::UnknownOption(other.to_string())),
        }

        candidate.validate()?;
        self.config = candidate;
        Ok(())
    }

    /// Emits the update event, then runs the hooks in registration order.
    ///
    /// The estimator has already been updated when hooks run, so
    /// [`ChunkController::estimated_size`] observed from a hook sees the new
    /// value. `paused` becomes true iff any hook actually blocked.
    fn finish_update(&mut self, event: EstimateUpdated) -> PaceResult<()> {
        self.sink.estimate_updated(&event);
        self.paused = false;

        let cx = PaceContext {
            config: &self.config,
            clock: self.clock.as_ref(),
            sink: self.sink.as_ref(),
            estimate: event.new_estimate,
        };
        for hook in &mut self.hooks {
            if hook.after_update(&cx)? {
                self.paused = true;
            }
        }

        Ok(())
    }
}

fn expect_integer(name: &str, value: OptionValue) -> PaceResult<u64> {
    match value {
        OptionValue::Integer(v) => Ok(v),
        _ => Err(PaceError::InvalidOptionValue {
            name: name.to_string(),
            expected: "an integer",
        }),
    }
}

fn expect_float(name: &str, value: OptionValue) -> PaceResult<f64> {
    match value {
        OptionValue::Float(v) => Ok(v),
        _ => Err(PaceError::InvalidOptionValue {
            name: name.to_string(),
            expected: "a float",
        }),
    }
}

fn expect_flag(name: &str, value: OptionValue) -> PaceResult<bool> {
    match value {
        OptionValue::Flag(v) => Ok(v),
        _ => Err(PaceError::InvalidOptionValue {
            name: name.to_string(),
            expected: "a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_value_sanity() {
        let controller = ChunkController::new(500, 0.2, PacerConfig::default()).unwrap();

        assert_eq!(controller.estimated_size(), 500);
        assert_eq!(controller.option("min").unwrap(), OptionValue::Integer(5));
        assert_eq!(controller.option("max").unwrap(), OptionValue::Integer(1500));
        assert!(!controller.paused());
    }

    #[test]
    fn rejects_invalid_construction() {
        assert!(ChunkController::new(0, 0.2, PacerConfig::default()).is_err());
        assert!(ChunkController::new(500, 0.0, PacerConfig::default()).is_err());

        let bad = PacerConfig {
            smoothing: 1.5,
            ..Default::default()
        };
        assert!(ChunkController::new(500, 0.2, bad).is_err());
    }

    #[test]
    fn unknown_option_is_an_error() {
        let mut controller = ChunkController::new(500, 0.2, PacerConfig::default()).unwrap();

        assert!(matches!(
            controller.option("chunk_sized"),
            Err(PaceError::UnknownOption(_))
        ));
        assert!(matches!(
            controller.set_option("chunk_sized", OptionValue::Integer(1)),
            Err(PaceError::UnknownOption(_))
        ));
    }

    #[test]
    fn wrongly_typed_option_is_an_error() {
        let mut controller = ChunkController::new(500, 0.2, PacerConfig::default()).unwrap();

        assert!(matches!(
            controller.set_option("min", OptionValue::Flag(true)),
            Err(PaceError::InvalidOptionValue { .. })
        ));
    }

    #[test]
    fn set_option_round_trips() {
        let mut controller = ChunkController::new(500, 0.2, PacerConfig::default()).unwrap();

        controller
            .set_option("max", OptionValue::Integer(2000))
            .unwrap();
        controller
            .set_option("smoothing", OptionValue::Float(0.5))
            .unwrap();
        controller
            .set_option("continue_on_timeout", OptionValue::Flag(true))
            .unwrap();

        assert_eq!(
            controller.option("max").unwrap(),
            OptionValue::Integer(2000)
        );
        assert_eq!(
            controller.option("smoothing").unwrap(),
            OptionValue::Float(0.5)
        );
        assert_eq!(
            controller.option("continue_on_timeout").unwrap(),
            OptionValue::Flag(true)
        );
    }

    #[test]
    fn invalid_option_update_is_rejected_whole() {
        let mut controller = ChunkController::new(500, 0.2, PacerConfig::default()).unwrap();

        let err = controller
            .set_option("smoothing", OptionValue::Float(2.0))
            .unwrap_err();
        assert!(matches!(err, PaceError::InvalidConfig(_)));
        // The previous value survives.
        assert_eq!(
            controller.option("smoothing").unwrap(),
            OptionValue::Float(PacerConfig::DEFAULT_SMOOTHING)
        );
    }

    #[test]
    fn new_bounds_apply_to_subsequent_updates() {
        let mut controller = ChunkController::new(500, 0.2, PacerConfig::default()).unwrap();

        controller
            .set_option("max", OptionValue::Integer(600))
            .unwrap();
        controller.interval(0.001, Some(100_000)).unwrap();

        assert_eq!(controller.estimated_size(), 600);
        assert!(controller.clamped());
    }

    #[test]
    fn interval_updates_estimate_without_hooks() {
        let mut controller = ChunkController::new(500, 0.2, PacerConfig::default()).unwrap();

        controller.interval(1.0, Some(1000)).unwrap();

        assert_eq!(controller.estimated_size(), 410);
        assert!(!controller.paused());
    }

    #[test]
    fn set_sources_registers_a_lag_gate_once() {
        use crate::lag::FixedLagSource;

        let mut controller = ChunkController::new(500, 0.2, PacerConfig::default()).unwrap();
        assert_eq!(controller.hooks.len(), 0);

        let source: Arc<dyn LagSource> = Arc::new(FixedLagSource::new("replica-1", None));
        controller.set_sources(vec![source.clone()]);
        assert_eq!(controller.hooks.len(), 1);

        // A second call replaces the set on the existing gate.
        controller.set_sources(vec![source.clone(), source]);
        assert_eq!(controller.hooks.len(), 1);
    }
}
