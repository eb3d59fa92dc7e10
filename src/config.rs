//! Configuration for the chunk pacing controller.
//!
//! [`PacerConfig`] is a plain serde struct so it can be embedded in a larger
//! pipeline configuration. Missing fields fall back to defaults; the clamp
//! bounds additionally depend on the caller's initial estimate and are filled
//! in by [`PacerConfig::resolve`] at controller construction.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by [`PacerConfig::validate`].
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    /// EWMA smoothing must stay strictly inside (0, 1).
    #[error("`smoothing` must be strictly between 0 and 1")]
    SmoothingOutOfRange,
    /// Lower clamp bound cannot exceed the upper one.
    #[error("`min` cannot exceed `max`")]
    MinAboveMax,
    /// The lag recheck interval cannot be zero, it drives the wait loop.
    #[error("`pause_interval_ms` cannot be zero")]
    PauseIntervalZero,
    /// The lag threshold cannot be negative or NaN.
    #[error("`max_lag_secs` cannot be negative")]
    MaxLagNegative,
    /// The initial chunk size estimate cannot be zero.
    #[error("initial estimate cannot be zero")]
    InitialEstimateZero,
    /// The target chunk duration must be a positive number of seconds.
    #[error("target duration must be positive, got {0}s")]
    TargetNotPositive(f64),
}

/// Tunables for the adaptive chunk-size estimator and its pacing hooks.
///
/// Durations are configured as integer milliseconds, lag thresholds as float
/// seconds to match what lag sources report.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PacerConfig {
    /// Lower clamp bound for the chunk-size estimate.
    ///
    /// When absent, [`PacerConfig::resolve`] computes 1% of the initial
    /// estimate (floored at 1).
    #[serde(default)]
    pub min: Option<u64>,
    /// Upper clamp bound for the chunk-size estimate.
    ///
    /// When absent, [`PacerConfig::resolve`] computes 3x the initial estimate.
    #[serde(default)]
    pub max: Option<u64>,
    /// EWMA weight in (0, 1). Higher values react faster to recent
    /// observations, lower values smooth noise more.
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    /// Fixed post-update delay in milliseconds. Zero disables the fixed pause.
    #[serde(default)]
    pub pause_always_ms: u64,
    /// Replication lag threshold in seconds above which pacing kicks in.
    #[serde(default = "default_max_lag_secs")]
    pub max_lag_secs: f64,
    /// Delay between lag rechecks, in milliseconds.
    #[serde(default = "default_pause_interval_ms")]
    pub pause_interval_ms: u64,
    /// Per-source pause budget, in milliseconds. Once the accumulated wait on
    /// one source exceeds this, the wait either fails or degrades to a
    /// warning depending on `continue_on_timeout`.
    #[serde(default = "default_max_total_pause_ms")]
    pub max_total_pause_ms: u64,
    /// Continue with a warning instead of failing when the pause budget is
    /// exhausted while a source is still lagging.
    #[serde(default)]
    pub continue_on_timeout: bool,
}

impl PacerConfig {
    /// Default EWMA smoothing weight.
    pub const DEFAULT_SMOOTHING: f64 = 0.3;

    /// Default lag threshold in seconds.
    pub const DEFAULT_MAX_LAG_SECS: f64 = 1.0;

    /// Default delay between lag rechecks in milliseconds.
    pub const DEFAULT_PAUSE_INTERVAL_MS: u64 = 500;

    /// Default per-source pause budget in milliseconds.
    pub const DEFAULT_MAX_TOTAL_PAUSE_MS: u64 = 60_000;

    /// Fills the clamp bounds from `initial_estimate` where they were not
    /// configured explicitly.
    ///
    /// An initial estimate of 500 yields `min = 5` and `max = 1500`.
    pub fn resolve(mut self, initial_estimate: u64) -> Self {
        self.min
            .get_or_insert_with(|| default_min(initial_estimate));
        self.max
            .get_or_insert_with(|| default_max(initial_estimate));
        self
    }

    /// Validates configuration settings.
    ///
    /// Ensures the smoothing weight stays inside (0, 1), the clamp bounds are
    /// ordered, the recheck interval is non-zero and the lag threshold is not
    /// negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.smoothing > 0.0 && self.smoothing < 1.0) {
            return Err(ValidationError::SmoothingOutOfRange);
        }

        if let (Some(min), Some(max)) = (self.min, self.max)
            && min > max
        {
            return Err(ValidationError::MinAboveMax);
        }

        if self.pause_interval_ms == 0 {
            return Err(ValidationError::PauseIntervalZero);
        }

        if !(self.max_lag_secs >= 0.0) {
            return Err(ValidationError::MaxLagNegative);
        }

        Ok(())
    }

    /// Returns the effective clamp bounds.
    ///
    /// Unresolved bounds fall back to `[1, u64::MAX]` so an unclamped config
    /// still behaves sanely when used directly with the estimator.
    pub fn clamp_bounds(&self) -> (u64, u64) {
        (self.min.unwrap_or(1), self.max.unwrap_or(u64::MAX))
    }

    /// The fixed post-update delay, if enabled.
    pub fn pause_always(&self) -> Option<Duration> {
        (self.pause_always_ms > 0).then(|| Duration::from_millis(self.pause_always_ms))
    }

    /// Delay between lag rechecks.
    pub fn pause_interval(&self) -> Duration {
        Duration::from_millis(self.pause_interval_ms)
    }

    /// Per-source pause budget.
    pub fn max_total_pause(&self) -> Duration {
        Duration::from_millis(self.max_total_pause_ms)
    }

    /// Lag threshold as a [`Duration`].
    pub fn max_lag(&self) -> Duration {
        Duration::from_secs_f64(self.max_lag_secs)
    }
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            smoothing: default_smoothing(),
            pause_always_ms: 0,
            max_lag_secs: default_max_lag_secs(),
            pause_interval_ms: default_pause_interval_ms(),
            max_total_pause_ms: default_max_total_pause_ms(),
            continue_on_timeout: false,
        }
    }
}

fn default_smoothing() -> f64 {
    PacerConfig::DEFAULT_SMOOTHING
}

fn default_max_lag_secs() -> f64 {
    PacerConfig::DEFAULT_MAX_LAG_SECS
}

fn default_pause_interval_ms() -> u64 {
    PacerConfig::DEFAULT_PAUSE_INTERVAL_MS
}

fn default_max_total_pause_ms() -> u64 {
    PacerConfig::DEFAULT_MAX_TOTAL_PAUSE_MS
}

fn default_min(initial_estimate: u64) -> u64 {
    ((initial_estimate as f64 * 0.01).round() as u64).max(1)
}

fn default_max(initial_estimate: u64) -> u64 {
    initial_estimate.saturating_mul(3)
}

/// A dynamically typed option value used by the by-name accessors on
/// [`crate::ChunkController`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OptionValue {
    /// Counts and millisecond durations.
    Integer(u64),
    /// Unitless or second-denominated floats.
    Float(f64),
    /// Boolean switches.
    Flag(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_json() {
        let config: PacerConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.min, None);
        assert_eq!(config.max, None);
        assert_eq!(config.smoothing, PacerConfig::DEFAULT_SMOOTHING);
        assert_eq!(config.pause_always_ms, 0);
        assert_eq!(config.max_lag_secs, PacerConfig::DEFAULT_MAX_LAG_SECS);
        assert_eq!(
            config.pause_interval_ms,
            PacerConfig::DEFAULT_PAUSE_INTERVAL_MS
        );
        assert_eq!(
            config.max_total_pause_ms,
            PacerConfig::DEFAULT_MAX_TOTAL_PAUSE_MS
        );
        assert!(!config.continue_on_timeout);
    }

    #[test]
    fn resolve_computes_bounds_from_initial_estimate() {
        let config = PacerConfig::default().resolve(500);

        assert_eq!(config.clamp_bounds(), (5, 1500));
    }

    #[test]
    fn resolve_floors_min_at_one() {
        let config = PacerConfig::default().resolve(10);

        assert_eq!(config.clamp_bounds(), (1, 30));
    }

    #[test]
    fn resolve_keeps_explicit_bounds() {
        let config = PacerConfig {
            min: Some(100),
            max: Some(200),
            ..Default::default()
        }
        .resolve(500);

        assert_eq!(config.clamp_bounds(), (100, 200));
    }

    #[test]
    fn validate_rejects_bad_smoothing() {
        for smoothing in [0.0, 1.0, -0.5, 2.0, f64::NAN] {
            let config = PacerConfig {
                smoothing,
                ..Default::default()
            };
            assert_eq!(
                config.validate(),
                Err(ValidationError::SmoothingOutOfRange),
                "smoothing {smoothing} should be rejected"
            );
        }
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let config = PacerConfig {
            min: Some(100),
            max: Some(50),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::MinAboveMax));
    }

    #[test]
    fn validate_rejects_zero_recheck_interval() {
        let config = PacerConfig {
            pause_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::PauseIntervalZero));
    }

    #[test]
    fn validate_rejects_negative_lag_threshold() {
        let config = PacerConfig {
            max_lag_secs: -1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::MaxLagNegative));
    }

    #[test]
    fn validate_accepts_zero_lag_threshold() {
        // A threshold of zero means "any measurable lag pauses".
        let config = PacerConfig {
            max_lag_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn serde_round_trip() {
        let config = PacerConfig {
            min: Some(10),
            max: Some(5000),
            smoothing: 0.5,
            pause_always_ms: 100,
            max_lag_secs: 2.5,
            pause_interval_ms: 250,
            max_total_pause_ms: 10_000,
            continue_on_timeout: true,
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: PacerConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.min, Some(10));
        assert_eq!(back.max, Some(5000));
        assert_eq!(back.smoothing, 0.5);
        assert_eq!(back.pause_always_ms, 100);
        assert_eq!(back.max_lag_secs, 2.5);
        assert_eq!(back.pause_interval_ms, 250);
        assert_eq!(back.max_total_pause_ms, 10_000);
        assert!(back.continue_on_timeout);
    }
}
