//! Error types for the chunk pacing control loop.
//!
//! Usage errors (caller contract violations) and operational failures share
//! one [`PaceError`] type so they propagate synchronously out of
//! `end`/`interval` to the caller's chunk loop. Configuration validation has
//! its own error type in [`crate::config`].

use thiserror::Error;

use crate::config::ValidationError;

/// Convenient result type for pacing operations using [`PaceError`] as the error type.
pub type PaceResult<T> = Result<T, PaceError>;

/// Errors raised by the chunk pacing control loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PaceError {
    /// A measurement was reported with a non-positive (or non-finite) elapsed
    /// time. This is a caller contract violation and is raised before any
    /// estimator state is mutated, so a bad sample can never poison the
    /// moving average with `NaN` or infinity.
    #[error("elapsed time must be positive and finite, got {0}s")]
    InvalidElapsed(f64),

    /// `end` was called without a matching `begin`.
    #[error("`end` called without a matching `begin`")]
    MeasurementNotStarted,

    /// An option name was requested that this controller does not know about.
    #[error("unknown option `{0}`")]
    UnknownOption(String),

    /// An option was set with a value of the wrong shape.
    #[error("option `{name}` expects {expected}")]
    InvalidOptionValue {
        /// The option that was being set.
        name: String,
        /// Human-readable description of the expected value shape.
        expected: &'static str,
    },

    /// An option update would have produced an invalid configuration.
    #[error(transparent)]
    InvalidConfig(#[from] ValidationError),

    /// A replica stayed above the lag threshold for the whole pause budget.
    ///
    /// Unless `continue_on_timeout` is configured this aborts the entire
    /// segmented operation; retry or resume policy belongs to the caller.
    #[error(
        "replica lag on `{label}` did not recover: still {lag_secs}s behind after waiting {waited_ms}ms"
    )]
    LagTimeout {
        /// Label of the offending lag source.
        label: String,
        /// The last observed lag, in seconds.
        lag_secs: f64,
        /// Total time spent waiting on this source, in milliseconds.
        waited_ms: u64,
    },
}
