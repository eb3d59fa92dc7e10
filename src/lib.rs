//! Adaptive chunk sizing and replication-lag pacing for bulk operations.
//!
//! Large segmented operations (bulk row mutations, backfills) work best when
//! each chunk takes roughly a constant wallclock duration and the loop slows
//! down while replicas fall behind. This crate provides the control loop for
//! that: a [`ChunkController`] recommends a chunk size from observed
//! throughput (an exponentially weighted moving average, clamped to bounds)
//! and paces the caller after every chunk, optionally stalling while any
//! configured [`LagSource`] reports lag above a threshold.
//!
//! The loop is strictly sequential and blocking; pacing sleeps hold the
//! caller's thread on purpose. The actual chunked work stays with the caller.
//!
//! ```
//! use chunkpace::{ChunkController, PacerConfig};
//!
//! let mut controller = ChunkController::new(500, 0.5, PacerConfig::default())?;
//!
//! // The caller measured a 0.4s chunk of 500 rows; the recommendation
//! // adapts toward the rate that fills the 0.5s target.
//! controller.interval(0.4, Some(500))?;
//! assert!(controller.estimated_size() > 500);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod estimator;
pub mod events;
pub mod lag;
pub mod pacing;

pub use clock::{Clock, SystemClock};
pub use config::{OptionValue, PacerConfig, ValidationError};
pub use controller::ChunkController;
pub use error::{PaceError, PaceResult};
pub use estimator::RateEstimator;
pub use events::{EstimateUpdated, LagWait, NoopSink, PaceEventSink};
pub use lag::{FixedLagSource, FnLagSource, LagSource};
pub use pacing::{FixedPause, LagGate, PaceContext, PacingHook};
