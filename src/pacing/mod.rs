//! Post-update pacing hooks.
//!
//! After every estimate update the controller runs its registered hooks in
//! order. A hook may block the caller (that is the point) and reports whether
//! it actually did, which feeds the controller's `paused` flag. A hook may
//! also fail, aborting the whole chunk loop; the lag gate does this when a
//! replica never recovers within its pause budget.

mod fixed;
mod lag_gate;

pub use fixed::FixedPause;
pub use lag_gate::LagGate;

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::PacerConfig;
use crate::error::PaceResult;
use crate::events::PaceEventSink;
use crate::lag::LagSource;

/// Everything a hook may consult while pacing: the resolved configuration,
/// the clock to sleep on, the event sink, and the already-updated estimate.
pub struct PaceContext<'a> {
    /// Resolved controller configuration.
    pub config: &'a PacerConfig,
    /// Clock used for all pacing sleeps.
    pub clock: &'a dyn Clock,
    /// Sink receiving structured diagnostics.
    pub sink: &'a dyn PaceEventSink,
    /// The chunk-size recommendation produced by the update this hook
    /// follows.
    pub estimate: u64,
}

/// One post-update pacing action.
pub trait PacingHook: Send {
    /// Runs after an estimate update, potentially blocking the caller.
    ///
    /// Returns whether the hook actually blocked. Errors abort the update and
    /// propagate out of the caller's `end`/`interval` call.
    fn after_update(&mut self, cx: &PaceContext<'_>) -> PaceResult<bool>;

    /// Offers replica lag sources to the hook.
    ///
    /// Hooks that do not watch replicas ignore the offer and return `false`;
    /// lag-aware hooks take ownership of the set and return `true`.
    fn set_sources(&mut self, _sources: Vec<Arc<dyn LagSource>>) -> bool {
        false
    }
}
