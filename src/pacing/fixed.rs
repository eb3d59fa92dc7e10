//! Unconditional fixed-delay pacing.

use tracing::debug;

use crate::error::PaceResult;
use crate::pacing::{PaceContext, PacingHook};

/// Sleeps for the configured `pause_always_ms` after every update.
///
/// Used for fixed-rate throttling independent of observed lag. When the
/// delay is not configured (zero) the hook is a no-op and does not mark the
/// update as paused.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedPause;

impl PacingHook for FixedPause {
    fn after_update(&mut self, cx: &PaceContext<'_>) -> PaceResult<bool> {
        let Some(delay) = cx.config.pause_always() else {
            return Ok(false);
        };

        debug!(pause_ms = delay.as_millis() as u64, "applying fixed pause");
        cx.clock.sleep(delay);

        Ok(true)
    }
}
