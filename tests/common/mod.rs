//! Shared fakes for the integration tests: a virtual clock, scripted lag
//! sources and a recording event sink.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chunkpace::{Clock, EstimateUpdated, LagSource, LagWait, PaceEventSink};

/// Installs a subscriber once so `RUST_LOG=chunkpace=debug` surfaces the
/// pacing diagnostics during test runs.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A clock on a virtual timeline: sleeps advance time instantly and are
/// recorded, so lag scenarios run deterministically and fast.
pub struct FakeClock {
    base: Instant,
    state: Mutex<FakeClockState>,
}

struct FakeClockState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            state: Mutex::new(FakeClockState {
                offset: Duration::ZERO,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Advances the timeline without recording a sleep, simulating the
    /// caller doing chunk work.
    pub fn advance(&self, duration: Duration) {
        self.state.lock().unwrap().offset += duration;
    }

    /// Total time spent in pacing sleeps.
    pub fn total_slept(&self) -> Duration {
        self.state.lock().unwrap().sleeps.iter().sum()
    }

    /// Every recorded sleep, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + self.state.lock().unwrap().offset
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.offset += duration;
        state.sleeps.push(duration);
    }
}

/// Replays a fixed sequence of lag readings in poll order, repeating the
/// last reading once the script is exhausted.
pub struct ScriptedLagSource {
    label: String,
    readings: Vec<Option<Duration>>,
    next: AtomicUsize,
}

impl ScriptedLagSource {
    pub fn new(label: &str, readings: Vec<Option<Duration>>) -> Self {
        assert!(!readings.is_empty(), "script needs at least one reading");
        Self {
            label: label.to_string(),
            readings,
            next: AtomicUsize::new(0),
        }
    }

    pub fn polls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl LagSource for ScriptedLagSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn current_lag(&self) -> Option<Duration> {
        let index = self
            .next
            .fetch_add(1, Ordering::SeqCst)
            .min(self.readings.len() - 1);
        self.readings[index]
    }
}

/// Collects every emitted event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub updates: Mutex<Vec<EstimateUpdated>>,
    pub lag_waits: Mutex<Vec<LagWait>>,
}

impl PaceEventSink for RecordingSink {
    fn estimate_updated(&self, event: &EstimateUpdated) {
        self.updates.lock().unwrap().push(event.clone());
    }

    fn lag_wait(&self, event: &LagWait) {
        self.lag_waits.lock().unwrap().push(event.clone());
    }
}
