//! Virtual-clock `SceneContext` for reproducible runs.

use async_trait::async_trait;
use linecam_env::SceneContext;
use std::cell::Cell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

tokio::task_local! {
    /// Clock reading when the current task was spawned, until its first sleep.
    static SPAWNED_AT_NS: Cell<Option<u64>>;
}

/// Clock that only moves when a task sleeps or the harness advances it.
///
/// Clones share the same clock.
///
/// Run it on a current-thread runtime: every task then interleaves at
/// its sleeps, so a scenario replays identically every time.
///
/// A sleep wakes at `max(clock, start + duration)`, where `start` is the
/// clock when the sleep began. Tasks sleeping over the same span share it
/// instead of each pushing the clock forward. A spawned task's first sleep
/// starts at its spawn time, even if another task moved the clock before
/// it was first polled.
pub struct SimContext {
    /// Nanoseconds since the run started
    virtual_time_ns: Arc<Mutex<u64>>,
}

impl SimContext {
    /// Creates a context with the clock at zero.
    pub fn new() -> Self {
        Self {
            virtual_time_ns: Arc::new(Mutex::new(0)),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn clock(&self) -> MutexGuard<'_, u64> {
        self.virtual_time_ns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the clock forward by `duration`.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.clock();
        *time += duration.as_nanos() as u64;
    }

    pub fn time_ns(&self) -> u64 {
        *self.clock()
    }
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
        }
    }
}

#[async_trait]
impl SceneContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    async fn sleep(&self, duration: Duration) {
        let start = SPAWNED_AT_NS
            .try_with(Cell::take)
            .ok()
            .flatten()
            .unwrap_or_else(|| self.time_ns());
        let wake = start + duration.as_nanos() as u64;
        // Yield so a ticking loop cannot starve the task that cancels it.
        tokio::task::yield_now().await;
        let mut time = self.clock();
        *time = (*time).max(wake);
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let at_ns = self.time_ns();
        tracing::trace!(task = name, at_ns, "sim spawn");
        tokio::spawn(SPAWNED_AT_NS.scope(Cell::new(Some(at_ns)), future));
    }
}
