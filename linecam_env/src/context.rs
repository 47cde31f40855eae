//! Clock and task seam between the camera engine and its runtime.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Time and task access for the engine.
///
/// The camera engine never touches `tokio::time` directly; every wait goes
/// through this trait so the same scheduler code runs against the wall
/// clock in production and a virtual clock in simulation.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time` and `tokio::spawn`
/// - **Simulation**: `SimContext` (in `linecam_sim`) - virtual clock
#[async_trait]
pub trait SceneContext: Send + Sync + 'static {
    /// Monotonic time elapsed since the context was created (virtual in
    /// simulation).
    fn now(&self) -> Duration;

    /// Waits `duration`. The simulated clock jumps ahead instead of waiting.
    async fn sleep(&self, duration: Duration);

    /// Runs `future` in the background; `name` labels its tracing span.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
