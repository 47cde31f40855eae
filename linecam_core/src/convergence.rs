//! Camera Convergence Scheduler
//!
//! Moves a live camera's aim toward a target look-at point on a fixed
//! cadence and stops by itself once the aim is within tolerance. The same
//! loop can drive the camera's position instead, see [`CameraChannel`].
//!
//! # Update rule
//!
//! Every tick the aim closes `damping` of the remaining gap:
//!
//! ```text
//! aim_{k+1} = aim_k + (target - aim_k) * damping
//! ```
//!
//! With the default damping of 0.1 the per-axis gap after `k` ticks is
//! `D * 0.9^k`, so a unit gap converges below 0.01 after 44 ticks. There
//! is no overshoot: the aim approaches the target from one side only.
//!
//! # Lifecycle
//!
//! ```text
//!   start() ──► Running ──(gap < tolerance on every axis)──► Converged
//!                  │
//!                  └────────(ConvergenceHandle::cancel)────► Cancelled
//! ```
//!
//! A target that never closes (NaN components, or a target moved every
//! tick through [`ConvergenceHandle::retarget`]) keeps the loop Running
//! forever. That is expected; the handle is the way out.

use nalgebra::Vector3;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use linecam_env::SceneContext;

use crate::camera::{lock_camera, CameraChannel, LiveCamera, SharedCamera};

/// Default tick cadence.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Default fraction of the remaining gap closed per tick.
pub const DEFAULT_DAMPING: f64 = 0.1;

/// Default per-axis convergence tolerance.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

static NEXT_DRIVE_ID: AtomicU64 = AtomicU64::new(1);

/// Tuning for a convergence run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceConfig {
    /// Wall-clock time between ticks (default: 100ms)
    pub tick_period: Duration,

    /// Fraction of the remaining gap closed per tick (default: 0.1)
    pub damping: f64,

    /// Per-axis gap below which the run converges (default: 0.01)
    pub tolerance: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            damping: DEFAULT_DAMPING,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Phase of a convergence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergencePhase {
    Running,
    Converged,
    Cancelled,
}

impl ConvergencePhase {
    /// True for `Converged` and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConvergencePhase::Running)
    }
}

/// True when `a` and `b` differ by less than `tolerance` on every axis.
///
/// NaN never compares as close.
pub fn within_tolerance(a: &Vector3<f64>, b: &Vector3<f64>, tolerance: f64) -> bool {
    (a - b).iter().all(|d| d.abs() < tolerance)
}

/// Pure per-tick convergence state.
#[derive(Debug, Clone)]
pub struct Convergence {
    aim: Vector3<f64>,
    target: Vector3<f64>,
    config: ConvergenceConfig,
    ticks: u64,
    phase: ConvergencePhase,
}

impl Convergence {
    pub fn new(from: Vector3<f64>, target: Vector3<f64>, config: ConvergenceConfig) -> Self {
        Self {
            aim: from,
            target,
            config,
            ticks: 0,
            phase: ConvergencePhase::Running,
        }
    }

    pub fn aim(&self) -> Vector3<f64> {
        self.aim
    }

    pub fn target(&self) -> Vector3<f64> {
        self.target
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn phase(&self) -> ConvergencePhase {
        self.phase
    }

    /// Replaces the target; a converged run starts running again.
    pub fn retarget(&mut self, target: Vector3<f64>) {
        self.target = target;
        if self.phase == ConvergencePhase::Converged {
            self.phase = ConvergencePhase::Running;
        }
    }

    /// Marks the run cancelled. No-op once terminal.
    pub fn cancel(&mut self) {
        if self.phase == ConvergencePhase::Running {
            self.phase = ConvergencePhase::Cancelled;
        }
    }

    /// Advances one tick and returns the new aim.
    ///
    /// Terminal runs return their last aim unchanged.
    pub fn tick(&mut self) -> Vector3<f64> {
        if self.phase.is_terminal() {
            return self.aim;
        }

        self.aim += (self.target - self.aim) * self.config.damping;
        self.ticks += 1;

        if within_tolerance(&self.aim, &self.target, self.config.tolerance) {
            self.phase = ConvergencePhase::Converged;
        }

        self.aim
    }
}

/// Snapshot published by a running convergence task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveStatus {
    pub phase: ConvergencePhase,
    pub ticks: u64,
    pub aim: Vector3<f64>,
}

/// External handle to a spawned convergence task.
///
/// Dropping the handle does not stop the task; call [`cancel`](Self::cancel).
#[derive(Debug, Clone)]
pub struct ConvergenceHandle {
    id: u64,
    channel: CameraChannel,
    cancelled: Arc<AtomicBool>,
    target_tx: Arc<watch::Sender<Vector3<f64>>>,
    status_rx: watch::Receiver<DriveStatus>,
}

impl ConvergenceHandle {
    /// Identifier used in logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Camera attribute this task writes.
    pub fn channel(&self) -> CameraChannel {
        self.channel
    }

    /// Requests cancellation. Takes effect at the next tick boundary.
    ///
    /// Returns false if the run had already finished.
    pub fn cancel(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    /// Moves the target of the running task.
    pub fn retarget(&self, target: Vector3<f64>) {
        self.target_tx.send_replace(target);
    }

    /// Latest published status.
    pub fn status(&self) -> DriveStatus {
        *self.status_rx.borrow()
    }

    /// True once the task reached a terminal phase.
    pub fn is_finished(&self) -> bool {
        self.status().phase.is_terminal()
    }

    /// Waits for the task to finish and returns its final status.
    pub async fn wait(&self) -> DriveStatus {
        let mut rx = self.status_rx.clone();
        loop {
            let status = *rx.borrow_and_update();
            if status.phase.is_terminal() {
                return status;
            }
            if rx.changed().await.is_err() {
                // Task gone without a terminal publish (runtime shutdown).
                return *rx.borrow();
            }
        }
    }
}

/// Spawns convergence tasks on a [`SceneContext`].
pub struct ConvergenceScheduler<Ctx: SceneContext> {
    context: Arc<Ctx>,
    config: ConvergenceConfig,
}

impl<Ctx: SceneContext> ConvergenceScheduler<Ctx> {
    pub fn new(context: Arc<Ctx>, config: ConvergenceConfig) -> Self {
        Self { context, config }
    }

    /// Starts aiming `camera` from `from` toward `target`.
    ///
    /// The first tick fires one period after the call. Callers sharing the
    /// camera must cancel any previous handle first (see `CameraDirector`).
    pub fn start<C: LiveCamera>(
        &self,
        camera: SharedCamera<C>,
        from: Vector3<f64>,
        target: Vector3<f64>,
    ) -> ConvergenceHandle {
        self.start_on(camera, CameraChannel::LookAt, from, target)
    }

    /// Starts moving `channel` of `camera` from `from` toward `target`.
    ///
    /// Drives on different channels of one camera may run side by side.
    pub fn start_on<C: LiveCamera>(
        &self,
        camera: SharedCamera<C>,
        channel: CameraChannel,
        from: Vector3<f64>,
        target: Vector3<f64>,
    ) -> ConvergenceHandle {
        let id = NEXT_DRIVE_ID.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (target_tx, mut target_rx) = watch::channel(target);
        let (status_tx, status_rx) = watch::channel(DriveStatus {
            phase: ConvergencePhase::Running,
            ticks: 0,
            aim: from,
        });

        info!(drive = id, ?channel, ?from, ?target, "camera convergence started");

        let context = Arc::clone(&self.context);
        let flag = Arc::clone(&cancelled);
        let mut state = Convergence::new(from, target, self.config);

        self.context.spawn("camera-convergence", async move {
            loop {
                context.sleep(state.config.tick_period).await;

                if target_rx.has_changed().unwrap_or(false) {
                    state.retarget(*target_rx.borrow_and_update());
                }

                {
                    let mut cam = lock_camera(&camera);
                    if flag.load(Ordering::SeqCst) {
                        state.cancel();
                    } else {
                        let aim = state.tick();
                        channel.apply(&mut *cam, aim);
                    }
                }

                debug!(drive = id, tick = state.ticks(), aim = ?state.aim(), "convergence tick");

                status_tx.send_replace(DriveStatus {
                    phase: state.phase(),
                    ticks: state.ticks(),
                    aim: state.aim(),
                });

                match state.phase() {
                    ConvergencePhase::Running => {}
                    ConvergencePhase::Converged => {
                        info!(drive = id, ticks = state.ticks(), "camera converged");
                        break;
                    }
                    ConvergencePhase::Cancelled => {
                        info!(drive = id, ticks = state.ticks(), "camera convergence cancelled");
                        break;
                    }
                }
            }
        });

        ConvergenceHandle {
            id,
            channel,
            cancelled,
            target_tx: Arc::new(target_tx),
            status_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{share, CameraState};
    use approx::assert_relative_eq;
    use linecam_env::TokioContext;

    /// Camera that remembers every aim it was given.
    #[derive(Default)]
    struct TraceCamera {
        aims: Vec<Vector3<f64>>,
    }

    impl LiveCamera for TraceCamera {
        fn look_at(&mut self, target: Vector3<f64>) {
            self.aims.push(target);
        }

        fn set_position(&mut self, _position: Vector3<f64>) {}
    }

    fn unit_run() -> Convergence {
        Convergence::new(Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0), ConvergenceConfig::default())
    }

    #[test]
    fn test_first_tick_moves_ten_percent() {
        let mut run = unit_run();
        let aim = run.tick();
        assert_relative_eq!(aim.x, 0.1, epsilon = 1e-12);
        assert_relative_eq!(aim.y, 0.0);
        assert_relative_eq!(aim.z, 0.0);
        assert_eq!(run.phase(), ConvergencePhase::Running);
    }

    #[test]
    fn test_monotonic_without_overshoot() {
        let mut run = unit_run();
        let mut last = 0.0;
        while !run.phase().is_terminal() {
            let x = run.tick().x;
            assert!(x > last);
            assert!(x <= 1.0);
            last = x;
        }
        assert_eq!(run.phase(), ConvergencePhase::Converged);
    }

    #[test]
    fn test_geometric_decay_tick_count() {
        // 0.9^43 ≈ 0.0108, 0.9^44 ≈ 0.0097
        let mut run = unit_run();
        while !run.phase().is_terminal() {
            run.tick();
        }
        assert_eq!(run.ticks(), 44);

        // Gap after k ticks is D * 0.9^k on every axis.
        let mut run = Convergence::new(
            Vector3::zeros(),
            Vector3::new(5.0, -5.0, 2.0),
            ConvergenceConfig::default(),
        );
        for _ in 0..10 {
            run.tick();
        }
        let gap = run.target() - run.aim();
        assert_relative_eq!(gap.x, 5.0 * 0.9f64.powi(10), epsilon = 1e-9);
        assert_relative_eq!(gap.y, -5.0 * 0.9f64.powi(10), epsilon = 1e-9);
        assert_relative_eq!(gap.z, 2.0 * 0.9f64.powi(10), epsilon = 1e-9);
    }

    #[test]
    fn test_tick_count_bounded_by_largest_gap() {
        for distance in [0.5, 1.0, 10.0, 100.0] {
            let mut run = Convergence::new(
                Vector3::zeros(),
                Vector3::new(distance, distance, distance),
                ConvergenceConfig::default(),
            );
            while !run.phase().is_terminal() {
                run.tick();
            }
            let bound = ((0.01 / distance).ln() / 0.9f64.ln()).ceil() as u64 + 1;
            assert!(run.ticks() <= bound, "distance {distance}: {} ticks", run.ticks());
        }
    }

    #[test]
    fn test_already_close_converges_in_one_tick() {
        let mut run = Convergence::new(
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(1.001, 1.0, 1.0),
            ConvergenceConfig::default(),
        );
        run.tick();
        assert_eq!(run.phase(), ConvergencePhase::Converged);
        assert_eq!(run.ticks(), 1);
    }

    #[test]
    fn test_nan_target_never_converges() {
        let mut run = Convergence::new(
            Vector3::zeros(),
            Vector3::new(f64::NAN, 0.0, 0.0),
            ConvergenceConfig::default(),
        );
        for _ in 0..1_000 {
            run.tick();
        }
        assert_eq!(run.phase(), ConvergencePhase::Running);
        run.cancel();
        assert_eq!(run.phase(), ConvergencePhase::Cancelled);
    }

    #[test]
    fn test_terminal_tick_is_noop() {
        let mut run = unit_run();
        run.cancel();
        let aim = run.tick();
        assert_eq!(aim, Vector3::zeros());
        assert_eq!(run.ticks(), 0);
    }

    #[test]
    fn test_retarget_reopens_converged_run() {
        let mut run = Convergence::new(Vector3::zeros(), Vector3::zeros(), ConvergenceConfig::default());
        run.tick();
        assert_eq!(run.phase(), ConvergencePhase::Converged);
        run.retarget(Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(run.phase(), ConvergencePhase::Running);
    }

    #[test]
    fn test_within_tolerance() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        assert!(within_tolerance(&a, &Vector3::new(1.005, 1.995, 3.0), 0.01));
        assert!(!within_tolerance(&a, &Vector3::new(1.0, 2.0, 3.02), 0.01));
        assert!(!within_tolerance(&a, &Vector3::new(f64::NAN, 2.0, 3.0), 0.01));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_drives_camera_to_target() {
        let ctx = TokioContext::shared();
        let scheduler = ConvergenceScheduler::new(ctx, ConvergenceConfig::default());
        let camera = share(TraceCamera::default());

        let handle = scheduler.start(camera.clone(), Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        let status = handle.wait().await;

        assert_eq!(status.phase, ConvergencePhase::Converged);
        assert_eq!(status.ticks, 44);

        let cam = lock_camera(&camera);
        assert_eq!(cam.aims.len(), 44);
        assert_relative_eq!(cam.aims[0].x, 0.1, epsilon = 1e-12);
        assert!(cam.aims.windows(2).all(|w| w[1].x > w[0].x));
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_channel_moves_camera() {
        let ctx = TokioContext::shared();
        let scheduler = ConvergenceScheduler::new(ctx, ConvergenceConfig::default());
        let camera = share(CameraState::default());

        let handle = scheduler.start_on(
            camera.clone(),
            CameraChannel::Position,
            Vector3::new(0.0, 10.0, 150.0),
            Vector3::new(0.0, 10.0, 149.0),
        );
        assert_eq!(handle.channel(), CameraChannel::Position);
        let status = handle.wait().await;

        assert_eq!(status.phase, ConvergencePhase::Converged);
        assert_eq!(status.ticks, 44);
        let cam = lock_camera(&camera);
        assert_eq!(cam.position, status.aim);
        assert_eq!(cam.look_at, Vector3::zeros());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_period() {
        let ctx = TokioContext::shared();
        let scheduler = ConvergenceScheduler::new(ctx.clone(), ConvergenceConfig::default());
        let camera = share(CameraState::default());

        let started = ctx.now();
        let handle = scheduler.start(camera, Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        handle.wait().await;

        let elapsed = ctx.now() - started;
        assert!(elapsed >= DEFAULT_TICK_PERIOD * 44);
        assert!(elapsed < DEFAULT_TICK_PERIOD * 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_cancel_stops_endless_run() {
        let ctx = TokioContext::shared();
        let scheduler = ConvergenceScheduler::new(ctx.clone(), ConvergenceConfig::default());
        let camera = share(TraceCamera::default());

        let handle = scheduler.start(
            camera.clone(),
            Vector3::zeros(),
            Vector3::new(f64::NAN, 0.0, 0.0),
        );

        ctx.sleep(Duration::from_millis(1_050)).await;
        assert!(!handle.is_finished());
        assert!(handle.cancel());

        let status = handle.wait().await;
        assert_eq!(status.phase, ConvergencePhase::Cancelled);
        assert_eq!(status.ticks, 10);
        assert_eq!(lock_camera(&camera).aims.len(), 10);

        // Cancelling a finished run reports false.
        assert!(!handle.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retarget_running_task() {
        let ctx = TokioContext::shared();
        let scheduler = ConvergenceScheduler::new(ctx.clone(), ConvergenceConfig::default());
        let camera = share(CameraState::default());

        let handle = scheduler.start(camera.clone(), Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        ctx.sleep(Duration::from_millis(250)).await;
        handle.retarget(Vector3::new(0.0, 0.0, -4.0));

        let status = handle.wait().await;
        assert_eq!(status.phase, ConvergencePhase::Converged);
        assert!(within_tolerance(&status.aim, &Vector3::new(0.0, 0.0, -4.0), DEFAULT_TOLERANCE));
        assert_eq!(lock_camera(&camera).look_at, status.aim);
    }
}
