//! Scenario runner - plays camera scenarios on a virtual clock.

use crate::camera::{CameraWrite, RecordingCamera};
use crate::context::SimContext;
use crate::exporter::{LineFrame, SimEvent, SimExport, SimFrame, TrailPoint};
use crate::scenarios::ScenarioId;

use linecam_core::{
    lock_camera, share, within_tolerance, AnimationCurve, CameraDirector, ConvergenceHandle,
    ConvergencePhase, ConvergenceScheduler, DriveStatus, EngineConfig, FocusDrives, LineEntity,
    LinePlayback, ScenePose, SharedCamera, Song,
};
use linecam_env::SceneContext;
use nalgebra::Vector3;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Convergence ticks executed across every drive
    pub total_ticks: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Convergence drives started
    pub drives_started: u64,

    /// Drives that reached Converged
    pub drives_converged: u64,

    /// Drives that ended Cancelled
    pub drives_cancelled: u64,

    /// `look_at` writes observed on the camera
    pub look_at_writes: u64,

    /// Playback samples taken
    pub playback_samples: u64,

    /// Longest trail seen during playback
    pub max_trail_len: usize,
}

/// Runs camera scenarios.
pub struct ScenarioRunner {
    /// Engine tuning
    config: EngineConfig,

    /// Ticks after which a still-running drive is cancelled
    max_ticks: u64,

    /// Ticks the NaN drive is left running before it is cancelled
    nan_cancel_after: u64,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioRunner {
    /// Creates a new scenario runner with the default engine config.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            max_ticks: 10_000,
            nan_cancel_after: 10,
        }
    }

    /// Sets the engine config.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the tick limit after which a running drive is cancelled.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = ticks;
        self
    }

    /// Sets how long the NaN drive runs before it is cancelled.
    pub fn with_nan_cancel_after(mut self, ticks: u64) -> Self {
        self.nan_cancel_after = ticks;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_with_export(scenario).0
    }

    /// Runs a scenario and returns the result with its frame export.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        info!("Starting scenario: {}", scenario.name());
        debug!("  {}", scenario.description());

        if scenario == ScenarioId::SongReplay {
            return self.execute(scenario, Some(&demo_song()));
        }
        self.execute(scenario, None)
    }

    /// Replays a song line by line: focus, let the camera settle, then
    /// play back the line's animation.
    pub fn replay(&self, song: &Song) -> (ScenarioResult, SimExport) {
        info!("Replaying song {} \"{}\" ({} lines)", song.id, song.title, song.lines.len());
        self.execute(ScenarioId::SongReplay, Some(song))
    }

    fn execute(&self, scenario: ScenarioId, song: Option<&Song>) -> (ScenarioResult, SimExport) {
        let runtime = match tokio::runtime::Builder::new_current_thread().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                let mut export = SimExport::new(scenario.name());
                export.finalize(false, None);
                let result = ScenarioResult {
                    scenario,
                    passed: false,
                    total_ticks: 0,
                    final_time_secs: 0.0,
                    failure_reason: Some(format!("failed to build runtime: {}", e)),
                    metrics: ScenarioMetrics::default(),
                };
                return (result, export);
            }
        };

        let mut harness = Harness::new(scenario, &self.config);
        let outcome = runtime.block_on(async {
            match (scenario, song) {
                (ScenarioId::Converge, _) => self.run_converge(&mut harness).await,
                (ScenarioId::Handoff, _) => self.run_handoff(&mut harness).await,
                (ScenarioId::NanTarget, _) => self.run_nan_target(&mut harness).await,
                (ScenarioId::StaticLine, _) => self.run_static_line(&mut harness).await,
                (ScenarioId::Playback, _) => self.run_playback(&mut harness).await,
                (ScenarioId::SongReplay, Some(song)) => self.run_song(&mut harness, song).await,
                (ScenarioId::SongReplay, None) => self.run_song(&mut harness, &demo_song()).await,
            }
        });
        harness.flush_camera();

        let passed = outcome.is_ok();
        harness.export.finalize(passed, harness.final_gap);

        let result = ScenarioResult {
            scenario,
            passed,
            total_ticks: harness.total_ticks,
            final_time_secs: harness.context.now().as_secs_f64(),
            failure_reason: outcome.err(),
            metrics: harness.metrics,
        };
        (result, harness.export)
    }

    /// Unit gap on one axis, left alone until it converges.
    async fn run_converge(&self, h: &mut Harness) -> Result<(), String> {
        let target = Vector3::new(1.0, 0.0, 0.0);
        let handle = h.point(Vector3::zeros(), target);
        let status = h.settle(&handle, self.max_ticks).await;
        h.final_gap = Some((status.aim - target).norm());

        if status.phase != ConvergencePhase::Converged {
            return Err(format!(
                "drive ended {:?} after {} ticks",
                status.phase, status.ticks
            ));
        }

        let look_at = lock_camera(&h.camera).look_at;
        if !within_tolerance(&look_at, &target, h.config.tolerance) {
            return Err(format!("camera aim {:?} not within tolerance of {:?}", look_at, target));
        }
        if h.metrics.look_at_writes != status.ticks {
            return Err(format!(
                "camera written {} times over {} ticks",
                h.metrics.look_at_writes, status.ticks
            ));
        }
        Ok(())
    }

    /// Second drive pre-empts the first after three ticks.
    async fn run_handoff(&self, h: &mut Harness) -> Result<(), String> {
        let first = h.point(Vector3::zeros(), Vector3::new(100.0, 0.0, 0.0));
        h.run_until(&first, 3).await;

        let target = Vector3::new(0.0, 5.0, 0.0);
        let second = h.point(first.status().aim, target);
        let first_status = first.wait().await;
        h.record(&first_status);
        let second_status = h.settle(&second, self.max_ticks).await;
        h.final_gap = Some((second_status.aim - target).norm());

        if first_status.phase != ConvergencePhase::Cancelled {
            return Err(format!("pre-empted drive ended {:?}", first_status.phase));
        }
        if second_status.phase != ConvergencePhase::Converged {
            return Err(format!("replacement drive ended {:?}", second_status.phase));
        }
        let writes = first_status.ticks + second_status.ticks;
        if h.metrics.look_at_writes != writes {
            return Err(format!(
                "camera written {} times, drives ticked {} times",
                h.metrics.look_at_writes, writes
            ));
        }
        if lock_camera(&h.camera).look_at != second_status.aim {
            return Err("camera does not hold the replacement drive's aim".to_string());
        }
        Ok(())
    }

    /// NaN target keeps running until the caller gives up on it.
    async fn run_nan_target(&self, h: &mut Harness) -> Result<(), String> {
        let handle = h.point(Vector3::zeros(), Vector3::new(f64::NAN, 0.0, 0.0));
        let status = h.settle(&handle, self.nan_cancel_after).await;

        if status.phase != ConvergencePhase::Cancelled {
            return Err(format!("NaN drive ended {:?}", status.phase));
        }
        if status.ticks < self.nan_cancel_after {
            return Err(format!(
                "NaN drive stopped after {} ticks, expected at least {}",
                status.ticks, self.nan_cancel_after
            ));
        }
        if h.metrics.look_at_writes != status.ticks {
            return Err("camera written after cancellation".to_string());
        }
        Ok(())
    }

    /// Static line: camera snaps, nothing is scheduled.
    async fn run_static_line(&self, h: &mut Harness) -> Result<(), String> {
        let line = LineEntity {
            id: 1,
            label: "standing still".to_string(),
            cam_position: Vector3::new(0.0, 20.0, 80.0),
            cam_look_at: Vector3::new(0.0, 0.0, -10.0),
            ..Default::default()
        };

        let drives = h.focus(&line);
        if !drives.is_empty() {
            drives.handles().for_each(|handle| {
                handle.cancel();
            });
            return Err("static line started a convergence drive".to_string());
        }

        let cam = lock_camera(&h.camera);
        if cam.position != line.cam_position || cam.look_at != line.cam_look_at {
            return Err(format!(
                "camera at {:?} aiming {:?} after snap",
                cam.position, cam.look_at
            ));
        }
        Ok(())
    }

    /// Eased position animation with a five-point trail.
    async fn run_playback(&self, h: &mut Harness) -> Result<(), String> {
        let end = Vector3::new(10.0, 0.0, 0.0);
        let line = LineEntity {
            id: 2,
            label: "chorus".to_string(),
            end_position: Some(end),
            animation: Some(AnimationCurve::InOut),
            keep_n_last: 5,
            ..Default::default()
        };

        let midpoint = line.pose_at(0.5).position;
        if !within_tolerance(&midpoint, &Vector3::new(5.0, 0.0, 0.0), 1e-9) {
            return Err(format!("InOut midpoint is {:?}", midpoint));
        }

        let (pose, playback, samples) = h.play(&line).await;
        if !within_tolerance(&pose.position, &end, 1e-9) {
            return Err(format!("playback ended at {:?}", pose.position));
        }

        let expected_trail = (line.keep_n_last as u64).min(samples) as usize;
        if playback.trail().len() != expected_trail {
            return Err(format!(
                "trail holds {} points, expected {}",
                playback.trail().len(),
                expected_trail
            ));
        }
        Ok(())
    }

    async fn run_song(&self, h: &mut Harness, song: &Song) -> Result<(), String> {
        let mut failures = Vec::new();

        for line in &song.lines {
            let drives = h.focus(line);
            for handle in drives.handles() {
                let status = h.settle(handle, self.max_ticks).await;
                if status.phase != ConvergencePhase::Converged {
                    failures.push(format!(
                        "line {} {:?} drive ended {:?}",
                        line.id,
                        handle.channel(),
                        status.phase
                    ));
                }
            }
            if let (Some(handle), Some(target)) = (&drives.look_at, line.cam_end_look_at) {
                h.final_gap = Some((handle.status().aim - target).norm());
            }
            if line.is_animated() {
                h.play(line).await;
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }
}

/// Three-line song used by the `song_replay` scenario.
///
/// Line 1 is static, line 2 swings the camera's aim and moves, line 3
/// pushes the camera in and moves.
pub fn demo_song() -> Song {
    let mut song = Song::from_lyrics(["hello again", "the lights come round", "and fade away"]);
    song.id = 1;
    song.title = "Demo".to_string();
    for (i, line) in song.lines.iter_mut().enumerate() {
        line.id = i as i32 + 1;
    }

    let swing = &mut song.lines[1];
    swing.position = Vector3::new(0.0, -5.0, 0.0);
    swing.end_position = Some(Vector3::new(0.0, 5.0, 0.0));
    swing.cam_end_look_at = Some(Vector3::new(5.0, 2.0, 0.0));
    swing.animation = Some(AnimationCurve::Out);
    swing.keep_n_last = 3;

    let drift = &mut song.lines[2];
    drift.end_position = Some(Vector3::new(-10.0, 0.0, 0.0));
    drift.cam_end_position = Some(Vector3::new(0.0, 10.0, 120.0));
    drift.animation = Some(AnimationCurve::In);

    song
}

/// Per-run state: the virtual clock, the recorded camera and what has
/// been exported so far.
struct Harness {
    context: Arc<SimContext>,
    camera: SharedCamera<RecordingCamera>,
    director: CameraDirector<SimContext, RecordingCamera>,
    config: EngineConfig,
    export: SimExport,
    metrics: ScenarioMetrics,
    total_ticks: u64,
    final_gap: Option<f64>,
    position: Vector3<f64>,
    look_at: Vector3<f64>,
}

impl Harness {
    fn new(scenario: ScenarioId, config: &EngineConfig) -> Self {
        let context = SimContext::shared();
        let camera = share(RecordingCamera::new(context.as_ref().clone()));
        let (position, look_at) = {
            let cam = lock_camera(&camera);
            (cam.position, cam.look_at)
        };
        let scheduler = ConvergenceScheduler::new(context.clone(), config.convergence());

        Self {
            director: CameraDirector::new(scheduler, camera.clone()),
            context,
            camera,
            config: config.clone(),
            export: SimExport::new(scenario.name()),
            metrics: ScenarioMetrics::default(),
            total_ticks: 0,
            final_gap: None,
            position,
            look_at,
        }
    }

    fn point(&mut self, from: Vector3<f64>, target: Vector3<f64>) -> ConvergenceHandle {
        let handle = self.director.point(from, target).clone();
        self.metrics.drives_started += 1;
        self.snapshot(None, Some(SimEvent::info(format!("drive {} started", handle.id()))));
        handle
    }

    fn focus(&mut self, line: &LineEntity) -> FocusDrives {
        let drives = self.director.focus(line);
        let ids: Vec<String> = drives.handles().map(|h| h.id().to_string()).collect();
        self.metrics.drives_started += ids.len() as u64;
        let event = if ids.is_empty() {
            SimEvent::info(format!("line {} focused, camera snapped", line.id))
        } else {
            SimEvent::info(format!("line {} focused, drives {} started", line.id, ids.join(", ")))
        };
        self.snapshot(None, Some(event));
        drives
    }

    /// Yields until `handle` has ticked `ticks` times or finished.
    async fn run_until(&mut self, handle: &ConvergenceHandle, ticks: u64) {
        while !handle.is_finished() && handle.status().ticks < ticks {
            tokio::task::yield_now().await;
        }
        self.flush_camera();
    }

    /// Waits for `handle` to finish, cancelling it once it has run
    /// `cancel_after` ticks.
    async fn settle(&mut self, handle: &ConvergenceHandle, cancel_after: u64) -> DriveStatus {
        self.run_until(handle, cancel_after).await;
        if handle.cancel() {
            warn!(drive = handle.id(), ticks = handle.status().ticks, "drive still running, cancelling");
            self.snapshot(None, Some(SimEvent::warn(format!("drive {} cancelled", handle.id()))));
        }
        let status = handle.wait().await;
        self.record(&status);
        status
    }

    fn record(&mut self, status: &DriveStatus) {
        self.flush_camera();
        self.total_ticks += status.ticks;
        match status.phase {
            ConvergencePhase::Converged => self.metrics.drives_converged += 1,
            ConvergencePhase::Cancelled => self.metrics.drives_cancelled += 1,
            ConvergencePhase::Running => {}
        }
        debug!(phase = ?status.phase, ticks = status.ticks, "drive finished");
    }

    /// Samples `line` every tick period until its playback finishes.
    ///
    /// Returns the final pose, the playback (for its trail) and the
    /// number of samples taken.
    async fn play(&mut self, line: &LineEntity) -> (ScenePose, LinePlayback, u64) {
        let mut playback = LinePlayback::new(line.clone(), self.config.playback_duration());
        let period = self.config.convergence().tick_period;
        let start = self.context.now();
        let mut samples = 0;

        loop {
            let elapsed = self.context.now().saturating_sub(start);
            let progress = playback.progress(elapsed);
            let pose = playback.sample(elapsed);
            samples += 1;

            self.metrics.playback_samples += 1;
            self.metrics.max_trail_len = self.metrics.max_trail_len.max(playback.trail().len());

            let trail = playback
                .trail()
                .faded()
                .into_iter()
                .map(|(p, opacity)| TrailPoint {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    opacity,
                })
                .collect();
            self.snapshot(
                Some(LineFrame {
                    line_id: line.id,
                    progress,
                    position: pose.position.into(),
                    trail,
                }),
                None,
            );

            if playback.is_finished(elapsed) {
                return (pose, playback, samples);
            }
            self.context.sleep(period).await;
        }
    }

    /// Turns pending camera writes into frames.
    fn flush_camera(&mut self) {
        let writes = lock_camera(&self.camera).drain();
        for write in writes {
            let at = match write {
                CameraWrite::LookAt { at, target } => {
                    self.look_at = target;
                    self.metrics.look_at_writes += 1;
                    at
                }
                CameraWrite::Position { at, position } => {
                    self.position = position;
                    at
                }
            };
            self.export.add_frame(SimFrame {
                time_sec: at.as_secs_f64(),
                camera_position: self.position.into(),
                camera_look_at: self.look_at.into(),
                line: None,
                events: vec![],
            });
        }
    }

    fn snapshot(&mut self, line: Option<LineFrame>, event: Option<SimEvent>) {
        self.flush_camera();
        self.export.add_frame(SimFrame {
            time_sec: self.context.now().as_secs_f64(),
            camera_position: self.position.into(),
            camera_look_at: self.look_at.into(),
            line,
            events: event.into_iter().collect(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_converge_scenario() {
        let result = ScenarioRunner::new().run(ScenarioId::Converge);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 44);
        assert_eq!(result.metrics.drives_converged, 1);
        assert_eq!(result.metrics.look_at_writes, 44);
        assert_relative_eq!(result.final_time_secs, 4.4, epsilon = 1e-9);
    }

    #[test]
    fn test_handoff_scenario() {
        let result = ScenarioRunner::new().run(ScenarioId::Handoff);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.drives_started, 2);
        assert_eq!(result.metrics.drives_cancelled, 1);
        assert_eq!(result.metrics.drives_converged, 1);
        // 3 ticks of the first drive, then 76 from (27.1, 0, 0) to (0, 5, 0)
        // starting on the very next tick boundary.
        assert_eq!(result.total_ticks, 79);
        assert_relative_eq!(result.final_time_secs, 7.9, epsilon = 1e-9);
    }

    #[test]
    fn test_nan_target_scenario() {
        let result = ScenarioRunner::new()
            .with_nan_cancel_after(15)
            .run(ScenarioId::NanTarget);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.drives_cancelled, 1);
        assert_eq!(result.metrics.drives_converged, 0);
        assert!(result.total_ticks >= 15);
    }

    #[test]
    fn test_static_line_scenario() {
        let result = ScenarioRunner::new().run(ScenarioId::StaticLine);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.drives_started, 0);
        assert_eq!(result.metrics.look_at_writes, 1);
        assert_eq!(result.total_ticks, 0);
    }

    #[test]
    fn test_playback_scenario() {
        let result = ScenarioRunner::new().run(ScenarioId::Playback);

        assert!(result.passed, "{:?}", result.failure_reason);
        // 0ms, 100ms, ... 2000ms
        assert_eq!(result.metrics.playback_samples, 21);
        assert_eq!(result.metrics.max_trail_len, 5);
    }

    #[test]
    fn test_song_replay_scenario() {
        let result = ScenarioRunner::new().run(ScenarioId::SongReplay);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.drives_started, 2);
        assert_eq!(result.metrics.drives_converged, 2);
        assert_eq!(result.metrics.max_trail_len, 3);
    }

    #[test]
    fn test_song_replay_moves_camera_in() {
        let (result, export) = ScenarioRunner::new().run_with_export(ScenarioId::SongReplay);

        assert!(result.passed, "{:?}", result.failure_reason);
        let last = export.frames.last().unwrap();
        assert_relative_eq!(last.camera_position.z, 120.0, epsilon = 0.01);
    }

    #[test]
    fn test_aim_and_position_drives_overlap_in_time() {
        let mut song = Song::from_lyrics(["both"]);
        song.lines[0].cam_end_look_at = Some(Vector3::new(1.0, 0.0, 0.0));
        song.lines[0].cam_end_position = Some(Vector3::new(0.0, 10.0, 149.0));

        let (result, _) = ScenarioRunner::new().replay(&song);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.drives_converged, 2);
        assert_eq!(result.total_ticks, 88);
        // Both drives tick together for 4.4 s, then 2 s of playback.
        assert_relative_eq!(result.final_time_secs, 6.4, epsilon = 1e-9);
    }

    #[test]
    fn test_replay_fetched_song() {
        let mut song = Song::from_lyrics(["a", "b"]);
        for (i, line) in song.lines.iter_mut().enumerate() {
            line.id = i as i32;
            line.cam_end_look_at = Some(Vector3::new(0.0, 0.0, -(i as f64) - 1.0));
        }

        let (result, export) = ScenarioRunner::new().replay(&song);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.drives_converged, 2);
        assert!(export.passed);
        assert!(export.frames.iter().any(|f| f.line.is_some()));
    }

    #[test]
    fn test_custom_damping_converges_faster() {
        let config = EngineConfig {
            damping: 0.5,
            ..Default::default()
        };
        let result = ScenarioRunner::new().with_config(config).run(ScenarioId::Converge);

        assert!(result.passed);
        // 0.5^7 < 0.01 <= 0.5^6
        assert_eq!(result.total_ticks, 7);
    }

    #[test]
    fn test_converge_is_deterministic() {
        let runner = ScenarioRunner::new();
        let (r1, e1) = runner.run_with_export(ScenarioId::Converge);
        let (r2, e2) = runner.run_with_export(ScenarioId::Converge);

        assert_eq!(r1.total_ticks, r2.total_ticks);
        assert_eq!(e1.frames.len(), e2.frames.len());
        assert_eq!(r1.final_time_secs, r2.final_time_secs);
    }

    #[test]
    fn test_export_ends_on_target() {
        let (result, export) = ScenarioRunner::new().run_with_export(ScenarioId::Converge);

        assert!(export.passed);
        assert_eq!(export.scenario, "converge");
        assert!(export.final_gap.unwrap() < 0.01);

        let last = export.frames.last().unwrap();
        assert_relative_eq!(last.camera_look_at.x, 1.0, epsilon = 0.01);
        assert_relative_eq!(export.duration_sec, result.final_time_secs, epsilon = 1e-9);
    }

    #[test]
    fn test_tick_limit_fails_converge() {
        let result = ScenarioRunner::new().with_max_ticks(5).run(ScenarioId::Converge);

        assert!(!result.passed);
        assert_eq!(result.metrics.drives_cancelled, 1);
        assert!(result.failure_reason.unwrap().contains("Cancelled"));
    }
}
