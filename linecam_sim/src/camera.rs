//! Recording camera for simulated runs.

use linecam_core::line::DEFAULT_CAM_POSITION;
use linecam_core::LiveCamera;
use linecam_env::SceneContext;
use nalgebra::Vector3;
use std::time::Duration;

use crate::context::SimContext;

/// One write to the camera, stamped with virtual time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraWrite {
    LookAt { at: Duration, target: Vector3<f64> },
    Position { at: Duration, position: Vector3<f64> },
}

/// Camera that keeps its current pose and a log of every write.
pub struct RecordingCamera {
    context: SimContext,
    pub position: Vector3<f64>,
    pub look_at: Vector3<f64>,
    writes: Vec<CameraWrite>,
}

impl RecordingCamera {
    pub fn new(context: SimContext) -> Self {
        Self {
            context,
            position: Vector3::from(DEFAULT_CAM_POSITION),
            look_at: Vector3::zeros(),
            writes: Vec::new(),
        }
    }

    pub fn writes(&self) -> &[CameraWrite] {
        &self.writes
    }

    /// Number of `look_at` calls so far.
    pub fn look_at_count(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, CameraWrite::LookAt { .. }))
            .count()
    }

    /// Removes and returns the log, keeping the current pose.
    pub fn drain(&mut self) -> Vec<CameraWrite> {
        std::mem::take(&mut self.writes)
    }
}

impl LiveCamera for RecordingCamera {
    fn look_at(&mut self, target: Vector3<f64>) {
        self.look_at = target;
        self.writes.push(CameraWrite::LookAt {
            at: self.context.now(),
            target,
        });
    }

    fn set_position(&mut self, position: Vector3<f64>) {
        self.position = position;
        self.writes.push(CameraWrite::Position {
            at: self.context.now(),
            position,
        });
    }
}
