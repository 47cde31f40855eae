//! Time-based playback of a line's start -> end animation.

use std::time::Duration;

use crate::line::{LineEntity, ScenePose};
use crate::trail::Trail;

/// Samples a line's pose against elapsed time and records its trail.
///
/// Progress is `elapsed / duration`, clamped to `[0, 1]`; easing is applied
/// per attribute by [`LineEntity::pose_at`]. The entity itself is never
/// mutated.
#[derive(Debug, Clone)]
pub struct LinePlayback {
    entity: LineEntity,
    duration: Duration,
    trail: Trail,
}

impl LinePlayback {
    /// Creates a playback; a zero duration jumps straight to the end state.
    pub fn new(entity: LineEntity, duration: Duration) -> Self {
        let trail = Trail::new(entity.keep_n_last as usize);
        Self {
            entity,
            duration,
            trail,
        }
    }

    pub fn entity(&self) -> &LineEntity {
        &self.entity
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    /// Progress in `[0, 1]` after `elapsed`.
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() || !self.entity.is_animated() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Samples the pose after `elapsed` and pushes the anchor into the trail.
    pub fn sample(&mut self, elapsed: Duration) -> ScenePose {
        let pose = self.entity.pose_at(self.progress(elapsed));
        self.trail.push(pose.position);
        pose
    }

    /// True once the end state has been reached.
    pub fn is_finished(&self, elapsed: Duration) -> bool {
        self.progress(elapsed) >= 1.0
    }
}
