//! The live camera the engine writes to.

use nalgebra::Vector3;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A camera the engine can aim and place.
///
/// Implemented by the renderer's camera object; the engine only ever
/// writes to it and never reads pose data back.
pub trait LiveCamera: Send + 'static {
    /// Orients the camera toward `target`.
    fn look_at(&mut self, target: Vector3<f64>);

    /// Moves the camera to `position`.
    fn set_position(&mut self, position: Vector3<f64>);
}

/// Camera attribute a convergence drive writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraChannel {
    /// The point the camera aims at
    LookAt,
    /// Where the camera stands
    Position,
}

impl CameraChannel {
    /// Writes `value` to this channel of `camera`.
    pub fn apply<C: LiveCamera + ?Sized>(self, camera: &mut C, value: Vector3<f64>) {
        match self {
            CameraChannel::LookAt => camera.look_at(value),
            CameraChannel::Position => camera.set_position(value),
        }
    }
}

/// The single live camera, shared between the director and whichever
/// convergence task currently drives it.
pub type SharedCamera<C> = Arc<Mutex<C>>;

/// Wraps a camera for sharing.
pub fn share<C: LiveCamera>(camera: C) -> SharedCamera<C> {
    Arc::new(Mutex::new(camera))
}

/// Locks the camera, recovering the guard if a previous writer panicked.
pub fn lock_camera<C>(camera: &SharedCamera<C>) -> MutexGuard<'_, C> {
    camera.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Plain camera state: where it stands and what it aims at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vector3<f64>,
    pub look_at: Vector3<f64>,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vector3::from(crate::line::DEFAULT_CAM_POSITION),
            look_at: Vector3::zeros(),
        }
    }
}

impl LiveCamera for CameraState {
    fn look_at(&mut self, target: Vector3<f64>) {
        self.look_at = target;
    }

    fn set_position(&mut self, position: Vector3<f64>) {
        self.position = position;
    }
}
