//! Camera Director - single active driver per camera attribute.
//!
//! Two convergence tasks writing the same camera attribute would fight
//! each other, so every drive goes through the director: starting a new
//! one cancels the previous handle on that channel first. The look-at and
//! position channels run independently.

use nalgebra::Vector3;
use tracing::{info, warn};

use linecam_env::SceneContext;

use crate::camera::{lock_camera, CameraChannel, LiveCamera, SharedCamera};
use crate::convergence::{ConvergenceHandle, ConvergenceScheduler};
use crate::line::{LineAttribute, LineEntity};

/// Drives started by [`CameraDirector::focus`].
#[derive(Debug, Clone, Default)]
pub struct FocusDrives {
    /// Look-at drive toward `cam_end_look_at`
    pub look_at: Option<ConvergenceHandle>,

    /// Position drive toward `cam_end_position`
    pub position: Option<ConvergenceHandle>,
}

impl FocusDrives {
    /// True when the camera was only snapped.
    pub fn is_empty(&self) -> bool {
        self.look_at.is_none() && self.position.is_none()
    }

    pub fn handles(&self) -> impl Iterator<Item = &ConvergenceHandle> {
        self.look_at.iter().chain(self.position.iter())
    }
}

/// Owns the live camera and at most one running convergence task per
/// [`CameraChannel`].
pub struct CameraDirector<Ctx: SceneContext, C: LiveCamera> {
    scheduler: ConvergenceScheduler<Ctx>,
    camera: SharedCamera<C>,
    look_at_drive: Option<ConvergenceHandle>,
    position_drive: Option<ConvergenceHandle>,
}

impl<Ctx: SceneContext, C: LiveCamera> CameraDirector<Ctx, C> {
    pub fn new(scheduler: ConvergenceScheduler<Ctx>, camera: SharedCamera<C>) -> Self {
        Self {
            scheduler,
            camera,
            look_at_drive: None,
            position_drive: None,
        }
    }

    pub fn camera(&self) -> &SharedCamera<C> {
        &self.camera
    }

    fn slot(&mut self, channel: CameraChannel) -> &mut Option<ConvergenceHandle> {
        match channel {
            CameraChannel::LookAt => &mut self.look_at_drive,
            CameraChannel::Position => &mut self.position_drive,
        }
    }

    /// The running driver on `channel`, if any.
    pub fn active(&self, channel: CameraChannel) -> Option<&ConvergenceHandle> {
        let slot = match channel {
            CameraChannel::LookAt => &self.look_at_drive,
            CameraChannel::Position => &self.position_drive,
        };
        slot.as_ref().filter(|h| !h.is_finished())
    }

    /// True when no channel has a running driver.
    pub fn is_idle(&self) -> bool {
        self.active(CameraChannel::LookAt).is_none() && self.active(CameraChannel::Position).is_none()
    }

    /// Cancels every running driver. Returns true if one was running.
    pub fn cancel(&mut self) -> bool {
        let aim = self.cancel_channel(CameraChannel::LookAt);
        let travel = self.cancel_channel(CameraChannel::Position);
        aim || travel
    }

    fn cancel_channel(&mut self, channel: CameraChannel) -> bool {
        match self.slot(channel).take() {
            Some(handle) => {
                let cancelled = handle.cancel();
                if cancelled {
                    info!(drive = handle.id(), ?channel, "camera driver cancelled");
                }
                cancelled
            }
            None => false,
        }
    }

    /// Hands `channel` of the camera to a new convergence from `from`
    /// toward `target`, cancelling that channel's previous driver first.
    pub fn drive(
        &mut self,
        channel: CameraChannel,
        from: Vector3<f64>,
        target: Vector3<f64>,
    ) -> &ConvergenceHandle {
        if let Some(previous) = self.slot(channel).take() {
            if previous.cancel() {
                warn!(drive = previous.id(), ?channel, "pre-empting running camera driver");
            }
        }

        let handle = self
            .scheduler
            .start_on(self.camera.clone(), channel, from, target);
        self.slot(channel).insert(handle)
    }

    /// Aims the camera from `from` toward `target`.
    pub fn point(&mut self, from: Vector3<f64>, target: Vector3<f64>) -> &ConvergenceHandle {
        self.drive(CameraChannel::LookAt, from, target)
    }

    /// Moves the camera onto `line`.
    ///
    /// Running drivers are cancelled and the camera jumps to the line's
    /// start pose. A look-at with an end value then converges from
    /// `cam_look_at` toward `cam_end_look_at`, and a camera position with
    /// an end value from `cam_position` toward `cam_end_position`. Lines
    /// with neither only snap.
    pub fn focus(&mut self, line: &LineEntity) -> FocusDrives {
        self.cancel();
        {
            let mut cam = lock_camera(&self.camera);
            cam.set_position(line.cam_position);
            cam.look_at(line.cam_look_at);
        }

        let look_at = line
            .end_of(LineAttribute::CamLookAt)
            .map(|end| self.drive(CameraChannel::LookAt, line.cam_look_at, end).clone());
        let position = line
            .end_of(LineAttribute::CamPosition)
            .map(|end| self.drive(CameraChannel::Position, line.cam_position, end).clone());

        let drives = FocusDrives { look_at, position };
        if drives.is_empty() {
            info!(line = line.id, animated = line.is_animated(), "snapped camera to line");
        } else {
            info!(
                line = line.id,
                look_at = drives.look_at.is_some(),
                position = drives.position.is_some(),
                "focusing animated line"
            );
        }
        drives
    }
}
