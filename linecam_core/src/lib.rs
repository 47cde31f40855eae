//! linecam Core - keyframe interpolation and camera convergence for 3D lyric lines
//!
//! Lines arrive from the line store as [`LineEntity`] records. Each one
//! declares a start state and, optionally, end values; this crate turns
//! those into poses over time and steers the single live camera:
//! 1. **Vector Parser**: `"x y z"` text → `Vector3`, rejecting malformed input
//! 2. **Easing Resolver**: `In` / `Out` / `InOut` cubic curves
//! 3. **Line State Model**: static vs animated lines, per-attribute interpolation
//! 4. **Convergence Scheduler**: damped look-at (or position) ticks that stop on their own
//! 5. **Camera Director**: one active driver per camera channel, with hand-off
//! 6. **Song Client**: typed requests over a `LineTransport`

pub mod camera;
pub mod client;
pub mod config;
pub mod convergence;
pub mod director;
pub mod easing;
pub mod line;
pub mod playback;
pub mod trail;
pub mod vector;

// Re-export key types for convenience
pub use camera::{lock_camera, share, CameraChannel, CameraState, LiveCamera, SharedCamera};
pub use client::SongClient;
pub use config::{ConfigError, EngineConfig};
pub use convergence::{
    within_tolerance, Convergence, ConvergenceConfig, ConvergenceHandle, ConvergencePhase,
    ConvergenceScheduler, DriveStatus,
};
pub use director::{CameraDirector, FocusDrives};
pub use easing::{eased_progress, resolve, AnimationCurve, EasingFn};
pub use line::{Color, LineAttribute, LineEntity, ScenePose, Song, SongSummary};
pub use playback::LinePlayback;
pub use trail::Trail;
pub use vector::{format_vector, parse_vector, ParseVectorError};
