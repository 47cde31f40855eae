//! linecam Deterministic Simulation Harness
//!
//! Runs the camera engine against a virtual clock so convergence,
//! hand-off and playback can be checked tick by tick without waiting on
//! wall-clock time.
//!
//! # Core Principle
//!
//! Time is the only source of non-determinism in the engine, and it is
//! intercepted:
//! - **Time**: `SimContext` implements `SceneContext`; sleeping advances
//!   a virtual clock and yields, so tasks interleave at tick boundaries
//! - **Camera**: `RecordingCamera` logs every write with its virtual time
//!
//! # Usage
//!
//! ```no_run
//! use linecam_sim::{ScenarioId, ScenarioRunner};
//!
//! let result = ScenarioRunner::new().run(ScenarioId::Converge);
//! assert!(result.passed);
//! ```

mod camera;
mod context;
pub mod exporter;
pub mod runner;
pub mod scenarios;

pub use camera::{CameraWrite, RecordingCamera};
pub use context::SimContext;
pub use exporter::{LineFrame, Point, SimEvent, SimExport, SimFrame, TrailPoint};
pub use runner::{demo_song, ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::{ScenarioId, UnknownScenario};
