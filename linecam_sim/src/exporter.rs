//! JSON exporter for offline inspection of camera runs.
//!
//! Exports simulation frames as JSON: one frame per camera write or
//! playback sample, each with the camera pose at that instant.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A point in scene space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vector3<f64>> for Point {
    fn from(v: Vector3<f64>) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// Camera (and optionally line) state at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Virtual time in seconds
    pub time_sec: f64,

    /// Camera position
    pub camera_position: Point,

    /// Camera aim
    pub camera_look_at: Point,

    /// Line being played back, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineFrame>,

    /// Events (drive start, hand-off, cancel)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// Line pose at a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineFrame {
    pub line_id: i32,
    pub progress: f64,
    pub position: Point,
    pub trail: Vec<TrailPoint>,
}

/// Trail point with its fade opacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub opacity: f64,
}

/// Something worth flagging in a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Some("warn".to_string()),
        }
    }
}

/// Everything recorded during one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Which scenario produced it
    pub scenario: String,

    /// Time of the latest frame in seconds
    pub duration_sec: f64,

    /// Frames in recording order
    pub frames: Vec<SimFrame>,

    /// Whether the scenario's checks held
    pub passed: bool,

    /// Distance from the final aim to the final target, if a drive ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_gap: Option<f64>,
}

impl SimExport {
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            final_gap: None,
        }
    }

    /// Appends `frame`; the duration follows the latest timestamp.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = self.duration_sec.max(frame.time_sec);
        self.frames.push(frame);
    }

    /// Attaches an event to the latest frame.
    pub fn add_event(&mut self, event: SimEvent) {
        if let Some(frame) = self.frames.last_mut() {
            frame.events.push(event);
        }
    }

    /// Records the verdict once the run is over.
    pub fn finalize(&mut self, passed: bool, final_gap: Option<f64>) {
        self.passed = passed;
        self.final_gap = final_gap;
    }

    /// Writes the export as pretty-printed JSON.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(time_sec: f64) -> SimFrame {
        SimFrame {
            time_sec,
            camera_position: Vector3::new(0.0, 10.0, 150.0).into(),
            camera_look_at: Vector3::zeros().into(),
            line: None,
            events: vec![],
        }
    }

    #[test]
    fn test_duration_tracks_latest_frame() {
        let mut export = SimExport::new("converge");
        export.add_frame(frame(0.1));
        export.add_frame(frame(0.2));
        export.add_event(SimEvent::warn("handoff"));
        export.finalize(true, Some(0.005));

        assert_eq!(export.duration_sec, 0.2);
        assert_eq!(export.frames[1].events.len(), 1);
        assert!(export.frames[0].events.is_empty());
    }

    #[test]
    fn test_event_without_frames_is_dropped() {
        let mut export = SimExport::new("static_line");
        export.add_event(SimEvent::info("nothing to attach to"));
        assert!(export.frames.is_empty());
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let json = serde_json::to_value(frame(1.0)).unwrap();
        assert!(json.get("line").is_none());
        assert!(json.get("events").is_none());
        assert_eq!(json["camera_position"]["z"], 150.0);
    }

    #[test]
    fn test_frame_without_events_reads_back() {
        let json = serde_json::to_string(&frame(2.0)).unwrap();
        let read: SimFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(read.time_sec, 2.0);
        assert!(read.events.is_empty());
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join(format!("linecam-export-{}.json", std::process::id()));
        let mut export = SimExport::new("playback");
        export.add_frame(frame(0.5));
        export.write_to_file(&path).unwrap();

        let read: SimExport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read.scenario, "playback");
        assert_eq!(read.frames.len(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
