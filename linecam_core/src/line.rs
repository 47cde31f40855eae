//! Line State Model - the shared vocabulary between the transport and the
//! camera engine.
//!
//! A [`LineEntity`] describes where a lyric line sits in the scene, where
//! the camera should stand to look at it, and (optionally) where all of
//! those end up when the line is animated.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::easing::{self, AnimationCurve};
use crate::vector::{xyz, xyz_opt};

/// Camera position given to lines created from bare text.
pub const DEFAULT_CAM_POSITION: [f64; 3] = [0.0, 10.0, 150.0];

/// Display color of a line. Absent means "inherit the scene default".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub color: String,
}

impl Color {
    pub fn new(color: impl Into<String>) -> Self {
        Self { color: color.into() }
    }
}

/// Spatial attributes that can move from a start to an end value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineAttribute {
    /// The line's anchor point
    Position,
    /// Where the camera stands
    CamPosition,
    /// What the camera aims at
    CamLookAt,
}

impl LineAttribute {
    /// Returns a list of all animatable attributes.
    pub fn all() -> [LineAttribute; 3] {
        [
            LineAttribute::Position,
            LineAttribute::CamPosition,
            LineAttribute::CamLookAt,
        ]
    }
}

/// A visualized lyric line with optional animated start -> end state.
///
/// Serializes to the line store's record shape: `line` carries the label
/// and vectors are `{x, y, z}` objects; `null` end values mean "not animated".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineEntity {
    /// Identifier, unique within a session
    pub id: i32,

    /// Display text
    #[serde(rename = "line")]
    pub label: String,

    /// Anchor point in its start state
    #[serde(with = "xyz")]
    pub position: Vector3<f64>,

    /// Camera aim in the start state
    #[serde(with = "xyz")]
    pub cam_look_at: Vector3<f64>,

    /// Camera position in the start state
    #[serde(with = "xyz")]
    pub cam_position: Vector3<f64>,

    /// Optional color override
    pub color: Option<Color>,

    /// Number of past anchor positions kept for the fading trail (0 = none)
    pub keep_n_last: u32,

    /// Target orientation of the line itself
    #[serde(with = "xyz_opt", default)]
    pub rotation: Option<Vector3<f64>>,

    /// Target camera orientation
    #[serde(with = "xyz_opt", default)]
    pub cam_rotation: Option<Vector3<f64>>,

    // Animation values
    #[serde(with = "xyz_opt", default)]
    pub end_position: Option<Vector3<f64>>,

    #[serde(with = "xyz_opt", default)]
    pub cam_end_position: Option<Vector3<f64>>,

    #[serde(with = "xyz_opt", default)]
    pub cam_end_look_at: Option<Vector3<f64>>,

    /// Easing applied to every animated attribute (absent = linear)
    #[serde(
        default,
        deserialize_with = "easing::deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub animation: Option<AnimationCurve>,
}

impl Default for LineEntity {
    fn default() -> Self {
        Self {
            id: 0,
            label: String::new(),
            position: Vector3::zeros(),
            cam_look_at: Vector3::zeros(),
            cam_position: Vector3::zeros(),
            color: None,
            keep_n_last: 0,
            rotation: None,
            cam_rotation: None,
            end_position: None,
            cam_end_position: None,
            cam_end_look_at: None,
            animation: None,
        }
    }
}

/// Scene pose sampled from a line at some progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenePose {
    pub position: Vector3<f64>,
    pub cam_position: Vector3<f64>,
    pub cam_look_at: Vector3<f64>,
    pub rotation: Option<Vector3<f64>>,
    pub cam_rotation: Option<Vector3<f64>>,
}

impl LineEntity {
    /// Creates a static line for bare lyric text, camera pulled back to
    /// [`DEFAULT_CAM_POSITION`].
    pub fn from_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            cam_position: Vector3::from(DEFAULT_CAM_POSITION),
            ..Default::default()
        }
    }

    /// True iff any end-* value is set.
    pub fn is_animated(&self) -> bool {
        LineAttribute::all().iter().any(|a| self.animates(*a))
    }

    /// True iff `attribute` has an end value.
    pub fn animates(&self, attribute: LineAttribute) -> bool {
        self.end_of(attribute).is_some()
    }

    /// Start value of an attribute.
    pub fn start_of(&self, attribute: LineAttribute) -> Vector3<f64> {
        match attribute {
            LineAttribute::Position => self.position,
            LineAttribute::CamPosition => self.cam_position,
            LineAttribute::CamLookAt => self.cam_look_at,
        }
    }

    /// End value of an attribute, if it animates.
    pub fn end_of(&self, attribute: LineAttribute) -> Option<Vector3<f64>> {
        match attribute {
            LineAttribute::Position => self.end_position,
            LineAttribute::CamPosition => self.cam_end_position,
            LineAttribute::CamLookAt => self.cam_end_look_at,
        }
    }

    /// Curve used for `attribute`.
    ///
    /// `None` either because the attribute is static or because no curve
    /// was declared; in the latter case the attribute still moves linearly.
    pub fn animation_curve_for(&self, attribute: LineAttribute) -> Option<AnimationCurve> {
        if self.animates(attribute) {
            self.animation
        } else {
            None
        }
    }

    /// Value of `attribute` at `progress` in `[0, 1]`.
    pub fn value_at(&self, attribute: LineAttribute, progress: f64) -> Vector3<f64> {
        let start = self.start_of(attribute);
        match self.end_of(attribute) {
            Some(end) => {
                let t = easing::eased_progress(self.animation_curve_for(attribute), progress);
                start.lerp(&end, t)
            }
            None => start,
        }
    }

    /// Samples the full scene pose at `progress`.
    pub fn pose_at(&self, progress: f64) -> ScenePose {
        ScenePose {
            position: self.value_at(LineAttribute::Position, progress),
            cam_position: self.value_at(LineAttribute::CamPosition, progress),
            cam_look_at: self.value_at(LineAttribute::CamLookAt, progress),
            rotation: self.rotation,
            cam_rotation: self.cam_rotation,
        }
    }
}

impl From<String> for LineEntity {
    fn from(value: String) -> Self {
        LineEntity::from_label(value)
    }
}

/// A song: an ordered list of lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Song {
    pub id: i32,
    pub title: String,
    pub lines: Vec<LineEntity>,
}

impl Song {
    /// Builds an untitled song from bare lyric lines.
    pub fn from_lyrics<I, S>(lyrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Song {
            id: 0,
            title: "Undefined".to_string(),
            lines: lyrics.into_iter().map(LineEntity::from_label).collect(),
        }
    }

    /// Looks up a line by id.
    pub fn line(&self, id: i32) -> Option<&LineEntity> {
        self.lines.iter().find(|l| l.id == id)
    }
}

/// Entry of the song listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSummary {
    pub id: i32,
    pub name: String,
}
