//! Named camera scenarios.

use thiserror::Error;

/// Returned when a scenario name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scenario: {0}")]
pub struct UnknownScenario(pub String);

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Unit look-at gap closes and the driver stops by itself
    Converge,

    /// A second drive pre-empts the first mid-flight
    Handoff,

    /// NaN target never converges and is cancelled from outside
    NanTarget,

    /// Static line snaps the camera without starting a driver
    StaticLine,

    /// Eased start -> end playback with a bounded trail
    Playback,

    /// A whole song: focus, converge and play back each line in turn
    SongReplay,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Converge,
            ScenarioId::Handoff,
            ScenarioId::NanTarget,
            ScenarioId::StaticLine,
            ScenarioId::Playback,
            ScenarioId::SongReplay,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Converge => "converge",
            ScenarioId::Handoff => "handoff",
            ScenarioId::NanTarget => "nan_target",
            ScenarioId::StaticLine => "static_line",
            ScenarioId::Playback => "playback",
            ScenarioId::SongReplay => "song_replay",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Converge => "aim (0,0,0) -> (1,0,0), expect self-cancel after convergence",
            ScenarioId::Handoff => "start a drive, replace it after 3 ticks, expect one writer",
            ScenarioId::NanTarget => "target with a NaN axis, expect Running until cancelled",
            ScenarioId::StaticLine => "focus a line with no end values, expect no driver",
            ScenarioId::Playback => "InOut position animation with keep_n_last = 5",
            ScenarioId::SongReplay => "three-line demo song, mixed static and animated lines",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "converge" => Ok(ScenarioId::Converge),
            "handoff" | "hand_off" => Ok(ScenarioId::Handoff),
            "nan_target" | "nan" => Ok(ScenarioId::NanTarget),
            "static_line" | "static" => Ok(ScenarioId::StaticLine),
            "playback" => Ok(ScenarioId::Playback),
            "song_replay" | "song" => Ok(ScenarioId::SongReplay),
            _ => Err(UnknownScenario(s.to_string())),
        }
    }
}
