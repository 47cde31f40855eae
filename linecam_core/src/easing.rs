//! Easing Resolver - animation curve selectors and their progress functions.

use serde::{Deserialize, Deserializer, Serialize};

/// A progress-remapping function over `[0, 1]`.
pub type EasingFn = fn(f64) -> f64;

/// Animation curve selector carried on the wire as `"In"`, `"Out"` or `"InOut"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationCurve {
    /// Cubic ease-in: slow start
    In,
    /// Cubic ease-out: slow finish
    Out,
    /// Cubic ease-in-out: slow at both ends, symmetric about 0.5
    InOut,
}

impl AnimationCurve {
    /// Returns a list of all curves.
    pub fn all() -> [AnimationCurve; 3] {
        [AnimationCurve::In, AnimationCurve::Out, AnimationCurve::InOut]
    }

    /// Returns the wire name of the curve.
    pub fn name(&self) -> &'static str {
        match self {
            AnimationCurve::In => "In",
            AnimationCurve::Out => "Out",
            AnimationCurve::InOut => "InOut",
        }
    }

    /// Maps a wire value to a curve. Unrecognized values mean "no easing".
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "In" => Some(AnimationCurve::In),
            "Out" => Some(AnimationCurve::Out),
            "InOut" => Some(AnimationCurve::InOut),
            _ => None,
        }
    }

    /// Returns the easing function for this curve.
    pub fn function(&self) -> EasingFn {
        match self {
            AnimationCurve::In => cubic_in,
            AnimationCurve::Out => cubic_out,
            AnimationCurve::InOut => cubic_in_out,
        }
    }
}

impl std::fmt::Display for AnimationCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for AnimationCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" | "cubic_in" => Ok(AnimationCurve::In),
            "out" | "cubic_out" => Ok(AnimationCurve::Out),
            "inout" | "in_out" | "cubic_in_out" => Ok(AnimationCurve::InOut),
            _ => Err(format!("Unknown animation curve: {}", s)),
        }
    }
}

/// Resolves an optional curve selector to its easing function.
///
/// `None` means "no easing"; callers decide whether that is linear
/// progress (see [`eased_progress`]) or a non-animated attribute.
pub fn resolve(curve: Option<AnimationCurve>) -> Option<EasingFn> {
    curve.map(|c| c.function())
}

/// Applies `curve` to `progress`, falling back to linear progress when no
/// curve is declared. Progress is clamped to `[0, 1]`.
pub fn eased_progress(curve: Option<AnimationCurve>, progress: f64) -> f64 {
    let t = progress.clamp(0.0, 1.0);
    match resolve(curve) {
        Some(ease) => ease(t),
        None => t,
    }
}

/// Cubic ease-in: `t³`.
pub fn cubic_in(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * t
}

/// Cubic ease-out: `1 - (1 - t)³`.
pub fn cubic_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Cubic ease-in-out, piecewise about `t = 0.5`.
pub fn cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Deserializes a nullable curve, mapping unknown strings to `None`.
pub(crate) fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<AnimationCurve>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(AnimationCurve::from_wire))
}
