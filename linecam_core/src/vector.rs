//! Vector Parser - textual coordinate triples and the `{x, y, z}` wire form.
//!
//! Interactive inputs carry vectors as `"x y z"`; the line store carries
//! them as JSON objects. Both end up as `nalgebra::Vector3<f64>`.

use nalgebra::Vector3;
use thiserror::Error;

/// Token that explicitly marks "no vector" in text inputs.
pub const NULL_TOKEN: &str = "null";

/// Errors produced by [`parse_vector`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseVectorError {
    /// The text did not split into exactly three components
    #[error("expected 3 space-separated components, found {found}")]
    ComponentCount { found: usize },

    /// A component was not a finite number
    #[error("component {index} ({token:?}) is not a finite number")]
    InvalidComponent { index: usize, token: String },
}

/// Parses `"x y z"` into a vector.
///
/// `""` and `"null"` yield `Ok(None)`. Components are separated by exactly
/// one space; anything other than three finite numbers is rejected, so a
/// NaN component can never reach the camera engine.
///
/// # Examples
///
/// ```
/// use linecam_core::parse_vector;
/// use nalgebra::Vector3;
///
/// assert_eq!(parse_vector("1 2.5 -3").unwrap(), Some(Vector3::new(1.0, 2.5, -3.0)));
/// assert_eq!(parse_vector("null").unwrap(), None);
/// assert!(parse_vector("abc").is_err());
/// ```
pub fn parse_vector(text: &str) -> Result<Option<Vector3<f64>>, ParseVectorError> {
    if text.is_empty() || text == NULL_TOKEN {
        return Ok(None);
    }

    let tokens: Vec<&str> = text.split(' ').collect();
    if tokens.len() != 3 {
        return Err(ParseVectorError::ComponentCount { found: tokens.len() });
    }

    let mut components = [0.0f64; 3];
    for (index, token) in tokens.iter().enumerate() {
        components[index] = token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseVectorError::InvalidComponent {
                index,
                token: token.to_string(),
            })?;
    }

    Ok(Some(Vector3::from(components)))
}

/// Renders a vector in the `"x y z"` form accepted by [`parse_vector`].
///
/// `None` renders as `"null"`.
pub fn format_vector(vector: Option<&Vector3<f64>>) -> String {
    match vector {
        Some(v) => format!("{} {} {}", v.x, v.y, v.z),
        None => NULL_TOKEN.to_string(),
    }
}

/// Serde adapter: `Vector3<f64>` as `{ "x": .., "y": .., "z": .. }`.
pub mod xyz {
    use nalgebra::Vector3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    pub(super) struct Xyz {
        pub x: f64,
        pub y: f64,
        pub z: f64,
    }

    impl From<&Vector3<f64>> for Xyz {
        fn from(v: &Vector3<f64>) -> Self {
            Self { x: v.x, y: v.y, z: v.z }
        }
    }

    impl From<Xyz> for Vector3<f64> {
        fn from(v: Xyz) -> Self {
            Vector3::new(v.x, v.y, v.z)
        }
    }

    pub fn serialize<S: Serializer>(v: &Vector3<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        Xyz::from(v).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vector3<f64>, D::Error> {
        Xyz::deserialize(deserializer).map(Vector3::from)
    }
}

/// Serde adapter: `Option<Vector3<f64>>` as a nullable `{x, y, z}` object.
pub mod xyz_opt {
    use super::xyz::Xyz;
    use nalgebra::Vector3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vector3<f64>>, serializer: S) -> Result<S::Ok, S::Error> {
        v.as_ref().map(Xyz::from).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vector3<f64>>, D::Error> {
        Option::<Xyz>::deserialize(deserializer).map(|v| v.map(Vector3::from))
    }
}
