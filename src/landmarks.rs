//! Landmark data types shared by the engine, the filter and the output schema.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One tracked point: x/y normalized to [0,1], z in relative units.
///
/// Serialized as a `[x, y, z]` array. JSON has no NaN, so a non-finite
/// coordinate is written as `null` and read back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[Option<f32>; 3]", into = "[f32; 3]")]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LandmarkPoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// True when every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for LandmarkPoint {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<[Option<f32>; 3]> for LandmarkPoint {
    fn from([x, y, z]: [Option<f32>; 3]) -> Self {
        Self {
            x: x.unwrap_or(f32::NAN),
            y: y.unwrap_or(f32::NAN),
            z: z.unwrap_or(f32::NAN),
        }
    }
}

impl From<LandmarkPoint> for [f32; 3] {
    fn from(p: LandmarkPoint) -> Self {
        [p.x, p.y, p.z]
    }
}

/// Which hand a landmark set belongs to.
///
/// Serialized as `"L"` / `"R"`, the format avatar renderers consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandSide {
    #[serde(rename = "L", alias = "Left")]
    Left,
    #[serde(rename = "R", alias = "Right")]
    Right,
}

impl HandSide {
    /// Classify a backend handedness label. Anything starting with `L` is a
    /// left hand; everything else (including unknown labels) is right.
    pub fn from_label(label: &str) -> Self {
        if label.starts_with('L') || label.starts_with('l') {
            HandSide::Left
        } else {
            HandSide::Right
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandSide::Left => "Left",
            HandSide::Right => "Right",
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected hand. Landmark order is positional and stable across frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub side: HandSide,
    pub landmarks: Vec<LandmarkPoint>,
}

impl Hand {
    pub fn new(side: HandSide, landmarks: Vec<LandmarkPoint>) -> Self {
        Self { side, landmarks }
    }

    /// Hand with `count` landmarks all at the same point.
    pub fn uniform(side: HandSide, count: usize, point: LandmarkPoint) -> Self {
        Self {
            side,
            landmarks: vec![point; count],
        }
    }
}

/// Head orientation estimate in degrees. Absent axes serialize as nothing,
/// so an unknown pose is `{}` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaw: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<f32>,
}

impl HeadPose {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self {
            pitch: Some(pitch),
            yaw: Some(yaw),
            roll: Some(roll),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pitch.is_none() && self.yaw.is_none() && self.roll.is_none()
    }
}
