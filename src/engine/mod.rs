//! Inference engine layer.
//!
//! `runtime` defines the seams to external landmark libraries, `backend` wraps
//! each supported library in a closed set of variants that normalize native
//! output, and `adapter` picks one backend at startup and keeps it.

pub mod adapter;
pub mod backend;
pub mod replay;
pub mod runtime;

pub use adapter::EngineAdapter;
pub use backend::{Backend, GraphModelBackend, HandTrackerBackend};
pub use replay::ReplayTracker;
pub use runtime::{
    GraphModelRuntime, GraphOutput, HandTrackerRuntime, Handedness, MockGraphModel,
    MockHandTracker, NormalizedLandmark, TrackerOptions, TrackerResults,
};

use crate::landmarks::{Hand, HeadPose};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The supported inference backends, in default priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Landmark tracker with handedness classification. Preferred.
    HandTracker,
    /// Lightweight keypoint graph model. Fallback.
    GraphModel,
}

impl EngineKind {
    pub const ALL: [EngineKind; 2] = [EngineKind::HandTracker, EngineKind::GraphModel];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::HandTracker => "hand_tracker",
            EngineKind::GraphModel => "graph_model",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hand_tracker" | "handtracker" | "tracker" | "mediapipe" => Ok(EngineKind::HandTracker),
            "graph_model" | "graphmodel" | "graph" | "tfjs" => Ok(EngineKind::GraphModel),
            other => Err(format!(
                "unknown engine '{other}' (expected hand_tracker or graph_model)"
            )),
        }
    }
}

/// Outcome of engine initialization. Decided once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "engine", rename_all = "snake_case")]
pub enum EngineStatus {
    Ready(EngineKind),
    Unavailable,
}

impl EngineStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineStatus::Ready(_))
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Ready(kind) => write!(f, "ready ({kind})"),
            EngineStatus::Unavailable => f.write_str("no inference engine available"),
        }
    }
}

/// Backend-neutral result of one inference call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InferenceResult {
    pub hands: Vec<Hand>,
    pub head_pose: Option<HeadPose>,
}

impl InferenceResult {
    /// No hands, no pose. Substituted when inference fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_hands(hands: Vec<Hand>) -> Self {
        Self {
            hands,
            head_pose: None,
        }
    }
}
