//! The closed set of inference backends and their output normalization.

use crate::capture::FrameHandle;
use crate::defaults;
use crate::engine::runtime::{
    GraphModelRuntime, GraphOutput, HandTrackerRuntime, TrackerOptions, TrackerResults,
};
use crate::engine::{EngineKind, InferenceResult};
use crate::error::{Result, SignlensError};
use crate::landmarks::{Hand, HandSide, HeadPose, LandmarkPoint};
use std::path::PathBuf;

/// Values per keypoint in the graph model tensor (x, y, z).
const KEYPOINT_STRIDE: usize = 3;

/// Landmark tracker backend.
pub struct HandTrackerBackend {
    runtime: Box<dyn HandTrackerRuntime>,
    options: TrackerOptions,
}

impl HandTrackerBackend {
    pub fn new(runtime: Box<dyn HandTrackerRuntime>, options: TrackerOptions) -> Self {
        Self { runtime, options }
    }

    fn load(&mut self) -> Result<()> {
        self.runtime.load(&self.options)?;
        if !self.runtime.is_ready() {
            return Err(not_ready(EngineKind::HandTracker, self.runtime.name()));
        }
        Ok(())
    }

    fn infer(&mut self, frame: &FrameHandle) -> Result<InferenceResult> {
        let results = self
            .runtime
            .process(frame)
            .map_err(|e| inference_error(EngineKind::HandTracker, e))?;
        Ok(normalize_tracker_results(results))
    }
}

/// Map tracker output to the neutral shape. A landmark set without a matching
/// handedness entry is labelled `Unknown`, which classifies as right; a
/// missing z becomes 0.
pub(crate) fn normalize_tracker_results(results: TrackerResults) -> InferenceResult {
    let TrackerResults {
        multi_hand_landmarks,
        multi_handedness,
        head_rotation,
    } = results;

    let hands = multi_hand_landmarks
        .into_iter()
        .enumerate()
        .map(|(i, landmarks)| {
            let label = multi_handedness
                .get(i)
                .map(|h| h.label.as_str())
                .unwrap_or("Unknown");
            Hand::new(
                HandSide::from_label(label),
                landmarks
                    .into_iter()
                    .map(|lm| LandmarkPoint::new(lm.x, lm.y, lm.z.unwrap_or(0.0)))
                    .collect(),
            )
        })
        .collect();

    InferenceResult {
        hands,
        head_pose: head_rotation.map(|[pitch, yaw, roll]| HeadPose::new(pitch, yaw, roll)),
    }
}

/// Keypoint graph model backend.
pub struct GraphModelBackend {
    runtime: Box<dyn GraphModelRuntime>,
    model_path: PathBuf,
    input_size: u32,
    max_hands: usize,
    min_presence: f32,
}

impl GraphModelBackend {
    pub fn new(runtime: Box<dyn GraphModelRuntime>, model_path: PathBuf) -> Self {
        Self {
            runtime,
            model_path,
            input_size: defaults::GRAPH_INPUT_SIZE,
            max_hands: defaults::MAX_HANDS as usize,
            min_presence: defaults::MIN_DETECTION_CONFIDENCE,
        }
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn with_max_hands(mut self, max_hands: usize) -> Self {
        self.max_hands = max_hands;
        self
    }

    pub fn with_min_presence(mut self, min_presence: f32) -> Self {
        self.min_presence = min_presence;
        self
    }

    fn load(&mut self) -> Result<()> {
        self.runtime.load(&self.model_path)?;
        if !self.runtime.is_ready() {
            return Err(not_ready(EngineKind::GraphModel, self.runtime.name()));
        }
        Ok(())
    }

    fn infer(&mut self, frame: &FrameHandle) -> Result<InferenceResult> {
        let output = self
            .runtime
            .execute(frame, self.input_size)
            .map_err(|e| inference_error(EngineKind::GraphModel, e))?;
        self.decode(output)
    }

    /// Decode raw tensors into hands, scaling pixel coordinates back to [0,1].
    pub(crate) fn decode(&self, output: GraphOutput) -> Result<InferenceResult> {
        let per_hand = defaults::HAND_LANDMARKS * KEYPOINT_STRIDE;
        if output.keypoints.len() % per_hand != 0 {
            return Err(SignlensError::EngineInference {
                engine: EngineKind::GraphModel.to_string(),
                message: format!(
                    "keypoint tensor has {} values, not a multiple of {}",
                    output.keypoints.len(),
                    per_hand
                ),
            });
        }

        let scale = self.input_size.max(1) as f32;
        let hands = output
            .keypoints
            .chunks_exact(per_hand)
            .enumerate()
            .filter(|(i, _)| output.presence.get(*i).copied().unwrap_or(1.0) >= self.min_presence)
            .take(self.max_hands)
            .map(|(i, values)| {
                let side = match output.handedness.get(i) {
                    Some(score) if *score < 0.5 => HandSide::Left,
                    _ => HandSide::Right,
                };
                let landmarks = values
                    .chunks_exact(KEYPOINT_STRIDE)
                    .map(|kp| {
                        LandmarkPoint::new(
                            (kp[0] / scale).clamp(0.0, 1.0),
                            (kp[1] / scale).clamp(0.0, 1.0),
                            kp[2] / scale,
                        )
                    })
                    .collect();
                Hand::new(side, landmarks)
            })
            .collect();

        Ok(InferenceResult::with_hands(hands))
    }
}

/// One interchangeable inference backend.
pub enum Backend {
    HandTracker(HandTrackerBackend),
    GraphModel(GraphModelBackend),
}

impl Backend {
    pub fn hand_tracker(runtime: Box<dyn HandTrackerRuntime>, options: TrackerOptions) -> Self {
        Backend::HandTracker(HandTrackerBackend::new(runtime, options))
    }

    pub fn graph_model(runtime: Box<dyn GraphModelRuntime>, model_path: impl Into<PathBuf>) -> Self {
        Backend::GraphModel(GraphModelBackend::new(runtime, model_path.into()))
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Backend::HandTracker(_) => EngineKind::HandTracker,
            Backend::GraphModel(_) => EngineKind::GraphModel,
        }
    }

    /// Load the backend and confirm it reports ready.
    pub fn load(&mut self) -> Result<()> {
        match self {
            Backend::HandTracker(b) => b.load(),
            Backend::GraphModel(b) => b.load(),
        }
    }

    /// Run inference and normalize the result.
    pub fn infer(&mut self, frame: &FrameHandle) -> Result<InferenceResult> {
        match self {
            Backend::HandTracker(b) => b.infer(frame),
            Backend::GraphModel(b) => b.infer(frame),
        }
    }
}

fn not_ready(kind: EngineKind, runtime: &str) -> SignlensError {
    SignlensError::EngineInit {
        engine: kind.to_string(),
        message: format!("runtime '{runtime}' loaded but did not report ready"),
    }
}

fn inference_error(kind: EngineKind, source: SignlensError) -> SignlensError {
    match source {
        e @ SignlensError::EngineInference { .. } => e,
        other => SignlensError::EngineInference {
            engine: kind.to_string(),
            message: other.to_string(),
        },
    }
}
