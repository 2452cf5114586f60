//! Seams to external landmark inference libraries.
//!
//! Each trait mirrors one library's native API and native output format.
//! Normalization into the backend-neutral shape happens in
//! [`crate::engine::backend`], never here.

use crate::capture::FrameHandle;
use crate::defaults;
use crate::error::{Result, SignlensError};
use crate::landmarks::{Hand, HandSide, LandmarkPoint};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Options passed to the hand tracker at load time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerOptions {
    pub max_num_hands: u32,
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            max_num_hands: defaults::MAX_HANDS,
            model_complexity: defaults::MODEL_COMPLEXITY,
            min_detection_confidence: defaults::MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: defaults::MIN_TRACKING_CONFIDENCE,
        }
    }
}

/// Landmark as reported by the tracker. z may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

/// Handedness classification for one detected hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handedness {
    pub label: String,
    #[serde(default)]
    pub score: f32,
}

/// Native tracker output for one frame.
///
/// `multi_hand_landmarks[i]` pairs with `multi_handedness[i]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerResults {
    #[serde(default)]
    pub multi_hand_landmarks: Vec<Vec<NormalizedLandmark>>,
    #[serde(default)]
    pub multi_handedness: Vec<Handedness>,
    /// [pitch, yaw, roll] in degrees, when a face model runs alongside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_rotation: Option<[f32; 3]>,
}

impl TrackerResults {
    /// Native results describing the given hands.
    pub fn from_hands(hands: &[Hand]) -> Self {
        Self {
            multi_hand_landmarks: hands
                .iter()
                .map(|h| {
                    h.landmarks
                        .iter()
                        .map(|p| NormalizedLandmark {
                            x: p.x,
                            y: p.y,
                            z: Some(p.z),
                        })
                        .collect()
                })
                .collect(),
            multi_handedness: hands
                .iter()
                .map(|h| Handedness {
                    label: h.side.as_str().to_string(),
                    score: 1.0,
                })
                .collect(),
            head_rotation: None,
        }
    }

    /// One hand with every landmark at `point`.
    pub fn uniform(side: HandSide, point: LandmarkPoint) -> Self {
        Self::from_hands(&[Hand::uniform(side, defaults::HAND_LANDMARKS, point)])
    }
}

/// Landmark tracking library (the preferred, richer backend).
pub trait HandTrackerRuntime: Send {
    /// Load models and apply options. May be slow.
    fn load(&mut self, options: &TrackerOptions) -> Result<()>;

    /// True once the runtime can process frames.
    fn is_ready(&self) -> bool;

    /// Run tracking on one frame.
    fn process(&mut self, frame: &FrameHandle) -> Result<TrackerResults>;

    /// Name for logging.
    fn name(&self) -> &str;
}

/// Raw output tensors of the fallback keypoint model.
///
/// `keypoints` is `[hands × 21 × 3]` flattened, with x/y in pixels of the
/// square model input. `handedness[i]` ≥ 0.5 means right hand, and
/// `presence[i]` is the detection score.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphOutput {
    pub keypoints: Vec<f32>,
    pub handedness: Vec<f32>,
    pub presence: Vec<f32>,
}

/// Generic graph-model runtime (the lighter fallback backend).
pub trait GraphModelRuntime: Send {
    /// Load the model graph from disk.
    fn load(&mut self, model_path: &Path) -> Result<()>;

    /// True once the graph is loaded.
    fn is_ready(&self) -> bool;

    /// Resize the frame to `input_size`², run the graph, return raw tensors.
    fn execute(&mut self, frame: &FrameHandle, input_size: u32) -> Result<GraphOutput>;

    /// Name for logging.
    fn name(&self) -> &str;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Scriptable tracker for tests and demos.
///
/// Clones share call counters and the response script, so a test can keep a
/// clone while the original is moved into a pipeline.
#[derive(Debug, Clone)]
pub struct MockHandTracker {
    name: String,
    response: TrackerResults,
    script: Arc<Mutex<VecDeque<TrackerResults>>>,
    fail_load: bool,
    report_ready: bool,
    fail_process: bool,
    delay: Option<Duration>,
    loaded: bool,
    load_calls: Arc<AtomicUsize>,
    process_calls: Arc<AtomicUsize>,
}

impl MockHandTracker {
    /// Create a tracker that loads fine and reports no hands.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            response: TrackerResults::default(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fail_load: false,
            report_ready: true,
            fail_process: false,
            delay: None,
            loaded: false,
            load_calls: Arc::new(AtomicUsize::new(0)),
            process_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return these results whenever the script is empty.
    pub fn with_response(mut self, response: TrackerResults) -> Self {
        self.response = response;
        self
    }

    /// Return these results in order, one per frame, before falling back to
    /// the fixed response.
    pub fn with_script(self, script: Vec<TrackerResults>) -> Self {
        lock(&self.script).extend(script);
        self
    }

    /// Configure the mock to fail on load
    pub fn with_load_failure(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Load succeeds but the runtime never reports ready
    pub fn with_not_ready(mut self) -> Self {
        self.report_ready = false;
        self
    }

    /// Configure the mock to fail on every process call
    pub fn with_process_failure(mut self) -> Self {
        self.fail_process = true;
        self
    }

    /// Sleep this long inside every process call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }
}

impl HandTrackerRuntime for MockHandTracker {
    fn load(&mut self, _options: &TrackerOptions) -> Result<()> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(SignlensError::EngineInit {
                engine: self.name.clone(),
                message: "mock load failure".to_string(),
            });
        }
        self.loaded = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.loaded && self.report_ready
    }

    fn process(&mut self, _frame: &FrameHandle) -> Result<TrackerResults> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.fail_process {
            return Err(SignlensError::EngineInference {
                engine: self.name.clone(),
                message: "mock process failure".to_string(),
            });
        }
        Ok(lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.response.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Scriptable graph model for tests and demos.
#[derive(Debug, Clone)]
pub struct MockGraphModel {
    name: String,
    response: GraphOutput,
    fail_load: bool,
    fail_execute: bool,
    loaded: bool,
    load_calls: Arc<AtomicUsize>,
    execute_calls: Arc<AtomicUsize>,
}

impl MockGraphModel {
    /// Create a model that loads fine and detects nothing.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            response: GraphOutput::default(),
            fail_load: false,
            fail_execute: false,
            loaded: false,
            load_calls: Arc::new(AtomicUsize::new(0)),
            execute_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_response(mut self, response: GraphOutput) -> Self {
        self.response = response;
        self
    }

    /// Configure the mock to fail on load
    pub fn with_load_failure(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Configure the mock to fail on every execute call
    pub fn with_execute_failure(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }
}

impl GraphModelRuntime for MockGraphModel {
    fn load(&mut self, model_path: &Path) -> Result<()> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(SignlensError::EngineInit {
                engine: self.name.clone(),
                message: format!("cannot load {}", model_path.display()),
            });
        }
        self.loaded = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.loaded
    }

    fn execute(&mut self, _frame: &FrameHandle, _input_size: u32) -> Result<GraphOutput> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_execute {
            return Err(SignlensError::EngineInference {
                engine: self.name.clone(),
                message: "mock execute failure".to_string(),
            });
        }
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
