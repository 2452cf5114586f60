//! Default configuration constants for signlens.
//!
//! Shared constants used across configuration types, the engine adapter and
//! the baseline filter.

/// Smoothing factor for the per-landmark exponentially weighted baseline.
///
/// Each observation moves the baseline 8% of the way toward it, so genuine
/// slow drift is followed within a few dozen frames while single-frame spikes
/// barely move it.
pub const BASELINE_ALPHA: f32 = 0.08;

/// Deviation from the baseline (normalized x/y units) above which a sample is
/// treated as a tic and snapped back to the baseline.
///
/// Tuning knob only; not overridable at runtime.
pub const TIC_THRESHOLD: f32 = 0.12;

/// Capture cadence in milliseconds (~30 fps).
pub const FRAME_INTERVAL_MS: u64 = 33;

/// Default capture width in pixels.
pub const FRAME_WIDTH: u32 = 640;

/// Default capture height in pixels.
pub const FRAME_HEIGHT: u32 = 480;

/// User key used when nobody is signed in.
pub const GUEST_USER: &str = "Guest";

/// User key substituted when a frame arrives without any user key.
pub const DEFAULT_USER: &str = "default";

/// Landmarks per hand produced by both shipped backends.
pub const HAND_LANDMARKS: usize = 21;

/// Maximum hands the tracker is asked to detect.
pub const MAX_HANDS: u32 = 2;

/// Tracker model complexity (0 = lite, 1 = full). Lite-leaning default for
/// CPU-only devices.
pub const MODEL_COMPLEXITY: u8 = 1;

/// Minimum detection confidence for a hand to be reported.
pub const MIN_DETECTION_CONFIDENCE: f32 = 0.6;

/// Minimum tracking confidence before the tracker re-runs detection.
pub const MIN_TRACKING_CONFIDENCE: f32 = 0.6;

/// Square input resolution of the fallback graph model.
pub const GRAPH_INPUT_SIZE: u32 = 256;

/// Default location of the fallback graph model.
pub const GRAPH_MODEL_PATH: &str = "models/hand_model/model.json";

/// Gloss token prefix for the hand-count placeholder grammar.
pub const HAND_GLOSS_PREFIX: &str = "HANDx";
