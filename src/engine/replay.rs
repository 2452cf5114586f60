//! Hand tracker runtime that replays recorded tracker output.
//!
//! The recording is JSON Lines, one `TrackerResults` object per frame in the
//! tracker's native field names. Blank lines are skipped.

use crate::capture::FrameHandle;
use crate::engine::runtime::{HandTrackerRuntime, TrackerOptions, TrackerResults};
use crate::error::{Result, SignlensError};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub struct ReplayTracker {
    path: PathBuf,
    frames: VecDeque<TrackerResults>,
    loaded: bool,
    exhausted: Arc<AtomicBool>,
}

impl ReplayTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frames: VecDeque::new(),
            loaded: false,
            exhausted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag set once every recorded frame has been handed out.
    pub fn exhausted_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exhausted)
    }

    /// Frames not yet replayed.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    fn init_error(&self, message: String) -> SignlensError {
        SignlensError::EngineInit {
            engine: format!("replay:{}", self.path.display()),
            message,
        }
    }
}

/// Parse a JSON Lines recording. Errors carry the 1-based line number.
pub(crate) fn parse_recording(content: &str) -> std::result::Result<Vec<TrackerResults>, String> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", i + 1, e))
        })
        .collect()
}

impl HandTrackerRuntime for ReplayTracker {
    fn load(&mut self, _options: &TrackerOptions) -> Result<()> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| self.init_error(format!("cannot read recording: {e}")))?;
        let frames = parse_recording(&content).map_err(|e| self.init_error(e))?;

        debug!(path = %self.path.display(), frames = frames.len(), "Loaded replay recording");
        self.exhausted.store(frames.is_empty(), Ordering::SeqCst);
        self.frames = frames.into();
        self.loaded = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.loaded
    }

    fn process(&mut self, _frame: &FrameHandle) -> Result<TrackerResults> {
        let next = self.frames.pop_front();
        if self.frames.is_empty() {
            self.exhausted.store(true, Ordering::SeqCst);
        }
        Ok(next.unwrap_or_default())
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Whether `path` looks like a replay recording.
pub fn is_recording(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl") | Some("ndjson")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{HandSide, LandmarkPoint};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn recording(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn frame() -> FrameHandle {
        FrameHandle::blank(0, 4, 4)
    }

    fn one_hand_line() -> String {
        serde_json::to_string(&TrackerResults::uniform(
            HandSide::Left,
            LandmarkPoint::new(0.5, 0.5, 0.0),
        ))
        .unwrap()
    }

    #[test]
    fn test_replays_frames_in_order_then_empty() {
        let line = one_hand_line();
        let file = recording(&[&line, "", "{}"]);
        let mut tracker = ReplayTracker::new(file.path());
        let exhausted = tracker.exhausted_flag();

        tracker.load(&TrackerOptions::default()).unwrap();
        assert!(tracker.is_ready());
        assert_eq!(tracker.remaining(), 2);
        assert!(!exhausted.load(Ordering::SeqCst));

        assert_eq!(tracker.process(&frame()).unwrap().multi_hand_landmarks.len(), 1);
        assert!(!exhausted.load(Ordering::SeqCst));
        assert!(tracker.process(&frame()).unwrap().multi_hand_landmarks.is_empty());
        assert!(exhausted.load(Ordering::SeqCst));
        assert_eq!(tracker.process(&frame()).unwrap(), TrackerResults::default());
    }

    #[test]
    fn test_missing_file_fails_load() {
        let mut tracker = ReplayTracker::new("/nonexistent/recording.jsonl");
        let err = tracker.load(&TrackerOptions::default()).unwrap_err();
        assert!(matches!(err, SignlensError::EngineInit { .. }));
        assert!(!tracker.is_ready());
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let line = one_hand_line();
        let file = recording(&[&line, "not json"]);
        let mut tracker = ReplayTracker::new(file.path());

        let err = tracker.load(&TrackerOptions::default()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "got: {err}");
    }

    #[test]
    fn test_empty_recording_is_exhausted_immediately() {
        let file = recording(&[]);
        let mut tracker = ReplayTracker::new(file.path());
        let exhausted = tracker.exhausted_flag();

        tracker.load(&TrackerOptions::default()).unwrap();
        assert!(exhausted.load(Ordering::SeqCst));
    }

    #[test]
    fn test_is_recording_by_extension() {
        assert!(is_recording(Path::new("session.jsonl")));
        assert!(is_recording(Path::new("session.ndjson")));
        assert!(!is_recording(Path::new("session.json")));
        assert!(!is_recording(Path::new("session")));
    }
}
