use crate::capture::frame::FrameHandle;
use crate::defaults;
use crate::error::{Result, SignlensError};

/// Trait for frame capture devices.
///
/// This trait allows swapping implementations (camera binding, recorded
/// video, synthetic frames). The pipeline polls it at its own cadence.
pub trait FrameSource: Send {
    /// Start capturing frames.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing frames.
    fn stop(&mut self) -> Result<()>;

    /// Read the next available frame.
    ///
    /// `Ok(None)` means no frame is ready yet for a live source, or that the
    /// input is exhausted for a finite one.
    fn next_frame(&mut self) -> Result<Option<FrameHandle>>;

    /// True for sources that end (files, fixed-length replays).
    fn is_finite(&self) -> bool {
        false
    }
}

/// Produces blank frames of a fixed size.
///
/// Used when landmarks come from a recorded stream rather than pixels, and in
/// tests.
#[derive(Debug, Clone)]
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    next_sequence: u64,
    limit: Option<u64>,
    is_started: bool,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_sequence: 0,
            limit: None,
            is_started: false,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "synthetic capture error".to_string(),
        }
    }

    /// Stop after `limit` frames; the source then reports itself finite.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Configure the source to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the source to fail on every read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }

    /// Number of frames produced so far.
    pub fn produced(&self) -> u64 {
        self.next_sequence
    }
}

impl Default for SyntheticFrameSource {
    fn default() -> Self {
        Self::new(defaults::FRAME_WIDTH, defaults::FRAME_HEIGHT)
    }
}

impl FrameSource for SyntheticFrameSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(SignlensError::CaptureFailed {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<FrameHandle>> {
        if self.should_fail_read {
            return Err(SignlensError::CaptureFailed {
                message: self.error_message.clone(),
            });
        }
        if !self.is_started {
            return Ok(None);
        }
        if self.limit.is_some_and(|limit| self.next_sequence >= limit) {
            return Ok(None);
        }
        let frame = FrameHandle::blank(self.next_sequence, self.width, self.height);
        self.next_sequence += 1;
        Ok(Some(frame))
    }

    fn is_finite(&self) -> bool {
        self.limit.is_some()
    }
}
