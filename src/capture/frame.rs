use std::fmt;
use std::time::Instant;

type ReleaseHook = Box<dyn FnOnce(u64) + Send>;

/// One captured image, owned by whoever holds it.
///
/// Move-only: the pipeline takes it on submission and releases it when the
/// processing step ends. Release happens on drop, so every exit path (early
/// return, error, panic unwind) runs the release hook exactly once.
pub struct FrameHandle {
    sequence: u64,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    captured_at: Instant,
    on_release: Option<ReleaseHook>,
}

impl FrameHandle {
    /// Wraps raw pixel data (RGBA8, row-major) captured now.
    pub fn new(sequence: u64, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            sequence,
            width,
            height,
            pixels,
            captured_at: Instant::now(),
            on_release: None,
        }
    }

    /// A frame with dimensions only and no pixel payload.
    pub fn blank(sequence: u64, width: u32, height: u32) -> Self {
        Self::new(sequence, width, height, Vec::new())
    }

    /// Registers a callback run with the frame's sequence number on release.
    ///
    /// Capture sources use this to recycle buffers.
    pub fn with_release_hook(mut self, hook: impl FnOnce(u64) + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Releases the frame now. Equivalent to dropping it.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for FrameHandle {
    fn drop(&mut self) {
        if let Some(hook) = self.on_release.take() {
            hook(self.sequence);
        }
    }
}

impl fmt::Debug for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHandle")
            .field("sequence", &self.sequence)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .field("has_release_hook", &self.on_release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    #[test]
    fn frame_exposes_dimensions() {
        let frame = FrameHandle::new(7, 640, 480, vec![0u8; 16]);
        assert_eq!(frame.sequence(), 7);
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.pixels().len(), 16);
    }

    #[test]
    fn release_runs_hook_once_with_sequence() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(AtomicU64::new(0));
        let (c, s) = (calls.clone(), seen.clone());

        let frame = FrameHandle::blank(42, 1, 1).with_release_hook(move |seq| {
            c.fetch_add(1, Ordering::SeqCst);
            s.store(seq, Ordering::SeqCst);
        });
        frame.release();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn drop_releases_frame() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        {
            let _frame = FrameHandle::blank(1, 1, 1).with_release_hook(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_does_not_dump_pixels() {
        let frame = FrameHandle::new(3, 2, 2, vec![255u8; 16]);
        let debug = format!("{:?}", frame);
        assert!(debug.contains("bytes: 16"));
        assert!(!debug.contains("255"));
    }
}
