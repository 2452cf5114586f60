//! Single-flight guard for the inference slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Marks whether a frame is in flight between acceptance and sink hand-off.
#[derive(Debug, Default)]
pub(crate) struct FrameSlot {
    busy: AtomicBool,
}

impl FrameSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the slot. `None` while another permit is alive.
    pub(crate) fn try_acquire(slot: &Arc<FrameSlot>) -> Option<SlotPermit> {
        slot.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SlotPermit {
                slot: Arc::clone(slot),
            })
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Ownership of the slot. Travels with a frame, then with its output, and
/// frees the slot when dropped.
#[derive(Debug)]
pub(crate) struct SlotPermit {
    slot: Arc<FrameSlot>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}
