//! Data types passed between pipeline stations, and the shared state the
//! producer side reads.

use crate::capture::FrameHandle;
use crate::engine::{EngineKind, EngineStatus};
use crate::output::StructuredSignOutput;
use crate::pipeline::slot::SlotPermit;
use crate::user::UserKey;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// A frame accepted into the inference slot.
pub(crate) struct FrameJob {
    pub frame: FrameHandle,
    pub user: UserKey,
    pub permit: SlotPermit,
}

/// Messages from the inference station to the sink station.
pub(crate) enum PipelineEvent {
    /// Engine initialization finished. Sent exactly once, before any output.
    Status(EngineStatus),
    /// One processed frame. The permit frees the slot once the sink is done.
    Output {
        output: StructuredSignOutput,
        permit: SlotPermit,
    },
}

/// Lifecycle of a pipeline. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "engine", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Loading,
    Ready(EngineKind),
    Unavailable,
}

impl PipelineState {
    /// True once the engine decision has been made.
    pub fn is_settled(&self) -> bool {
        matches!(self, PipelineState::Ready(_) | PipelineState::Unavailable)
    }

    fn rank(&self) -> u8 {
        match self {
            PipelineState::Idle => 0,
            PipelineState::Loading => 1,
            PipelineState::Ready(_) | PipelineState::Unavailable => 2,
        }
    }

    fn encode(&self) -> u8 {
        match self {
            PipelineState::Idle => 0,
            PipelineState::Loading => 1,
            PipelineState::Ready(EngineKind::HandTracker) => 2,
            PipelineState::Ready(EngineKind::GraphModel) => 3,
            PipelineState::Unavailable => 4,
        }
    }

    fn decode(value: u8) -> Self {
        match value {
            1 => PipelineState::Loading,
            2 => PipelineState::Ready(EngineKind::HandTracker),
            3 => PipelineState::Ready(EngineKind::GraphModel),
            4 => PipelineState::Unavailable,
            _ => PipelineState::Idle,
        }
    }
}

impl From<EngineStatus> for PipelineState {
    fn from(status: EngineStatus) -> Self {
        match status {
            EngineStatus::Ready(kind) => PipelineState::Ready(kind),
            EngineStatus::Unavailable => PipelineState::Unavailable,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("idle"),
            PipelineState::Loading => f.write_str("loading"),
            PipelineState::Ready(kind) => write!(f, "ready ({kind})"),
            PipelineState::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Lock-free, forward-only holder of a [`PipelineState`].
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn get(&self) -> PipelineState {
        PipelineState::decode(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if it is later in the lifecycle. Returns whether the
    /// state changed.
    pub(crate) fn advance(&self, next: PipelineState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (next.rank() > PipelineState::decode(current).rank()).then(|| next.encode())
            })
            .is_ok()
    }
}

/// Result of offering one frame to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Taken into the inference slot.
    Accepted,
    /// Another frame was still in flight.
    DroppedBusy,
    /// The engine is still loading.
    DroppedNotReady,
    /// No engine could be loaded.
    DroppedNoEngine,
    /// The pipeline has stopped.
    Closed,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted)
    }
}

/// Live counters, shared by the producer side and the stations.
#[derive(Debug, Default)]
pub(crate) struct PipelineCounters {
    pub submitted: AtomicU64,
    pub accepted: AtomicU64,
    pub dropped_busy: AtomicU64,
    pub dropped_not_ready: AtomicU64,
    pub dropped_no_engine: AtomicU64,
    pub emitted: AtomicU64,
    pub inference_failures: AtomicU64,
}

impl PipelineCounters {
    pub(crate) fn record(&self, outcome: SubmitOutcome) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            SubmitOutcome::Accepted => &self.accepted,
            SubmitOutcome::DroppedBusy => &self.dropped_busy,
            SubmitOutcome::DroppedNotReady => &self.dropped_not_ready,
            SubmitOutcome::DroppedNoEngine => &self.dropped_no_engine,
            SubmitOutcome::Closed => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            dropped_not_ready: self.dropped_not_ready.load(Ordering::Relaxed),
            dropped_no_engine: self.dropped_no_engine.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            inference_failures: self.inference_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PipelineStats {
    pub submitted: u64,
    pub accepted: u64,
    pub dropped_busy: u64,
    pub dropped_not_ready: u64,
    pub dropped_no_engine: u64,
    pub emitted: u64,
    pub inference_failures: u64,
}

impl PipelineStats {
    pub fn dropped(&self) -> u64 {
        self.dropped_busy + self.dropped_not_ready + self.dropped_no_engine
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} submitted, {} emitted, {} dropped ({} busy, {} not ready, {} no engine), {} inference failures",
            self.submitted,
            self.emitted,
            self.dropped(),
            self.dropped_busy,
            self.dropped_not_ready,
            self.dropped_no_engine,
            self.inference_failures
        )
    }
}
