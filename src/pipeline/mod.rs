//! Frame pipeline.
//!
//! Each station runs in its own thread, connected by bounded crossbeam
//! channels. The producer side never blocks: frames that cannot enter the
//! single inference slot are released on the spot.

pub mod error;
pub(crate) mod inference_station;
pub mod orchestrator;
pub mod sink;
pub(crate) mod slot;
pub mod station;
pub mod types;

pub use error::{ErrorReporter, LogReporter, StationError};
pub use orchestrator::{FrameSubmitter, Pipeline, PipelineConfig, PipelineHandle};
pub use sink::{CollectorSink, JsonLinesSink, LiveTextSink, SignSink};
pub use station::{Station, StationRunner};
pub use types::{PipelineState, PipelineStats, SubmitOutcome};
