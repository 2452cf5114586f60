//! Inference station: engine, tic filter and output assembly for one frame.

use crate::engine::EngineAdapter;
use crate::filter::BaselineFilter;
use crate::output::StructuredSignOutput;
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::{FrameJob, PipelineCounters, PipelineEvent, PipelineState, StateCell};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

/// Owns the engine adapter and every user's baseline. Runs on the single
/// inference thread, so frames are processed strictly one at a time.
pub(crate) struct InferenceStation {
    adapter: EngineAdapter,
    filter: BaselineFilter,
    state: Arc<StateCell>,
    counters: Arc<PipelineCounters>,
}

impl InferenceStation {
    pub(crate) fn new(
        adapter: EngineAdapter,
        state: Arc<StateCell>,
        counters: Arc<PipelineCounters>,
    ) -> Self {
        Self {
            adapter,
            filter: BaselineFilter::new(),
            state,
            counters,
        }
    }
}

impl Station for InferenceStation {
    type Input = FrameJob;
    type Output = PipelineEvent;

    fn startup(&mut self) -> Result<Option<PipelineEvent>, StationError> {
        self.state.advance(PipelineState::Loading);
        let status = self.adapter.initialize();
        self.state.advance(status.into());
        info!(%status, "Pipeline ready to accept frames");
        Ok(Some(PipelineEvent::Status(status)))
    }

    fn process(&mut self, job: FrameJob) -> Result<Option<PipelineEvent>, StationError> {
        let FrameJob {
            frame,
            user,
            permit,
        } = job;

        let sequence = frame.sequence();
        let result = self
            .adapter
            .infer(&frame)
            .map_err(|e| StationError::Recoverable(format!("frame {sequence}: {e}")))?;
        frame.release();

        self.counters
            .inference_failures
            .store(self.adapter.failure_count(), Ordering::Relaxed);

        let outcome = self.filter.filter(&user, result.hands);
        debug!(
            frame = sequence,
            user = %user,
            hands = outcome.hands.len(),
            tics = outcome.filtered,
            "Frame processed"
        );

        let output =
            StructuredSignOutput::from_inference(outcome.hands, result.head_pose, outcome.filtered);
        Ok(Some(PipelineEvent::Output { output, permit }))
    }

    fn name(&self) -> &'static str {
        "inference"
    }

    fn shutdown(&mut self) {
        debug!(users = self.filter.user_count(), "Inference station stopped");
    }
}
