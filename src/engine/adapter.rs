//! Engine selection with fallback.
//!
//! Backends are tried in priority order on first initialization. The first
//! one that loads and reports ready stays active for the life of the adapter;
//! if none does, the adapter is permanently unavailable.

use crate::capture::FrameHandle;
use crate::config::EngineConfig;
use crate::engine::backend::{Backend, GraphModelBackend};
use crate::engine::runtime::{GraphModelRuntime, HandTrackerRuntime};
use crate::engine::{EngineKind, EngineStatus, InferenceResult};
use crate::error::{Result, SignlensError};
use tracing::{debug, info, warn};

pub struct EngineAdapter {
    candidates: Vec<Backend>,
    active: Option<Backend>,
    status: Option<EngineStatus>,
    failures: u64,
}

impl EngineAdapter {
    /// Create an adapter over backends listed in priority order.
    pub fn new(candidates: Vec<Backend>) -> Self {
        Self {
            candidates,
            active: None,
            status: None,
            failures: 0,
        }
    }

    /// Build the candidate list from config, ordering available runtimes by
    /// `engine.order`. Kinds without a runtime are skipped.
    pub fn from_config(
        config: &EngineConfig,
        mut tracker: Option<Box<dyn HandTrackerRuntime>>,
        mut graph: Option<Box<dyn GraphModelRuntime>>,
    ) -> Self {
        let mut candidates = Vec::new();
        for kind in &config.order {
            match kind {
                EngineKind::HandTracker => {
                    if let Some(runtime) = tracker.take() {
                        candidates.push(Backend::hand_tracker(runtime, config.tracker_options()));
                    }
                }
                EngineKind::GraphModel => {
                    if let Some(runtime) = graph.take() {
                        candidates.push(Backend::GraphModel(
                            GraphModelBackend::new(runtime, config.graph_model_path.clone().into())
                                .with_input_size(config.graph_input_size)
                                .with_max_hands(config.max_hands as usize)
                                .with_min_presence(config.min_detection_confidence),
                        ));
                    }
                }
            }
        }
        Self::new(candidates)
    }

    /// Select a backend. Runs the fallback sequence once; later calls return
    /// the cached outcome without touching any runtime.
    pub fn initialize(&mut self) -> EngineStatus {
        if let Some(status) = self.status {
            return status;
        }

        let candidates = std::mem::take(&mut self.candidates);
        for mut backend in candidates {
            if self.active.is_some() {
                break;
            }
            let kind = backend.kind();
            debug!(engine = %kind, "Loading inference engine");
            match backend.load() {
                Ok(()) => {
                    info!(engine = %kind, "Inference engine ready");
                    self.active = Some(backend);
                }
                Err(e) => {
                    warn!(engine = %kind, error = %e, "Inference engine failed to load, trying next");
                }
            }
        }

        let status = match &self.active {
            Some(backend) => EngineStatus::Ready(backend.kind()),
            None => {
                warn!("No inference engine available");
                EngineStatus::Unavailable
            }
        };
        self.status = Some(status);
        status
    }

    /// Outcome of initialization, or `None` before `initialize` ran.
    pub fn status(&self) -> Option<EngineStatus> {
        self.status
    }

    pub fn active_kind(&self) -> Option<EngineKind> {
        self.active.as_ref().map(Backend::kind)
    }

    /// Run the active backend on one frame.
    ///
    /// A backend failure is logged and counted, and yields an empty result so
    /// a bad frame never stops the stream.
    pub fn infer(&mut self, frame: &FrameHandle) -> Result<InferenceResult> {
        let backend = match (self.status, self.active.as_mut()) {
            (None, _) => return Err(SignlensError::EngineNotInitialized),
            (Some(EngineStatus::Unavailable), _) | (Some(_), None) => {
                return Err(SignlensError::NoEngine);
            }
            (Some(EngineStatus::Ready(_)), Some(backend)) => backend,
        };

        match backend.infer(frame) {
            Ok(result) => Ok(result),
            Err(e) => {
                self.failures += 1;
                warn!(
                    frame = frame.sequence(),
                    failures = self.failures,
                    error = %e,
                    "Inference failed, emitting empty result"
                );
                Ok(InferenceResult::empty())
            }
        }
    }

    /// Number of frames whose inference failed and was replaced by an empty result.
    pub fn failure_count(&self) -> u64 {
        self.failures
    }
}
