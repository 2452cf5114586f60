//! Frame pipeline: FrameSource → inference slot → SignSink.

use crate::capture::{FrameHandle, FrameSource};
use crate::defaults;
use crate::engine::EngineAdapter;
use crate::error::Result;
use crate::pipeline::error::{ErrorReporter, LogReporter};
use crate::pipeline::inference_station::InferenceStation;
use crate::pipeline::sink::{SignSink, SinkStation};
use crate::pipeline::slot::FrameSlot;
use crate::pipeline::station::StationRunner;
use crate::pipeline::types::{
    FrameJob, PipelineCounters, PipelineState, PipelineStats, StateCell, SubmitOutcome,
};
use crate::user::{SharedUserKey, UserKey};
use crossbeam_channel::{Sender, TrySendError, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interval between capture polls in `start_with_source`.
    pub frame_interval: Duration,
    /// Capacity of the inference → sink channel.
    pub event_buffer: usize,
    /// How long `stop` waits for threads before detaching them.
    pub shutdown_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(defaults::FRAME_INTERVAL_MS),
            event_buffer: 4,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct SubmitterShared {
    jobs: Mutex<Option<Sender<FrameJob>>>,
    slot: Arc<FrameSlot>,
    state: Arc<StateCell>,
    counters: Arc<PipelineCounters>,
    warned_unavailable: AtomicBool,
}

/// Producer-side entry point. Cheap to clone and safe to use from any thread.
///
/// Submission never blocks and never queues: a frame that cannot enter the
/// inference slot right now is released immediately.
#[derive(Clone)]
pub struct FrameSubmitter {
    shared: Arc<SubmitterShared>,
}

impl FrameSubmitter {
    fn new(
        jobs: Sender<FrameJob>,
        slot: Arc<FrameSlot>,
        state: Arc<StateCell>,
        counters: Arc<PipelineCounters>,
    ) -> Self {
        Self {
            shared: Arc::new(SubmitterShared {
                jobs: Mutex::new(Some(jobs)),
                slot,
                state,
                counters,
                warned_unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// Offer one frame for `user`. The outcome is informational.
    pub fn submit(&self, frame: FrameHandle, user: UserKey) -> SubmitOutcome {
        let sequence = frame.sequence();
        let outcome = self.try_submit(frame, user);
        self.shared.counters.record(outcome);

        match outcome {
            SubmitOutcome::DroppedNoEngine => {
                if !self.shared.warned_unavailable.swap(true, Ordering::Relaxed) {
                    warn!("No inference engine available, dropping frames");
                }
            }
            SubmitOutcome::Accepted => {}
            other => debug!(frame = sequence, outcome = ?other, "Frame dropped"),
        }
        outcome
    }

    fn try_submit(&self, frame: FrameHandle, user: UserKey) -> SubmitOutcome {
        match self.shared.state.get() {
            PipelineState::Idle | PipelineState::Loading => return SubmitOutcome::DroppedNotReady,
            PipelineState::Unavailable => return SubmitOutcome::DroppedNoEngine,
            PipelineState::Ready(_) => {}
        }

        let Some(permit) = FrameSlot::try_acquire(&self.shared.slot) else {
            return SubmitOutcome::DroppedBusy;
        };

        let jobs = lock(&self.shared.jobs);
        let Some(tx) = jobs.as_ref() else {
            return SubmitOutcome::Closed;
        };
        match tx.try_send(FrameJob {
            frame,
            user,
            permit,
        }) {
            Ok(()) => SubmitOutcome::Accepted,
            Err(TrySendError::Full(_)) => SubmitOutcome::DroppedBusy,
            Err(TrySendError::Disconnected(_)) => SubmitOutcome::Closed,
        }
    }

    /// Disconnect the job channel. Later submissions report `Closed`.
    fn close(&self) {
        lock(&self.shared.jobs).take();
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    submitter: FrameSubmitter,
    state: Arc<StateCell>,
    slot: Arc<FrameSlot>,
    counters: Arc<PipelineCounters>,
    shutdown_timeout: Duration,
}

impl PipelineHandle {
    /// Offer one frame. Fire-and-forget: the frame is either taken into the
    /// inference slot or released before this returns.
    pub fn submit_frame(&self, frame: FrameHandle, user: UserKey) -> SubmitOutcome {
        self.submitter.submit(frame, user)
    }

    /// A submitter that outlives borrows of the handle (capture threads).
    pub fn submitter(&self) -> FrameSubmitter {
        self.submitter.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    /// Block until engine selection finishes or `timeout` passes. Returns the
    /// state at that point.
    pub fn wait_for_engine(&self, timeout: Duration) -> PipelineState {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.state.get();
            if state.is_settled() || Instant::now() >= deadline {
                return state;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Block until no frame is in flight. Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.slot.is_busy() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Returns true if the pipeline is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the pipeline and returns the final counters.
    ///
    /// The frame in flight, if any, finishes and reaches the sink. Threads
    /// still running after the shutdown timeout are detached.
    pub fn stop(mut self) -> PipelineStats {
        self.running.store(false, Ordering::SeqCst);
        self.submitter.close();

        let deadline = Instant::now() + self.shutdown_timeout;
        let poll_interval = Duration::from_millis(10);

        loop {
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    if let Err(panic_info) = handle.join() {
                        let msg = panic_info
                            .downcast_ref::<&str>()
                            .copied()
                            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                            .unwrap_or("unknown panic");
                        error!("Pipeline thread panicked: {msg}");
                    }
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }

            if Instant::now() >= deadline {
                warn!(
                    threads = self.threads.len(),
                    "Shutdown timeout, detaching pipeline threads"
                );
                break;
            }

            thread::sleep(poll_interval);
        }

        let stats = self.counters.snapshot();
        info!(%stats, "Pipeline stopped");
        stats
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        // Dropping without stop() still ends the capture and station threads
        self.running.store(false, Ordering::SeqCst);
        self.submitter.close();
    }
}

/// Capture-to-output pipeline: FrameSource → EngineAdapter → BaselineFilter
/// → SignSink.
pub struct Pipeline {
    config: PipelineConfig,
    error_reporter: Arc<dyn ErrorReporter>,
}

impl Pipeline {
    /// Creates a new pipeline with default error reporter.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            error_reporter: Arc::new(LogReporter),
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Starts the stations. Engine loading begins immediately on the
    /// inference thread; frames submitted before it finishes are dropped.
    pub fn start(self, adapter: EngineAdapter, sink: Box<dyn SignSink>) -> PipelineHandle {
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(StateCell::default());
        let slot = FrameSlot::new();
        let counters = Arc::new(PipelineCounters::default());

        let (job_tx, job_rx) = bounded(1);
        let (event_tx, event_rx) = bounded(self.config.event_buffer.max(1));
        // Terminal station never sends
        let (sink_out_tx, _sink_out_rx) = bounded::<()>(1);

        let inference_station = InferenceStation::new(adapter, state.clone(), counters.clone());
        let sink_station = SinkStation::new(sink, counters.clone());

        let inference_runner = StationRunner::spawn(
            inference_station,
            job_rx,
            event_tx,
            self.error_reporter.clone(),
        );
        let sink_runner =
            StationRunner::spawn(sink_station, event_rx, sink_out_tx, self.error_reporter.clone());

        let threads = vec![
            thread::spawn(move || {
                if let Err(msg) = inference_runner.join() {
                    error!("{msg}");
                }
            }),
            thread::spawn(move || {
                if let Err(msg) = sink_runner.join() {
                    error!("{msg}");
                }
            }),
        ];

        let submitter = FrameSubmitter::new(job_tx, slot.clone(), state.clone(), counters.clone());

        PipelineHandle {
            running,
            threads,
            submitter,
            state,
            slot,
            counters,
            shutdown_timeout: self.config.shutdown_timeout,
        }
    }

    /// Starts the stations plus a capture thread that polls `source` every
    /// `frame_interval` and submits each frame for the current `user`.
    ///
    /// A finite source ends the capture thread when exhausted; the stations
    /// keep running until `stop`.
    pub fn start_with_source(
        self,
        adapter: EngineAdapter,
        sink: Box<dyn SignSink>,
        mut source: Box<dyn FrameSource>,
        user: SharedUserKey,
    ) -> Result<PipelineHandle> {
        source.start()?;

        let interval = self.config.frame_interval;
        let mut handle = self.start(adapter, sink);
        let submitter = handle.submitter();
        let capture_running = handle.running.clone();
        let source_is_finite = source.is_finite();

        let capture_handle = thread::spawn(move || {
            let mut consecutive_errors: u32 = 0;
            const MAX_CONSECUTIVE_ERRORS: u32 = 10;
            let mut frames_read: u64 = 0;

            while capture_running.load(Ordering::SeqCst) {
                let frame = match source.next_frame() {
                    Ok(f) => {
                        consecutive_errors = 0;
                        f
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            error!(
                                errors = consecutive_errors,
                                error = %e,
                                "Frame capture failed repeatedly, stopping capture"
                            );
                            break;
                        }
                        thread::sleep(interval);
                        continue;
                    }
                };

                let Some(frame) = frame else {
                    if source_is_finite {
                        debug!(frames = frames_read, "Frame source exhausted");
                        break;
                    }
                    thread::sleep(interval);
                    continue;
                };

                frames_read += 1;
                if submitter.submit(frame, user.get()) == SubmitOutcome::Closed {
                    break;
                }

                thread::sleep(interval);
            }

            if frames_read == 0 && !source_is_finite {
                warn!("No frames captured; check that the camera is connected");
            }

            if let Err(e) = source.stop() {
                warn!(error = %e, "Failed to stop frame capture");
            }
        });

        handle.threads.push(capture_handle);
        Ok(handle)
    }
}
