//! Station abstraction and its thread runner.

use crate::pipeline::error::{ErrorReporter, StationError};
use crossbeam_channel::{Receiver, Sender};
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A processing step that runs on its own thread.
///
/// Stations are connected by channels. Each one owns its state outright, so
/// nothing inside a station needs a lock.
pub trait Station: Send + 'static {
    /// The input type this station receives.
    type Input: Send + 'static;
    /// The output type this station produces.
    type Output: Send + 'static;

    /// Runs once on the station thread before the first input is read.
    ///
    /// Slow setup (model loading) belongs here so the thread that spawned
    /// the station is never blocked. An output returned here is forwarded
    /// ahead of any per-input output.
    fn startup(&mut self) -> Result<Option<Self::Output>, StationError> {
        Ok(None)
    }

    /// Processes a single input item.
    ///
    /// Returns:
    /// - `Ok(Some(output))` - Successfully processed and produced output
    /// - `Ok(None)` - Successfully processed but no output
    /// - `Err(StationError)` - Processing failed
    fn process(&mut self, input: Self::Input) -> Result<Option<Self::Output>, StationError>;

    /// Returns the name of this station for logging and error reporting.
    fn name(&self) -> &'static str;

    /// Called when the station is shutting down.
    fn shutdown(&mut self) {}
}

/// Runs a station in a dedicated thread.
pub struct StationRunner<S: Station> {
    handle: Option<JoinHandle<()>>,
    station_name: &'static str,
    _phantom: PhantomData<S>,
}

/// What the run loop does after one step.
enum Flow {
    Continue,
    Stop,
}

impl<S: Station> StationRunner<S> {
    /// Spawns a new station in a dedicated thread.
    ///
    /// The thread exits when the input channel disconnects, the output
    /// channel closes, or the station reports a fatal error.
    pub fn spawn(
        mut station: S,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let station_name = station.name();

        let handle = thread::Builder::new()
            .name(format!("station-{station_name}"))
            .spawn(move || {
                Self::run_station(&mut station, input_rx, output_tx, error_reporter);
            });

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!(station = station_name, error = %e, "Failed to spawn station thread");
                None
            }
        };

        Self {
            handle,
            station_name,
            _phantom: PhantomData,
        }
    }

    fn run_station(
        station: &mut S,
        input_rx: Receiver<S::Input>,
        output_tx: Sender<S::Output>,
        error_reporter: Arc<dyn ErrorReporter>,
    ) {
        let station_name = station.name();

        let startup = station.startup();
        if let Flow::Continue = Self::forward(startup, station_name, &output_tx, &*error_reporter) {
            while let Ok(input) = input_rx.recv() {
                let result = station.process(input);
                if let Flow::Stop = Self::forward(result, station_name, &output_tx, &*error_reporter)
                {
                    break;
                }
            }
        }

        station.shutdown();
    }

    fn forward(
        result: Result<Option<S::Output>, StationError>,
        station_name: &str,
        output_tx: &Sender<S::Output>,
        error_reporter: &dyn ErrorReporter,
    ) -> Flow {
        match result {
            Ok(Some(output)) => {
                if output_tx.send(output).is_err() {
                    // Downstream gone
                    return Flow::Stop;
                }
                Flow::Continue
            }
            Ok(None) => Flow::Continue,
            Err(err @ StationError::Recoverable(_)) => {
                error_reporter.report(station_name, &err);
                Flow::Continue
            }
            Err(err @ StationError::Fatal(_)) => {
                error_reporter.report(station_name, &err);
                Flow::Stop
            }
        }
    }

    /// Waits for the station thread to complete.
    pub fn join(mut self) -> Result<(), String> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| format!("Station '{}' thread panicked", self.station_name))
        } else {
            Ok(())
        }
    }

    /// Returns the name of the station.
    pub fn name(&self) -> &'static str {
        self.station_name
    }
}
