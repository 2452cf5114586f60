use crate::engine::EngineStatus;
use crate::output::StructuredSignOutput;
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::{PipelineCounters, PipelineEvent};
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Pluggable consumer of structured sign output (renderer, UI, file).
pub trait SignSink: Send + 'static {
    /// Handle one processed frame. Called once per emitted output, in
    /// acceptance order.
    fn handle(&mut self, output: &StructuredSignOutput) -> crate::error::Result<()>;

    /// Engine initialization outcome. Called exactly once, before any output.
    fn status(&mut self, _status: EngineStatus) -> crate::error::Result<()> {
        Ok(())
    }

    /// Called on pipeline shutdown.
    fn finish(&mut self) {}

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Station wrapper for any SignSink. Terminal: produces no output.
pub(crate) struct SinkStation {
    sink: Box<dyn SignSink>,
    counters: Arc<PipelineCounters>,
}

impl SinkStation {
    pub(crate) fn new(sink: Box<dyn SignSink>, counters: Arc<PipelineCounters>) -> Self {
        Self { sink, counters }
    }
}

impl Station for SinkStation {
    type Input = PipelineEvent;
    type Output = ();

    fn name(&self) -> &'static str {
        self.sink.name()
    }

    fn process(&mut self, event: PipelineEvent) -> Result<Option<()>, StationError> {
        match event {
            PipelineEvent::Status(status) => {
                debug!(sink = self.sink.name(), %status, "Delivering engine status");
                self.sink
                    .status(status)
                    .map_err(|e| StationError::Recoverable(format!("status: {e}")))?;
            }
            PipelineEvent::Output { output, permit } => {
                let result = self.sink.handle(&output);
                self.counters.emitted.fetch_add(1, Ordering::Relaxed);
                // Slot frees only after the sink is done with the output
                drop(permit);
                result.map_err(|e| StationError::Recoverable(e.to_string()))?;
            }
        }
        Ok(None)
    }

    fn shutdown(&mut self) {
        self.sink.finish();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Collects outputs and status notifications in memory for tests and
/// embedding. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct CollectorSink {
    outputs: Arc<Mutex<Vec<StructuredSignOutput>>>,
    statuses: Arc<Mutex<Vec<EngineStatus>>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<StructuredSignOutput> {
        lock(&self.outputs).clone()
    }

    pub fn statuses(&self) -> Vec<EngineStatus> {
        lock(&self.statuses).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.outputs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignSink for CollectorSink {
    fn handle(&mut self, output: &StructuredSignOutput) -> crate::error::Result<()> {
        lock(&self.outputs).push(output.clone());
        Ok(())
    }

    fn status(&mut self, status: EngineStatus) -> crate::error::Result<()> {
        lock(&self.statuses).push(status);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Writes one JSON object per output, newline-terminated.
pub struct JsonLinesSink<W: Write + Send + 'static> {
    writer: W,
    pretty: bool,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    /// Indent each object. The output is then no longer one object per line.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send + 'static> SignSink for JsonLinesSink<W> {
    fn handle(&mut self, output: &StructuredSignOutput) -> crate::error::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, output)?;
        } else {
            serde_json::to_writer(&mut self.writer, output)?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(error = %e, "Failed to flush JSON output");
        }
    }

    fn name(&self) -> &'static str {
        "json-lines"
    }
}

/// Live caption: writes the caption line whenever it changes.
pub struct LiveTextSink<W: Write + Send + 'static> {
    writer: W,
    last: Option<String>,
}

impl<W: Write + Send + 'static> LiveTextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, last: None }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send + 'static> SignSink for LiveTextSink<W> {
    fn handle(&mut self, output: &StructuredSignOutput) -> crate::error::Result<()> {
        let caption = output.caption();
        if self.last.as_deref() == Some(caption.as_str()) {
            return Ok(());
        }
        writeln!(self.writer, "{caption}")?;
        self.writer.flush()?;
        self.last = Some(caption);
        Ok(())
    }

    fn status(&mut self, status: EngineStatus) -> crate::error::Result<()> {
        if !status.is_ready() {
            writeln!(self.writer, "[{status}]")?;
            self.writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "live-text"
    }
}
