//! Output sinks: JSON-lines persistence and in-memory collection.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use petrec_core::{
    AggregateSignal, Event, Hit, OutputSink, Pulse, SinkError, StageOutput,
};

use crate::error::Result;

#[derive(Serialize)]
struct StageRecord<'a, T> {
    stage: &'static str,
    items: &'a [T],
}

/// Sink writing one JSON object per stage emission.
///
/// Each line carries the stage name and its rows; emission order is
/// preserved, so a file can be replayed window by window.
pub struct JsonlSink<W: Write> {
    writer: W,
}

impl JsonlSink<BufWriter<File>> {
    /// Creates (or truncates) an output file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonlSink<W> {
    /// Wraps any writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flushes buffered output.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn write_record<T: Serialize>(&mut self, stage: &'static str, items: &[T]) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &StageRecord { stage, items })?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> OutputSink for JsonlSink<W> {
    fn emit(&mut self, output: StageOutput<'_>) -> std::result::Result<(), SinkError> {
        match output {
            StageOutput::Pulses(rows) => self.write_record("pulses", rows)?,
            StageOutput::Signals(rows) => self.write_record("signals", rows)?,
            StageOutput::Hits(rows) => self.write_record("hits", rows)?,
            StageOutput::Events(rows) => self.write_record("events", rows)?,
        }
        Ok(())
    }
}

/// Sink keeping every emitted object in memory.
///
/// Intended for tests and small runs; rows accumulate across windows
/// in emission order.
#[derive(Debug, Default)]
pub struct CollectSink {
    /// Collected stage 1 output.
    pub pulses: Vec<Pulse>,
    /// Collected stage 2 output.
    pub signals: Vec<AggregateSignal>,
    /// Collected stage 3 output.
    pub hits: Vec<Hit>,
    /// Collected stage 4 output.
    pub events: Vec<Event>,
}

impl CollectSink {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for CollectSink {
    fn emit(&mut self, output: StageOutput<'_>) -> std::result::Result<(), SinkError> {
        match output {
            StageOutput::Pulses(rows) => self.pulses.extend_from_slice(rows),
            StageOutput::Signals(rows) => self.signals.extend_from_slice(rows),
            StageOutput::Hits(rows) => self.hits.extend_from_slice(rows),
            StageOutput::Events(rows) => self.events.extend_from_slice(rows),
        }
        Ok(())
    }
}
