//! Time-window batches and the source/sink contracts around the
//! pipeline.

use crate::edge::Edge;
use crate::event::Event;
use crate::hit::Hit;
use crate::pulse::Pulse;
use crate::signal::AggregateSignal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Error type carried by sources and sinks; their concrete failure
/// modes are not the core's concern.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// The content of one time window, resolved to a concrete row type at
/// the source boundary.
///
/// Later-stage batches let the pipeline be entered mid-chain, e.g. to
/// re-run hit matching on persisted aggregate signals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WindowBatch {
    /// Raw threshold crossings; the full chain runs.
    Edges(Vec<Edge>),
    /// Pre-built pulses; assembly is skipped.
    Pulses(Vec<Pulse>),
    /// Pre-built aggregate signals; merging is skipped.
    Signals(Vec<AggregateSignal>),
    /// Pre-built hits; only event assembly runs.
    Hits(Vec<Hit>),
}

impl WindowBatch {
    /// True when the window carries no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Edges(rows) => rows.is_empty(),
            Self::Pulses(rows) => rows.is_empty(),
            Self::Signals(rows) => rows.is_empty(),
            Self::Hits(rows) => rows.is_empty(),
        }
    }
}

/// One stage's emitted objects, borrowed in emission order.
#[derive(Debug, Clone, Copy)]
pub enum StageOutput<'a> {
    /// Stage 1 output.
    Pulses(&'a [Pulse]),
    /// Stage 2 output.
    Signals(&'a [AggregateSignal]),
    /// Stage 3 output.
    Hits(&'a [Hit]),
    /// Stage 4 output.
    Events(&'a [Event]),
}

impl StageOutput<'_> {
    /// Number of emitted objects.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Pulses(rows) => rows.len(),
            Self::Signals(rows) => rows.len(),
            Self::Hits(rows) => rows.len(),
            Self::Events(rows) => rows.len(),
        }
    }

    /// True when the stage emitted nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pull-based supplier of time windows.
///
/// Exhaustible and not restartable mid-run: once `next_window` returns
/// `Ok(None)` the run is over.
pub trait WindowSource {
    /// The next window, `None` when the source is exhausted.
    fn next_window(&mut self) -> Result<Option<WindowBatch>, SinkError>;
}

/// Write-only consumer of stage outputs.
///
/// Emission order within a window matters for reproducibility;
/// ordering across windows does not.
pub trait OutputSink {
    /// Accepts one stage's output for the current window.
    fn emit(&mut self, output: StageOutput<'_>) -> Result<(), SinkError>;
}

impl<S: WindowSource + ?Sized> WindowSource for &mut S {
    fn next_window(&mut self) -> Result<Option<WindowBatch>, SinkError> {
        (**self).next_window()
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn emit(&mut self, output: StageOutput<'_>) -> Result<(), SinkError> {
        (**self).emit(output)
    }
}
