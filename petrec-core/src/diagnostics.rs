//! Write-only diagnostics: named numeric samples for monitoring.
//!
//! The core records samples (counts, time differences, multiplicities)
//! but never reads them back; a sink that drops everything is a valid
//! implementation and does not affect correctness.

use std::collections::HashMap;
use std::sync::Mutex;

/// Write-only sink for named numeric samples.
///
/// Implementations must tolerate concurrent recording: stage 2 and 3
/// workers run in parallel across mounting groups and detector
/// elements.
pub trait Diagnostics: Send + Sync {
    /// Records one sample under a name.
    fn record(&self, name: &'static str, value: f64);

    /// Records a sample with value 1.0.
    fn count(&self, name: &'static str) {
        self.record(name, 1.0);
    }
}

/// Diagnostics sink that drops every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn record(&self, _name: &'static str, _value: f64) {}
}

/// Accumulated statistics for one sample name.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    /// Number of recorded samples.
    pub count: u64,
    /// Sum of recorded values.
    pub sum: f64,
}

/// In-memory diagnostics recorder, used by tests and the CLI summary.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    samples: Mutex<HashMap<&'static str, SampleStats>>,
}

impl MemoryDiagnostics {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics recorded under a name, if any.
    #[must_use]
    pub fn stats(&self, name: &str) -> Option<SampleStats> {
        self.samples
            .lock()
            .map(|samples| samples.get(name).copied())
            .unwrap_or(None)
    }

    /// Number of samples recorded under a name.
    #[must_use]
    pub fn count_of(&self, name: &str) -> u64 {
        self.stats(name).map_or(0, |s| s.count)
    }

    /// Snapshot of all accumulated statistics.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<&'static str, SampleStats> {
        self.samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn record(&self, name: &'static str, value: f64) {
        // A poisoned lock only loses monitoring data, never
        // reconstruction output.
        if let Ok(mut samples) = self.samples.lock() {
            let entry = samples.entry(name).or_default();
            entry.count += 1;
            entry.sum += value;
        }
    }
}

/// Sample names recorded by the reconstruction stages.
pub mod sample {
    /// Edge referencing a channel unknown to the sensor map.
    pub const UNKNOWN_CHANNEL_EDGES: &str = "unknown_channel_edges";
    /// Edges left unpaired after pulse assembly.
    pub const UNUSED_EDGES: &str = "unused_edges";
    /// Channels rejected for incomplete threshold pairing.
    pub const INCOMPLETE_PULSES: &str = "incomplete_pulses";
    /// Channels with no valid threshold pair at all.
    pub const EMPTY_CHANNELS: &str = "empty_channels";
    /// Pulses per window surviving assembly.
    pub const PULSES_PER_WINDOW: &str = "pulses_per_window";
    /// Leftover pulses not absorbed into an aggregate signal.
    pub const UNPAIRED_PULSES: &str = "unpaired_pulses";
    /// Aggregate signals per window.
    pub const SIGNALS_PER_WINDOW: &str = "signals_per_window";
    /// Signals without an opposite-side partner; value is the signal
    /// time.
    pub const REMAINDER_SIGNALS: &str = "remainder_signals";
    /// Time gap of a signal pair rejected by the matching window.
    pub const REMAINDER_TIME_GAP: &str = "remainder_time_gap";
    /// Hits per window.
    pub const HITS_PER_WINDOW: &str = "hits_per_window";
    /// Constituent multiplicity of emitted hits.
    pub const HIT_MULTIPLICITY: &str = "hit_multiplicity";
    /// Time gap of a hit rejected from event building.
    pub const REJECTED_EVENT_GAP: &str = "rejected_event_gap";
    /// Events discarded by the minimum-multiplicity filter.
    pub const EVENTS_BELOW_MULTIPLICITY: &str = "events_below_multiplicity";
    /// Events per window.
    pub const EVENTS_PER_WINDOW: &str = "events_per_window";
}
