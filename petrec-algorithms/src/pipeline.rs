//! The four-stage reconstruction pipeline and its run loop.

use std::sync::Arc;

use tracing::{debug, info};

use petrec_core::{
    AggregateSignal, CalibrationTable, ConfigError, Error, Event, Hit, NullDiagnostics, OutputSink,
    Pulse, SensorMap, StageOutput, WindowBatch, WindowSource,
};
use petrec_core::diagnostics::Diagnostics;

use crate::event_assembly::{assemble_events, EventAssemblyConfig};
use crate::group_merging::{merge_pulses, GroupMergingConfig};
use crate::hit_matching::{match_signals, HitMatchingConfig};
use crate::pulse_assembly::{assemble_pulses, PulseAssemblyConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of all four reconstruction stages.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Stage 1: edge pairing.
    pub pulse_assembly: PulseAssemblyConfig,
    /// Stage 2: pulse merging per mounting group.
    pub group_merging: GroupMergingConfig,
    /// Stage 3: opposite-side signal matching.
    pub hit_matching: HitMatchingConfig,
    /// Stage 4: coincidence clustering.
    pub event_assembly: EventAssemblyConfig,
}

impl PipelineConfig {
    /// Checks the configuration against itself and the sensor map.
    fn validate(&self, map: &SensorMap) -> Result<(), ConfigError> {
        if self.pulse_assembly.edge_pair_max_time <= 0.0 {
            return Err(ConfigError::NonPositiveWindow {
                name: "edge_pair_max_time",
                value: self.pulse_assembly.edge_pair_max_time,
            });
        }
        if self.pulse_assembly.threshold_count == 0 {
            return Err(ConfigError::NoThresholds(self.pulse_assembly.threshold_count));
        }
        if self.group_merging.merge_window <= 0.0 {
            return Err(ConfigError::NonPositiveWindow {
                name: "merge_window",
                value: self.group_merging.merge_window,
            });
        }
        if self.hit_matching.min_time_diff >= self.hit_matching.max_time_diff {
            return Err(ConfigError::EmptyMatchWindow {
                min: self.hit_matching.min_time_diff,
                max: self.hit_matching.max_time_diff,
            });
        }
        if self.hit_matching.propagation_velocity <= 0.0 {
            return Err(ConfigError::NonPositiveVelocity(
                self.hit_matching.propagation_velocity,
            ));
        }
        if self.event_assembly.event_window <= 0.0 {
            return Err(ConfigError::NonPositiveWindow {
                name: "event_window",
                value: self.event_assembly.event_window,
            });
        }
        if self.event_assembly.min_multiplicity < 2 {
            return Err(ConfigError::MultiplicityTooLow(
                self.event_assembly.min_multiplicity,
            ));
        }
        if self.event_assembly.adjacency.is_empty() {
            return Err(ConfigError::NoAdjacencyRules);
        }
        for rule in &self.event_assembly.adjacency {
            for layer in [rule.layers.0, rule.layers.1] {
                if !map.has_layer(layer) {
                    return Err(ConfigError::UnknownAdjacencyLayer(layer));
                }
            }
        }
        Ok(())
    }
}

/// Everything one window produced, stage by stage.
///
/// Stages skipped by a mid-chain entry leave their field empty; the
/// supplied rows are not re-emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowOutput {
    /// Stage 1 output.
    pub pulses: Vec<Pulse>,
    /// Stage 2 output.
    pub signals: Vec<AggregateSignal>,
    /// Stage 3 output.
    pub hits: Vec<Hit>,
    /// Stage 4 output.
    pub events: Vec<Event>,
}

/// Totals accumulated over one [`Pipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Windows processed.
    pub windows: u64,
    /// Pulses emitted.
    pub pulses: u64,
    /// Aggregate signals emitted.
    pub signals: u64,
    /// Hits emitted.
    pub hits: u64,
    /// Events emitted.
    pub events: u64,
}

/// The reconstruction chain, validated once and shared read-only
/// across windows.
pub struct Pipeline {
    map: Arc<SensorMap>,
    calibration: CalibrationTable,
    config: PipelineConfig,
    diagnostics: Arc<dyn Diagnostics>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("map", &self.map)
            .field("calibration", &self.calibration)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Builds a pipeline without diagnostics.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when the configuration is
    /// inconsistent with itself or the sensor map.
    pub fn new(
        map: Arc<SensorMap>,
        calibration: CalibrationTable,
        config: PipelineConfig,
    ) -> Result<Self, Error> {
        Self::with_diagnostics(map, calibration, config, Arc::new(NullDiagnostics))
    }

    /// Builds a pipeline recording diagnostic samples to the given
    /// sink.
    pub fn with_diagnostics(
        map: Arc<SensorMap>,
        calibration: CalibrationTable,
        config: PipelineConfig,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, Error> {
        config.validate(&map)?;
        info!(
            elements = map.elements().count(),
            groups = map.mounting_groups().count(),
            offsets = calibration.len(),
            "pipeline configured"
        );
        Ok(Self {
            map,
            calibration,
            config,
            diagnostics,
        })
    }

    /// The sensor map the pipeline was built with.
    #[must_use]
    pub fn sensor_map(&self) -> &SensorMap {
        &self.map
    }

    /// Runs the chain on one window, entering at the stage matching
    /// the batch content.
    ///
    /// # Errors
    /// A failed geometry lookup aborts the window; no partial output
    /// is returned.
    pub fn process_window(&self, batch: WindowBatch) -> Result<WindowOutput, Error> {
        let diagnostics = self.diagnostics.as_ref();
        let mut output = WindowOutput::default();

        // Rows supplied by a mid-chain batch feed the next stage but
        // stay out of the output; only stages that ran emit.
        let mut supplied_signals = None;
        let mut supplied_hits = None;

        match batch {
            WindowBatch::Edges(edges) => {
                output.pulses =
                    assemble_pulses(&edges, &self.map, &self.config.pulse_assembly, diagnostics);
                output.signals = merge_pulses(
                    output.pulses.clone(),
                    &self.map,
                    &self.calibration,
                    &self.config.group_merging,
                    diagnostics,
                )?;
            }
            WindowBatch::Pulses(pulses) => {
                output.signals = merge_pulses(
                    pulses,
                    &self.map,
                    &self.calibration,
                    &self.config.group_merging,
                    diagnostics,
                )?;
            }
            WindowBatch::Signals(signals) => supplied_signals = Some(signals),
            WindowBatch::Hits(hits) => supplied_hits = Some(hits),
        }

        if supplied_hits.is_none() {
            let signals = supplied_signals.unwrap_or_else(|| output.signals.clone());
            output.hits = match_signals(
                signals,
                &self.map,
                &self.config.hit_matching,
                diagnostics,
            )?;
        }
        let hits = supplied_hits.as_deref().unwrap_or(&output.hits);
        output.events = assemble_events(
            hits,
            &self.map,
            &self.config.event_assembly,
            diagnostics,
        )?;

        debug!(
            pulses = output.pulses.len(),
            signals = output.signals.len(),
            hits = output.hits.len(),
            events = output.events.len(),
            "window processed"
        );
        Ok(output)
    }

    /// Pulls windows from the source until exhaustion, emitting every
    /// stage's output to the sink.
    ///
    /// # Errors
    /// Stops at the first source, sink or window-processing failure.
    pub fn run<S, K>(&self, mut source: S, mut sink: K) -> Result<RunSummary, Error>
    where
        S: WindowSource,
        K: OutputSink,
    {
        let mut summary = RunSummary::default();
        while let Some(batch) = source.next_window().map_err(Error::Source)? {
            let output = self.process_window(batch)?;
            sink.emit(StageOutput::Pulses(&output.pulses))
                .map_err(Error::Sink)?;
            sink.emit(StageOutput::Signals(&output.signals))
                .map_err(Error::Sink)?;
            sink.emit(StageOutput::Hits(&output.hits))
                .map_err(Error::Sink)?;
            sink.emit(StageOutput::Events(&output.events))
                .map_err(Error::Sink)?;

            summary.windows += 1;
            summary.pulses += output.pulses.len() as u64;
            summary.signals += output.signals.len() as u64;
            summary.hits += output.hits.len() as u64;
            summary.events += output.events.len() as u64;
        }
        info!(
            windows = summary.windows,
            pulses = summary.pulses,
            signals = summary.signals,
            hits = summary.hits,
            events = summary.events,
            "run complete"
        );
        Ok(summary)
    }
}
