//! Stage 1: pairing leading/trailing edges into single-channel pulses.

use std::collections::BTreeMap;

use petrec_core::diagnostics::{sample, Diagnostics};
use petrec_core::{ChannelId, Edge, LeadTrailPair, Pulse, SensorMap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for pulse assembly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PulseAssemblyConfig {
    /// Maximum accepted gap between a leading edge and its trailing
    /// partner on one threshold [ps].
    pub edge_pair_max_time: f64,
    /// Number of threshold levels expected per channel.
    pub threshold_count: usize,
    /// Keep pulses that paired only a subset of the thresholds.
    pub allow_incomplete: bool,
}

impl Default for PulseAssemblyConfig {
    fn default() -> Self {
        Self {
            edge_pair_max_time: 25_000.0,
            threshold_count: 2,
            allow_incomplete: false,
        }
    }
}

/// Pairs the window's edges into pulses, one pulse at most per
/// channel.
///
/// Edges referencing a channel unknown to the sensor map are skipped
/// with a diagnostic sample; a channel with no valid pair on any
/// threshold is dropped silently (statistic only). Output is ordered
/// by representative time.
pub fn assemble_pulses(
    edges: &[Edge],
    map: &SensorMap,
    config: &PulseAssemblyConfig,
    diagnostics: &dyn Diagnostics,
) -> Vec<Pulse> {
    // BTreeMap keeps channel iteration deterministic under any input
    // permutation.
    let mut by_channel: BTreeMap<ChannelId, Vec<Edge>> = BTreeMap::new();
    for edge in edges {
        if !map.knows_channel(edge.channel) {
            diagnostics.count(sample::UNKNOWN_CHANNEL_EDGES);
            continue;
        }
        by_channel.entry(edge.channel).or_default().push(*edge);
    }

    let mut pulses = Vec::with_capacity(by_channel.len());
    for (channel, channel_edges) in by_channel {
        if let Some(pulse) = assemble_channel(channel, &channel_edges, config, diagnostics) {
            pulses.push(pulse);
        }
    }

    pulses.sort_by(|a, b| {
        a.base_time()
            .unwrap_or(f64::MAX)
            .total_cmp(&b.base_time().unwrap_or(f64::MAX))
    });
    diagnostics.record(sample::PULSES_PER_WINDOW, pulses.len() as f64);
    pulses
}

/// Builds the pulse of one channel, or `None` when the channel is
/// rejected.
fn assemble_channel(
    channel: ChannelId,
    edges: &[Edge],
    config: &PulseAssemblyConfig,
    diagnostics: &dyn Diagnostics,
) -> Option<Pulse> {
    let mut pulse = Pulse::new(channel, config.threshold_count);
    let mut used_edges = 0usize;

    for threshold in 0..config.threshold_count {
        let mut leads: Vec<f64> = edges
            .iter()
            .filter(|e| e.threshold as usize == threshold && e.is_leading())
            .map(|e| e.time)
            .collect();
        let mut trails: Vec<f64> = edges
            .iter()
            .filter(|e| e.threshold as usize == threshold && !e.is_leading())
            .map(|e| e.time)
            .collect();
        leads.sort_by(f64::total_cmp);
        trails.sort_by(f64::total_cmp);

        // Earliest leading edge, nearest following trailing edge.
        if let Some(&lead) = leads.first() {
            if let Some(&trail) = trails.iter().find(|&&t| t > lead) {
                if trail - lead <= config.edge_pair_max_time {
                    if let Some(pair) = LeadTrailPair::new(lead, trail) {
                        if pulse.set_pair(threshold, pair) {
                            used_edges += 2;
                        }
                    }
                }
            }
        }
    }

    let unused = edges.len().saturating_sub(used_edges);
    if unused > 0 {
        diagnostics.record(sample::UNUSED_EDGES, unused as f64);
    }

    if pulse.pair_count() == 0 {
        diagnostics.count(sample::EMPTY_CHANNELS);
        return None;
    }
    if !pulse.is_complete() && !config.allow_incomplete {
        diagnostics.record(sample::INCOMPLETE_PULSES, f64::from(channel));
        return None;
    }
    Some(pulse)
}
