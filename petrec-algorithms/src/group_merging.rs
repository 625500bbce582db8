//! Stage 2: merging pulses of one mounting group into aggregate
//! signals.

use std::collections::BTreeMap;

use rayon::prelude::*;

use petrec_core::diagnostics::{sample, Diagnostics};
use petrec_core::{
    AggregateSignal, CalibrationTable, GeometryError, GroupId, GroupKind, Pulse, SensorMap,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for group merging.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupMergingConfig {
    /// Maximum accepted gap between a seed pulse and a candidate of
    /// the same group [ps].
    pub merge_window: f64,
}

impl Default for GroupMergingConfig {
    fn default() -> Self {
        Self {
            merge_window: 20_000.0,
        }
    }
}

/// Per-group working set resolved against the sensor map before the
/// parallel loop.
struct GroupWork {
    group: GroupId,
    slots: u8,
    offset: f64,
    /// A single-sensor auxiliary group may emit single-pulse
    /// aggregates.
    single_sensor_auxiliary: bool,
    /// Pulses with their mounting positions, sorted by base time.
    pulses: Vec<(u8, Pulse)>,
}

/// Merges the window's pulses into aggregate signals, one greedy scan
/// per mounting group.
///
/// Groups never interact, so they are processed in parallel; the
/// output concatenates the per-group results in ascending group-id
/// order. A pulse whose channel cannot be resolved is a hard geometry
/// error for the window.
pub fn merge_pulses(
    pulses: Vec<Pulse>,
    map: &SensorMap,
    calibration: &CalibrationTable,
    config: &GroupMergingConfig,
    diagnostics: &dyn Diagnostics,
) -> Result<Vec<AggregateSignal>, GeometryError> {
    let mut by_group: BTreeMap<GroupId, Vec<(u8, Pulse)>> = BTreeMap::new();
    for pulse in pulses {
        let sensor = map.sensor_for_channel(pulse.channel)?;
        by_group
            .entry(sensor.group)
            .or_default()
            .push((sensor.position, pulse));
    }

    let mut work = Vec::with_capacity(by_group.len());
    for (group_id, mut group_pulses) in by_group {
        let group = map.group(group_id)?;
        group_pulses.sort_by(|a, b| {
            a.1.base_time()
                .unwrap_or(f64::MAX)
                .total_cmp(&b.1.base_time().unwrap_or(f64::MAX))
        });
        work.push(GroupWork {
            group: group_id,
            slots: group.slots,
            offset: calibration.offset(group_id),
            single_sensor_auxiliary: group.kind == GroupKind::Auxiliary
                && map.sensor_count(group_id) == 1,
            pulses: group_pulses,
        });
    }

    let merged: Vec<Vec<AggregateSignal>> = work
        .par_iter()
        .map(|group| merge_group(group, config, diagnostics))
        .collect();

    let signals: Vec<AggregateSignal> = merged.into_iter().flatten().collect();
    diagnostics.record(sample::SIGNALS_PER_WINDOW, signals.len() as f64);
    Ok(signals)
}

/// Greedy seed scan over one group's time-sorted pulses.
///
/// Consumption is tracked by index markers; the input is never
/// mutated while being scanned.
fn merge_group(
    work: &GroupWork,
    config: &GroupMergingConfig,
    diagnostics: &dyn Diagnostics,
) -> Vec<AggregateSignal> {
    let pulses = &work.pulses;
    let mut consumed = vec![false; pulses.len()];
    let mut signals = Vec::new();

    let mut seed = 0;
    while seed < pulses.len() {
        if consumed[seed] {
            seed += 1;
            continue;
        }
        let (seed_position, seed_pulse) = &pulses[seed];
        let Some(seed_time) = seed_pulse.base_time() else {
            // A pulse with no pairs cannot anchor or join an
            // aggregate; skip it as malformed input.
            diagnostics.count(sample::UNPAIRED_PULSES);
            consumed[seed] = true;
            continue;
        };

        let mut aggregate = AggregateSignal::new(work.group, work.slots);
        aggregate.try_insert(*seed_position, seed_pulse.clone());
        consumed[seed] = true;

        for candidate in seed + 1..pulses.len() {
            if consumed[candidate] {
                continue;
            }
            let (position, pulse) = &pulses[candidate];
            let Some(time) = pulse.base_time() else {
                continue;
            };
            if (time - seed_time).abs() >= config.merge_window {
                // Sorted order: every later candidate is further away.
                break;
            }
            // An occupied mounting position does not close the
            // aggregate; later candidates may fill other positions.
            if aggregate.try_insert(*position, pulse.clone()) {
                consumed[candidate] = true;
            }
        }

        if aggregate.multiplicity() > 1 || work.single_sensor_auxiliary {
            if let Some(mean) = aggregate.mean_base_time() {
                aggregate.time = mean - work.offset;
                signals.push(aggregate);
            }
        } else {
            diagnostics.count(sample::UNPAIRED_PULSES);
        }
    }

    signals
}
