//! Stage 3: matching opposite-side aggregate signals into hits.

use std::collections::BTreeMap;

use rayon::prelude::*;

use petrec_core::diagnostics::{sample, Diagnostics};
use petrec_core::{
    AggregateSignal, DetectorElement, ElementId, GeometryError, GroupKind, Hit, RecoFlag,
    SensorMap, POSITION_UNKNOWN, REFERENCE_QUALITY,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for hit matching.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitMatchingConfig {
    /// Lower bound of the accepted signed time difference between a
    /// seed signal and a later opposite-side candidate [ps].
    pub min_time_diff: f64,
    /// Upper bound of the accepted time difference [ps].
    pub max_time_diff: f64,
    /// Effective light propagation velocity along the element
    /// [cm/ps]; the axial position fallback is
    /// `time_diff * velocity / 2`.
    pub propagation_velocity: f64,
}

impl Default for HitMatchingConfig {
    fn default() -> Self {
        Self {
            min_time_diff: 0.0,
            max_time_diff: 5_000.0,
            propagation_velocity: 0.012,
        }
    }
}

/// Per-element working set built before the parallel loop.
struct ElementWork {
    element: DetectorElement,
    auxiliary_only: bool,
    /// Side A/B signals in one time-sorted sequence.
    sides: Vec<(GroupKind, AggregateSignal)>,
    /// Auxiliary-layer signals, time-sorted.
    auxiliary: Vec<AggregateSignal>,
}

/// Matches the window's aggregate signals into hits, one greedy scan
/// per detector element.
///
/// Elements never interact, so they are processed in parallel; the
/// concatenated output is stably sorted by fused time before event
/// assembly. Signals without an opposite-side partner are recorded as
/// remainder and never become hits; input count = consumed + remainder
/// holds per element.
pub fn match_signals(
    signals: Vec<AggregateSignal>,
    map: &SensorMap,
    config: &HitMatchingConfig,
    diagnostics: &dyn Diagnostics,
) -> Result<Vec<Hit>, GeometryError> {
    let mut by_element: BTreeMap<ElementId, (Vec<(GroupKind, AggregateSignal)>, Vec<AggregateSignal>)> =
        BTreeMap::new();
    for signal in signals {
        let group = map.group(signal.group)?;
        let entry = by_element.entry(group.element).or_default();
        match group.kind {
            GroupKind::SideA | GroupKind::SideB => entry.0.push((group.kind, signal)),
            GroupKind::Auxiliary => entry.1.push(signal),
        }
    }

    let mut work = Vec::with_capacity(by_element.len());
    for (element_id, (mut sides, mut auxiliary)) in by_element {
        let element = *map.element(element_id)?;
        let topology = map.groups_of_element(element_id)?;
        sides.sort_by(|a, b| a.1.time.total_cmp(&b.1.time));
        auxiliary.sort_by(|a, b| a.time.total_cmp(&b.time));
        work.push(ElementWork {
            element,
            auxiliary_only: topology.is_auxiliary_only(),
            sides,
            auxiliary,
        });
    }

    let matched: Result<Vec<Vec<Hit>>, GeometryError> = work
        .into_par_iter()
        .map(|element| match_element(element, map, config, diagnostics))
        .collect();

    let mut hits: Vec<Hit> = matched?.into_iter().flatten().collect();
    hits.sort_by(|a, b| a.time.total_cmp(&b.time));
    for hit in &hits {
        diagnostics.record(sample::HIT_MULTIPLICITY, hit.multiplicity);
    }
    diagnostics.record(sample::HITS_PER_WINDOW, hits.len() as f64);
    Ok(hits)
}

/// Greedy earliest-first matching on one element.
///
/// The time-window condition is checked before the opposite-side
/// condition; among in-window candidates the sorted order guarantees
/// the closest one is encountered first.
fn match_element(
    work: ElementWork,
    map: &SensorMap,
    config: &HitMatchingConfig,
    diagnostics: &dyn Diagnostics,
) -> Result<Vec<Hit>, GeometryError> {
    let mut hits = Vec::new();

    if work.auxiliary_only {
        // No A/B pairing on this element; every surviving signal is a
        // reference hit.
        for signal in work.auxiliary {
            hits.push(reference_hit(&work.element, signal));
        }
        return Ok(hits);
    }

    let sides = &work.sides;
    let mut consumed = vec![false; sides.len()];
    let mut aux_consumed = vec![false; work.auxiliary.len()];

    for i in 0..sides.len() {
        if consumed[i] {
            continue;
        }
        let (seed_kind, seed) = &sides[i];
        let mut matched = false;

        for j in i + 1..sides.len() {
            if consumed[j] {
                continue;
            }
            let (kind, candidate) = &sides[j];
            let diff = candidate.time - seed.time;
            if diff <= config.min_time_diff || diff >= config.max_time_diff {
                // Only an opposite-side pair missing the window is a
                // near miss worth sampling.
                if kind != seed_kind {
                    diagnostics.record(sample::REMAINDER_TIME_GAP, diff);
                }
                break;
            }
            if kind == seed_kind {
                // Same side within the window; a later candidate may
                // still sit on the opposite side.
                continue;
            }

            let (side_a, side_b) = if *seed_kind == GroupKind::SideA {
                (seed, candidate)
            } else {
                (candidate, seed)
            };
            let fused = (side_a.time + side_b.time) / 2.0;
            let auxiliary =
                take_auxiliary(&work.auxiliary, &mut aux_consumed, fused, config);
            hits.push(fused_hit(&work.element, side_a, side_b, auxiliary, map, config)?);
            consumed[i] = true;
            consumed[j] = true;
            matched = true;
            break;
        }

        if !matched {
            consumed[i] = true;
            diagnostics.record(sample::REMAINDER_SIGNALS, seed.time);
        }
    }

    // Auxiliary signals no fused hit claimed are remainder as well.
    for (index, signal) in work.auxiliary.iter().enumerate() {
        if !aux_consumed[index] {
            diagnostics.record(sample::REMAINDER_SIGNALS, signal.time);
        }
    }

    Ok(hits)
}

/// Claims the first unconsumed auxiliary signal in coincidence with
/// the fused time.
fn take_auxiliary(
    auxiliary: &[AggregateSignal],
    aux_consumed: &mut [bool],
    fused_time: f64,
    config: &HitMatchingConfig,
) -> Option<AggregateSignal> {
    for (index, signal) in auxiliary.iter().enumerate() {
        if aux_consumed[index] {
            continue;
        }
        let gap = (signal.time - fused_time).abs();
        if gap >= config.min_time_diff && gap <= config.max_time_diff {
            aux_consumed[index] = true;
            return Some(signal.clone());
        }
    }
    None
}

/// Builds a hit from matched side A/B signals and an optional
/// auxiliary signal.
fn fused_hit(
    element: &DetectorElement,
    side_a: &AggregateSignal,
    side_b: &AggregateSignal,
    auxiliary: Option<AggregateSignal>,
    map: &SensorMap,
    config: &HitMatchingConfig,
) -> Result<Hit, GeometryError> {
    let time = (side_a.time + side_b.time) / 2.0;
    let time_diff = side_b.time - side_a.time;
    let energy = side_a.tot() + side_b.tot();
    let mut multiplicity = (side_a.multiplicity() + side_b.multiplicity()) as f64;

    let z = match &auxiliary {
        Some(aux) => {
            multiplicity += aux.multiplicity() as f64;
            weighted_axial_position(aux, map)?
        }
        None => time_diff * config.propagation_velocity / 2.0,
    };

    Ok(Hit {
        element: element.id,
        time,
        time_diff,
        energy,
        multiplicity,
        x: element.center_x,
        y: element.center_y,
        z,
        flag: RecoFlag::Good,
        signal_a: Some(side_a.clone()),
        signal_b: Some(side_b.clone()),
        signal_aux: auxiliary,
    })
}

/// TOT-weighted mean of the auxiliary constituents' sensor positions;
/// the unknown sentinel when the weight sum vanishes, never `NaN`.
fn weighted_axial_position(
    auxiliary: &AggregateSignal,
    map: &SensorMap,
) -> Result<f64, GeometryError> {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for (_, pulse) in auxiliary.constituents() {
        let sensor = map.sensor_for_channel(pulse.channel)?;
        let weight = pulse.tot();
        weighted_sum += sensor.z * weight;
        weight_sum += weight;
    }
    if weight_sum > 0.0 {
        Ok(weighted_sum / weight_sum)
    } else {
        Ok(POSITION_UNKNOWN)
    }
}

/// Hit with a reduced attribute set for auxiliary-only sensor groups.
fn reference_hit(element: &DetectorElement, signal: AggregateSignal) -> Hit {
    Hit {
        element: element.id,
        time: signal.time,
        time_diff: 0.0,
        energy: signal.tot(),
        multiplicity: REFERENCE_QUALITY,
        x: element.center_x,
        y: element.center_y,
        z: element.center_z,
        flag: RecoFlag::Good,
        signal_a: None,
        signal_b: None,
        signal_aux: Some(signal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use petrec_core::{
        DetectorElement, GroupId, LeadTrailPair, MemoryDiagnostics, MountingGroup,
        NullDiagnostics, Pulse, Sensor,
    };

    /// Element 1: side groups 1 (A) and 2 (B) plus auxiliary group 3
    /// with two weighted sensors. Element 2: auxiliary-only strip,
    /// group 4.
    fn test_map() -> SensorMap {
        SensorMap::builder()
            .element(DetectorElement {
                id: 1,
                layer: 1,
                center_x: 12.5,
                center_y: -3.0,
                center_z: 0.0,
            })
            .element(DetectorElement {
                id: 2,
                layer: 3,
                center_x: 0.0,
                center_y: 20.0,
                center_z: 4.0,
            })
            .group(MountingGroup {
                id: 1,
                kind: GroupKind::SideA,
                element: 1,
                slots: 4,
            })
            .group(MountingGroup {
                id: 2,
                kind: GroupKind::SideB,
                element: 1,
                slots: 4,
            })
            .group(MountingGroup {
                id: 3,
                kind: GroupKind::Auxiliary,
                element: 1,
                slots: 2,
            })
            .group(MountingGroup {
                id: 4,
                kind: GroupKind::Auxiliary,
                element: 2,
                slots: 1,
            })
            .sensor(Sensor {
                id: 1,
                channel: 1,
                group: 1,
                position: 0,
                z: 0.0,
            })
            .sensor(Sensor {
                id: 2,
                channel: 2,
                group: 2,
                position: 0,
                z: 0.0,
            })
            .sensor(Sensor {
                id: 3,
                channel: 3,
                group: 3,
                position: 0,
                z: -10.0,
            })
            .sensor(Sensor {
                id: 4,
                channel: 4,
                group: 3,
                position: 1,
                z: 10.0,
            })
            .sensor(Sensor {
                id: 5,
                channel: 5,
                group: 4,
                position: 0,
                z: 0.0,
            })
            .build()
            .unwrap()
    }

    fn signal_at(group: GroupId, slots: u8, channel: u32, time: f64, tot: f64) -> AggregateSignal {
        let mut pulse = Pulse::new(channel, 1);
        pulse.set_pair(0, LeadTrailPair::new(time, time + tot).unwrap());
        let mut signal = AggregateSignal::new(group, slots);
        signal.try_insert(0, pulse);
        signal.time = time;
        signal
    }

    fn config() -> HitMatchingConfig {
        HitMatchingConfig {
            min_time_diff: 0.0,
            max_time_diff: 10.0,
            propagation_velocity: 0.012,
        }
    }

    #[test]
    fn test_time_diff_sign_and_fused_time() {
        let map = test_map();
        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(2, 4, 2, 12.0, 40.0),
        ];

        let hits = match_signals(signals, &map, &config(), &NullDiagnostics).unwrap();
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!(hits[0].time, 11.0);
        assert_abs_diff_eq!(hits[0].time_diff, 2.0);
        assert_abs_diff_eq!(hits[0].energy, 70.0);
        assert_abs_diff_eq!(hits[0].multiplicity, 2.0);
        assert_abs_diff_eq!(hits[0].x, 12.5);
        assert_abs_diff_eq!(hits[0].y, -3.0);
    }

    #[test]
    fn test_time_diff_sign_with_side_b_first() {
        let map = test_map();
        // Side B leads in time: time_diff = B - A is negative.
        let signals = vec![
            signal_at(2, 4, 2, 10.0, 30.0),
            signal_at(1, 4, 1, 12.0, 30.0),
        ];

        let hits = match_signals(signals, &map, &config(), &NullDiagnostics).unwrap();
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!(hits[0].time_diff, -2.0);
    }

    #[test]
    fn test_axial_position_from_time_difference() {
        let map = test_map();
        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(2, 4, 2, 12.0, 30.0),
        ];

        let hits = match_signals(signals, &map, &config(), &NullDiagnostics).unwrap();
        assert_abs_diff_eq!(hits[0].z, 0.012, epsilon = 1e-12);
    }

    #[test]
    fn test_axial_position_from_auxiliary_weights() {
        let map = test_map();
        // Auxiliary aggregate with two constituents at z = -10 and
        // z = +10, TOT 10 and 30: weighted mean is +5.
        let mut aux = AggregateSignal::new(3, 2);
        let mut p3 = Pulse::new(3, 1);
        p3.set_pair(0, LeadTrailPair::new(11.0, 21.0).unwrap());
        aux.try_insert(0, p3);
        let mut p4 = Pulse::new(4, 1);
        p4.set_pair(0, LeadTrailPair::new(11.0, 41.0).unwrap());
        aux.try_insert(1, p4);
        aux.time = 11.0;

        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(2, 4, 2, 12.0, 30.0),
            aux,
        ];

        let hits = match_signals(signals, &map, &config(), &NullDiagnostics).unwrap();
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!(hits[0].z, 5.0);
        // Constituents of both sides plus the auxiliary signal.
        assert_abs_diff_eq!(hits[0].multiplicity, 4.0);
        // Energy stays the sum of the two sides.
        assert_abs_diff_eq!(hits[0].energy, 60.0);
    }

    #[test]
    fn test_zero_weight_auxiliary_yields_sentinel() {
        let map = test_map();
        // Empty auxiliary aggregate: weight sum is zero.
        let mut aux = AggregateSignal::new(3, 2);
        aux.time = 11.0;
        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(2, 4, 2, 12.0, 30.0),
            aux,
        ];

        let hits = match_signals(signals, &map, &config(), &NullDiagnostics).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].axial_position_unknown());
        assert!(!hits[0].z.is_nan());
    }

    #[test]
    fn test_minimum_time_difference_bound() {
        let map = test_map();
        let bounded = HitMatchingConfig {
            min_time_diff: 5.0,
            max_time_diff: 20.0,
            propagation_velocity: 0.012,
        };

        // A candidate closer than the lower bound ends the seed's
        // scan; neither signal becomes a hit.
        let diag = MemoryDiagnostics::new();
        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(2, 4, 2, 12.0, 30.0),
        ];
        let hits = match_signals(signals, &map, &bounded, &diag).unwrap();
        assert!(hits.is_empty());
        assert_eq!(diag.count_of(sample::REMAINDER_SIGNALS), 2);
        assert_eq!(diag.count_of(sample::REMAINDER_TIME_GAP), 1);

        // The same pair separated beyond the bound matches.
        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(2, 4, 2, 20.0, 30.0),
        ];
        let hits = match_signals(signals, &map, &bounded, &NullDiagnostics).unwrap();
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!(hits[0].time_diff, 10.0);
    }

    #[test]
    fn test_time_gap_sample_only_for_opposite_sides() {
        let map = test_map();

        // Same-side pair outside the window: remainder, but no gap
        // sample.
        let diag = MemoryDiagnostics::new();
        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(1, 4, 1, 50.0, 30.0),
        ];
        match_signals(signals, &map, &config(), &diag).unwrap();
        assert_eq!(diag.count_of(sample::REMAINDER_TIME_GAP), 0);
        assert_eq!(diag.count_of(sample::REMAINDER_SIGNALS), 2);

        // Opposite-side pair outside the window records the gap.
        let diag = MemoryDiagnostics::new();
        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(2, 4, 2, 50.0, 30.0),
        ];
        match_signals(signals, &map, &config(), &diag).unwrap();
        let gap = diag.stats(sample::REMAINDER_TIME_GAP).unwrap();
        assert_eq!(gap.count, 1);
        assert_abs_diff_eq!(gap.sum, 40.0);
    }

    #[test]
    fn test_same_side_signals_never_match() {
        let map = test_map();
        let diag = MemoryDiagnostics::new();
        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(1, 4, 1, 12.0, 30.0),
        ];

        let hits = match_signals(signals, &map, &config(), &diag).unwrap();
        assert!(hits.is_empty());
        assert_eq!(diag.count_of(sample::REMAINDER_SIGNALS), 2);
    }

    #[test]
    fn test_remainder_accounting() {
        let map = test_map();
        let diag = MemoryDiagnostics::new();
        // Five side signals: one A-B pair matches, one A has a same
        // side partner only, one B sits outside every window.
        let signals = vec![
            signal_at(1, 4, 1, 10.0, 30.0),
            signal_at(2, 4, 2, 12.0, 30.0),
            signal_at(1, 4, 1, 14.0, 30.0),
            signal_at(1, 4, 1, 16.0, 30.0),
            signal_at(2, 4, 2, 100.0, 30.0),
        ];
        let input_count = signals.len();

        let hits = match_signals(signals, &map, &config(), &diag).unwrap();
        let consumed: usize = hits
            .iter()
            .map(|h| 2 + usize::from(h.signal_aux.is_some()))
            .sum();
        let remainder = diag.count_of(sample::REMAINDER_SIGNALS) as usize;
        assert_eq!(input_count, consumed + remainder);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_auxiliary_only_element_makes_reference_hits() {
        let map = test_map();
        let signals = vec![signal_at(4, 1, 5, 50.0, 25.0)];

        let hits = match_signals(signals, &map, &config(), &NullDiagnostics).unwrap();
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert!(hit.is_reference());
        assert_eq!(hit.element, 2);
        assert_abs_diff_eq!(hit.time, 50.0);
        assert_abs_diff_eq!(hit.energy, 25.0);
        assert_abs_diff_eq!(hit.multiplicity, REFERENCE_QUALITY);
        assert_abs_diff_eq!(hit.z, 4.0);
    }

    #[test]
    fn test_output_sorted_by_fused_time() {
        let map = test_map();
        let signals = vec![
            signal_at(1, 4, 1, 50.0, 30.0),
            signal_at(2, 4, 2, 52.0, 30.0),
            signal_at(4, 1, 5, 10.0, 25.0),
        ];

        let hits = match_signals(signals, &map, &config(), &NullDiagnostics).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].time < hits[1].time);
        assert_eq!(hits[0].element, 2);
    }
}
