//! End-to-end reconstruction over one window on a small detector:
//! two opposing elements plus an auxiliary-only reference strip.

use std::collections::HashMap;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use petrec_algorithms::{
    AdjacencyPair, EventAssemblyConfig, Pipeline, PipelineConfig, PulseAssemblyConfig,
};
use petrec_core::{
    CalibrationTable, DetectorElement, Edge, EdgePolarity, EventCategory, GroupKind,
    MemoryDiagnostics, MountingGroup, RecoFlag, Sensor, SensorMap, WindowBatch,
};

/// Element 1 (layer 1): side groups 1/2 on channels 1-4 plus an
/// auxiliary group 3 on channels 5-6 with sensors at z = -10 and +10.
/// Element 2 (layer 2): side groups 4/5 on channels 7-10. Element 3
/// (layer 3): auxiliary-only strip, group 6 on channel 11.
fn detector() -> SensorMap {
    let mut builder = SensorMap::builder()
        .element(DetectorElement {
            id: 1,
            layer: 1,
            center_x: -40.0,
            center_y: 0.0,
            center_z: 0.0,
        })
        .element(DetectorElement {
            id: 2,
            layer: 2,
            center_x: 40.0,
            center_y: 0.0,
            center_z: 0.0,
        })
        .element(DetectorElement {
            id: 3,
            layer: 3,
            center_x: 0.0,
            center_y: 25.0,
            center_z: 2.0,
        });
    for (id, kind, element, slots) in [
        (1, GroupKind::SideA, 1, 2),
        (2, GroupKind::SideB, 1, 2),
        (3, GroupKind::Auxiliary, 1, 2),
        (4, GroupKind::SideA, 2, 2),
        (5, GroupKind::SideB, 2, 2),
        (6, GroupKind::Auxiliary, 3, 1),
    ] {
        builder = builder.group(MountingGroup {
            id,
            kind,
            element,
            slots,
        });
    }
    for (channel, group, position, z) in [
        (1, 1, 0, 0.0),
        (2, 1, 1, 0.0),
        (3, 2, 0, 0.0),
        (4, 2, 1, 0.0),
        (5, 3, 0, -10.0),
        (6, 3, 1, 10.0),
        (7, 4, 0, 0.0),
        (8, 4, 1, 0.0),
        (9, 5, 0, 0.0),
        (10, 5, 1, 0.0),
        (11, 6, 0, 2.0),
    ] {
        builder = builder.sensor(Sensor {
            id: channel,
            channel,
            group,
            position,
            z,
        });
    }
    builder.build().unwrap()
}

fn config() -> PipelineConfig {
    PipelineConfig {
        pulse_assembly: PulseAssemblyConfig {
            edge_pair_max_time: 100.0,
            threshold_count: 1,
            allow_incomplete: false,
        },
        event_assembly: EventAssemblyConfig {
            adjacency: vec![AdjacencyPair {
                layers: (1, 2),
                category: EventCategory::BackToBack,
            }],
            ..EventAssemblyConfig::default()
        },
        ..PipelineConfig::default()
    }
}

fn pair(edges: &mut Vec<Edge>, channel: u32, lead: f64, tot: f64) {
    edges.push(Edge::new(channel, 0, EdgePolarity::Leading, lead));
    edges.push(Edge::new(channel, 0, EdgePolarity::Trailing, lead + tot));
}

/// One window of edges:
/// - element 1 sides at mean times 1005 / 1025, auxiliary pulses at
///   1012 (z = -10, TOT 10) and 1014 (z = +10, TOT 30);
/// - element 2 sides at 1045 / 1065 (group 4 carries a 5 ps
///   calibration offset);
/// - one reference pulse on channel 11 at 1100.
fn window() -> Vec<Edge> {
    let mut edges = Vec::new();
    pair(&mut edges, 1, 1000.0, 30.0);
    pair(&mut edges, 2, 1010.0, 30.0);
    pair(&mut edges, 3, 1020.0, 30.0);
    pair(&mut edges, 4, 1030.0, 30.0);
    pair(&mut edges, 5, 1012.0, 10.0);
    pair(&mut edges, 6, 1014.0, 30.0);
    pair(&mut edges, 7, 1040.0, 30.0);
    pair(&mut edges, 8, 1050.0, 30.0);
    pair(&mut edges, 9, 1060.0, 30.0);
    pair(&mut edges, 10, 1070.0, 30.0);
    pair(&mut edges, 11, 1100.0, 25.0);
    edges
}

#[test]
fn test_reconstruction_chain() {
    let calibration = CalibrationTable::from_offsets(HashMap::from([(4, 5.0)]));
    let diagnostics = Arc::new(MemoryDiagnostics::new());
    let pipeline = Pipeline::with_diagnostics(
        Arc::new(detector()),
        calibration,
        config(),
        diagnostics.clone(),
    )
    .unwrap();

    let output = pipeline
        .process_window(WindowBatch::Edges(window()))
        .unwrap();

    assert_eq!(output.pulses.len(), 11);
    assert_eq!(output.signals.len(), 6);
    assert_eq!(output.hits.len(), 3);
    assert_eq!(output.events.len(), 1);

    // Element 1: sides fused at 1015, axial position from the
    // TOT-weighted auxiliary sensors.
    let first = &output.hits[0];
    assert_eq!(first.element, 1);
    assert_abs_diff_eq!(first.time, 1015.0);
    assert_abs_diff_eq!(first.time_diff, 20.0);
    assert_abs_diff_eq!(first.energy, 120.0);
    assert_abs_diff_eq!(first.multiplicity, 6.0);
    assert_abs_diff_eq!(first.z, 5.0);
    assert!(first.signal_aux.is_some());

    // Element 2: the group 4 offset shifts side A to 1040, so the
    // time difference widens to 25 and z comes from propagation.
    let second = &output.hits[1];
    assert_eq!(second.element, 2);
    assert_abs_diff_eq!(second.time, 1052.5);
    assert_abs_diff_eq!(second.time_diff, 25.0);
    assert_abs_diff_eq!(second.z, 25.0 * 0.012 / 2.0, epsilon = 1e-12);

    // Element 3: the reference strip emits a hit with the reduced
    // attribute set.
    let reference = &output.hits[2];
    assert!(reference.is_reference());
    assert_eq!(reference.element, 3);
    assert_abs_diff_eq!(reference.time, 1100.0);
    assert_abs_diff_eq!(reference.energy, 25.0);
    assert_abs_diff_eq!(reference.z, 2.0);

    // The two scintillator hits form a back-to-back event; the
    // reference hit matches no adjacency rule and stays out.
    let event = &output.events[0];
    assert_eq!(event.category, EventCategory::BackToBack);
    assert_eq!(event.flag, RecoFlag::Good);
    assert_eq!(event.multiplicity(), 2);
    assert_abs_diff_eq!(event.hits[0].time, 1015.0);
    assert_abs_diff_eq!(event.hits[1].time, 1052.5);

    let hits_stats = diagnostics.stats("hits_per_window").unwrap();
    assert_eq!(hits_stats.count, 1);
    assert_abs_diff_eq!(hits_stats.sum, 3.0);
}

#[test]
fn test_reconstruction_is_permutation_invariant() {
    let pipeline = Pipeline::new(
        Arc::new(detector()),
        CalibrationTable::new(),
        config(),
    )
    .unwrap();

    let reference = pipeline
        .process_window(WindowBatch::Edges(window()))
        .unwrap();

    let mut shuffled = window();
    shuffled.reverse();
    shuffled.swap(1, 17);
    shuffled.swap(4, 12);
    let other = pipeline
        .process_window(WindowBatch::Edges(shuffled))
        .unwrap();

    assert_eq!(reference, other);
}
