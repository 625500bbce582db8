//! petrec-core: Core types and contracts for detector event reconstruction.
//!
//! This crate provides the data model for the reconstruction chain
//! (edges, pulses, aggregate signals, hits, events), the read-only
//! sensor map and calibration table, and the in-process contracts for
//! window sources, output sinks and diagnostics.

pub mod calibration;
pub mod diagnostics;
pub mod edge;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hit;
pub mod pulse;
pub mod signal;
pub mod window;

pub use calibration::CalibrationTable;
pub use diagnostics::{Diagnostics, MemoryDiagnostics, NullDiagnostics};
pub use edge::{Edge, EdgePolarity};
pub use error::{ConfigError, Error, GeometryError, Result};
pub use event::{Event, EventCategory};
pub use geometry::{
    ChannelId, DetectorElement, ElementId, GroupId, GroupKind, LayerId, MountingGroup, Sensor,
    SensorId, SensorMap, SensorMapBuilder,
};
pub use hit::{Hit, RecoFlag, POSITION_UNKNOWN, REFERENCE_QUALITY};
pub use pulse::{LeadTrailPair, Pulse};
pub use signal::AggregateSignal;
pub use window::{OutputSink, SinkError, StageOutput, WindowBatch, WindowSource};
