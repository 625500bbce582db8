//! Error types for petrec-core.

use crate::geometry::{ChannelId, ElementId, GroupId, LayerId, SensorId};
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for the reconstruction core.
#[derive(Error, Debug)]
pub enum Error {
    /// Inconsistent configuration detected at pipeline construction.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sensor map lookup failed; fatal for the affected window.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// The output sink rejected an emission.
    #[error("output sink error: {0}")]
    Sink(#[source] crate::window::SinkError),

    /// The window source failed to produce a batch.
    #[error("window source error: {0}")]
    Source(#[source] crate::window::SinkError),
}

/// Configuration inconsistency, surfaced once at construction time.
///
/// The pipeline refuses to run rather than produce silently wrong
/// output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A time window parameter must be strictly positive.
    #[error("{name} must be positive, got {value}")]
    NonPositiveWindow { name: &'static str, value: f64 },

    /// The hit matching window is empty or inverted.
    #[error("hit matching window is empty: min_time_diff {min} >= max_time_diff {max}")]
    EmptyMatchWindow { min: f64, max: f64 },

    /// At least one threshold is required per channel.
    #[error("threshold_count must be at least 1, got {0}")]
    NoThresholds(usize),

    /// Events carry at least two hits.
    #[error("min_multiplicity must be at least 2, got {0}")]
    MultiplicityTooLow(usize),

    /// Event assembly needs at least one adjacency rule.
    #[error("no layer adjacency rules configured")]
    NoAdjacencyRules,

    /// An adjacency rule references a layer absent from the sensor map.
    #[error("adjacency rule references unknown layer {0}")]
    UnknownAdjacencyLayer(LayerId),

    /// The effective propagation velocity must be strictly positive.
    #[error("propagation_velocity must be positive, got {0}")]
    NonPositiveVelocity(f64),
}

/// Sensor map lookup failure.
///
/// A missing id indicates a corrupted configuration, not corrupted
/// data, so these abort the window instead of being skipped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// No sensor is mapped to the channel.
    #[error("unknown channel id {0}")]
    UnknownChannel(ChannelId),

    /// No sensor record for the id.
    #[error("unknown sensor id {0}")]
    UnknownSensor(SensorId),

    /// No mounting group record for the id.
    #[error("unknown mounting group id {0}")]
    UnknownGroup(GroupId),

    /// No detector element record for the id.
    #[error("unknown detector element id {0}")]
    UnknownElement(ElementId),

    /// A record references an id that was never registered.
    #[error("{kind} {id} referenced by {referrer} was never registered")]
    DanglingReference {
        kind: &'static str,
        id: u32,
        referrer: &'static str,
    },

    /// A mounting position is outside the group's slot range.
    #[error("mounting position {position} out of range for group {group} with {slots} slots")]
    PositionOutOfRange {
        group: GroupId,
        position: u8,
        slots: u8,
    },

    /// Two sensors claim the same channel.
    #[error("channel {0} is mapped to more than one sensor")]
    DuplicateChannel(ChannelId),

    /// Two sensors claim the same mounting position of one group.
    #[error("mounting position {position} of group {group} is assigned twice")]
    DuplicatePosition { group: GroupId, position: u8 },

    /// Two mounting groups claim the same role on one element.
    #[error("element {element} has more than one {kind:?} group")]
    DuplicateRole {
        element: ElementId,
        kind: crate::geometry::GroupKind,
    },
}
