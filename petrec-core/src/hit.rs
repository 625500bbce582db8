//! Reconstructed hits: side A/B signal fusion on one detector element.

use crate::geometry::ElementId;
use crate::signal::AggregateSignal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sentinel for a position that could not be computed (undefined
/// weight sum). Never `NaN`.
pub const POSITION_UNKNOWN: f64 = -99.0;

/// Sentinel quality for reference hits that carry no derived
/// quantities (auxiliary-only sensor groups).
pub const REFERENCE_QUALITY: f64 = -1.0;

/// Reconstruction quality flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RecoFlag {
    /// Reconstructed from consistent input.
    #[default]
    Good,
    /// Reconstructed but flagged as unreliable.
    Corrupted,
    /// Flag was never assigned.
    Unknown,
}

/// A reconstructed interaction on one detector element.
///
/// Fuses the aggregate signals of the element's two sides, optionally
/// augmented by an auxiliary-layer signal used for the axial position
/// estimate. Times in picoseconds, positions in centimetres, energy as
/// summed time over threshold.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// Owning detector element.
    pub element: ElementId,
    /// Fused time: midpoint of the two side times [ps].
    pub time: f64,
    /// Side B time minus side A time [ps].
    pub time_diff: f64,
    /// Summed time over threshold of both sides [ps].
    pub energy: f64,
    /// Constituent pulse count across both sides and the auxiliary
    /// signal; [`REFERENCE_QUALITY`] for reference hits.
    pub multiplicity: f64,
    /// Lateral position, fixed by element geometry [cm].
    pub x: f64,
    /// Lateral position, fixed by element geometry [cm].
    pub y: f64,
    /// Position along the element's long axis [cm], or
    /// [`POSITION_UNKNOWN`].
    pub z: f64,
    /// Quality flag.
    pub flag: RecoFlag,
    /// Side A constituent, if any.
    pub signal_a: Option<AggregateSignal>,
    /// Side B constituent, if any.
    pub signal_b: Option<AggregateSignal>,
    /// Auxiliary-layer constituent, if any.
    pub signal_aux: Option<AggregateSignal>,
}

impl Hit {
    /// True for a hit created from an auxiliary-only sensor group.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.signal_a.is_none() && self.signal_b.is_none()
    }

    /// True if the axial position carries the unknown sentinel.
    #[must_use]
    pub fn axial_position_unknown(&self) -> bool {
        self.z == POSITION_UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_hit_detection() {
        let hit = Hit {
            element: 1,
            time: 10.0,
            time_diff: -1.0,
            energy: 25.0,
            multiplicity: REFERENCE_QUALITY,
            x: 0.0,
            y: 0.0,
            z: POSITION_UNKNOWN,
            flag: RecoFlag::Good,
            signal_a: None,
            signal_b: None,
            signal_aux: None,
        };
        assert!(hit.is_reference());
        assert!(hit.axial_position_unknown());
    }
}
