//! Threshold-crossing edges, the raw input of the reconstruction chain.

use crate::geometry::ChannelId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Polarity of a threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EdgePolarity {
    /// The signal crossed the threshold upwards.
    Leading,
    /// The signal crossed the threshold downwards.
    Trailing,
}

/// A single threshold crossing on one channel.
///
/// Edges are produced externally by the front-end electronics and are
/// immutable. Times are in picoseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    /// Electronics channel that produced the crossing.
    pub channel: ChannelId,
    /// Zero-based threshold level index.
    pub threshold: u8,
    /// Leading or trailing crossing.
    pub polarity: EdgePolarity,
    /// Timestamp of the crossing [ps].
    pub time: f64,
}

impl Edge {
    /// Creates a new edge.
    #[inline]
    #[must_use]
    pub fn new(channel: ChannelId, threshold: u8, polarity: EdgePolarity, time: f64) -> Self {
        Self {
            channel,
            threshold,
            polarity,
            time,
        }
    }

    /// Returns true for a leading crossing.
    #[inline]
    #[must_use]
    pub fn is_leading(&self) -> bool {
        self.polarity == EdgePolarity::Leading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_polarity() {
        let lead = Edge::new(7, 0, EdgePolarity::Leading, 100.0);
        let trail = Edge::new(7, 0, EdgePolarity::Trailing, 150.0);
        assert!(lead.is_leading());
        assert!(!trail.is_leading());
        assert_eq!(lead.channel, trail.channel);
    }
}
