//! Reconstructed single-channel pulses.

use crate::geometry::ChannelId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A matched pair of leading and trailing crossing times on one
/// threshold. Invariant: `trail > lead`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeadTrailPair {
    /// Leading edge time [ps].
    pub lead: f64,
    /// Trailing edge time [ps].
    pub trail: f64,
}

impl LeadTrailPair {
    /// Creates a pair. Returns `None` unless `trail > lead`.
    #[must_use]
    pub fn new(lead: f64, trail: f64) -> Option<Self> {
        (trail > lead).then_some(Self { lead, trail })
    }

    /// Time over threshold for this level [ps].
    #[inline]
    #[must_use]
    pub fn tot(&self) -> f64 {
        self.trail - self.lead
    }
}

/// One channel's signal within a time window: leading/trailing pairs
/// per threshold level, each level independently populated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pulse {
    /// Channel the pulse was reconstructed on.
    pub channel: ChannelId,
    /// Per-threshold pairs, indexed by threshold level.
    pub thresholds: Vec<Option<LeadTrailPair>>,
}

impl Pulse {
    /// Creates an empty pulse with `threshold_count` unpopulated levels.
    #[must_use]
    pub fn new(channel: ChannelId, threshold_count: usize) -> Self {
        Self {
            channel,
            thresholds: vec![None; threshold_count],
        }
    }

    /// Sets the pair for a threshold level. Levels beyond the pulse's
    /// range are ignored; at most one pair is accepted per level.
    pub fn set_pair(&mut self, threshold: usize, pair: LeadTrailPair) -> bool {
        match self.thresholds.get_mut(threshold) {
            Some(slot @ None) => {
                *slot = Some(pair);
                true
            }
            _ => false,
        }
    }

    /// Representative time: the leading edge on the lowest populated
    /// threshold [ps]. `None` for a pulse with no pairs at all.
    #[must_use]
    pub fn base_time(&self) -> Option<f64> {
        self.thresholds.iter().flatten().next().map(|p| p.lead)
    }

    /// Total time over threshold, summed over populated levels [ps].
    #[must_use]
    pub fn tot(&self) -> f64 {
        self.thresholds.iter().flatten().map(LeadTrailPair::tot).sum()
    }

    /// Number of populated threshold levels.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.thresholds.iter().flatten().count()
    }

    /// True if every expected threshold level carries a pair.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.thresholds.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pair_rejects_inverted_times() {
        assert!(LeadTrailPair::new(10.0, 5.0).is_none());
        assert!(LeadTrailPair::new(10.0, 10.0).is_none());
        let pair = LeadTrailPair::new(10.0, 15.0).unwrap();
        assert_abs_diff_eq!(pair.tot(), 5.0);
    }

    #[test]
    fn test_pulse_accumulation() {
        let mut pulse = Pulse::new(3, 2);
        assert!(pulse.base_time().is_none());

        assert!(pulse.set_pair(0, LeadTrailPair::new(100.0, 130.0).unwrap()));
        assert!(pulse.set_pair(1, LeadTrailPair::new(105.0, 120.0).unwrap()));
        // Second pair on an occupied level is rejected.
        assert!(!pulse.set_pair(0, LeadTrailPair::new(90.0, 95.0).unwrap()));
        // Out-of-range level is rejected.
        assert!(!pulse.set_pair(2, LeadTrailPair::new(90.0, 95.0).unwrap()));

        assert_eq!(pulse.pair_count(), 2);
        assert!(pulse.is_complete());
        assert_abs_diff_eq!(pulse.base_time().unwrap(), 100.0);
        assert_abs_diff_eq!(pulse.tot(), 45.0);
    }

    #[test]
    fn test_base_time_of_partial_pulse() {
        let mut pulse = Pulse::new(3, 2);
        pulse.set_pair(1, LeadTrailPair::new(200.0, 210.0).unwrap());
        assert!(!pulse.is_complete());
        // Threshold 0 empty, so the representative time falls back to
        // the lowest populated level.
        assert_abs_diff_eq!(pulse.base_time().unwrap(), 200.0);
    }
}
