//! Physical events: sets of time-coincident hits.

use crate::hit::{Hit, RecoFlag};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Category assigned from the layer-adjacency pattern of the matched
/// hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventCategory {
    /// Two hits consistent with a back-to-back coincidence.
    BackToBack,
    /// Hits consistent with a scattered coincidence.
    Scatter,
    /// Pattern matched an adjacency rule with no category attached.
    #[default]
    Unclassified,
}

/// A set of hits judged to originate from the same physical process.
///
/// Every hit satisfies the configured coincidence window against at
/// least one other hit of the event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Coincident hits, at least two.
    pub hits: Vec<Hit>,
    /// Layer-adjacency classification.
    pub category: EventCategory,
    /// Quality flag: corrupted if any constituent hit is.
    pub flag: RecoFlag,
}

impl Event {
    /// Creates a binary event from a coincident hit pair.
    #[must_use]
    pub fn from_pair(first: Hit, second: Hit, category: EventCategory) -> Self {
        let flag = if first.flag == RecoFlag::Corrupted || second.flag == RecoFlag::Corrupted {
            RecoFlag::Corrupted
        } else {
            RecoFlag::Good
        };
        Self {
            hits: vec![first, second],
            category,
            flag,
        }
    }

    /// Number of hits in the event.
    #[must_use]
    pub fn multiplicity(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::POSITION_UNKNOWN;

    fn hit(flag: RecoFlag) -> Hit {
        Hit {
            element: 1,
            time: 0.0,
            time_diff: 0.0,
            energy: 0.0,
            multiplicity: 2.0,
            x: 0.0,
            y: 0.0,
            z: POSITION_UNKNOWN,
            flag,
            signal_a: None,
            signal_b: None,
            signal_aux: None,
        }
    }

    #[test]
    fn test_event_flag_propagates_corruption() {
        let good = Event::from_pair(hit(RecoFlag::Good), hit(RecoFlag::Good), EventCategory::BackToBack);
        assert_eq!(good.flag, RecoFlag::Good);
        assert_eq!(good.multiplicity(), 2);

        let bad = Event::from_pair(hit(RecoFlag::Good), hit(RecoFlag::Corrupted), EventCategory::Scatter);
        assert_eq!(bad.flag, RecoFlag::Corrupted);
    }
}
