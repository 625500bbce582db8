//! Aggregate signals: the merged response of one mounting group.

use crate::geometry::GroupId;
use crate::pulse::Pulse;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The combined signal of up to `slots` sensors of one mounting group
/// within a time window.
///
/// Constituent pulses are keyed by mounting position; each position is
/// filled at most once. An aggregate always holds at least one
/// constituent once closed by the merging stage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregateSignal {
    /// Owning mounting group.
    pub group: GroupId,
    /// Representative time [ps]: mean of constituent base times, minus
    /// the group's calibration offset.
    pub time: f64,
    slots: Vec<Option<Pulse>>,
}

impl AggregateSignal {
    /// Creates an empty aggregate for a group with `slots` mounting
    /// positions. The time is assigned when the aggregate is closed.
    #[must_use]
    pub fn new(group: GroupId, slots: u8) -> Self {
        Self {
            group,
            time: 0.0,
            slots: vec![None; slots as usize],
        }
    }

    /// Tries to place a pulse at a mounting position. Fails when the
    /// position is already occupied or out of range, leaving the
    /// aggregate untouched.
    pub fn try_insert(&mut self, position: u8, pulse: Pulse) -> bool {
        match self.slots.get_mut(position as usize) {
            Some(slot @ None) => {
                *slot = Some(pulse);
                true
            }
            _ => false,
        }
    }

    /// Iterates constituent pulses with their mounting positions.
    pub fn constituents(&self) -> impl Iterator<Item = (u8, &Pulse)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| slot.as_ref().map(|p| (pos as u8, p)))
    }

    /// Number of constituent pulses.
    #[must_use]
    pub fn multiplicity(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// True when no constituent has been inserted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.multiplicity() == 0
    }

    /// Total time over threshold, summed over constituent pulses [ps].
    #[must_use]
    pub fn tot(&self) -> f64 {
        self.slots.iter().flatten().map(Pulse::tot).sum()
    }

    /// Mean of the constituent pulses' representative times [ps].
    /// `None` when the aggregate is empty.
    #[must_use]
    pub fn mean_base_time(&self) -> Option<f64> {
        let times: Vec<f64> = self
            .slots
            .iter()
            .flatten()
            .filter_map(Pulse::base_time)
            .collect();
        if times.is_empty() {
            return None;
        }
        Some(times.iter().sum::<f64>() / times.len() as f64)
    }
}
