//! Per-group calibration time offsets.

use std::collections::HashMap;

use crate::geometry::GroupId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Read-only table of per-group time offsets [ps].
///
/// Loaded once before a run from an external constants file and never
/// mutated by the core. A group absent from the table has offset 0.0.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationTable {
    offsets: HashMap<GroupId, f64>,
}

impl CalibrationTable {
    /// Creates an empty table: every offset is 0.0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from explicit entries.
    #[must_use]
    pub fn from_offsets(offsets: HashMap<GroupId, f64>) -> Self {
        Self { offsets }
    }

    /// The offset for a group, 0.0 when absent.
    #[inline]
    #[must_use]
    pub fn offset(&self, group: GroupId) -> f64 {
        self.offsets.get(&group).copied().unwrap_or(0.0)
    }

    /// Number of explicit entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// True when no explicit entry is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_missing_group_defaults_to_zero() {
        let table = CalibrationTable::from_offsets(HashMap::from([(3, 125.0)]));
        assert_abs_diff_eq!(table.offset(3), 125.0);
        assert_abs_diff_eq!(table.offset(4), 0.0);
        assert_eq!(table.len(), 1);
    }
}
