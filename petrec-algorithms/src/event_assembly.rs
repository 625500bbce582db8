//! Stage 4: clustering coincident hits into events.

use petrec_core::diagnostics::{sample, Diagnostics};
use petrec_core::{Event, EventCategory, GeometryError, Hit, LayerId, RecoFlag, SensorMap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An allowed layer pairing and the category it implies.
///
/// The pair is unordered: `(1, 2)` matches hits on layers 2 and 1 as
/// well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdjacencyPair {
    /// Layer identifiers of the two hits.
    pub layers: (LayerId, LayerId),
    /// Category assigned to events matching this pairing.
    pub category: EventCategory,
}

impl AdjacencyPair {
    /// True when the unordered layer pair matches this rule.
    #[must_use]
    pub fn matches(&self, a: LayerId, b: LayerId) -> bool {
        (self.layers.0 == a && self.layers.1 == b) || (self.layers.0 == b && self.layers.1 == a)
    }
}

/// Configuration for event assembly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventAssemblyConfig {
    /// Maximum accepted time gap between two coincident hits [ps].
    pub event_window: f64,
    /// Events with fewer hits are discarded.
    pub min_multiplicity: usize,
    /// Let corrupted hits participate in coincidences.
    pub use_corrupted_hits: bool,
    /// Layer pairings that may form an event.
    pub adjacency: Vec<AdjacencyPair>,
}

impl Default for EventAssemblyConfig {
    fn default() -> Self {
        Self {
            event_window: 5_000.0,
            min_multiplicity: 2,
            use_corrupted_hits: false,
            adjacency: vec![
                AdjacencyPair {
                    layers: (1, 2),
                    category: EventCategory::BackToBack,
                },
                AdjacencyPair {
                    layers: (1, 4),
                    category: EventCategory::BackToBack,
                },
            ],
        }
    }
}

/// Clusters the window's time-ordered hits into binary events.
///
/// Each hit joins at most one event. A hit with no partner inside the
/// coincidence window never becomes a singleton event; the gap to its
/// nearest following hit is recorded instead.
pub fn assemble_events(
    hits: &[Hit],
    map: &SensorMap,
    config: &EventAssemblyConfig,
    diagnostics: &dyn Diagnostics,
) -> Result<Vec<Event>, GeometryError> {
    let layers: Vec<LayerId> = hits
        .iter()
        .map(|hit| map.element(hit.element).map(|element| element.layer))
        .collect::<Result<_, _>>()?;

    let mut events = Vec::new();
    let mut consumed = vec![false; hits.len()];

    for i in 0..hits.len() {
        if consumed[i] {
            continue;
        }
        let seed = &hits[i];
        if seed.flag == RecoFlag::Corrupted && !config.use_corrupted_hits {
            consumed[i] = true;
            continue;
        }
        let mut matched = false;

        for j in i + 1..hits.len() {
            if consumed[j] {
                continue;
            }
            let candidate = &hits[j];
            let gap = (candidate.time - seed.time).abs();
            if gap >= config.event_window {
                // Hits are time-sorted; the seed stays unpaired.
                diagnostics.record(sample::REJECTED_EVENT_GAP, gap);
                break;
            }
            if candidate.flag == RecoFlag::Corrupted && !config.use_corrupted_hits {
                continue;
            }
            let Some(rule) = config
                .adjacency
                .iter()
                .find(|rule| rule.matches(layers[i], layers[j]))
            else {
                continue;
            };

            let event = Event::from_pair(seed.clone(), candidate.clone(), rule.category);
            consumed[i] = true;
            consumed[j] = true;
            matched = true;
            if event.multiplicity() < config.min_multiplicity {
                diagnostics.count(sample::EVENTS_BELOW_MULTIPLICITY);
            } else {
                events.push(event);
            }
            break;
        }

        if !matched {
            consumed[i] = true;
        }
    }

    diagnostics.record(sample::EVENTS_PER_WINDOW, events.len() as f64);
    Ok(events)
}
