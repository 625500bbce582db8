//! The sensor map: channel → sensor → mounting group → detector
//! element → layer.
//!
//! The map is built once from an external geometry description,
//! validated, and shared read-only across all windows and workers.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::GeometryError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Electronics channel identifier.
pub type ChannelId = u32;
/// Physical sensor identifier.
pub type SensorId = u32;
/// Mounting group identifier.
pub type GroupId = u32;
/// Detector element identifier.
pub type ElementId = u32;
/// Layer identifier.
pub type LayerId = u32;

/// Which part of a detector element a mounting group reads out.
///
/// A closed enumeration; side discrimination never relies on string
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GroupKind {
    /// First side of a detector element.
    SideA,
    /// Opposite side of a detector element.
    SideB,
    /// Auxiliary wavelength-shifting layer.
    Auxiliary,
}

/// One physical sensor and its place in the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sensor {
    /// Sensor identifier.
    pub id: SensorId,
    /// Electronics channel reading this sensor out.
    pub channel: ChannelId,
    /// Mounting group the sensor belongs to.
    pub group: GroupId,
    /// Mounting position within the group (0-based).
    pub position: u8,
    /// Axial coordinate of the sensor [cm]; used as the weighting
    /// position for auxiliary-layer signals.
    pub z: f64,
}

/// A fixed set of sensors coupled to one side of a detector element or
/// to an auxiliary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MountingGroup {
    /// Group identifier.
    pub id: GroupId,
    /// Side or auxiliary-layer role.
    pub kind: GroupKind,
    /// Detector element the group is coupled to.
    pub element: ElementId,
    /// Number of mounting positions.
    pub slots: u8,
}

/// The physical sensing unit whose opposite sides are matched into
/// hits.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorElement {
    /// Element identifier.
    pub id: ElementId,
    /// Layer the element sits in.
    pub layer: LayerId,
    /// Centre position [cm].
    pub center_x: f64,
    /// Centre position [cm].
    pub center_y: f64,
    /// Centre position [cm].
    pub center_z: f64,
}

/// The mounting groups attached to one element, by role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementGroups {
    /// Side A group, if any.
    pub side_a: Option<GroupId>,
    /// Side B group, if any.
    pub side_b: Option<GroupId>,
    /// Auxiliary-layer group, if any.
    pub auxiliary: Option<GroupId>,
}

impl ElementGroups {
    /// True when the element has no A/B pairing, only an auxiliary
    /// group.
    #[must_use]
    pub fn is_auxiliary_only(&self) -> bool {
        self.side_a.is_none() && self.side_b.is_none() && self.auxiliary.is_some()
    }
}

/// Read-only geometry lookups for the whole reconstruction chain.
///
/// Built through [`SensorMapBuilder`]; a missing id on lookup means a
/// corrupted configuration and is surfaced as a hard
/// [`GeometryError`].
#[derive(Debug, Clone)]
pub struct SensorMap {
    channels: HashMap<ChannelId, SensorId>,
    sensors: HashMap<SensorId, Sensor>,
    groups: BTreeMap<GroupId, MountingGroup>,
    elements: BTreeMap<ElementId, DetectorElement>,
    element_groups: HashMap<ElementId, ElementGroups>,
    sensor_counts: HashMap<GroupId, u8>,
    layers: HashSet<LayerId>,
}

impl SensorMap {
    /// Starts building a sensor map.
    #[must_use]
    pub fn builder() -> SensorMapBuilder {
        SensorMapBuilder::default()
    }

    /// Resolves a channel to its sensor.
    pub fn sensor_for_channel(&self, channel: ChannelId) -> Result<&Sensor, GeometryError> {
        let id = self
            .channels
            .get(&channel)
            .ok_or(GeometryError::UnknownChannel(channel))?;
        self.sensors
            .get(id)
            .ok_or(GeometryError::UnknownSensor(*id))
    }

    /// Looks up a mounting group.
    pub fn group(&self, id: GroupId) -> Result<&MountingGroup, GeometryError> {
        self.groups.get(&id).ok_or(GeometryError::UnknownGroup(id))
    }

    /// Looks up a detector element.
    pub fn element(&self, id: ElementId) -> Result<&DetectorElement, GeometryError> {
        self.elements
            .get(&id)
            .ok_or(GeometryError::UnknownElement(id))
    }

    /// The groups attached to an element, by role.
    pub fn groups_of_element(&self, id: ElementId) -> Result<ElementGroups, GeometryError> {
        self.element_groups
            .get(&id)
            .copied()
            .ok_or(GeometryError::UnknownElement(id))
    }

    /// Number of sensors actually registered in a group (may be fewer
    /// than its slots).
    #[must_use]
    pub fn sensor_count(&self, group: GroupId) -> usize {
        self.sensor_counts.get(&group).copied().unwrap_or(0) as usize
    }

    /// True if any element sits in the layer.
    #[must_use]
    pub fn has_layer(&self, layer: LayerId) -> bool {
        self.layers.contains(&layer)
    }

    /// True if the channel is known to the map.
    #[must_use]
    pub fn knows_channel(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel)
    }

    /// Elements in ascending id order.
    pub fn elements(&self) -> impl Iterator<Item = &DetectorElement> {
        self.elements.values()
    }

    /// Mounting groups in ascending id order.
    pub fn mounting_groups(&self) -> impl Iterator<Item = &MountingGroup> {
        self.groups.values()
    }
}

/// Builder validating all cross references before producing a
/// [`SensorMap`].
#[derive(Debug, Default)]
pub struct SensorMapBuilder {
    sensors: Vec<Sensor>,
    groups: Vec<MountingGroup>,
    elements: Vec<DetectorElement>,
}

impl SensorMapBuilder {
    /// Registers a detector element.
    #[must_use]
    pub fn element(mut self, element: DetectorElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Registers a mounting group.
    #[must_use]
    pub fn group(mut self, group: MountingGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Registers a sensor.
    #[must_use]
    pub fn sensor(mut self, sensor: Sensor) -> Self {
        self.sensors.push(sensor);
        self
    }

    /// Validates the registered records and builds the map.
    pub fn build(self) -> Result<SensorMap, GeometryError> {
        let mut elements = BTreeMap::new();
        let mut layers = HashSet::new();
        for element in self.elements {
            layers.insert(element.layer);
            elements.insert(element.id, element);
        }

        let mut groups = BTreeMap::new();
        let mut element_groups: HashMap<ElementId, ElementGroups> = HashMap::new();
        for group in self.groups {
            if !elements.contains_key(&group.element) {
                return Err(GeometryError::DanglingReference {
                    kind: "element",
                    id: group.element,
                    referrer: "mounting group",
                });
            }
            let entry = element_groups.entry(group.element).or_default();
            let slot = match group.kind {
                GroupKind::SideA => &mut entry.side_a,
                GroupKind::SideB => &mut entry.side_b,
                GroupKind::Auxiliary => &mut entry.auxiliary,
            };
            if slot.is_some() {
                return Err(GeometryError::DuplicateRole {
                    element: group.element,
                    kind: group.kind,
                });
            }
            *slot = Some(group.id);
            groups.insert(group.id, group);
        }
        // Elements with no groups at all still get an (empty) entry so
        // lookups succeed.
        for id in elements.keys() {
            element_groups.entry(*id).or_default();
        }

        let mut channels = HashMap::new();
        let mut sensors = HashMap::new();
        let mut sensor_counts: HashMap<GroupId, u8> = HashMap::new();
        let mut occupied: HashSet<(GroupId, u8)> = HashSet::new();
        for sensor in self.sensors {
            let Some(group) = groups.get(&sensor.group) else {
                return Err(GeometryError::DanglingReference {
                    kind: "mounting group",
                    id: sensor.group,
                    referrer: "sensor",
                });
            };
            if sensor.position >= group.slots {
                return Err(GeometryError::PositionOutOfRange {
                    group: group.id,
                    position: sensor.position,
                    slots: group.slots,
                });
            }
            if !occupied.insert((sensor.group, sensor.position)) {
                return Err(GeometryError::DuplicatePosition {
                    group: sensor.group,
                    position: sensor.position,
                });
            }
            if channels.insert(sensor.channel, sensor.id).is_some() {
                return Err(GeometryError::DuplicateChannel(sensor.channel));
            }
            *sensor_counts.entry(sensor.group).or_default() += 1;
            sensors.insert(sensor.id, sensor);
        }

        Ok(SensorMap {
            channels,
            sensors,
            groups,
            elements,
            element_groups,
            sensor_counts,
            layers,
        })
    }
}
