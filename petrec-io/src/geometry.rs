//! Loading the sensor map from a JSON geometry description.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use petrec_core::{DetectorElement, MountingGroup, Sensor, SensorMap};

use crate::error::Result;

/// On-disk layout of a detector description.
///
/// Record order in the file does not matter; all cross references are
/// validated when the map is built.
#[derive(Debug, Deserialize)]
pub struct GeometryFile {
    /// Detector elements.
    pub elements: Vec<DetectorElement>,
    /// Mounting groups.
    pub groups: Vec<MountingGroup>,
    /// Sensors with their channel assignments.
    pub sensors: Vec<Sensor>,
}

impl GeometryFile {
    /// Builds the validated sensor map from the loaded records.
    pub fn into_map(self) -> Result<SensorMap> {
        let mut builder = SensorMap::builder();
        for element in self.elements {
            builder = builder.element(element);
        }
        for group in self.groups {
            builder = builder.group(group);
        }
        for sensor in self.sensors {
            builder = builder.sensor(sensor);
        }
        Ok(builder.build()?)
    }
}

/// Reads and validates a geometry description.
pub fn load_sensor_map<P: AsRef<Path>>(path: P) -> Result<SensorMap> {
    let file = File::open(path)?;
    from_reader(BufReader::new(file))
}

/// Reads and validates a geometry description from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SensorMap> {
    let description: GeometryFile = serde_json::from_reader(reader)?;
    description.into_map()
}
