//! petrec-io: Geometry, calibration and window I/O for petrec.
//!
//! This crate loads the sensor map and calibration offsets from JSON
//! descriptions and provides JSON-lines implementations of the window
//! source and output sink contracts.

mod error;

pub mod calibration;
pub mod geometry;
pub mod sink;
pub mod source;

pub use calibration::load_calibration;
pub use error::{Error, Result};
pub use geometry::{load_sensor_map, GeometryFile};
pub use sink::{CollectSink, JsonlSink};
pub use source::JsonlWindowSource;
