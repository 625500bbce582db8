//! Loading per-group time offsets from a JSON key/value file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use petrec_core::{CalibrationTable, GroupId};

use crate::error::Result;

/// Reads a calibration table from a JSON object mapping group id to
/// time offset [ps].
///
/// Groups absent from the file keep an offset of zero.
pub fn load_calibration<P: AsRef<Path>>(path: P) -> Result<CalibrationTable> {
    let file = File::open(path)?;
    from_reader(BufReader::new(file))
}

/// Reads a calibration table from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<CalibrationTable> {
    let offsets: HashMap<GroupId, f64> = serde_json::from_reader(reader)?;
    Ok(CalibrationTable::from_offsets(offsets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_calibration() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"1": 2.5, "7": -10.0}"#).unwrap();

        let table = load_calibration(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert!((table.offset(1) - 2.5).abs() < f64::EPSILON);
        assert!((table.offset(7) + 10.0).abs() < f64::EPSILON);
        // Unlisted groups default to zero.
        assert!(table.offset(3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_object_gives_empty_table() {
        let table = from_reader("{}".as_bytes()).unwrap();
        assert!(table.is_empty());
    }
}
