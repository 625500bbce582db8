//! Window sources backed by JSON-lines files.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use petrec_core::{SinkError, WindowBatch, WindowSource};

use crate::error::Result;

/// Pull-based window supplier reading one JSON-encoded
/// [`WindowBatch`] per line.
///
/// Blank lines are skipped; a malformed line aborts the run. The
/// source is exhausted at end of file and is not restartable.
pub struct JsonlWindowSource<R> {
    reader: BufReader<R>,
    line: String,
}

impl JsonlWindowSource<File> {
    /// Opens a window file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> JsonlWindowSource<R> {
    /// Wraps any reader producing JSON lines.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: String::new(),
        }
    }
}

impl<R: Read> WindowSource for JsonlWindowSource<R> {
    fn next_window(&mut self) -> std::result::Result<Option<WindowBatch>, SinkError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let row = self.line.trim();
            if row.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(row)?));
        }
    }
}
