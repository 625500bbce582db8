//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON content.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A geometry description that does not validate.
    #[error("geometry error: {0}")]
    Geometry(#[from] petrec_core::GeometryError),
}
