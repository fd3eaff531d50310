use thiserror::Error;

/// Errors raised by the map pipeline.
///
/// Only startup-time corruption is fatal: a spatial key the grid scheme
/// cannot decode means the whole cell catalog is untrustworthy. Everything
/// encountered per request shrinks the output instead of failing it, and an
/// empty row-set is a valid input everywhere, not an error.
#[derive(Debug, Error)]
pub enum MapError {
    /// The raw 64-bit value is not a valid H3 cell index.
    #[error("invalid H3 cell id: {0:#x}")]
    InvalidCellId(u64),

    /// The hex-string form of a cell id could not be decoded.
    #[error("invalid H3 cell id string: {0:?}")]
    InvalidCellIdHex(String),

    /// The emissions dataset payload could not be parsed.
    #[error("failed to parse emissions dataset: {0}")]
    DatasetParse(#[from] serde_json::Error),
}
