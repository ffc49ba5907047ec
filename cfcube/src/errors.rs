use std::result;

use thiserror::Error;

/// Hard failures.
///
/// Everything here indicates either invalid input handed to a constructor or an internal
/// inconsistency that the grouping logic should have made impossible. Soft, per-bucket
/// combination failures are not errors; they are reported as [`Conflict`] values alongside
/// the untouched input cubes.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation that should have guaranteed consistency produced a cube whose payload
    /// shape disagrees with its declared coordinates. Internal bug class.
    #[error("structural invariant violated: {detail}")]
    Invariant { detail: String },

    #[error("coordinate '{coord}' is not strictly monotonic")]
    NotMonotonic { coord: String },

    #[error("shape mismatch: {detail}")]
    ShapeMismatch { detail: String },

    #[error("dtype mismatch: {detail}")]
    DtypeMismatch { detail: String },

    #[error("units '{from}' cannot be converted to '{to}'")]
    IncompatibleUnits { from: String, to: String },

    #[error("at least one of standard name, long name, or var name is required")]
    EmptyName,

    #[error("bad ellipsoid: {detail}")]
    Ellipsoid { detail: String },

    #[error("bad bounds: {detail}")]
    BadBounds { detail: String },

    #[error("empty input: {what}")]
    EmptyInput { what: String },
}

pub type Result<T> = result::Result<T, Error>;

/// Why a group of candidate cubes was left uncombined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictReason {
    /// Missing grid combinations, duplicate scalar values, or overlapping ranges.
    BucketUnresolved,

    /// Coordinate systems or other metadata differ in a way that prevents combination.
    MetadataConflict,

    /// Candidate coordinates share a name but have inconvertible units.
    IncompatibleUnits,
}

/// A soft combination failure.
///
/// The affected cubes are returned to the caller unchanged; the batch as a whole proceeds.
#[derive(Clone, Debug)]
pub struct Conflict {
    pub reason: ConflictReason,
    pub detail: String,
}

impl Conflict {
    pub fn new(reason: ConflictReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}
