mod combine;
mod concat;
mod coords;
mod crs;
mod cube;
mod errors;
mod merge;
mod metadata;
mod payload;
mod signature;
mod units;
mod values;

#[cfg(test)]
mod testing;

pub use combine::{combine, CombineOptions, CombineStep};
pub use concat::{concatenate, concatenate_with, concatenate_with_conflicts, ConcatOptions};
pub use coords::{CoordDef, CoordMeta, Coordinate, DimCoord};
pub use crs::{CoordSystem, CrsRegistry, GeogCS, LambertConformal, RotatedGeogCS};
pub use cube::{AuxEntry, Cube};
pub use errors::{Conflict, ConflictReason, Error, Result};
pub use merge::{merge, merge_with_conflicts};
pub use metadata::{AttrValue, Attributes, CellMethod, CubeMetadata, NameTriple};
pub use payload::{Dtype, Payload};
pub use signature::{
    concat_signature, concat_signature_with, merge_signature, merge_signature_with,
    ConcatSignature, MergeSignature, DEFAULT_IGNORED_ATTRIBUTES,
};
pub use units::{Dims, Unit, UnitDef, UnitRegistry};
pub use values::{Bounds, CoordValues, Direction, ScalarIdentity, ScalarValue};
