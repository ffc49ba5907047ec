//! Hashable cube fingerprints used to bucket combination candidates.
//!
//! Signatures are pure functions of a cube's metadata and are order-independent: the same
//! logical metadata hashes identically no matter what order coordinates were attached in.
//! Bucketing keeps merge and concatenate from degrading to all-pairs comparison.

use std::sync::Arc;

use crate::coords::CoordDef;
use crate::crs::CoordSystem;
use crate::cube::Cube;
use crate::metadata::{Attributes, CellMethod, NameTriple};
use crate::payload::Dtype;
use crate::units::{Dims, Unit};
use crate::values::ScalarIdentity;

/// Attribute keys excluded from signatures: provenance noise that legitimately differs
/// between fragments of one logical cube.
pub const DEFAULT_IGNORED_ATTRIBUTES: &[&str] = &["history", "Conventions"];

/// The bucket key for merging.
///
/// Scalar coordinates contribute their names only; their values are exactly what merging is
/// allowed to vary. Dimension and auxiliary coordinates contribute definitions, not points:
/// differing points inside one bucket mean genuinely different cubes, checked downstream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MergeSignature {
    names: NameTriple,
    units: Unit,
    cell_methods: Vec<CellMethod>,
    attributes: Attributes,
    dtype: Dtype,
    shape: Vec<usize>,
    dim_defs: Vec<(usize, CoordDef)>,
    aux_defs: Vec<(Vec<usize>, CoordDef)>,
    scalar_names: Vec<String>,
}

pub fn merge_signature(cube: &Cube) -> MergeSignature {
    merge_signature_with(cube, DEFAULT_IGNORED_ATTRIBUTES)
}

pub fn merge_signature_with(cube: &Cube, ignored_attributes: &[&str]) -> MergeSignature {
    let mut dim_defs: Vec<(usize, CoordDef)> = cube
        .dim_coords()
        .iter()
        .enumerate()
        .filter_map(|(axis, slot)| slot.as_ref().map(|dim| (axis, dim.definition())))
        .collect();
    dim_defs.sort_by_key(|(axis, _)| *axis);

    let mut aux_defs: Vec<(Vec<usize>, CoordDef)> = cube
        .non_scalar_aux()
        .map(|entry| (entry.dims.clone(), entry.coord.definition()))
        .collect();
    aux_defs.sort_by(|(a_dims, a_def), (b_dims, b_def)| {
        (a_def.sort_key(), a_dims).cmp(&(b_def.sort_key(), b_dims))
    });

    let mut scalar_names: Vec<String> = cube
        .scalar_coords()
        .map(|coord| coord.name().to_string())
        .collect();
    scalar_names.sort();

    MergeSignature {
        names: cube.metadata.names.clone(),
        units: cube.metadata.units.clone(),
        cell_methods: cube.metadata.cell_methods.clone(),
        attributes: filtered_attributes(&cube.metadata.attributes, ignored_attributes),
        dtype: cube.payload().dtype(),
        shape: cube.shape().to_vec(),
        dim_defs,
        aux_defs,
        scalar_names,
    }
}

/// The definition key of a dimension coordinate for concatenation purposes.
///
/// Units enter as their dimensional class and epoch rather than their exact symbol, so a
/// candidate recorded in "km" lands in the same bucket as one in "m" and conversion can be
/// attempted; an exact-unit key would keep convertible candidates apart forever.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DimKey {
    names: NameTriple,
    dims: Dims,
    epoch: Option<String>,
    known: bool,
    symbol_if_unknown: Option<String>,
    coord_system: Option<Arc<CoordSystem>>,
}

fn dim_key(def: &CoordDef) -> DimKey {
    let known = def.units.def().known;
    DimKey {
        names: def.names.clone(),
        dims: def.units.dims(),
        epoch: def.units.epoch().map(|epoch| epoch.to_string()),
        known,
        // Unknown units convert to nothing, so they only share a bucket with themselves.
        symbol_if_unknown: (!known).then(|| def.units.symbol().to_string()),
        coord_system: def.coord_system.clone(),
    }
}

/// The bucket key for concatenation.
///
/// Scalar coordinates contribute name and value: a scalar that differs is a merge concern,
/// not a concatenate one. Dimension coordinates contribute [`DimKey`]s; points are excluded
/// because the candidate axis is exactly the one whose points differ.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConcatSignature {
    names: NameTriple,
    units: Unit,
    cell_methods: Vec<CellMethod>,
    attributes: Attributes,
    dtype: Dtype,
    ndim: usize,
    dim_keys: Vec<(usize, Option<DimKey>)>,
    aux_defs: Vec<(Vec<usize>, CoordDef)>,
    scalars: Vec<(String, ScalarIdentity)>,
}

pub fn concat_signature(cube: &Cube) -> ConcatSignature {
    concat_signature_with(cube, DEFAULT_IGNORED_ATTRIBUTES)
}

pub fn concat_signature_with(cube: &Cube, ignored_attributes: &[&str]) -> ConcatSignature {
    let dim_keys: Vec<(usize, Option<DimKey>)> = cube
        .dim_coords()
        .iter()
        .enumerate()
        .map(|(axis, slot)| (axis, slot.as_ref().map(|dim| dim_key(&dim.definition()))))
        .collect();

    let mut aux_defs: Vec<(Vec<usize>, CoordDef)> = cube
        .non_scalar_aux()
        .map(|entry| (entry.dims.clone(), entry.coord.definition()))
        .collect();
    aux_defs.sort_by(|(a_dims, a_def), (b_dims, b_def)| {
        (a_def.sort_key(), a_dims).cmp(&(b_def.sort_key(), b_dims))
    });

    let mut scalars: Vec<(String, ScalarIdentity)> = cube
        .scalar_coords()
        .filter_map(|coord| {
            coord
                .scalar_identity()
                .map(|identity| (coord.name().to_string(), identity))
        })
        .collect();
    scalars.sort_by(|(a, _), (b, _)| a.cmp(b));

    ConcatSignature {
        names: cube.metadata.names.clone(),
        units: cube.metadata.units.clone(),
        cell_methods: cube.metadata.cell_methods.clone(),
        attributes: filtered_attributes(&cube.metadata.attributes, ignored_attributes),
        dtype: cube.payload().dtype(),
        ndim: cube.ndim(),
        dim_keys,
        aux_defs,
        scalars,
    }
}

fn filtered_attributes(attributes: &Attributes, ignored: &[&str]) -> Attributes {
    attributes
        .iter()
        .filter(|(key, _)| !ignored.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::metadata::AttrValue;
    use crate::testing::{cube_2x2, dim_coord_f64, CubeRecipe};

    #[test]
    fn test_attachment_order_irrelevant() {
        let a = cube_2x2(CubeRecipe::new().scalars(&[("time", 1.0), ("height", 10.0)]));
        let b = cube_2x2(CubeRecipe::new().scalars(&[("height", 10.0), ("time", 1.0)]));
        assert_eq!(merge_signature(&a), merge_signature(&b));
        assert_eq!(concat_signature(&a), concat_signature(&b));
    }

    #[test]
    fn test_scalar_values_in_concat_but_not_merge() {
        let a = cube_2x2(CubeRecipe::new().scalars(&[("time", 1.0)]));
        let b = cube_2x2(CubeRecipe::new().scalars(&[("time", 2.0)]));
        assert_eq!(merge_signature(&a), merge_signature(&b));
        assert_ne!(concat_signature(&a), concat_signature(&b));
    }

    #[test]
    fn test_scalar_names_in_merge() {
        let a = cube_2x2(CubeRecipe::new().scalars(&[("time", 1.0)]));
        let b = cube_2x2(CubeRecipe::new().scalars(&[("height", 1.0)]));
        assert_ne!(merge_signature(&a), merge_signature(&b));
    }

    #[test]
    fn test_dim_points_excluded() {
        let a = cube_2x2(CubeRecipe::new().lat(&[-45.0, 45.0]));
        let b = cube_2x2(CubeRecipe::new().lat(&[-30.0, 30.0]));
        assert_eq!(merge_signature(&a), merge_signature(&b));
        assert_eq!(concat_signature(&a), concat_signature(&b));
    }

    #[test]
    fn test_ignored_attributes() {
        let mut a = cube_2x2(CubeRecipe::new());
        let mut b = cube_2x2(CubeRecipe::new());
        a.metadata
            .attributes
            .insert("history".to_string(), AttrValue::Str("run A".to_string()));
        b.metadata
            .attributes
            .insert("history".to_string(), AttrValue::Str("run B".to_string()));
        assert_eq!(merge_signature(&a), merge_signature(&b));

        a.metadata
            .attributes
            .insert("source".to_string(), AttrValue::Str("model A".to_string()));
        assert_ne!(merge_signature(&a), merge_signature(&b));
    }

    #[test]
    fn test_concat_units_bucket_by_dimensional_class() {
        let m = dim_coord_f64("height", "m", &[0.0, 10.0]);
        let km = dim_coord_f64("height", "km", &[1.0, 2.0]);
        let a = cube_2x2(CubeRecipe::new().dim(0, m));
        let b = cube_2x2(CubeRecipe::new().dim(0, km));
        assert_eq!(concat_signature(&a), concat_signature(&b));
        assert_ne!(merge_signature(&a), merge_signature(&b));
    }

    #[test]
    fn test_cell_methods_distinguish() {
        let a = cube_2x2(CubeRecipe::new());
        let mut b = cube_2x2(CubeRecipe::new());
        b.metadata
            .cell_methods
            .push(crate::metadata::CellMethod::new("mean", &["time"]));
        assert_ne!(merge_signature(&a), merge_signature(&b));
    }
}
