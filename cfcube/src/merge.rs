//! The merge engine.
//!
//! Merging combines cubes that differ only in their scalar coordinate values into one cube
//! with new leading dimensions, one per varying scalar coordinate. Candidates are bucketed
//! by signature, refined into groups whose non-scalar structure is exactly equal, and each
//! group either merges completely or is returned untouched with a reported conflict.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::coords::{Coordinate, DimCoord};
use crate::cube::{AuxEntry, Cube};
use crate::errors::{Conflict, ConflictReason, Result};
use crate::payload::Payload;
use crate::signature::{merge_signature, MergeSignature};
use crate::values::{Bounds, CoordValues, ScalarIdentity};

/// Merge a batch of cubes, reporting soft failures only through the log.
pub fn merge(cubes: Vec<Cube>) -> Result<Vec<Cube>> {
    let (cubes, _conflicts) = merge_with_conflicts(cubes)?;

    Ok(cubes)
}

/// Merge a batch of cubes, returning the conflicts alongside the results.
///
/// Every input cube comes back exactly once: merged into a combined cube where possible,
/// unchanged where its group could not be resolved.
pub fn merge_with_conflicts(cubes: Vec<Cube>) -> Result<(Vec<Cube>, Vec<Conflict>)> {
    let mut order: Vec<MergeSignature> = Vec::new();
    let mut buckets: HashMap<MergeSignature, Vec<Cube>> = HashMap::new();
    for cube in cubes {
        let signature = merge_signature(&cube);
        if !buckets.contains_key(&signature) {
            order.push(signature.clone());
        }
        buckets.entry(signature).or_default().push(cube);
    }

    let mut merged = Vec::new();
    let mut conflicts = Vec::new();
    for signature in &order {
        let members = buckets.remove(signature).unwrap();
        for group in partition_groups(members) {
            merged.extend(merge_group(group, &mut conflicts)?);
        }
    }

    for conflict in &conflicts {
        warn!(reason = ?conflict.reason, "{}", conflict.detail);
    }

    Ok((merged, conflicts))
}

/// Split a bucket into groups whose non-scalar structure is exactly equal.
///
/// Cubes in one signature bucket whose dimension or auxiliary coordinates differ in points
/// are genuinely different cubes, not promotable variations, and must not merge.
fn partition_groups(members: Vec<Cube>) -> Vec<Vec<Cube>> {
    let mut groups: Vec<Vec<Cube>> = Vec::new();
    for cube in members {
        match groups.iter_mut().find(|group| same_frame(&group[0], &cube)) {
            Some(group) => group.push(cube),
            None => groups.push(vec![cube]),
        }
    }

    groups
}

fn same_frame(a: &Cube, b: &Cube) -> bool {
    if a.shape() != b.shape() || a.dim_coords() != b.dim_coords() {
        return false;
    }
    let a_aux: Vec<&AuxEntry> = a.non_scalar_aux().collect();
    let b_aux: Vec<&AuxEntry> = b.non_scalar_aux().collect();

    a_aux == b_aux
}

struct MergeAxis {
    name: String,
    distinct: Vec<ScalarIdentity>,
}

/// A varying scalar coordinate promoted to cover one new dimension.
struct Promoted {
    coord: Coordinate,
    dim: Option<DimCoord>,
}

fn merge_group(group: Vec<Cube>, conflicts: &mut Vec<Conflict>) -> Result<Vec<Cube>> {
    if group.len() == 1 {
        return Ok(group);
    }
    let group_name = group[0].name().to_string();

    let tables = match scalar_tables(&group) {
        Ok(tables) => tables,
        Err(conflict) => {
            conflicts.push(conflict);
            return Ok(group);
        }
    };

    // The signature already buckets on scalar names; a presence mismatch here means the
    // whole group is unresolvable.
    for table in &tables[1..] {
        if !table.keys().eq(tables[0].keys()) {
            conflicts.push(Conflict::new(
                ConflictReason::BucketUnresolved,
                format!(
                    "'{group_name}': scalar coordinates present in some members but not others"
                ),
            ));
            return Ok(group);
        }
    }

    let varying: Vec<String> = tables[0]
        .keys()
        .filter(|name| tables[1..].iter().any(|table| table[*name] != tables[0][*name]))
        .cloned()
        .collect();

    if varying.is_empty() {
        conflicts.push(Conflict::new(
            ConflictReason::BucketUnresolved,
            format!(
                "'{group_name}': {} members with identical scalar coordinate values",
                group.len()
            ),
        ));
        return Ok(group);
    }

    // One axis per varying coordinate, distinct values ascending, canonically ordered:
    // more distinct values first, then name.
    let mut axes: Vec<MergeAxis> = Vec::with_capacity(varying.len());
    for name in &varying {
        let mut distinct = Vec::new();
        let mut seen = HashSet::new();
        for table in &tables {
            let identity = table[name].clone();
            if seen.insert(identity.clone()) {
                distinct.push(identity);
            }
        }
        distinct.sort();
        axes.push(MergeAxis {
            name: name.clone(),
            distinct,
        });
    }
    axes.sort_by(|a, b| {
        b.distinct
            .len()
            .cmp(&a.distinct.len())
            .then_with(|| a.name.cmp(&b.name))
    });

    let grid: Vec<usize> = axes.iter().map(|axis| axis.distinct.len()).collect();
    let cells: usize = grid.iter().product();
    if cells != group.len() {
        let names: Vec<&str> = axes.iter().map(|axis| axis.name.as_str()).collect();
        conflicts.push(Conflict::new(
            ConflictReason::BucketUnresolved,
            format!(
                "'{group_name}': {} members cannot fill a complete {grid:?} grid over {names:?} \
                 (duplicate or missing scalar coordinate values)",
                group.len()
            ),
        ));
        return Ok(group);
    }

    let mut strides = vec![1usize; axes.len()];
    for i in (0..axes.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * grid[i + 1];
    }

    // Place each member in the grid's row-major order; a collision is a duplicate value
    // combination and with `cells == len` uniqueness also implies completeness.
    let mut ranked: Vec<(usize, usize)> = Vec::with_capacity(group.len());
    let mut seen_ranks = HashSet::new();
    for (index, table) in tables.iter().enumerate() {
        let mut rank = 0;
        for (axis, stride) in axes.iter().zip(&strides) {
            let position = axis
                .distinct
                .iter()
                .position(|value| *value == table[&axis.name])
                .unwrap();
            rank += position * stride;
        }
        if !seen_ranks.insert(rank) {
            let names: Vec<&str> = axes.iter().map(|axis| axis.name.as_str()).collect();
            conflicts.push(Conflict::new(
                ConflictReason::BucketUnresolved,
                format!("'{group_name}': duplicate scalar coordinate combination over {names:?}"),
            ));
            return Ok(group);
        }
        ranked.push((rank, index));
    }
    ranked.sort();

    let template = &group[ranked[0].1];
    let promoted = match promote_axes(&axes, template) {
        Ok(promoted) => promoted,
        Err(conflict) => {
            conflicts.push(conflict);
            return Ok(group);
        }
    };

    // Payload handles are cheap clones of shared buffers; nothing is copied until the
    // stack below.
    let payloads: Vec<Payload> = ranked
        .iter()
        .map(|(_, index)| group[*index].payload().clone())
        .collect();
    let stacked = Payload::stack_new_axis(&payloads)?;
    let mut new_shape = grid.clone();
    new_shape.extend_from_slice(template.shape());
    let payload = stacked.reshape(new_shape)?;

    let leading = axes.len();
    let mut dim_coords: Vec<(usize, DimCoord)> = Vec::new();
    let mut aux_coords: Vec<(Coordinate, Vec<usize>)> = Vec::new();
    for (axis_index, promotion) in promoted.into_iter().enumerate() {
        match promotion.dim {
            Some(dim) => dim_coords.push((axis_index, dim)),
            None => {
                warn!(
                    coordinate = promotion.coord.name(),
                    "promoted coordinate is not monotonic; attaching as auxiliary"
                );
                aux_coords.push((promotion.coord, vec![axis_index]));
            }
        }
    }

    for (axis, slot) in template.dim_coords().iter().enumerate() {
        if let Some(dim) = slot {
            dim_coords.push((leading + axis, dim.clone()));
        }
    }
    for entry in template.aux_coords() {
        if entry.dims.is_empty() {
            // Promoted scalars are superseded; the rest pass through.
            if varying.iter().any(|name| name == entry.coord.name()) {
                continue;
            }
            aux_coords.push((entry.coord.clone(), vec![]));
        } else {
            let dims = entry.dims.iter().map(|dim| dim + leading).collect();
            aux_coords.push((entry.coord.clone(), dims));
        }
    }

    let cube = Cube::new(template.metadata.clone(), payload, dim_coords, aux_coords)?;

    Ok(vec![cube])
}

/// Collect each member's scalar coordinates, keyed by name.
fn scalar_tables(
    group: &[Cube],
) -> std::result::Result<Vec<BTreeMap<String, ScalarIdentity>>, Conflict> {
    let mut tables = Vec::with_capacity(group.len());
    for cube in group {
        let mut table = BTreeMap::new();
        for coord in cube.scalar_coords() {
            let identity = coord.scalar_identity().unwrap();
            if table.insert(coord.name().to_string(), identity).is_some() {
                return Err(Conflict::new(
                    ConflictReason::MetadataConflict,
                    format!(
                        "'{}': two scalar coordinates named '{}'",
                        cube.name(),
                        coord.name()
                    ),
                ));
            }
        }
        tables.push(table);
    }

    Ok(tables)
}

/// Build the new coordinate for each axis from its distinct values, in the dimension role
/// where the points allow it.
fn promote_axes(
    axes: &[MergeAxis],
    template: &Cube,
) -> std::result::Result<Vec<Promoted>, Conflict> {
    let mut promoted = Vec::with_capacity(axes.len());
    for axis in axes {
        let template_coord = template.coord(&axis.name).unwrap();

        let points: Vec<_> = axis.distinct.iter().map(|value| value.point).collect();
        let points = CoordValues::from_scalars(&points).map_err(|err| {
            Conflict::new(
                ConflictReason::MetadataConflict,
                format!("cannot promote '{}': {err}", axis.name),
            )
        })?;

        // Bounds survive promotion only when every member supplied them.
        let bounds = if axis.distinct.iter().all(|value| value.bounds.is_some()) {
            let rows: Vec<_> = axis
                .distinct
                .iter()
                .map(|value| value.bounds.clone().unwrap())
                .collect();
            Some(Bounds::from_rows(&rows).map_err(|err| {
                Conflict::new(
                    ConflictReason::MetadataConflict,
                    format!("cannot promote bounds of '{}': {err}", axis.name),
                )
            })?)
        } else {
            None
        };

        let coord = Coordinate::new(template_coord.meta.clone(), points, bounds).map_err(
            |err| {
                Conflict::new(
                    ConflictReason::MetadataConflict,
                    format!("cannot promote '{}': {err}", axis.name),
                )
            },
        )?;
        let dim = DimCoord::new(coord.clone()).ok();
        promoted.push(Promoted { coord, dim });
    }

    Ok(promoted)
}
