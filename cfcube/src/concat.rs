//! The concatenate engine.
//!
//! Concatenation joins cubes end-to-end along an existing dimension coordinate: the one
//! axis whose coordinate definition matches across members while its point ranges differ.
//! Everything off the candidate axis must match exactly. Like merging, each group either
//! joins completely or is returned untouched with a reported conflict.

use std::collections::HashMap;

use tracing::warn;

use crate::coords::{Coordinate, DimCoord};
use crate::cube::{AuxEntry, Cube};
use crate::errors::{Conflict, ConflictReason, Result};
use crate::payload::Payload;
use crate::signature::{concat_signature, ConcatSignature};
use crate::values::Direction;

/// Options controlling the contiguity checks of a concatenation.
#[derive(Clone, Copy, Debug)]
pub struct ConcatOptions {
    /// Tolerance for floating rounding in bounds comparisons at the seams between members.
    pub epsilon: f64,

    /// Require the upper bound of each member to meet the lower bound of the next; a wider
    /// gap fails the join instead of producing a cube with holes between cells.
    pub require_contiguous_bounds: bool,
}

impl Default for ConcatOptions {
    fn default() -> Self {
        Self {
            epsilon: 1e-8,
            require_contiguous_bounds: false,
        }
    }
}

/// Concatenate a batch of cubes with default options, reporting soft failures only through
/// the log.
pub fn concatenate(cubes: Vec<Cube>) -> Result<Vec<Cube>> {
    let (cubes, _conflicts) = concatenate_with(cubes, &ConcatOptions::default())?;

    Ok(cubes)
}

pub fn concatenate_with_conflicts(cubes: Vec<Cube>) -> Result<(Vec<Cube>, Vec<Conflict>)> {
    concatenate_with(cubes, &ConcatOptions::default())
}

/// Concatenate a batch of cubes, returning the conflicts alongside the results.
pub fn concatenate_with(
    cubes: Vec<Cube>,
    options: &ConcatOptions,
) -> Result<(Vec<Cube>, Vec<Conflict>)> {
    let mut order: Vec<ConcatSignature> = Vec::new();
    let mut buckets: HashMap<ConcatSignature, Vec<Cube>> = HashMap::new();
    for cube in cubes {
        let signature = concat_signature(&cube);
        if !buckets.contains_key(&signature) {
            order.push(signature.clone());
        }
        buckets.entry(signature).or_default().push(cube);
    }

    let mut joined = Vec::new();
    let mut conflicts = Vec::new();
    for signature in &order {
        let members = buckets.remove(signature).unwrap();
        for group in partition_groups(members) {
            joined.extend(join_group(group, options, &mut conflicts)?);
        }
    }

    for conflict in &conflicts {
        warn!(reason = ?conflict.reason, "{}", conflict.detail);
    }

    Ok((joined, conflicts))
}

/// How two candidates relate structurally.
enum Frame {
    /// Identical coordinates everywhere, the duplicate-range case.
    Same,

    /// Exactly one axis differs in its dimension coordinate's values.
    DiffersOn(usize),

    /// Not joinable with each other.
    Unrelated,
}

fn frame_of(a: &Cube, b: &Cube) -> Frame {
    if a.ndim() != b.ndim() {
        return Frame::Unrelated;
    }

    let mut differing = None;
    for axis in 0..a.ndim() {
        match (a.dim_coord(axis), b.dim_coord(axis)) {
            (None, None) => {
                if a.shape()[axis] != b.shape()[axis] {
                    return Frame::Unrelated;
                }
            }
            (Some(da), Some(db)) => {
                if da == db {
                    continue;
                }
                if differing.is_some() {
                    return Frame::Unrelated;
                }
                differing = Some(axis);
            }
            _ => return Frame::Unrelated,
        }
    }

    let a_aux = a.aux_coords();
    let b_aux = b.aux_coords();
    if a_aux.len() != b_aux.len() {
        return Frame::Unrelated;
    }

    match differing {
        None => {
            if a_aux != b_aux {
                return Frame::Unrelated;
            }
            Frame::Same
        }
        Some(axis) => {
            // Attachment order is canonical, so entries align index-by-index.
            for (ea, eb) in a_aux.iter().zip(b_aux) {
                if ea.dims != eb.dims {
                    return Frame::Unrelated;
                }
                if ea.dims.contains(&axis) {
                    if ea.coord.definition() != eb.coord.definition() {
                        return Frame::Unrelated;
                    }
                } else if ea != eb {
                    return Frame::Unrelated;
                }
            }
            Frame::DiffersOn(axis)
        }
    }
}

struct JoinGroup {
    members: Vec<Cube>,
    axis: Option<usize>,
}

fn partition_groups(members: Vec<Cube>) -> Vec<JoinGroup> {
    let mut groups: Vec<JoinGroup> = Vec::new();
    'next: for cube in members {
        for group in groups.iter_mut() {
            match frame_of(&group.members[0], &cube) {
                Frame::Same => {
                    group.members.push(cube);
                    continue 'next;
                }
                Frame::DiffersOn(axis) => {
                    if group.axis.is_none() || group.axis == Some(axis) {
                        group.axis = Some(axis);
                        group.members.push(cube);
                        continue 'next;
                    }
                }
                Frame::Unrelated => {}
            }
        }
        groups.push(JoinGroup {
            members: vec![cube],
            axis: None,
        });
    }

    groups
}

fn join_group(
    group: JoinGroup,
    options: &ConcatOptions,
    conflicts: &mut Vec<Conflict>,
) -> Result<Vec<Cube>> {
    let members = group.members;
    if members.len() == 1 {
        return Ok(members);
    }
    let group_name = members[0].name().to_string();

    let axis = match group.axis {
        Some(axis) => axis,
        None => {
            conflicts.push(Conflict::new(
                ConflictReason::BucketUnresolved,
                format!(
                    "'{group_name}': {} members with identical coordinate ranges",
                    members.len()
                ),
            ));
            return Ok(members);
        }
    };

    // All frames in the group carry a dimension coordinate on the candidate axis.
    let candidates: Vec<&DimCoord> = members
        .iter()
        .map(|cube| cube.dim_coord(axis).unwrap())
        .collect();
    let coord_name = candidates[0].name().to_string();

    // Align units. The signature only lets convertible units share a bucket, so a failure
    // here is defensive; the target is the smallest symbol to keep the result independent
    // of input order.
    let units: Vec<_> = candidates
        .iter()
        .map(|dim| dim.coord().meta.units.clone())
        .collect();
    let aligned: Vec<Coordinate> = if units.iter().all(|unit| *unit == units[0]) {
        candidates.iter().map(|dim| dim.coord().clone()).collect()
    } else {
        let target = units
            .iter()
            .min_by(|a, b| a.symbol().cmp(b.symbol()))
            .unwrap()
            .clone();
        let mut converted = Vec::with_capacity(candidates.len());
        for dim in &candidates {
            match dim.coord().converted_f64(&target) {
                Ok(coord) => converted.push(coord),
                Err(_) => {
                    conflicts.push(Conflict::new(
                        ConflictReason::IncompatibleUnits,
                        format!(
                            "'{group_name}': coordinate '{coord_name}' has inconvertible units \
                             '{}' and '{}'",
                            dim.coord().meta.units.symbol(),
                            target.symbol()
                        ),
                    ));
                    return Ok(members);
                }
            }
        }
        converted
    };

    let direction = candidates[0].direction();
    if candidates.iter().any(|dim| dim.direction() != direction) {
        conflicts.push(Conflict::new(
            ConflictReason::MetadataConflict,
            format!("'{group_name}': coordinate '{coord_name}' runs in inconsistent directions"),
        ));
        return Ok(members);
    }

    let with_bounds = aligned[0].bounds().is_some();
    if aligned.iter().any(|coord| coord.bounds().is_some() != with_bounds) {
        conflicts.push(Conflict::new(
            ConflictReason::MetadataConflict,
            format!("'{group_name}': coordinate '{coord_name}' has bounds on some members only"),
        ));
        return Ok(members);
    }

    // Sort members along the axis by their starting value.
    let mut order: Vec<usize> = (0..members.len()).collect();
    order.sort_by(|&i, &j| {
        let a = aligned[i].first_point();
        let b = aligned[j].first_point();
        match direction {
            Direction::Ascending => a.cmp(&b),
            Direction::Descending => b.cmp(&a),
        }
    });

    // Ranges must not overlap and must not meet on a duplicate point; the joined
    // coordinate has to stay strictly monotonic.
    for pair in order.windows(2) {
        let prev = &aligned[pair[0]];
        let next = &aligned[pair[1]];
        let overlaps = match direction {
            Direction::Ascending => next.first_point() <= prev.last_point(),
            Direction::Descending => next.first_point() >= prev.last_point(),
        };
        if overlaps {
            conflicts.push(Conflict::new(
                ConflictReason::BucketUnresolved,
                format!("'{group_name}': coordinate '{coord_name}' has overlapping ranges"),
            ));
            return Ok(members);
        }
    }

    if with_bounds {
        for pair in order.windows(2) {
            let prev = aligned[pair[0]].bounds().unwrap();
            let next = aligned[pair[1]].bounds().unwrap();
            let prev_row = prev.row(prev.len() - 1);
            let next_row = next.row(0);
            let (prev_edge, next_edge) = match direction {
                Direction::Ascending => (
                    prev_row.iter().map(|v| v.as_f64()).fold(f64::MIN, f64::max),
                    next_row.iter().map(|v| v.as_f64()).fold(f64::MAX, f64::min),
                ),
                Direction::Descending => (
                    prev_row.iter().map(|v| v.as_f64()).fold(f64::MAX, f64::min),
                    next_row.iter().map(|v| v.as_f64()).fold(f64::MIN, f64::max),
                ),
            };
            let overlap = match direction {
                Direction::Ascending => next_edge < prev_edge - options.epsilon,
                Direction::Descending => next_edge > prev_edge + options.epsilon,
            };
            if overlap {
                conflicts.push(Conflict::new(
                    ConflictReason::BucketUnresolved,
                    format!("'{group_name}': coordinate '{coord_name}' has overlapping bounds"),
                ));
                return Ok(members);
            }
            if options.require_contiguous_bounds
                && (next_edge - prev_edge).abs() > options.epsilon
            {
                conflicts.push(Conflict::new(
                    ConflictReason::BucketUnresolved,
                    format!(
                        "'{group_name}': coordinate '{coord_name}' has a gap between bounds"
                    ),
                ));
                return Ok(members);
            }
        }
    }

    // Join the candidate coordinate, the payload, and any auxiliary coordinates that span
    // the axis, all in sorted order.
    let ordered_coords: Vec<&Coordinate> = order.iter().map(|&i| &aligned[i]).collect();
    let joined = Coordinate::concat(&ordered_coords)?;
    let joined_dim = DimCoord::new(joined)?;

    let payloads: Vec<Payload> = order
        .iter()
        .map(|&i| members[i].payload().clone())
        .collect();
    let payload = Payload::concat_axis(axis, &payloads)?;

    let template = &members[order[0]];

    let mut spanning_joined: Vec<(Coordinate, Vec<usize>)> = Vec::new();
    let spanning_count = template
        .aux_coords()
        .iter()
        .filter(|entry| entry.dims.contains(&axis))
        .count();
    for position in 0..spanning_count {
        let per_member: Vec<&AuxEntry> = order
            .iter()
            .map(|&i| {
                members[i]
                    .aux_coords()
                    .iter()
                    .filter(|entry| entry.dims.contains(&axis))
                    .nth(position)
                    .unwrap()
            })
            .collect();
        let parts: Vec<&Coordinate> = per_member.iter().map(|entry| &entry.coord).collect();
        match Coordinate::concat(&parts) {
            Ok(coord) => spanning_joined.push((coord, per_member[0].dims.clone())),
            Err(err) => {
                conflicts.push(Conflict::new(
                    ConflictReason::MetadataConflict,
                    format!(
                        "'{group_name}': cannot join auxiliary coordinate '{}': {err}",
                        parts[0].name()
                    ),
                ));
                return Ok(members);
            }
        }
    }

    let mut dim_coords: Vec<(usize, DimCoord)> = vec![(axis, joined_dim)];
    for (other, slot) in template.dim_coords().iter().enumerate() {
        if other == axis {
            continue;
        }
        if let Some(dim) = slot {
            dim_coords.push((other, dim.clone()));
        }
    }

    let mut aux_coords: Vec<(Coordinate, Vec<usize>)> = spanning_joined;
    for entry in template.aux_coords() {
        if entry.dims.contains(&axis) {
            continue;
        }
        aux_coords.push((entry.coord.clone(), entry.dims.clone()));
    }

    let cube = Cube::new(template.metadata.clone(), payload, dim_coords, aux_coords)?;

    Ok(vec![cube])
}
