//! The cube: an N-D payload with attached coordinates, cell methods, and attributes.

use crate::coords::{Coordinate, DimCoord};
use crate::errors::{Error, Result};
use crate::metadata::CubeMetadata;
use crate::payload::Payload;

/// An auxiliary coordinate and the payload axes it spans.
///
/// An empty `dims` with a single point is a scalar coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct AuxEntry {
    pub coord: Coordinate,
    pub dims: Vec<usize>,
}

/// An N-dimensional data payload plus its describing coordinates.
///
/// The cube exclusively owns its attached coordinates; the payload buffer may be shared
/// read-only with the loader that produced it. Construction validates the structural
/// invariants, so an existing cube's coordinates always agree with its payload shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Cube {
    pub metadata: CubeMetadata,
    payload: Payload,
    dim_coords: Vec<Option<DimCoord>>,
    aux_coords: Vec<AuxEntry>,
}

impl Cube {
    /// Build a cube, validating every coordinate against the payload shape.
    ///
    /// `dim_coords` maps payload axes to dimension coordinates; axes may be left without
    /// one. `aux_coords` pairs coordinates with the axes they span; a coordinate spanning
    /// no axis must hold exactly one point (the scalar case).
    pub fn new(
        metadata: CubeMetadata,
        payload: Payload,
        dim_coords: Vec<(usize, DimCoord)>,
        aux_coords: Vec<(Coordinate, Vec<usize>)>,
    ) -> Result<Self> {
        let ndim = payload.ndim();
        let shape = payload.shape().to_vec();

        let mut slots: Vec<Option<DimCoord>> = vec![None; ndim];
        for (axis, coord) in dim_coords {
            if axis >= ndim {
                return Err(Error::ShapeMismatch {
                    detail: format!(
                        "dimension coordinate '{}' mapped to axis {axis} of a {ndim}-d payload",
                        coord.name()
                    ),
                });
            }
            if coord.len() != shape[axis] {
                return Err(Error::Invariant {
                    detail: format!(
                        "dimension coordinate '{}' has {} points on an axis of extent {}",
                        coord.name(),
                        coord.len(),
                        shape[axis]
                    ),
                });
            }
            if slots[axis].is_some() {
                return Err(Error::Invariant {
                    detail: format!("axis {axis} claimed by two dimension coordinates"),
                });
            }
            slots[axis] = Some(coord);
        }

        let mut entries = Vec::with_capacity(aux_coords.len());
        for (coord, dims) in aux_coords {
            match dims.as_slice() {
                [] => {
                    if coord.len() != 1 {
                        return Err(Error::Invariant {
                            detail: format!(
                                "coordinate '{}' spans no axis but has {} points",
                                coord.name(),
                                coord.len()
                            ),
                        });
                    }
                }
                [axis] => {
                    if *axis >= ndim {
                        return Err(Error::ShapeMismatch {
                            detail: format!(
                                "auxiliary coordinate '{}' mapped to axis {axis} of a {ndim}-d payload",
                                coord.name()
                            ),
                        });
                    }
                    if coord.len() != shape[*axis] {
                        return Err(Error::Invariant {
                            detail: format!(
                                "auxiliary coordinate '{}' has {} points on an axis of extent {}",
                                coord.name(),
                                coord.len(),
                                shape[*axis]
                            ),
                        });
                    }
                }
                _ => {
                    return Err(Error::ShapeMismatch {
                        detail: format!(
                            "auxiliary coordinate '{}' spans {} axes; point arrays are 1-d",
                            coord.name(),
                            dims.len()
                        ),
                    });
                }
            }
            entries.push(AuxEntry { coord, dims });
        }

        // Canonical attachment order, so structural equality ignores the order coordinates
        // arrived in.
        entries.sort_by(|a, b| {
            (a.coord.name(), &a.dims).cmp(&(b.coord.name(), &b.dims))
        });

        Ok(Self {
            metadata,
            payload,
            dim_coords: slots,
            aux_coords: entries,
        })
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn shape(&self) -> &[usize] {
        self.payload.shape()
    }

    pub fn ndim(&self) -> usize {
        self.payload.ndim()
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn dim_coord(&self, axis: usize) -> Option<&DimCoord> {
        self.dim_coords.get(axis).and_then(|slot| slot.as_ref())
    }

    pub fn dim_coords(&self) -> &[Option<DimCoord>] {
        &self.dim_coords
    }

    pub fn aux_coords(&self) -> &[AuxEntry] {
        &self.aux_coords
    }

    /// Scalar coordinates: single-point coordinates mapped to no axis.
    pub fn scalar_coords(&self) -> impl Iterator<Item = &Coordinate> {
        self.aux_coords
            .iter()
            .filter(|entry| entry.dims.is_empty() && entry.coord.is_scalar())
            .map(|entry| &entry.coord)
    }

    /// Auxiliary coordinates that span at least one axis.
    pub fn non_scalar_aux(&self) -> impl Iterator<Item = &AuxEntry> {
        self.aux_coords.iter().filter(|entry| !entry.dims.is_empty())
    }

    /// Find any attached coordinate by name, dimension coordinates first.
    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        for slot in &self.dim_coords {
            if let Some(dim) = slot {
                if dim.name() == name {
                    return Some(dim.coord());
                }
            }
        }
        self.aux_coords
            .iter()
            .find(|entry| entry.coord.name() == name)
            .map(|entry| &entry.coord)
    }
}
