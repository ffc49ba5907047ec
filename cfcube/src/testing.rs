//! Shared builders for cubes and coordinates used by the test modules.

use ndarray::{ArcArray, Array1, Array2, IxDyn};
use num_traits::{Num, NumCast};

use crate::coords::{CoordMeta, Coordinate, DimCoord};
use crate::cube::Cube;
use crate::metadata::{CubeMetadata, NameTriple};
use crate::payload::Payload;
use crate::units::UnitRegistry;
use crate::values::{Bounds, CoordValues};

pub(crate) fn coord_meta(name: &str, unit: &str) -> CoordMeta {
    let units = UnitRegistry::new();
    CoordMeta::new(NameTriple::standard(name), units.get(unit))
}

pub(crate) fn scalar_coord(name: &str, unit: &str, value: f64) -> Coordinate {
    Coordinate::new(coord_meta(name, unit), CoordValues::F64(Array1::from(vec![value])), None)
        .unwrap()
}

pub(crate) fn scalar_coord_bounded(
    name: &str,
    unit: &str,
    value: f64,
    lower: f64,
    upper: f64,
) -> Coordinate {
    Coordinate::new(
        coord_meta(name, unit),
        CoordValues::F64(Array1::from(vec![value])),
        Some(Bounds::F64(
            Array2::from_shape_vec((1, 2), vec![lower, upper]).unwrap(),
        )),
    )
    .unwrap()
}

pub(crate) fn aux_coord_f64(name: &str, unit: &str, points: &[f64]) -> Coordinate {
    Coordinate::new(
        coord_meta(name, unit),
        CoordValues::F64(Array1::from(points.to_vec())),
        None,
    )
    .unwrap()
}

pub(crate) fn dim_coord_f64(name: &str, unit: &str, points: &[f64]) -> DimCoord {
    DimCoord::new(aux_coord_f64(name, unit, points)).unwrap()
}

pub(crate) fn dim_coord_bounded(
    name: &str,
    unit: &str,
    points: &[f64],
    bounds: &[[f64; 2]],
) -> DimCoord {
    let flat: Vec<f64> = bounds.iter().flatten().copied().collect();
    let coord = Coordinate::new(
        coord_meta(name, unit),
        CoordValues::F64(Array1::from(points.to_vec())),
        Some(Bounds::F64(
            Array2::from_shape_vec((points.len(), 2), flat).unwrap(),
        )),
    )
    .unwrap();

    DimCoord::new(coord).unwrap()
}

/// A payload filled with `start, start + 1, ...` in row-major order.
pub(crate) fn payload_range<N>(shape: &[usize], start: N) -> ArcArray<N, IxDyn>
where
    N: Num + NumCast + Copy,
{
    let len: usize = shape.iter().product();
    let values: Vec<N> = (0..len)
        .map(|i| start + N::from(i).unwrap())
        .collect();

    ArcArray::from_shape_vec(IxDyn(shape), values).unwrap()
}

pub(crate) fn cube_metadata(name: &str, unit: &str) -> CubeMetadata {
    let units = UnitRegistry::new();
    CubeMetadata::new(NameTriple::standard(name), units.get(unit))
}

/// Recipe for the standard 2x2 test cube.
pub(crate) struct CubeRecipe {
    name: String,
    unit: String,
    fill: f64,
    scalars: Vec<Coordinate>,
    dims: Vec<(usize, DimCoord)>,
}

impl CubeRecipe {
    pub fn new() -> Self {
        Self {
            name: "air_temperature".to_string(),
            unit: "K".to_string(),
            fill: 0.0,
            scalars: vec![],
            dims: vec![],
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn fill(mut self, fill: f64) -> Self {
        self.fill = fill;
        self
    }

    pub fn scalars(mut self, scalars: &[(&str, f64)]) -> Self {
        for (name, value) in scalars {
            self.scalars.push(scalar_coord(name, "1", *value));
        }
        self
    }

    pub fn scalar(mut self, coord: Coordinate) -> Self {
        self.scalars.push(coord);
        self
    }

    pub fn dim(mut self, axis: usize, coord: DimCoord) -> Self {
        self.dims.push((axis, coord));
        self
    }

    pub fn lat(self, points: &[f64]) -> Self {
        let coord = dim_coord_f64("latitude", "degrees", points);
        self.dim(0, coord)
    }

    pub fn lon(self, points: &[f64]) -> Self {
        let coord = dim_coord_f64("longitude", "degrees", points);
        self.dim(1, coord)
    }
}

/// Build a 2x2 cube from a recipe.
pub(crate) fn cube_2x2(recipe: CubeRecipe) -> Cube {
    let payload = Payload::new_f64(payload_range(&[2, 2], recipe.fill));
    let aux: Vec<(Coordinate, Vec<usize>)> = recipe
        .scalars
        .into_iter()
        .map(|coord| (coord, vec![]))
        .collect();

    Cube::new(cube_metadata(&recipe.name, &recipe.unit), payload, recipe.dims, aux).unwrap()
}

/// Build a 1-d cube over a single dimension coordinate.
pub(crate) fn cube_1d(dim: DimCoord, scalars: &[(&str, f64)]) -> Cube {
    let len = dim.len();
    let payload = Payload::new_f64(payload_range(&[len], dim.coord().first_point().as_f64()));
    let aux = scalars
        .iter()
        .map(|(name, value)| (scalar_coord(name, "1", *value), vec![]))
        .collect();

    Cube::new(cube_metadata("air_temperature", "K"), payload, vec![(0, dim)], aux).unwrap()
}
