//! Coordinates: named value arrays describing cube axes and scalar attributes.
//!
//! A `Coordinate` may play the auxiliary role anywhere; a `DimCoord` is the validated
//! dimension role, strictly monotonic with no duplicate points. Coordinates are never
//! mutated once attached to a cube; operations that need a changed coordinate build a new
//! one.

use std::sync::Arc;

use crate::crs::CoordSystem;
use crate::errors::{Error, Result};
use crate::metadata::{Attributes, NameTriple};
use crate::units::Unit;
use crate::values::{Bounds, CoordValues, Direction, ScalarIdentity, ScalarValue};

/// Descriptive metadata shared by all coordinate roles.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CoordMeta {
    pub names: NameTriple,
    pub units: Unit,
    pub attributes: Attributes,
    pub coord_system: Option<Arc<CoordSystem>>,

    /// Whether the coordinate wraps, e.g. longitude.
    pub circular: bool,

    /// Whether the bounds describe a climatological period.
    pub climatological: bool,
}

impl CoordMeta {
    pub fn new(names: NameTriple, units: Unit) -> Self {
        Self {
            names,
            units,
            attributes: Attributes::new(),
            coord_system: None,
            circular: false,
            climatological: false,
        }
    }

    pub fn with_coord_system(mut self, coord_system: Arc<CoordSystem>) -> Self {
        self.coord_system = Some(coord_system);
        self
    }
}

/// The definition of a coordinate: what it is, independent of its values.
///
/// Signatures bucket on definitions; point arrays are deliberately excluded.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CoordDef {
    pub names: NameTriple,
    pub units: Unit,
    pub coord_system: Option<Arc<CoordSystem>>,
}

impl CoordDef {
    /// Key for deterministic ordering of definition sets.
    pub(crate) fn sort_key(&self) -> (String, String) {
        (
            self.names.best_name().to_string(),
            self.units.symbol().to_string(),
        )
    }
}

/// A named array of values, optionally bounded, with units and a coordinate system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coordinate {
    pub meta: CoordMeta,
    points: CoordValues,
    bounds: Option<Bounds>,
}

impl Coordinate {
    pub fn new(meta: CoordMeta, points: CoordValues, bounds: Option<Bounds>) -> Result<Self> {
        if let Some(bounds) = &bounds {
            if bounds.len() != points.len() {
                return Err(Error::BadBounds {
                    detail: format!(
                        "coordinate '{}' has {} points but {} bounds rows",
                        meta.names.best_name(),
                        points.len(),
                        bounds.len()
                    ),
                });
            }
        }

        Ok(Self {
            meta,
            points,
            bounds,
        })
    }

    pub fn points(&self) -> &CoordValues {
        &self.points
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn name(&self) -> &str {
        self.meta.names.best_name()
    }

    /// A coordinate of a single point is eligible to be a scalar coordinate.
    pub fn is_scalar(&self) -> bool {
        self.points.len() == 1
    }

    pub fn definition(&self) -> CoordDef {
        CoordDef {
            names: self.meta.names.clone(),
            units: self.meta.units.clone(),
            coord_system: self.meta.coord_system.clone(),
        }
    }

    /// The value identity of a scalar coordinate: point plus bounds.
    pub fn scalar_identity(&self) -> Option<ScalarIdentity> {
        if !self.is_scalar() {
            return None;
        }

        Some(ScalarIdentity {
            point: self.points.get(0),
            bounds: self.bounds.as_ref().map(|bounds| bounds.row(0)),
        })
    }

    pub fn first_point(&self) -> ScalarValue {
        self.points.first()
    }

    pub fn last_point(&self) -> ScalarValue {
        self.points.last()
    }

    /// A copy of this coordinate converted into `to`, with float values.
    ///
    /// Used when joining candidates whose units differ but convert; forcing floats keeps
    /// every member of a join on one dtype.
    pub fn converted_f64(&self, to: &Unit) -> Result<Coordinate> {
        let from = self.meta.units.clone();
        // Probe once so an inconvertible pair errors before any mapping.
        from.convert(0.0, to)?;

        let points = self.points.map_f64(|x| from.convert(x, to).unwrap());
        let bounds = self
            .bounds
            .as_ref()
            .map(|bounds| bounds.map_f64(|x| from.convert(x, to).unwrap()));

        let mut meta = self.meta.clone();
        meta.units = to.clone();

        Coordinate::new(meta, points, bounds)
    }

    /// Join several coordinates end-to-end, metadata from the first.
    ///
    /// All parts must agree on bounds presence; mixed presence cannot produce a coordinate
    /// with a defined cell extent for every point.
    pub fn concat(parts: &[&Coordinate]) -> Result<Coordinate> {
        let first = parts.first().ok_or_else(|| Error::EmptyInput {
            what: "coordinates to concatenate".to_string(),
        })?;

        let with_bounds = first.bounds.is_some();
        if parts.iter().any(|part| part.bounds.is_some() != with_bounds) {
            return Err(Error::BadBounds {
                detail: format!(
                    "coordinate '{}' has bounds on some members only",
                    first.name()
                ),
            });
        }

        let points =
            CoordValues::concat(&parts.iter().map(|part| &part.points).collect::<Vec<_>>())?;
        let bounds = if with_bounds {
            let bounds_parts = parts
                .iter()
                .map(|part| part.bounds.as_ref().unwrap())
                .collect::<Vec<_>>();
            Some(Bounds::concat(&bounds_parts)?)
        } else {
            None
        };

        Coordinate::new(first.meta.clone(), points, bounds)
    }
}

/// A coordinate in the dimension role: 1-D, strictly monotonic, no duplicate points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimCoord {
    coord: Coordinate,
    direction: Direction,
}

impl DimCoord {
    pub fn new(coord: Coordinate) -> Result<Self> {
        let direction = coord.points().direction().ok_or_else(|| Error::NotMonotonic {
            coord: coord.name().to_string(),
        })?;

        Ok(Self { coord, direction })
    }

    pub fn coord(&self) -> &Coordinate {
        &self.coord
    }

    pub fn into_coord(self) -> Coordinate {
        self.coord
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.coord.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coord.is_empty()
    }

    pub fn name(&self) -> &str {
        self.coord.name()
    }

    pub fn definition(&self) -> CoordDef {
        self.coord.definition()
    }
}
