//! Coordinate value and bounds arrays.
//!
//! Metadata-role comparisons are exact: integers compare directly and floats compare
//! bitwise, never with a tolerance. Ordering of floats uses `total_cmp` so that sorting
//! candidate values is total even in the presence of NaN.

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use ndarray::{Array1, Array2, Axis};
use num_traits::ToPrimitive;

use crate::errors::{Error, Result};

/// Direction of a strictly monotonic sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A single coordinate value.
#[derive(Clone, Copy, Debug)]
pub enum ScalarValue {
    I64(i64),
    F64(f64),
}

impl ScalarValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ScalarValue::I64(n) => n.to_f64().unwrap(),
            ScalarValue::F64(x) => *x,
        }
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::I64(a), ScalarValue::I64(b)) => a == b,
            (ScalarValue::F64(a), ScalarValue::F64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ScalarValue::I64(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            ScalarValue::F64(x) => {
                1u8.hash(state);
                x.to_bits().hash(state);
            }
        }
    }
}

impl Ord for ScalarValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ScalarValue::I64(a), ScalarValue::I64(b)) => a.cmp(b),
            (ScalarValue::F64(a), ScalarValue::F64(b)) => a.total_cmp(b),
            // Mixed dtypes never share a coordinate; any fixed order will do.
            (ScalarValue::I64(_), ScalarValue::F64(_)) => Ordering::Less,
            (ScalarValue::F64(_), ScalarValue::I64(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A scalar coordinate's value together with its bounds, if any.
///
/// This is the identity used to decide whether two cubes' scalar coordinates "differ": two
/// members with the same point but different bounds are distinct candidates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScalarIdentity {
    pub point: ScalarValue,
    pub bounds: Option<Vec<ScalarValue>>,
}

/// 1-D coordinate point arrays.
#[derive(Clone, Debug)]
pub enum CoordValues {
    I64(Array1<i64>),
    F64(Array1<f64>),
}

impl CoordValues {
    pub fn len(&self) -> usize {
        match self {
            CoordValues::I64(values) => values.len(),
            CoordValues::F64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> ScalarValue {
        match self {
            CoordValues::I64(values) => ScalarValue::I64(values[index]),
            CoordValues::F64(values) => ScalarValue::F64(values[index]),
        }
    }

    pub fn first(&self) -> ScalarValue {
        self.get(0)
    }

    pub fn last(&self) -> ScalarValue {
        self.get(self.len() - 1)
    }

    /// The direction of the values if they are strictly monotonic with no duplicates.
    ///
    /// NaN defeats monotonicity.
    pub fn direction(&self) -> Option<Direction> {
        if let CoordValues::F64(values) = self {
            if values.iter().any(|x| x.is_nan()) {
                return None;
            }
        }
        if self.len() < 2 {
            return Some(Direction::Ascending);
        }

        let mut ascending = true;
        let mut descending = true;
        for i in 1..self.len() {
            match self.get(i - 1).cmp(&self.get(i)) {
                Ordering::Less => descending = false,
                Ordering::Greater => ascending = false,
                Ordering::Equal => return None,
            }
        }

        match (ascending, descending) {
            (true, false) => Some(Direction::Ascending),
            (false, true) => Some(Direction::Descending),
            // Length >= 2 with no equal pair cannot be both.
            _ => None,
        }
    }

    /// Join several point arrays end-to-end. All parts must share a dtype.
    pub fn concat(parts: &[&CoordValues]) -> Result<CoordValues> {
        match parts.first() {
            None => Err(Error::EmptyInput {
                what: "coordinate values to concatenate".to_string(),
            }),
            Some(CoordValues::I64(_)) => {
                let mut views = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        CoordValues::I64(values) => views.push(values.view()),
                        CoordValues::F64(_) => return Err(dtype_mismatch()),
                    }
                }
                Ok(CoordValues::I64(join(&views)?))
            }
            Some(CoordValues::F64(_)) => {
                let mut views = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        CoordValues::F64(values) => views.push(values.view()),
                        CoordValues::I64(_) => return Err(dtype_mismatch()),
                    }
                }
                Ok(CoordValues::F64(join(&views)?))
            }
        }
    }

    /// Build a point array from scalar values. All values must share a dtype.
    pub fn from_scalars(values: &[ScalarValue]) -> Result<CoordValues> {
        match values.first() {
            None => Err(Error::EmptyInput {
                what: "scalar values".to_string(),
            }),
            Some(ScalarValue::I64(_)) => {
                let mut points = Vec::with_capacity(values.len());
                for value in values {
                    match value {
                        ScalarValue::I64(n) => points.push(*n),
                        ScalarValue::F64(_) => return Err(dtype_mismatch()),
                    }
                }
                Ok(CoordValues::I64(Array1::from(points)))
            }
            Some(ScalarValue::F64(_)) => {
                let mut points = Vec::with_capacity(values.len());
                for value in values {
                    match value {
                        ScalarValue::F64(x) => points.push(*x),
                        ScalarValue::I64(_) => return Err(dtype_mismatch()),
                    }
                }
                Ok(CoordValues::F64(Array1::from(points)))
            }
        }
    }

    /// Map every value through an `f64 -> f64` function, yielding float values.
    pub fn map_f64(&self, mut f: impl FnMut(f64) -> f64) -> CoordValues {
        let mapped = match self {
            CoordValues::I64(values) => values.mapv(|n| f(n.to_f64().unwrap())),
            CoordValues::F64(values) => values.mapv(&mut f),
        };

        CoordValues::F64(mapped)
    }
}

impl PartialEq for CoordValues {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        (0..self.len()).all(|i| self.get(i) == other.get(i))
    }
}

impl Eq for CoordValues {}

/// 2-D bounds arrays, one row of cell extents per point.
#[derive(Clone, Debug)]
pub enum Bounds {
    I64(Array2<i64>),
    F64(Array2<f64>),
}

impl Bounds {
    pub fn len(&self) -> usize {
        match self {
            Bounds::I64(bounds) => bounds.nrows(),
            Bounds::F64(bounds) => bounds.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_bounds(&self) -> usize {
        match self {
            Bounds::I64(bounds) => bounds.ncols(),
            Bounds::F64(bounds) => bounds.ncols(),
        }
    }

    pub fn row(&self, index: usize) -> Vec<ScalarValue> {
        match self {
            Bounds::I64(bounds) => bounds.row(index).iter().map(|n| ScalarValue::I64(*n)).collect(),
            Bounds::F64(bounds) => bounds.row(index).iter().map(|x| ScalarValue::F64(*x)).collect(),
        }
    }

    /// Join several bounds arrays along the points axis. All parts must share a dtype and
    /// bounds count.
    pub fn concat(parts: &[&Bounds]) -> Result<Bounds> {
        match parts.first() {
            None => Err(Error::EmptyInput {
                what: "bounds to concatenate".to_string(),
            }),
            Some(Bounds::I64(_)) => {
                let mut views = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        Bounds::I64(bounds) => views.push(bounds.view()),
                        Bounds::F64(_) => return Err(dtype_mismatch()),
                    }
                }
                let joined = ndarray::concatenate(Axis(0), &views)
                    .map_err(|err| Error::BadBounds {
                        detail: err.to_string(),
                    })?;
                Ok(Bounds::I64(joined))
            }
            Some(Bounds::F64(_)) => {
                let mut views = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        Bounds::F64(bounds) => views.push(bounds.view()),
                        Bounds::I64(_) => return Err(dtype_mismatch()),
                    }
                }
                let joined = ndarray::concatenate(Axis(0), &views)
                    .map_err(|err| Error::BadBounds {
                        detail: err.to_string(),
                    })?;
                Ok(Bounds::F64(joined))
            }
        }
    }

    /// Build a bounds array from per-point rows of scalar values.
    pub fn from_rows(rows: &[Vec<ScalarValue>]) -> Result<Bounds> {
        let first = rows.first().ok_or_else(|| Error::EmptyInput {
            what: "bounds rows".to_string(),
        })?;
        let n_bounds = first.len();
        if rows.iter().any(|row| row.len() != n_bounds) {
            return Err(Error::BadBounds {
                detail: "rows have differing bounds counts".to_string(),
            });
        }

        match first.first() {
            None => Err(Error::BadBounds {
                detail: "empty bounds row".to_string(),
            }),
            Some(ScalarValue::I64(_)) => {
                let mut flat = Vec::with_capacity(rows.len() * n_bounds);
                for row in rows {
                    for value in row {
                        match value {
                            ScalarValue::I64(n) => flat.push(*n),
                            ScalarValue::F64(_) => return Err(dtype_mismatch()),
                        }
                    }
                }
                let bounds = Array2::from_shape_vec((rows.len(), n_bounds), flat)
                    .map_err(|err| Error::BadBounds {
                        detail: err.to_string(),
                    })?;
                Ok(Bounds::I64(bounds))
            }
            Some(ScalarValue::F64(_)) => {
                let mut flat = Vec::with_capacity(rows.len() * n_bounds);
                for row in rows {
                    for value in row {
                        match value {
                            ScalarValue::F64(x) => flat.push(*x),
                            ScalarValue::I64(_) => return Err(dtype_mismatch()),
                        }
                    }
                }
                let bounds = Array2::from_shape_vec((rows.len(), n_bounds), flat)
                    .map_err(|err| Error::BadBounds {
                        detail: err.to_string(),
                    })?;
                Ok(Bounds::F64(bounds))
            }
        }
    }

    /// Map every value through an `f64 -> f64` function, yielding float bounds.
    pub fn map_f64(&self, mut f: impl FnMut(f64) -> f64) -> Bounds {
        let mapped = match self {
            Bounds::I64(bounds) => bounds.mapv(|n| f(n.to_f64().unwrap())),
            Bounds::F64(bounds) => bounds.mapv(&mut f),
        };

        Bounds::F64(mapped)
    }
}

impl PartialEq for Bounds {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() || self.n_bounds() != other.n_bounds() {
            return false;
        }
        (0..self.len()).all(|i| self.row(i) == other.row(i))
    }
}

impl Eq for Bounds {}

fn join<N: Clone>(views: &[ndarray::ArrayView1<N>]) -> Result<Array1<N>> {
    ndarray::concatenate(Axis(0), views).map_err(|err| Error::ShapeMismatch {
        detail: err.to_string(),
    })
}

fn dtype_mismatch() -> Error {
    Error::DtypeMismatch {
        detail: "coordinate values have differing dtypes".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    #[test]
    fn test_direction() {
        assert_eq!(
            CoordValues::F64(array![0.0, 10.0, 20.0]).direction(),
            Some(Direction::Ascending)
        );
        assert_eq!(
            CoordValues::I64(array![30, 20, 10]).direction(),
            Some(Direction::Descending)
        );
        assert_eq!(CoordValues::I64(array![0, 10, 10]).direction(), None);
        assert_eq!(CoordValues::F64(array![0.0, 20.0, 10.0]).direction(), None);
        assert_eq!(
            CoordValues::F64(array![42.0]).direction(),
            Some(Direction::Ascending)
        );
        assert_eq!(
            CoordValues::F64(array![0.0, f64::NAN]).direction(),
            None
        );
    }

    #[test]
    fn test_bitwise_equality() {
        let a = CoordValues::F64(array![0.0, f64::NAN]);
        let b = CoordValues::F64(array![0.0, f64::NAN]);
        assert_eq!(a, b);

        // -0.0 and 0.0 differ bitwise, so as metadata they differ.
        let c = CoordValues::F64(array![-0.0, f64::NAN]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_scalar_ordering() {
        let mut values = vec![
            ScalarValue::F64(3.0),
            ScalarValue::F64(-1.0),
            ScalarValue::F64(2.0),
        ];
        values.sort();
        assert_eq!(values[0], ScalarValue::F64(-1.0));
        assert_eq!(values[2], ScalarValue::F64(3.0));

        assert!(ScalarValue::I64(5) > ScalarValue::I64(-7));
    }

    #[test]
    fn test_concat() {
        let a = CoordValues::I64(array![0, 10, 20]);
        let b = CoordValues::I64(array![30, 40]);
        let joined = CoordValues::concat(&[&a, &b]).unwrap();
        assert_eq!(joined, CoordValues::I64(array![0, 10, 20, 30, 40]));

        let mixed = CoordValues::F64(array![1.0]);
        assert!(CoordValues::concat(&[&a, &mixed]).is_err());
    }

    #[test]
    fn test_from_scalars() {
        let values = [ScalarValue::F64(1.0), ScalarValue::F64(2.0)];
        assert_eq!(
            CoordValues::from_scalars(&values).unwrap(),
            CoordValues::F64(array![1.0, 2.0])
        );

        let mixed = [ScalarValue::F64(1.0), ScalarValue::I64(2)];
        assert!(CoordValues::from_scalars(&mixed).is_err());
    }

    #[test]
    fn test_bounds_roundtrip() {
        let bounds = Bounds::F64(array![[0.0, 1.0], [1.0, 2.0]]);
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds.n_bounds(), 2);
        assert_eq!(
            bounds.row(1),
            vec![ScalarValue::F64(1.0), ScalarValue::F64(2.0)]
        );

        let rebuilt = Bounds::from_rows(&[bounds.row(0), bounds.row(1)]).unwrap();
        assert_eq!(rebuilt, bounds);
    }

    #[test]
    fn test_bounds_concat() {
        let a = Bounds::I64(array![[0, 10], [10, 20]]);
        let b = Bounds::I64(array![[20, 30]]);
        let joined = Bounds::concat(&[&a, &b]).unwrap();
        assert_eq!(joined, Bounds::I64(array![[0, 10], [10, 20], [20, 30]]));
    }

    #[test]
    fn test_map_f64() {
        let km = CoordValues::I64(array![1, 2]);
        let m = km.map_f64(|x| x * 1000.0);
        assert_eq!(m, CoordValues::F64(array![1000.0, 2000.0]));
    }
}
