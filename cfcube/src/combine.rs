//! The combine pipeline: merge and concatenate applied in sequence.
//!
//! A single merge pass cannot always finish the job: concatenating along an existing axis
//! can make previously unmergeable fragments mergeable, and vice versa. The pipeline runs a
//! configured sequence of passes, optionally repeating until the batch stops shrinking.

use crate::concat::{concatenate_with, ConcatOptions};
use crate::cube::Cube;
use crate::errors::Result;
use crate::merge::merge;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombineStep {
    Merge,
    Concatenate,
}

#[derive(Clone, Debug)]
pub struct CombineOptions {
    pub sequence: Vec<CombineStep>,
    pub repeat_until_unchanged: bool,
    pub concat: ConcatOptions,
}

impl CombineOptions {
    /// Merge only, the behavior loaders historically relied on.
    pub fn legacy() -> Self {
        Self {
            sequence: vec![CombineStep::Merge],
            repeat_until_unchanged: false,
            concat: ConcatOptions::default(),
        }
    }

    /// Merge, then concatenate the results.
    pub fn recommended() -> Self {
        Self {
            sequence: vec![CombineStep::Merge, CombineStep::Concatenate],
            repeat_until_unchanged: false,
            concat: ConcatOptions::default(),
        }
    }

    /// Merge and concatenate repeatedly until the batch stops shrinking.
    pub fn comprehensive() -> Self {
        Self {
            sequence: vec![CombineStep::Merge, CombineStep::Concatenate],
            repeat_until_unchanged: true,
            concat: ConcatOptions::default(),
        }
    }
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self::legacy()
    }
}

/// Run the configured passes over a batch of cubes.
///
/// Merging and concatenating only ever reduce or preserve the cube count, so a pass that
/// leaves the count unchanged has reached the fixed point.
pub fn combine(cubes: Vec<Cube>, options: &CombineOptions) -> Result<Vec<Cube>> {
    let mut cubes = cubes;
    loop {
        let before = cubes.len();
        for step in &options.sequence {
            cubes = match step {
                CombineStep::Merge => merge(cubes)?,
                CombineStep::Concatenate => {
                    let (joined, _conflicts) = concatenate_with(cubes, &options.concat)?;
                    joined
                }
            };
        }
        if !options.repeat_until_unchanged || cubes.len() == before {
            break;
        }
    }

    Ok(cubes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{cube_1d, dim_coord_f64};

    fn series(points: &[f64], z: f64) -> Cube {
        cube_1d(dim_coord_f64("time", "h", points), &[("height", z)])
    }

    #[test]
    fn test_mergeable_under_any_policy() {
        let run = |options: &CombineOptions| {
            let cubes = vec![series(&[1.0, 2.0], 1.0), series(&[1.0, 2.0], 2.0)];
            combine(cubes, options).unwrap()
        };
        for options in [
            CombineOptions::legacy(),
            CombineOptions::recommended(),
            CombineOptions::comprehensive(),
        ] {
            let result = run(&options);
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].shape(), &[2, 2]);
        }
    }

    #[test]
    fn test_catable_needs_concatenate_enabled() {
        let run = |options: &CombineOptions| {
            let cubes = vec![series(&[1.0, 2.0], 1.0), series(&[3.0, 4.0], 1.0)];
            combine(cubes, options).unwrap()
        };

        assert_eq!(run(&CombineOptions::legacy()).len(), 2);

        let result = run(&CombineOptions::recommended());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].shape(), &[4]);
    }

    #[test]
    fn test_concatenate_enables_merge() {
        // Ragged time series per level: no pair is mergeable or catable into one cube in a
        // single pass, but once each level's series is joined the two levels merge.
        let cubes = vec![
            series(&[1.0, 2.0], 1.0),
            series(&[3.0, 4.0, 5.0], 1.0),
            series(&[1.0, 2.0, 3.0], 2.0),
            series(&[4.0, 5.0], 2.0),
        ];

        let single_pass = combine(cubes.clone(), &CombineOptions::recommended()).unwrap();
        assert_eq!(single_pass.len(), 2);

        let repeated = combine(cubes, &CombineOptions::comprehensive()).unwrap();
        assert_eq!(repeated.len(), 1);
        assert_eq!(repeated[0].shape(), &[2, 5]);
        assert_eq!(repeated[0].dim_coord(0).unwrap().name(), "height");
        assert_eq!(repeated[0].dim_coord(1).unwrap().name(), "time");
    }

    #[test]
    fn test_default_is_merge_only() {
        let options = CombineOptions::default();
        assert_eq!(options.sequence, vec![CombineStep::Merge]);
        assert!(!options.repeat_until_unchanged);
    }
}
