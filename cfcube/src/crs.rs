//! Definitions of coordinate systems.
//!
//! Comparison is deep and exact: projection and ellipsoid parameters are compared bitwise,
//! never with a tolerance, so that two cubes only combine when their georeferencing is
//! genuinely identical.

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::errors::{Error, Result};

/// A geographic (ellipsoidal) coordinate system, defined by the shape of the Earth and a
/// prime meridian.
#[derive(Clone, Debug)]
pub struct GeogCS {
    /// Major radius of the ellipsoid in metres.
    pub semi_major_axis: f64,

    /// Minor radius of the ellipsoid in metres.
    pub semi_minor_axis: f64,

    /// `1/f` where `f = (a-b)/a`.
    pub inverse_flattening: f64,

    /// Describes 'zero' on the ellipsoid in degrees.
    pub longitude_of_prime_meridian: f64,
}

impl GeogCS {
    /// A perfect sphere of the given radius.
    pub fn sphere(radius: f64) -> Self {
        Self {
            semi_major_axis: radius,
            semi_minor_axis: radius,
            inverse_flattening: 0.0,
            longitude_of_prime_meridian: 0.0,
        }
    }

    /// Build an ellipsoid from any sufficient pair of parameters.
    ///
    /// Exactly one of the three radius parameters may be omitted and is derived from the
    /// others using `flattening = (a - b) / a`. Giving just a semi-major axis produces a
    /// perfect sphere. Giving all three, or too few, is an error.
    pub fn from_ellipsoid(
        semi_major_axis: Option<f64>,
        semi_minor_axis: Option<f64>,
        inverse_flattening: Option<f64>,
        longitude_of_prime_meridian: f64,
    ) -> Result<Self> {
        let (a, b, f_inv) = match (semi_major_axis, semi_minor_axis, inverse_flattening) {
            (None, None, None) => {
                return Err(Error::Ellipsoid {
                    detail: "no ellipsoid specified".to_string(),
                })
            }
            (Some(_), Some(_), Some(_)) => {
                return Err(Error::Ellipsoid {
                    detail: "ellipsoid is overspecified".to_string(),
                })
            }
            (Some(a), None, None) => (a, a, 0.0),
            (None, Some(b), Some(f_inv)) => {
                let a = -b / ((1.0 - f_inv) / f_inv);
                (a, b, f_inv)
            }
            (Some(a), None, Some(f_inv)) => {
                let b = a - (1.0 / f_inv) * a;
                (a, b, f_inv)
            }
            (Some(a), Some(b), None) => {
                let f_inv = if a == b { 0.0 } else { 1.0 / ((a - b) / a) };
                (a, b, f_inv)
            }
            _ => {
                return Err(Error::Ellipsoid {
                    detail: "insufficient ellipsoid specification".to_string(),
                })
            }
        };

        Ok(Self {
            semi_major_axis: a,
            semi_minor_axis: b,
            inverse_flattening: f_inv,
            longitude_of_prime_meridian,
        })
    }

    fn bits(&self) -> [u64; 4] {
        [
            self.semi_major_axis.to_bits(),
            self.semi_minor_axis.to_bits(),
            self.inverse_flattening.to_bits(),
            self.longitude_of_prime_meridian.to_bits(),
        ]
    }
}

impl PartialEq for GeogCS {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for GeogCS {}

impl Hash for GeogCS {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// A coordinate system with the north pole rotated away from the geographic pole.
#[derive(Clone, Debug)]
pub struct RotatedGeogCS {
    pub grid_north_pole_latitude: f64,
    pub grid_north_pole_longitude: f64,
    pub north_pole_grid_longitude: f64,
    pub ellipsoid: Option<GeogCS>,
}

impl RotatedGeogCS {
    fn bits(&self) -> [u64; 3] {
        [
            self.grid_north_pole_latitude.to_bits(),
            self.grid_north_pole_longitude.to_bits(),
            self.north_pole_grid_longitude.to_bits(),
        ]
    }
}

impl PartialEq for RotatedGeogCS {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits() && self.ellipsoid == other.ellipsoid
    }
}

impl Eq for RotatedGeogCS {}

impl Hash for RotatedGeogCS {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
        self.ellipsoid.hash(state);
    }
}

/// A Lambert conformal conic projection.
#[derive(Clone, Debug)]
pub struct LambertConformal {
    pub central_lat: f64,
    pub central_lon: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub secant_latitudes: Vec<f64>,
    pub ellipsoid: Option<GeogCS>,
}

impl LambertConformal {
    fn bits(&self) -> [u64; 4] {
        [
            self.central_lat.to_bits(),
            self.central_lon.to_bits(),
            self.false_easting.to_bits(),
            self.false_northing.to_bits(),
        ]
    }
}

impl PartialEq for LambertConformal {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
            && self.secant_latitudes.len() == other.secant_latitudes.len()
            && self
                .secant_latitudes
                .iter()
                .zip(&other.secant_latitudes)
                .all(|(a, b)| a.to_bits() == b.to_bits())
            && self.ellipsoid == other.ellipsoid
    }
}

impl Eq for LambertConformal {}

impl Hash for LambertConformal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
        for lat in &self.secant_latitudes {
            lat.to_bits().hash(state);
        }
        self.ellipsoid.hash(state);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CoordSystem {
    Geog(GeogCS),
    RotatedGeog(RotatedGeogCS),
    LambertConformal(LambertConformal),
}

impl CoordSystem {
    /// CF grid mapping name for this coordinate system.
    pub fn grid_mapping_name(&self) -> &'static str {
        match self {
            CoordSystem::Geog(_) => "latitude_longitude",
            CoordSystem::RotatedGeog(_) => "rotated_latitude_longitude",
            CoordSystem::LambertConformal(_) => "lambert_conformal_conic",
        }
    }
}

/// Interning registry for coordinate systems.
///
/// Hands out immutable shared handles. The cache is keyed by the structural value itself, so
/// two loads of the same projection share one allocation. Interned systems are never mutated
/// in place; an adjustment means interning a new value.
pub struct CrsRegistry {
    interned: Mutex<HashMap<CoordSystem, Arc<CoordSystem>>>,
}

impl CrsRegistry {
    pub fn new() -> Self {
        Self {
            interned: Mutex::new(HashMap::new()),
        }
    }

    pub fn intern(&self, cs: CoordSystem) -> Arc<CoordSystem> {
        let mut interned = self.interned.lock();
        if let Some(shared) = interned.get(&cs) {
            return Arc::clone(shared);
        }
        let shared = Arc::new(cs.clone());
        interned.insert(cs, Arc::clone(&shared));

        shared
    }
}

impl Default for CrsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_from_major_only() {
        let cs = GeogCS::from_ellipsoid(Some(6371229.0), None, None, 0.0).unwrap();
        assert_eq!(cs.semi_major_axis, 6371229.0);
        assert_eq!(cs.semi_minor_axis, 6371229.0);
        assert_eq!(cs.inverse_flattening, 0.0);
        assert_eq!(cs, GeogCS::sphere(6371229.0));
    }

    #[test]
    fn test_semi_minor_from_flattening() {
        // Airy 1830
        let cs =
            GeogCS::from_ellipsoid(Some(6377563.396), None, Some(299.3249646), 0.0).unwrap();
        assert!((cs.semi_minor_axis - 6356256.909).abs() < 1e-2);
    }

    #[test]
    fn test_flattening_from_radii() {
        let cs =
            GeogCS::from_ellipsoid(Some(6377563.396), Some(6356256.909), None, 0.0).unwrap();
        assert!((cs.inverse_flattening - 299.3249646).abs() < 1e-4);

        let sphere = GeogCS::from_ellipsoid(Some(6371229.0), Some(6371229.0), None, 0.0).unwrap();
        assert_eq!(sphere.inverse_flattening, 0.0);
    }

    #[test]
    fn test_unspecified_and_overspecified() {
        assert!(GeogCS::from_ellipsoid(None, None, None, 0.0).is_err());
        assert!(
            GeogCS::from_ellipsoid(Some(6377563.396), Some(6356256.909), Some(299.3249646), 0.0)
                .is_err()
        );
        assert!(GeogCS::from_ellipsoid(None, Some(6356256.909), None, 0.0).is_err());
    }

    #[test]
    fn test_equality_is_exact() {
        let a = CoordSystem::Geog(GeogCS::sphere(6371229.0));
        let b = CoordSystem::Geog(GeogCS::sphere(6371229.0));
        let c = CoordSystem::Geog(GeogCS::sphere(6371229.0 + 1e-6));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rotated_equality_includes_ellipsoid() {
        let rotated = |ellipsoid| {
            CoordSystem::RotatedGeog(RotatedGeogCS {
                grid_north_pole_latitude: 37.5,
                grid_north_pole_longitude: 177.5,
                north_pole_grid_longitude: 0.0,
                ellipsoid,
            })
        };
        assert_eq!(rotated(None), rotated(None));
        assert_ne!(rotated(None), rotated(Some(GeogCS::sphere(6371229.0))));
    }

    #[test]
    fn test_interning_shares() {
        let registry = CrsRegistry::new();
        let a = registry.intern(CoordSystem::Geog(GeogCS::sphere(6371229.0)));
        let b = registry.intern(CoordSystem::Geog(GeogCS::sphere(6371229.0)));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
