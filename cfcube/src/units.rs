//! Units of measure for cubes and coordinates.
//!
//! Units are interned, immutable value objects. Equality is structural and exact (scale and
//! offset compared bitwise), which is what metadata-role comparisons require. Conversion is
//! affine: a value is mapped to the base unit of its dimensional class and back out. Time
//! units measured from a reference epoch ("hours since 1970-01-01") carry the epoch string
//! and only convert to units with the same epoch.

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::errors::{Error, Result};

/// Integer powers of the base dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Dims {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub temperature: i8,
    pub angle: i8,
}

impl Dims {
    pub const NONE: Dims = Dims::new(0, 0, 0, 0, 0);
    pub const LENGTH: Dims = Dims::new(1, 0, 0, 0, 0);
    pub const TIME: Dims = Dims::new(0, 0, 1, 0, 0);
    pub const TEMPERATURE: Dims = Dims::new(0, 0, 0, 1, 0);
    pub const ANGLE: Dims = Dims::new(0, 0, 0, 0, 1);
    pub const PRESSURE: Dims = Dims::new(-1, 1, -2, 0, 0);

    pub const fn new(length: i8, mass: i8, time: i8, temperature: i8, angle: i8) -> Self {
        Self {
            length,
            mass,
            time,
            temperature,
            angle,
        }
    }
}

/// Structural definition of a unit.
///
/// `scale` and `offset` map a value into the base unit of its dimensional class:
/// `base = value * scale + offset`. Unrecognized symbols get a definition with
/// `known == false`, which is equal only to itself and convertible to nothing else.
#[derive(Clone, Debug)]
pub struct UnitDef {
    pub symbol: String,
    pub dims: Dims,
    pub scale: f64,
    pub offset: f64,
    pub epoch: Option<String>,
    pub known: bool,
}

impl UnitDef {
    pub fn new(symbol: impl Into<String>, dims: Dims, scale: f64, offset: f64) -> Self {
        Self {
            symbol: symbol.into(),
            dims,
            scale,
            offset,
            epoch: None,
            known: true,
        }
    }
}

impl PartialEq for UnitDef {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.dims == other.dims
            && self.scale.to_bits() == other.scale.to_bits()
            && self.offset.to_bits() == other.offset.to_bits()
            && self.epoch == other.epoch
            && self.known == other.known
    }
}

impl Eq for UnitDef {}

impl Hash for UnitDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.dims.hash(state);
        self.scale.to_bits().hash(state);
        self.offset.to_bits().hash(state);
        self.epoch.hash(state);
        self.known.hash(state);
    }
}

/// A shared handle to an interned unit definition.
#[derive(Clone, Debug)]
pub struct Unit(Arc<UnitDef>);

impl Unit {
    pub fn def(&self) -> &UnitDef {
        &self.0
    }

    pub fn symbol(&self) -> &str {
        &self.0.symbol
    }

    pub fn dims(&self) -> Dims {
        self.0.dims
    }

    pub fn epoch(&self) -> Option<&str> {
        self.0.epoch.as_deref()
    }

    pub fn is_time_reference(&self) -> bool {
        self.0.epoch.is_some()
    }

    /// Whether values in this unit can be converted to `other`.
    ///
    /// Requires the same dimensional class and the same reference epoch. Unknown units
    /// convert only to themselves.
    pub fn convertible(&self, other: &Unit) -> bool {
        if self == other {
            return true;
        }
        self.0.known && other.0.known && self.0.dims == other.0.dims && self.0.epoch == other.0.epoch
    }

    /// Convert a single value from this unit into `to`.
    pub fn convert(&self, x: f64, to: &Unit) -> Result<f64> {
        if !self.convertible(to) {
            return Err(Error::IncompatibleUnits {
                from: self.symbol().to_string(),
                to: to.symbol().to_string(),
            });
        }
        Ok((x * self.0.scale + self.0.offset - to.0.offset) / to.0.scale)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Interning registry for units.
///
/// Hands out `Unit` handles backed by a process-wide cache keyed by symbol. The registry is
/// an explicit object passed by the caller; equality between units from different registries
/// is still structural, so interning is purely a sharing optimization.
pub struct UnitRegistry {
    interned: Mutex<HashMap<String, Unit>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self {
            interned: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a unit symbol, consulting the built-in table and falling back to an unknown
    /// unit that is equal only to itself.
    pub fn get(&self, symbol: &str) -> Unit {
        let mut interned = self.interned.lock();
        if let Some(unit) = interned.get(symbol) {
            return unit.clone();
        }

        let def = builtin_def(symbol).unwrap_or_else(|| UnitDef {
            symbol: symbol.to_string(),
            dims: Dims::NONE,
            scale: 1.0,
            offset: 0.0,
            epoch: None,
            known: false,
        });
        let unit = Unit(Arc::new(def));
        interned.insert(symbol.to_string(), unit.clone());

        unit
    }

    /// Intern a custom definition under its own symbol.
    pub fn intern(&self, def: UnitDef) -> Unit {
        let mut interned = self.interned.lock();
        if let Some(unit) = interned.get(&def.symbol) {
            if *unit.def() == def {
                return unit.clone();
            }
        }
        let unit = Unit(Arc::new(def));
        interned.insert(unit.symbol().to_string(), unit.clone());

        unit
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_def(symbol: &str) -> Option<UnitDef> {
    let def = match symbol {
        "1" | "" => UnitDef::new(symbol, Dims::NONE, 1.0, 0.0),
        "%" | "percent" => UnitDef::new(symbol, Dims::NONE, 0.01, 0.0),
        "m" | "meter" | "metre" => UnitDef::new(symbol, Dims::LENGTH, 1.0, 0.0),
        "km" => UnitDef::new(symbol, Dims::LENGTH, 1000.0, 0.0),
        "cm" => UnitDef::new(symbol, Dims::LENGTH, 0.01, 0.0),
        "mm" => UnitDef::new(symbol, Dims::LENGTH, 0.001, 0.0),
        "s" | "second" | "seconds" => UnitDef::new(symbol, Dims::TIME, 1.0, 0.0),
        "min" | "minute" | "minutes" => UnitDef::new(symbol, Dims::TIME, 60.0, 0.0),
        "h" | "hr" | "hour" | "hours" => UnitDef::new(symbol, Dims::TIME, 3600.0, 0.0),
        "d" | "day" | "days" => UnitDef::new(symbol, Dims::TIME, 86400.0, 0.0),
        "K" | "kelvin" => UnitDef::new(symbol, Dims::TEMPERATURE, 1.0, 0.0),
        "degC" | "celsius" => {
            let mut def = UnitDef::new(symbol, Dims::TEMPERATURE, 1.0, 0.0);
            def.offset = 273.15;
            def
        }
        "Pa" => UnitDef::new(symbol, Dims::PRESSURE, 1.0, 0.0),
        "hPa" => UnitDef::new(symbol, Dims::PRESSURE, 100.0, 0.0),
        "degrees" | "degrees_east" | "degrees_north" => {
            UnitDef::new(symbol, Dims::ANGLE, 1.0, 0.0)
        }
        "radians" => UnitDef::new(symbol, Dims::ANGLE, 57.29577951308232, 0.0),
        _ => return parse_time_since(symbol),
    };

    Some(def)
}

/// Parse units of the form "<interval> since <epoch>", e.g. "hours since 1970-01-01".
fn parse_time_since(symbol: &str) -> Option<UnitDef> {
    let (head, epoch) = symbol.split_once(" since ")?;
    let scale = match head.trim() {
        "s" | "second" | "seconds" => 1.0,
        "min" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hour" | "hours" => 3600.0,
        "d" | "day" | "days" => 86400.0,
        _ => return None,
    };

    Some(UnitDef {
        symbol: symbol.to_string(),
        dims: Dims::TIME,
        scale,
        offset: 0.0,
        epoch: Some(epoch.trim().to_string()),
        known: true,
    })
}
