//! Cube-level metadata: names, attributes, and cell methods.

use std::{
    collections::BTreeMap,
    hash::{Hash, Hasher},
};

use crate::errors::{Error, Result};
use crate::units::Unit;

/// The CF name triple. At least one of the three must be present.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NameTriple {
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
    pub var_name: Option<String>,
}

impl NameTriple {
    pub fn new(
        standard_name: Option<String>,
        long_name: Option<String>,
        var_name: Option<String>,
    ) -> Result<Self> {
        if standard_name.is_none() && long_name.is_none() && var_name.is_none() {
            return Err(Error::EmptyName);
        }

        Ok(Self {
            standard_name,
            long_name,
            var_name,
        })
    }

    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            standard_name: Some(name.into()),
            long_name: None,
            var_name: None,
        }
    }

    /// The most authoritative name available: standard, then long, then var.
    pub fn best_name(&self) -> &str {
        self.standard_name
            .as_deref()
            .or(self.long_name.as_deref())
            .or(self.var_name.as_deref())
            .unwrap_or("unknown")
    }
}

/// An attribute value. Floats compare bitwise.
#[derive(Clone, Debug)]
pub enum AttrValue {
    Str(String),
    I64(i64),
    F64(f64),
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Str(a), AttrValue::Str(b)) => a == b,
            (AttrValue::I64(a), AttrValue::I64(b)) => a == b,
            (AttrValue::F64(a), AttrValue::F64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for AttrValue {}

impl Hash for AttrValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            AttrValue::Str(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            AttrValue::I64(n) => {
                1u8.hash(state);
                n.hash(state);
            }
            AttrValue::F64(x) => {
                2u8.hash(state);
                x.to_bits().hash(state);
            }
        }
    }
}

/// Attribute maps are ordered by key so equality ignores attachment order and hashing is
/// deterministic.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Record of a statistical operation already applied over named coordinates,
/// e.g. "mean" over "time".
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellMethod {
    pub method: String,
    pub coord_names: Vec<String>,
    pub intervals: Vec<String>,
    pub comments: Vec<String>,
}

impl CellMethod {
    pub fn new(method: impl Into<String>, coord_names: &[&str]) -> Self {
        Self {
            method: method.into(),
            coord_names: coord_names.iter().map(|name| name.to_string()).collect(),
            intervals: vec![],
            comments: vec![],
        }
    }
}

/// The phenomenon-describing metadata of a cube.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CubeMetadata {
    pub names: NameTriple,
    pub units: Unit,
    pub cell_methods: Vec<CellMethod>,
    pub attributes: Attributes,
}

impl CubeMetadata {
    pub fn new(names: NameTriple, units: Unit) -> Self {
        Self {
            names,
            units,
            cell_methods: vec![],
            attributes: Attributes::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.names.best_name()
    }
}
