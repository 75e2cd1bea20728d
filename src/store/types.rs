use serde::{Deserialize, Serialize};
use std::fmt;

/// Component count of a scalar quantity.
pub const SCALAR: usize = 1;
/// Component count of a vector quantity.
pub const VECTOR: usize = 3;
/// Component count of a (full, non-symmetric) tensor quantity.
pub const TENSOR: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct QuantityId(pub u32);

impl QuantityId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// Representation category of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// Space-independent: only the multiplier, no array.
    Value,
    /// Multiplier times a dimensionless, space-dependent mask.
    Mask,
    /// A computed space-dependent array, scaled per component by the multiplier.
    Field,
}

impl Kind {
    pub fn is_space_dependent(&self) -> bool {
        !matches!(self, Kind::Value)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Value => "VALUE",
            Kind::Mask => "MASK",
            Kind::Field => "FIELD",
        };
        f.write_str(s)
    }
}

/// Display unit. Informational only, never used in arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Unit(pub String);

impl Unit {
    pub fn new(s: impl Into<String>) -> Self { Self(s.into()) }
    pub fn dimensionless() -> Self { Self::default() }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityMetadata {
    pub name: String,
    /// Namespace, the module that created the quantity. Names stay unique
    /// across groups; the group is informational.
    pub group: Option<String>,
    pub unit: Unit,
    pub description: String,
}

impl QuantityMetadata {
    pub fn new(name: impl Into<String>, unit: Unit) -> Self {
        Self { name: name.into(), unit, ..Default::default() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_group(mut self, group: Option<String>) -> Self {
        self.group = group;
        self
    }

    /// `group.name`, or just the name when ungrouped.
    pub fn full_name(&self) -> String {
        match &self.group {
            Some(g) => format!("{}.{}", g, self.name),
            None => self.name.clone(),
        }
    }
}

/// Human-readable shape name for a component count.
pub fn shape_name(ncomp: usize) -> &'static str {
    match ncomp {
        SCALAR => "SCALAR",
        VECTOR => "VECTOR",
        TENSOR => "TENSOR",
        _ => "ARRAY",
    }
}

/// Names of the quantities every engine owns.
pub mod names {
    /// Simulated time.
    pub const TIME: &str = "t";
    /// Solver time step.
    pub const TIME_STEP: &str = "dt";
    /// Number of steps taken.
    pub const STEP: &str = "step";
}
