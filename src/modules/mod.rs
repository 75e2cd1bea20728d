//! Named physics modules that wire quantities and updaters into an engine.
//!
//! The registry is an ordinary value built by the host before any engine is
//! constructed, then shared (read-only) by every engine that uses it.
mod builtin;

pub use builtin::Relaxation;

use crate::engine::Engine;
use crate::error::{InvariantViolation, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Adds a module's quantities to an engine. Must be safe to run against an
/// engine where some of its prerequisites already exist.
pub type Loader = fn(&mut Engine) -> Result<()>;

#[derive(Clone)]
pub struct ModuleDef {
    pub name: String,
    pub description: String,
    pub loader: Loader,
}

impl fmt::Debug for ModuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDef").field("name", &self.name).field("description", &self.description).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, ModuleDef>,
}

impl ModuleRegistry {
    /// An empty registry.
    pub fn new() -> Self { Self::default() }

    /// A registry holding the modules shipped with this crate.
    pub fn with_builtins() -> Result<Self> {
        let mut reg = Self::new();
        builtin::register_all(&mut reg)?;
        Ok(reg)
    }

    pub fn register(&mut self, name: &str, description: &str, loader: Loader) -> Result<()> {
        if self.modules.contains_key(name) {
            return Err(InvariantViolation::DuplicateModule { name: name.to_string() }.into());
        }
        self.modules.insert(
            name.to_string(),
            ModuleDef { name: name.to_string(), description: description.to_string(), loader },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDef> { self.modules.get(name) }
    pub fn contains(&self, name: &str) -> bool { self.modules.contains_key(name) }
    pub fn len(&self) -> usize { self.modules.len() }
    pub fn is_empty(&self) -> bool { self.modules.is_empty() }

    /// Modules in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDef> { self.modules.values() }
}
