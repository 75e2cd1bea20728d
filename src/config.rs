//! Engine configuration, loaded from JSON.
//!
//! Axis triples are in user (X,Y,Z) order, like every other user input.
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub grid_size: Option<[usize; 3]>,
    pub cell_size: Option<[f64; 3]>,
    pub periodic: Option<[usize; 3]>,
    /// Loaded in order.
    pub modules: Vec<String>,
    pub dt: Option<f64>,
    /// Without one, output is recorded in memory only.
    pub output_dir: Option<PathBuf>,
    pub filename_digits: Option<usize>,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
