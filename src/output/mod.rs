//! Where saved and tabulated data goes.
//!
//! The engine hands a sink fully updated data at the moment of the call and
//! does not care how it is persisted.
mod file;
mod recording;

pub use file::FileSink;
pub use recording::{OutputEvent, RecordingSink};

use crate::compute::array::Array;
use crate::error::Result;
use crate::store::types::Kind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An up-to-date copy of one quantity, as handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub quantity: String,
    pub unit: String,
    pub kind: Kind,
    pub time: f64,
    pub step: u64,
    pub multiplier: Vec<f64>,
    /// Multiplier times array for MASK and FIELD quantities.
    pub buffer: Option<Array>,
}

pub trait OutputSink: fmt::Debug + Send {
    /// Persists one quantity under `file_name` in the given format.
    fn save(&mut self, file_name: &str, format: &str, snapshot: &Snapshot) -> Result<()>;

    /// Appends one row to the named table. `header` is the same for every row
    /// of a table and is written once.
    fn tabulate(&mut self, table: &str, header: &[String], row: &[f64]) -> Result<()>;
}

/// Column labels for a quantity: the bare name for scalars, an index suffix
/// per component otherwise.
pub fn column_labels(name: &str, unit: &str, ncomp: usize) -> Vec<String> {
    if ncomp == 1 {
        return vec![format!("{name} ({unit})")];
    }
    (0..ncomp).map(|c| format!("{name}_{c} ({unit})")).collect()
}
