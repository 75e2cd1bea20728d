//! Engine-wide discretization: grid size, cell size and periodicity.
//!
//! Each parameter may be set once. All triples are in internal (Z,Y,X) order.
use crate::error::{InputError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    grid_size: Option<[usize; 3]>,
    cell_size: Option<[f64; 3]>,
    periodic: Option<[usize; 3]>,
}

impl Geometry {
    pub fn new() -> Self { Self::default() }

    pub fn grid_size(&self) -> Option<[usize; 3]> { self.grid_size }
    pub fn cell_size(&self) -> Option<[f64; 3]> { self.cell_size }

    /// Number of periodic images per axis, 0 meaning not periodic.
    pub fn periodic(&self) -> [usize; 3] { self.periodic.unwrap_or_default() }

    pub fn set_grid_size(&mut self, size: [usize; 3]) -> Result<()> {
        if self.grid_size.is_some() {
            return Err(InputError::GeometryAlreadySet { what: "grid size" }.into());
        }
        if size.contains(&0) {
            return Err(InputError::Config(format!("grid size must be positive, got {size:?}")).into());
        }
        self.grid_size = Some(size);
        Ok(())
    }

    pub fn set_cell_size(&mut self, size: [f64; 3]) -> Result<()> {
        if self.cell_size.is_some() {
            return Err(InputError::GeometryAlreadySet { what: "cell size" }.into());
        }
        if size.iter().any(|&s| !(s > 0.0)) {
            return Err(InputError::Config(format!("cell size must be positive, got {size:?}")).into());
        }
        self.cell_size = Some(size);
        Ok(())
    }

    pub fn set_periodic(&mut self, periodic: [usize; 3]) -> Result<()> {
        if self.periodic.is_some() {
            return Err(InputError::GeometryAlreadySet { what: "periodicity" }.into());
        }
        self.periodic = Some(periodic);
        Ok(())
    }

    pub fn require_grid(&self) -> Result<[usize; 3]> {
        self.grid_size.ok_or_else(|| InputError::GeometryNotSet { what: "grid size" }.into())
    }

    /// Total size of the simulated box.
    pub fn world_size(&self) -> Result<[f64; 3]> {
        let grid = self.require_grid()?;
        let cell = self.cell_size.ok_or(InputError::GeometryNotSet { what: "cell size" })?;
        Ok([0, 1, 2].map(|i| grid[i] as f64 * cell[i]))
    }

    pub fn cell_count(&self) -> Option<usize> {
        self.grid_size.map(|g| g.iter().product())
    }
}
