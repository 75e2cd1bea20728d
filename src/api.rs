//! Scripting facade over [`Engine`].
//!
//! Users give vectors, sizes and cells in X,Y,Z order; the engine stores them
//! Z,Y,X. This module is the only place where one is converted to the other.
use crate::analysis::stats::GraphStats;
use crate::compute::array::Array;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::Result;
use crate::modules::ModuleRegistry;
use crate::output::{FileSink, RecordingSink};
use crate::store::types::{Kind, Unit, TENSOR, VECTOR};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Where component `c` lands after the axis swap. Vectors reverse their
/// components; a row-major tensor maps `(i, j)` to `(2 - i, 2 - j)`, which is
/// again a plain reversal. Other component counts carry no axes.
fn swap_component(c: usize, ncomp: usize) -> usize {
    match ncomp {
        VECTOR | TENSOR => ncomp - 1 - c,
        _ => c,
    }
}

/// Converts vector and tensor values between the two axis orders; anything
/// else passes through unchanged.
pub fn swap_xyz(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut out = values.to_vec();
    for (c, &v) in values.iter().enumerate() {
        out[swap_component(c, n)] = v;
    }
    out
}

fn swap3<T: Copy>(v: [T; 3]) -> [T; 3] {
    [v[2], v[1], v[0]]
}

/// Converts an array between the two axis orders: the grid is transposed and,
/// for vectors and tensors, the components permuted. Its own inverse.
pub fn swap_array(a: &Array) -> Array {
    let [n0, n1, n2] = a.size3d();
    let ncomp = a.ncomp();
    let mut out = Array::new(ncomp, [n2, n1, n0]);
    for c in 0..ncomp {
        let dst_c = swap_component(c, ncomp);
        let src = a.component(c);
        let dst = out.component_mut(dst_c);
        for i in 0..n0 {
            for j in 0..n1 {
                for k in 0..n2 {
                    dst[(k * n1 + j) * n0 + i] = src[(i * n1 + j) * n2 + k];
                }
            }
        }
    }
    out
}

#[derive(Debug)]
pub struct Api {
    engine: Engine,
}

impl Api {
    pub fn new(engine: Engine) -> Self { Self { engine } }

    /// Builds an engine from a configuration: geometry first, then `dt`, then
    /// the modules in order.
    pub fn from_config(config: &EngineConfig, modules: Arc<ModuleRegistry>) -> Result<Self> {
        let engine = match &config.output_dir {
            Some(dir) => Engine::new(modules, FileSink::new(dir)?)?,
            None => Engine::new(modules, RecordingSink::new())?,
        };
        let mut api = Self::new(engine);
        if let Some(digits) = config.filename_digits {
            api.engine.set_filename_digits(digits);
        }
        if let Some([x, y, z]) = config.grid_size {
            api.set_grid_size(x, y, z)?;
        }
        if let Some([x, y, z]) = config.cell_size {
            api.set_cell_size(x, y, z)?;
        }
        if let Some([x, y, z]) = config.periodic {
            api.set_periodic(x, y, z)?;
        }
        if let Some(dt) = config.dt {
            api.set_scalar("dt", dt)?;
        }
        for module in &config.modules {
            api.load(module)?;
        }
        info!(modules = config.modules.len(), "engine configured");
        Ok(api)
    }

    pub fn engine(&self) -> &Engine { &self.engine }
    pub fn engine_mut(&mut self) -> &mut Engine { &mut self.engine }
    pub fn into_engine(self) -> Engine { self.engine }

    // --- Geometry ---

    pub fn set_grid_size(&mut self, x: usize, y: usize, z: usize) -> Result<()> {
        self.engine.set_grid_size([z, y, x])
    }

    pub fn get_grid_size(&self) -> Option<[usize; 3]> {
        self.engine.geometry().grid_size().map(swap3)
    }

    pub fn set_cell_size(&mut self, x: f64, y: f64, z: f64) -> Result<()> {
        self.engine.set_cell_size([z, y, x])
    }

    pub fn get_cell_size(&self) -> Option<[f64; 3]> {
        self.engine.geometry().cell_size().map(swap3)
    }

    pub fn set_periodic(&mut self, x: usize, y: usize, z: usize) -> Result<()> {
        self.engine.set_periodic([z, y, x])
    }

    pub fn get_periodic(&self) -> [usize; 3] {
        swap3(self.engine.geometry().periodic())
    }

    pub fn get_world_size(&self) -> Result<[f64; 3]> {
        self.engine.world_size().map(swap3)
    }

    // --- Graph construction ---

    pub fn load(&mut self, module: &str) -> Result<()> {
        self.engine.load_module(module)
    }

    pub fn add_quantity(&mut self, name: &str, ncomp: usize, kind: Kind, unit: &str, description: &str) -> Result<()> {
        self.engine.add_quantity(name, ncomp, kind, Unit::new(unit), description).map(|_| ())
    }

    pub fn add_to(&mut self, sum: &str, term: &str) -> Result<()> {
        self.engine.add_to(sum, term).map(|_| ())
    }

    pub fn new_max_abs(&mut self, name: &str, input: &str) -> Result<()> {
        self.engine.new_max_abs(name, input).map(|_| ())
    }

    pub fn new_max_norm(&mut self, name: &str, input: &str) -> Result<()> {
        self.engine.new_max_norm(name, input).map(|_| ())
    }

    pub fn new_peak(&mut self, name: &str, input: &str) -> Result<()> {
        self.engine.new_peak(name, input).map(|_| ())
    }

    // --- Values ---

    pub fn set_value(&mut self, name: &str, value: &[f64]) -> Result<()> {
        self.engine.set_value(name, &swap_xyz(value))
    }

    pub fn get_value(&mut self, name: &str) -> Result<Vec<f64>> {
        Ok(swap_xyz(&self.engine.value(name)?))
    }

    pub fn set_scalar(&mut self, name: &str, value: f64) -> Result<()> {
        self.engine.set_scalar(name, value)
    }

    pub fn get_scalar(&mut self, name: &str) -> Result<f64> {
        self.engine.scalar(name)
    }

    pub fn set_pointwise(&mut self, name: &str, time: f64, value: &[f64]) -> Result<()> {
        self.engine.set_pointwise(name, time, &swap_xyz(value))
    }

    pub fn set_mask(&mut self, name: &str, mask: &Array) -> Result<()> {
        self.engine.set_mask(name, swap_array(mask))
    }

    pub fn set_field(&mut self, name: &str, field: &Array) -> Result<()> {
        self.engine.set_field(name, swap_array(field))
    }

    /// Multiplier times array, in user axis order.
    pub fn get_buffer(&mut self, name: &str) -> Result<Array> {
        Ok(swap_array(&self.engine.buffer(name)?))
    }

    pub fn get_cell(&mut self, name: &str, x: usize, y: usize, z: usize) -> Result<Vec<f64>> {
        Ok(swap_xyz(&self.engine.get_cell(name, [z, y, x])?))
    }

    pub fn set_cell(&mut self, name: &str, x: usize, y: usize, z: usize, value: &[f64]) -> Result<()> {
        self.engine.set_cell(name, [z, y, x], &swap_xyz(value))
    }

    pub fn unit(&self, name: &str) -> Result<String> {
        Ok(self.engine.quantity(name)?.unit().to_string())
    }

    // --- Running ---

    pub fn step(&mut self) -> Result<()> { self.engine.step() }
    pub fn steps(&mut self, n: usize) -> Result<()> { self.engine.steps(n) }
    pub fn run(&mut self, duration: f64) -> Result<()> { self.engine.run(duration) }

    pub fn run_until_smaller(&mut self, name: &str, value: f64, max_steps: Option<u64>) -> Result<bool> {
        self.engine.run_until_smaller(name, value, max_steps)
    }

    pub fn run_until_larger(&mut self, name: &str, value: f64, max_steps: Option<u64>) -> Result<bool> {
        self.engine.run_until_larger(name, value, max_steps)
    }

    // --- Output ---

    pub fn save(&mut self, name: &str, format: &str) -> Result<String> {
        self.engine.save(name, format)
    }

    pub fn save_as(&mut self, name: &str, format: &str, file_name: &str) -> Result<()> {
        self.engine.save_as(name, format, file_name)
    }

    pub fn auto_save(&mut self, name: &str, format: &str, period: f64) -> Result<usize> {
        self.engine.auto_save(name, format, period)
    }

    pub fn tabulate(&mut self, names: &[&str], table: &str) -> Result<()> {
        self.engine.tabulate(names, table)
    }

    pub fn auto_tabulate(&mut self, names: &[&str], table: &str, period: f64) -> Result<usize> {
        self.engine.auto_tabulate(names, table, period)
    }

    pub fn remove(&mut self, handle: usize) -> Result<()> {
        self.engine.remove_handle(handle)
    }

    // --- Introspection ---

    /// Writes the graph in Graphviz format.
    pub fn save_graph(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.engine.to_dot())?;
        Ok(())
    }

    pub fn dump(&self) -> String { self.engine.dump() }
    pub fn trace(&mut self, name: &str) -> Result<String> { self.engine.trace(name) }
    pub fn stats(&self) -> GraphStats { self.engine.stats() }
    pub fn verify(&self) -> Result<()> { self.engine.verify() }
}
