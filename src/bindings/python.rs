use crate::api::Api;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::modules::ModuleRegistry;
use crate::store::types::Kind;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::Arc;

/// Input errors become `ValueError`; wiring bugs become `RuntimeError`; a
/// committed step whose output failed becomes `IOError`.
fn to_py(e: EngineError) -> PyErr {
    match e {
        EngineError::Input(_) => PyValueError::new_err(e.to_string()),
        EngineError::Invariant(_) => PyRuntimeError::new_err(e.to_string()),
        EngineError::Actions { .. } if e.is_fatal() => PyRuntimeError::new_err(e.to_string()),
        EngineError::Actions { .. } => PyIOError::new_err(e.to_string()),
    }
}

fn parse_kind(kind: &str) -> PyResult<Kind> {
    match kind.to_ascii_uppercase().as_str() {
        "VALUE" => Ok(Kind::Value),
        "MASK" => Ok(Kind::Mask),
        "FIELD" => Ok(Kind::Field),
        _ => Err(PyValueError::new_err(format!("unknown kind '{kind}', expected VALUE, MASK or FIELD"))),
    }
}

// Custom updaters are not required to be Sync, so the engine stays on the
// thread that created it.
#[pyclass(name = "_Engine", unsendable)]
#[derive(Debug)]
pub struct PyEngine {
    api: Api,
}

#[pymethods]
impl PyEngine {
    /// `config` is an optional JSON document.
    #[new]
    #[pyo3(signature = (config=None))]
    pub fn new(config: Option<&str>) -> PyResult<Self> {
        let config = match config {
            Some(text) => EngineConfig::from_json(text).map_err(to_py)?,
            None => EngineConfig::default(),
        };
        let modules = ModuleRegistry::with_builtins().map_err(to_py)?;
        let api = Api::from_config(&config, Arc::new(modules)).map_err(to_py)?;
        Ok(Self { api })
    }

    pub fn set_grid_size(&mut self, x: usize, y: usize, z: usize) -> PyResult<()> {
        self.api.set_grid_size(x, y, z).map_err(to_py)
    }

    pub fn get_grid_size(&self) -> Option<[usize; 3]> { self.api.get_grid_size() }

    pub fn set_cell_size(&mut self, x: f64, y: f64, z: f64) -> PyResult<()> {
        self.api.set_cell_size(x, y, z).map_err(to_py)
    }

    pub fn set_periodic(&mut self, x: usize, y: usize, z: usize) -> PyResult<()> {
        self.api.set_periodic(x, y, z).map_err(to_py)
    }

    pub fn get_world_size(&self) -> PyResult<[f64; 3]> { self.api.get_world_size().map_err(to_py) }

    pub fn load(&mut self, module: &str) -> PyResult<()> { self.api.load(module).map_err(to_py) }

    #[pyo3(signature = (name, ncomp, kind, unit="", description=""))]
    pub fn add_quantity(&mut self, name: &str, ncomp: usize, kind: &str, unit: &str, description: &str) -> PyResult<()> {
        self.api.add_quantity(name, ncomp, parse_kind(kind)?, unit, description).map_err(to_py)
    }

    pub fn add_to(&mut self, sum: &str, term: &str) -> PyResult<()> { self.api.add_to(sum, term).map_err(to_py) }
    pub fn new_max_abs(&mut self, name: &str, input: &str) -> PyResult<()> { self.api.new_max_abs(name, input).map_err(to_py) }
    pub fn new_max_norm(&mut self, name: &str, input: &str) -> PyResult<()> { self.api.new_max_norm(name, input).map_err(to_py) }
    pub fn new_peak(&mut self, name: &str, input: &str) -> PyResult<()> { self.api.new_peak(name, input).map_err(to_py) }

    pub fn set_value(&mut self, name: &str, value: Vec<f64>) -> PyResult<()> {
        self.api.set_value(name, &value).map_err(to_py)
    }

    pub fn get_value(&mut self, name: &str) -> PyResult<Vec<f64>> { self.api.get_value(name).map_err(to_py) }

    pub fn set_scalar(&mut self, name: &str, value: f64) -> PyResult<()> {
        self.api.set_scalar(name, value).map_err(to_py)
    }

    pub fn get_scalar(&mut self, name: &str) -> PyResult<f64> { self.api.get_scalar(name).map_err(to_py) }

    pub fn set_pointwise(&mut self, name: &str, time: f64, value: Vec<f64>) -> PyResult<()> {
        self.api.set_pointwise(name, time, &value).map_err(to_py)
    }

    pub fn get_cell(&mut self, name: &str, x: usize, y: usize, z: usize) -> PyResult<Vec<f64>> {
        self.api.get_cell(name, x, y, z).map_err(to_py)
    }

    pub fn set_cell(&mut self, name: &str, x: usize, y: usize, z: usize, value: Vec<f64>) -> PyResult<()> {
        self.api.set_cell(name, x, y, z, &value).map_err(to_py)
    }

    pub fn unit(&self, name: &str) -> PyResult<String> { self.api.unit(name).map_err(to_py) }

    pub fn step(&mut self) -> PyResult<()> { self.api.step().map_err(to_py) }
    pub fn steps(&mut self, n: usize) -> PyResult<()> { self.api.steps(n).map_err(to_py) }
    pub fn run(&mut self, duration: f64) -> PyResult<()> { self.api.run(duration).map_err(to_py) }

    #[pyo3(signature = (name, value, max_steps=None))]
    pub fn run_until_smaller(&mut self, name: &str, value: f64, max_steps: Option<u64>) -> PyResult<bool> {
        self.api.run_until_smaller(name, value, max_steps).map_err(to_py)
    }

    #[pyo3(signature = (name, value, max_steps=None))]
    pub fn run_until_larger(&mut self, name: &str, value: f64, max_steps: Option<u64>) -> PyResult<bool> {
        self.api.run_until_larger(name, value, max_steps).map_err(to_py)
    }

    pub fn save(&mut self, name: &str, format: &str) -> PyResult<String> { self.api.save(name, format).map_err(to_py) }

    pub fn save_as(&mut self, name: &str, format: &str, file_name: &str) -> PyResult<()> {
        self.api.save_as(name, format, file_name).map_err(to_py)
    }

    pub fn auto_save(&mut self, name: &str, format: &str, period: f64) -> PyResult<usize> {
        self.api.auto_save(name, format, period).map_err(to_py)
    }

    pub fn tabulate(&mut self, names: Vec<String>, table: &str) -> PyResult<()> {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.api.tabulate(&names, table).map_err(to_py)
    }

    pub fn auto_tabulate(&mut self, names: Vec<String>, table: &str, period: f64) -> PyResult<usize> {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.api.auto_tabulate(&names, table, period).map_err(to_py)
    }

    pub fn remove(&mut self, handle: usize) -> PyResult<()> { self.api.remove(handle).map_err(to_py) }

    pub fn save_graph(&self, path: &str) -> PyResult<()> { self.api.save_graph(path).map_err(to_py) }
    pub fn dump(&self) -> String { self.api.dump() }
    pub fn trace(&mut self, name: &str) -> PyResult<String> { self.api.trace(name).map_err(to_py) }
    pub fn stats(&self) -> String { self.api.stats().to_string() }
    pub fn verify(&self) -> PyResult<()> { self.api.verify().map_err(to_py) }
}
