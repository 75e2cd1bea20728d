//! A dependency graph of named, lazily recomputed physical quantities, driven
//! forward in time by a solver.
//!
//! Reads pull stale parents up to date; writes eagerly invalidate descendants.
//! Start from [`engine::Engine`], or from [`api::Api`] for user-facing axis order.
pub mod analysis;
pub mod api;
pub mod bindings;
pub mod compute;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod modules;
pub mod output;
pub mod solver;
pub mod store;

pub use api::Api;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ActionFailure, EngineError, InputError, InvariantViolation, Result};
pub use modules::ModuleRegistry;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `multiphys._core` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<bindings::python::PyEngine>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
