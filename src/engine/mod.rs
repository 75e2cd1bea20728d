//! The coordinator: quantity graph, geometry, solver, periodic actions and output.
//!
//! Every operation here addresses quantities by name and works in internal
//! (Z,Y,X) axis order. User-facing axis order is handled by [`crate::api`].
pub mod geometry;
pub mod handles;

pub use geometry::Geometry;
pub use handles::{Action, HandleTable, PeriodicAction};

use crate::analysis::{stats::GraphStats, topology};
use crate::compute::array::Array;
use crate::compute::pointwise::PointwiseUpdater;
use crate::compute::reduce::{MaxAbsUpdater, MaxNormUpdater, PeakUpdater};
use crate::compute::sum::SumUpdater;
use crate::compute::updater::Updater;
use crate::display::{dot, trace};
use crate::error::{ActionFailure, EngineError, InputError, InvariantViolation, Result};
use crate::modules::ModuleRegistry;
use crate::output::{column_labels, OutputSink, Snapshot};
use crate::solver::{EulerSolver, Solver};
use crate::store::quantity::Quantity;
use crate::store::registry::Registry;
use crate::store::types::{names, Kind, QuantityId, QuantityMetadata, Unit, SCALAR, TENSOR, VECTOR};
use std::sync::Arc;
use tracing::{debug, info, trace as trace_event, warn};

/// Default zero padding of automatically numbered output files.
pub const DEFAULT_FILENAME_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Idle,
    Stepping,
}

#[derive(Debug)]
pub struct Engine {
    registry: Registry,
    geometry: Geometry,
    modules: Arc<ModuleRegistry>,
    /// In load order.
    loaded: Vec<String>,
    /// Modules whose loader is running, innermost last.
    loading: Vec<String>,
    solver: Option<Box<dyn Solver>>,
    state: SolverState,
    handles: HandleTable,
    sink: Box<dyn OutputSink>,
    /// Number of automatically named files handed out so far.
    output_id: u64,
    filename_digits: usize,
    time: QuantityId,
    dt: QuantityId,
    step: QuantityId,
}

impl Engine {
    /// An engine holding only `t`, `dt` and `step`. `t` and `step` start at 0;
    /// `dt` must be set before the first step.
    pub fn new(modules: Arc<ModuleRegistry>, sink: impl OutputSink + 'static) -> Result<Self> {
        let mut registry = Registry::new();
        let time = registry.add(QuantityMetadata::new(names::TIME, Unit::new("s")).with_description("time"), SCALAR, Kind::Value, None)?;
        let dt = registry.add(QuantityMetadata::new(names::TIME_STEP, Unit::new("s")).with_description("time step"), SCALAR, Kind::Value, None)?;
        let step = registry.add(
            QuantityMetadata::new(names::STEP, Unit::dimensionless()).with_description("number of steps taken"),
            SCALAR,
            Kind::Value,
            None,
        )?;
        registry.set_scalar(time, 0.0)?;
        registry.set_scalar(step, 0.0)?;

        Ok(Self {
            registry,
            geometry: Geometry::new(),
            modules,
            loaded: Vec::new(),
            loading: Vec::new(),
            solver: None,
            state: SolverState::Idle,
            handles: HandleTable::new(),
            sink: Box::new(sink),
            output_id: 0,
            filename_digits: DEFAULT_FILENAME_DIGITS,
            time,
            dt,
            step,
        })
    }

    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn registry_mut(&mut self) -> &mut Registry { &mut self.registry }
    pub fn geometry(&self) -> &Geometry { &self.geometry }
    pub fn handles(&self) -> &HandleTable { &self.handles }
    pub fn modules(&self) -> &ModuleRegistry { &self.modules }
    pub fn loaded_modules(&self) -> &[String] { &self.loaded }
    pub fn solver(&self) -> Option<&dyn Solver> { self.solver.as_deref() }
    pub fn solver_state(&self) -> SolverState { self.state }

    pub fn set_sink(&mut self, sink: impl OutputSink + 'static) { self.sink = Box::new(sink); }
    pub fn set_filename_digits(&mut self, digits: usize) { self.filename_digits = digits; }

    /// Current simulated time. `t` is only ever written by the engine and stays valid.
    pub fn time(&self) -> f64 { self.registry.get(self.time).multiplier()[0] }

    pub fn step_count(&self) -> u64 { self.registry.get(self.step).multiplier()[0] as u64 }

    // --- Geometry ---

    pub fn set_grid_size(&mut self, size: [usize; 3]) -> Result<()> {
        self.geometry.set_grid_size(size)?;
        info!(?size, "grid size");
        Ok(())
    }

    pub fn set_cell_size(&mut self, size: [f64; 3]) -> Result<()> {
        self.geometry.set_cell_size(size)?;
        info!(?size, "cell size");
        Ok(())
    }

    pub fn set_periodic(&mut self, periodic: [usize; 3]) -> Result<()> {
        self.geometry.set_periodic(periodic)?;
        info!(?periodic, "periodicity");
        Ok(())
    }

    pub fn world_size(&self) -> Result<[f64; 3]> { self.geometry.world_size() }

    // --- Quantities ---

    pub fn contains(&self, name: &str) -> bool { self.registry.contains(name) }
    pub fn lookup(&self, name: &str) -> Result<QuantityId> { self.registry.lookup(name) }
    pub fn quantity(&self, name: &str) -> Result<&Quantity> { self.registry.quantity(name) }

    /// Creates a quantity. MASK and FIELD quantities are sized from the grid.
    /// Quantities created while a module loads are grouped under that module.
    pub fn add_quantity(&mut self, name: &str, ncomp: usize, kind: Kind, unit: Unit, description: &str) -> Result<QuantityId> {
        let size3d = if kind.is_space_dependent() { Some(self.geometry.require_grid()?) } else { None };
        let meta = QuantityMetadata::new(name, unit)
            .with_description(description)
            .with_group(self.loading.last().cloned());
        self.registry.add(meta, ncomp, kind, size3d)
    }

    pub fn add_scalar(&mut self, name: &str, unit: Unit, description: &str) -> Result<QuantityId> {
        self.add_quantity(name, SCALAR, Kind::Value, unit, description)
    }

    pub fn add_scalar_field(&mut self, name: &str, unit: Unit, description: &str) -> Result<QuantityId> {
        self.add_quantity(name, SCALAR, Kind::Field, unit, description)
    }

    pub fn add_vector_field(&mut self, name: &str, unit: Unit, description: &str) -> Result<QuantityId> {
        self.add_quantity(name, VECTOR, Kind::Field, unit, description)
    }

    pub fn add_tensor_field(&mut self, name: &str, unit: Unit, description: &str) -> Result<QuantityId> {
        self.add_quantity(name, TENSOR, Kind::Field, unit, description)
    }

    /// Returns the existing quantity if it matches, otherwise creates it.
    /// Meant for module loaders, which may run against an engine that already
    /// holds some of their quantities.
    pub fn ensure_quantity(&mut self, name: &str, ncomp: usize, kind: Kind, unit: Unit, description: &str) -> Result<QuantityId> {
        match self.registry.lookup(name) {
            Ok(id) => {
                let q = self.registry.get(id);
                q.check_kind(&[kind])?;
                q.check_comp(ncomp)?;
                Ok(id)
            }
            Err(_) => self.add_quantity(name, ncomp, kind, unit, description),
        }
    }

    /// Declares that `child` is computed from `parent`.
    pub fn depends(&mut self, child: &str, parent: &str) -> Result<()> {
        let (c, p) = (self.lookup(child)?, self.lookup(parent)?);
        self.registry.depends(c, p)
    }

    pub fn set_updater(&mut self, name: &str, updater: Updater) -> Result<()> {
        let id = self.lookup(name)?;
        self.registry.set_updater(id, updater);
        Ok(())
    }

    /// Creates a quantity computed as the (initially empty) sum of its terms.
    pub fn add_sum(&mut self, name: &str, ncomp: usize, kind: Kind, unit: Unit, description: &str) -> Result<QuantityId> {
        let id = self.add_quantity(name, ncomp, kind, unit, description)?;
        self.registry.set_updater(id, Updater::Sum(SumUpdater::new()));
        Ok(id)
    }

    /// Creates `term` with the shape and unit of `sum` and adds it as a term.
    /// The new term is a MASK for space-dependent sums, a VALUE otherwise.
    pub fn add_to(&mut self, sum: &str, term: &str) -> Result<QuantityId> {
        let sum_id = self.lookup(sum)?;
        let target = self.registry.get(sum_id);
        if target.updater().and_then(Updater::as_sum).is_none() {
            return Err(InvariantViolation::NotASum { name: sum.to_string() }.into());
        }
        let (ncomp, unit) = (target.ncomp(), target.unit().clone());
        let kind = if target.kind().is_space_dependent() { Kind::Mask } else { Kind::Value };
        let description = format!("term of {sum}");

        let term_id = self.add_quantity(term, ncomp, kind, unit, &description)?;
        self.add_term(sum_id, term_id)?;
        Ok(term_id)
    }

    /// Appends an existing quantity to a sum.
    pub fn add_term(&mut self, sum: QuantityId, term: QuantityId) -> Result<()> {
        let name = self.registry.get(sum).name().to_string();
        let updater = self.registry.updater_mut(sum).and_then(Updater::as_sum_mut);
        let Some(sum_updater) = updater else {
            return Err(InvariantViolation::NotASum { name }.into());
        };
        sum_updater.add_term(term);
        self.registry.depends(sum, term)?;
        debug!(sum = %name, term = self.registry.get(term).name(), "term added");
        Ok(())
    }

    /// Appends a `(time, value)` sample to a time-dependent quantity, making it
    /// time-dependent on first use.
    pub fn set_pointwise(&mut self, name: &str, time: f64, value: &[f64]) -> Result<()> {
        let id = self.lookup(name)?;
        let q = self.registry.get(id);
        q.check_kind(&[Kind::Value, Kind::Mask])?;
        let ncomp = q.ncomp();
        if value.len() != ncomp {
            return Err(InputError::ComponentMismatch { name: name.to_string(), expected: ncomp, actual: value.len() }.into());
        }
        let current = q.updater().map(|u| (matches!(u, Updater::Pointwise(_)), u.name().to_string()));
        match current {
            None => {
                self.registry.set_updater(id, Updater::Pointwise(PointwiseUpdater::new()));
                if !self.registry.has_dependency(id, self.time) {
                    self.registry.depends(id, self.time)?;
                }
            }
            Some((true, _)) => {}
            Some((false, updater)) => {
                return Err(InputError::AlreadyDetermined { name: name.to_string(), updater }.into());
            }
        }
        if let Some(p) = self.registry.updater_mut(id).and_then(Updater::as_pointwise_mut) {
            p.append(name, ncomp, time, value)?;
        }
        self.registry.mark_stale(id);
        debug!(quantity = name, time, ?value, "pointwise sample");
        Ok(())
    }

    /// Creates `name` holding the maximum absolute value of `input`.
    pub fn new_max_abs(&mut self, name: &str, input: &str) -> Result<QuantityId> {
        let input_id = self.lookup(input)?;
        let unit = self.registry.get(input_id).unit().clone();
        self.add_reduction(name, input_id, unit, Updater::MaxAbs(MaxAbsUpdater::new(input_id)))
    }

    /// Creates `name` holding the maximum norm of the vector `input`.
    pub fn new_max_norm(&mut self, name: &str, input: &str) -> Result<QuantityId> {
        let input_id = self.lookup(input)?;
        let q = self.registry.get(input_id);
        let updater = Updater::MaxNorm(MaxNormUpdater::new(input_id, q)?);
        let unit = q.unit().clone();
        self.add_reduction(name, input_id, unit, updater)
    }

    /// Creates `name` holding the largest value the scalar `input` has reached.
    pub fn new_peak(&mut self, name: &str, input: &str) -> Result<QuantityId> {
        let input_id = self.lookup(input)?;
        let q = self.registry.get(input_id);
        let updater = Updater::Peak(PeakUpdater::new(input_id, q)?);
        let unit = q.unit().clone();
        self.add_reduction(name, input_id, unit, updater)
    }

    fn add_reduction(&mut self, name: &str, input: QuantityId, unit: Unit, updater: Updater) -> Result<QuantityId> {
        let description = format!("{} of {}", updater.name(), self.registry.get(input).name());
        let id = self.add_quantity(name, SCALAR, Kind::Value, unit, &description)?;
        self.registry.depends(id, input)?;
        self.registry.set_updater(id, updater);
        Ok(id)
    }

    // --- Reads and writes by name ---

    pub fn value(&mut self, name: &str) -> Result<Vec<f64>> {
        let id = self.lookup(name)?;
        Ok(self.registry.value(id)?.to_vec())
    }

    pub fn scalar(&mut self, name: &str) -> Result<f64> {
        let id = self.lookup(name)?;
        self.registry.scalar(id)
    }

    pub fn buffer(&mut self, name: &str) -> Result<Array> {
        let id = self.lookup(name)?;
        self.registry.buffer(id)
    }

    pub fn get_cell(&mut self, name: &str, cell: [usize; 3]) -> Result<Vec<f64>> {
        let id = self.lookup(name)?;
        self.registry.cell(id, cell)
    }

    pub fn set_value(&mut self, name: &str, values: &[f64]) -> Result<()> {
        let id = self.lookup(name)?;
        self.registry.set_value(id, values)
    }

    pub fn set_scalar(&mut self, name: &str, value: f64) -> Result<()> {
        self.set_value(name, &[value])
    }

    pub fn set_mask(&mut self, name: &str, mask: Array) -> Result<()> {
        let id = self.lookup(name)?;
        self.registry.set_mask(id, mask)
    }

    pub fn set_field(&mut self, name: &str, field: Array) -> Result<()> {
        let id = self.lookup(name)?;
        self.registry.set_field(id, field)
    }

    pub fn set_cell(&mut self, name: &str, cell: [usize; 3], values: &[f64]) -> Result<()> {
        let id = self.lookup(name)?;
        self.registry.set_cell(id, cell, values)
    }

    pub fn invalidate(&mut self, name: &str) -> Result<()> {
        let id = self.lookup(name)?;
        self.registry.invalidate(id);
        Ok(())
    }

    // --- Modules ---

    /// Loads a module by name. Loading an already loaded module does nothing.
    pub fn load_module(&mut self, name: &str) -> Result<()> {
        if self.loaded.iter().any(|m| m == name) {
            return Ok(());
        }
        let modules = Arc::clone(&self.modules);
        let def = modules.get(name).ok_or_else(|| InputError::UnknownModule { name: name.to_string() })?;
        // Recorded before loading so that modules loading each other terminate.
        self.loaded.push(name.to_string());
        info!(module = name, "loading module");
        self.loading.push(name.to_string());
        let result = (def.loader)(self);
        self.loading.pop();
        if let Err(e) = result {
            self.loaded.retain(|m| m != name);
            return Err(e);
        }
        Ok(())
    }

    // --- Time stepping ---

    pub fn set_solver(&mut self, solver: Box<dyn Solver>) {
        info!(solver = solver.name(), state = self.registry.get(solver.state()).name(), "solver selected");
        self.solver = Some(solver);
    }

    /// Integrates `state` with forward Euler using `derivative`.
    pub fn use_euler(&mut self, state: &str, derivative: &str) -> Result<()> {
        let (y, dy) = (self.lookup(state)?, self.lookup(derivative)?);
        let (qy, qdy) = (self.registry.get(y), self.registry.get(dy));
        qdy.check_comp(qy.ncomp())?;
        self.set_solver(Box::new(EulerSolver::new(y, dy)));
        Ok(())
    }

    /// Takes one step of size `dt`, then fires due periodic actions.
    ///
    /// A failed step leaves the state, `t` and `step` untouched. Once the step
    /// is committed, failing actions are reported as [`EngineError::Actions`].
    pub fn step(&mut self) -> Result<()> {
        if self.state == SolverState::Stepping {
            return Err(InvariantViolation::SolverBusy.into());
        }
        let mut solver = self.solver.take().ok_or(InputError::NoSolver)?;
        self.state = SolverState::Stepping;
        let result = self.advance(&mut *solver);
        self.solver = Some(solver);
        self.state = SolverState::Idle;
        result?;
        self.notify()
    }

    fn advance(&mut self, solver: &mut dyn Solver) -> Result<()> {
        let dt = self.registry.scalar(self.dt)?;
        if !(dt > 0.0) {
            return Err(InputError::NonPositiveStep { dt }.into());
        }
        solver.advance(&mut self.registry, dt)?;

        let time = self.time() + dt;
        self.registry.set_scalar(self.time, time)?;
        let step = self.registry.get(self.step).multiplier()[0] + 1.0;
        self.registry.set_scalar(self.step, step)?;
        trace_event!(time, step, "step");
        Ok(())
    }

    pub fn steps(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    /// Steps until `duration` of simulated time has passed.
    pub fn run(&mut self, duration: f64) -> Result<()> {
        let stop = self.time() + duration;
        info!(duration, stop, "run");
        while self.time() < stop {
            self.step()?;
        }
        Ok(())
    }

    /// Steps until the scalar `name` drops below `threshold`. Returns whether it
    /// did within `max_steps` (unbounded if `None`).
    pub fn run_until_smaller(&mut self, name: &str, threshold: f64, max_steps: Option<u64>) -> Result<bool> {
        self.run_until(name, |v| v < threshold, max_steps)
    }

    /// Steps until the scalar `name` rises above `threshold`.
    pub fn run_until_larger(&mut self, name: &str, threshold: f64, max_steps: Option<u64>) -> Result<bool> {
        self.run_until(name, |v| v > threshold, max_steps)
    }

    fn run_until(&mut self, name: &str, reached: impl Fn(f64) -> bool, max_steps: Option<u64>) -> Result<bool> {
        let id = self.lookup(name)?;
        let mut taken = 0;
        while !reached(self.registry.scalar(id)?) {
            if max_steps.is_some_and(|max| taken >= max) {
                warn!(quantity = name, steps = taken, "step limit reached before the condition");
                return Ok(false);
            }
            self.step()?;
            taken += 1;
        }
        Ok(true)
    }

    // --- Periodic actions and output ---

    /// Runs every due action. A failing action does not stop the others and
    /// stays due, so it is retried after the next step.
    fn notify(&mut self) -> Result<()> {
        let time = self.time();
        let mut failures = Vec::new();
        for (handle, action) in self.handles.due(time) {
            let result = match action {
                Action::AutoSave { quantity, format } => {
                    let file = self.auto_filename(quantity, &format);
                    self.save_id(quantity, &format, &file)
                }
                Action::AutoTabulate { quantities, table } => self.tabulate_ids(&quantities, &table),
            };
            match result {
                Ok(()) => self.handles.mark_fired(handle, time),
                Err(error) => {
                    warn!(handle, time, %error, "periodic action failed");
                    failures.push(ActionFailure { handle, error: Box::new(error) });
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Actions { step: self.step_count(), failures })
        }
    }

    /// `<quantity><counter>.<format>`, the counter zero padded.
    fn auto_filename(&mut self, id: QuantityId, format: &str) -> String {
        let name = format!("{}{:0width$}.{}", self.registry.get(id).name(), self.output_id, format, width = self.filename_digits);
        self.output_id += 1;
        name
    }

    /// A fully updated copy of one quantity.
    pub fn snapshot(&mut self, name: &str) -> Result<Snapshot> {
        let id = self.lookup(name)?;
        self.snapshot_id(id)
    }

    fn snapshot_id(&mut self, id: QuantityId) -> Result<Snapshot> {
        self.registry.update(id)?;
        let buffer = if self.registry.get(id).kind().is_space_dependent() { Some(self.registry.buffer(id)?) } else { None };
        let q = self.registry.get(id);
        Ok(Snapshot {
            quantity: q.name().to_string(),
            unit: q.unit().to_string(),
            kind: q.kind(),
            time: self.time(),
            step: self.step_count(),
            multiplier: q.multiplier().to_vec(),
            buffer,
        })
    }

    fn save_id(&mut self, id: QuantityId, format: &str, file_name: &str) -> Result<()> {
        let snapshot = self.snapshot_id(id)?;
        self.sink.save(file_name, format, &snapshot)
    }

    /// Saves `name` to an automatically numbered file and returns its name.
    pub fn save(&mut self, name: &str, format: &str) -> Result<String> {
        let id = self.lookup(name)?;
        let file = self.auto_filename(id, format);
        self.save_id(id, format, &file)?;
        Ok(file)
    }

    pub fn save_as(&mut self, name: &str, format: &str, file_name: &str) -> Result<()> {
        let id = self.lookup(name)?;
        self.save_id(id, format, file_name)
    }

    /// Appends the current values of `quantities` as one row of `table`.
    pub fn tabulate(&mut self, quantities: &[&str], table: &str) -> Result<()> {
        let ids = quantities.iter().map(|n| self.lookup(n)).collect::<Result<Vec<_>>>()?;
        self.tabulate_ids(&ids, table)
    }

    fn tabulate_ids(&mut self, ids: &[QuantityId], table: &str) -> Result<()> {
        let mut header = Vec::new();
        let mut row = Vec::new();
        for &id in ids {
            let values = self.registry.value(id)?.to_vec();
            let q = self.registry.get(id);
            header.extend(column_labels(q.name(), &q.unit().0, q.ncomp()));
            row.extend(values);
        }
        self.sink.tabulate(table, &header, &row)
    }

    fn check_period(&self, period: f64) -> Result<()> {
        if !(period > 0.0) {
            return Err(InputError::Config(format!("period must be positive, got {period}")).into());
        }
        let dt = self.registry.get(self.dt).multiplier()[0];
        if dt > period {
            warn!(period, dt, "period shorter than the time step, actions will fire late");
        }
        Ok(())
    }

    pub fn auto_save(&mut self, name: &str, format: &str, period: f64) -> Result<usize> {
        let quantity = self.lookup(name)?;
        self.check_period(period)?;
        Ok(self.handles.register(Action::AutoSave { quantity, format: format.to_string() }, period))
    }

    pub fn auto_tabulate(&mut self, quantities: &[&str], table: &str, period: f64) -> Result<usize> {
        let ids = quantities.iter().map(|n| self.lookup(n)).collect::<Result<Vec<_>>>()?;
        self.check_period(period)?;
        Ok(self.handles.register(Action::AutoTabulate { quantities: ids, table: table.to_string() }, period))
    }

    pub fn remove_handle(&mut self, handle: usize) -> Result<()> {
        self.handles.remove(handle).map(|_| ())
    }

    // --- Introspection ---

    /// Checks the whole graph for dependency cycles.
    pub fn verify(&self) -> Result<()> {
        topology::sort(&self.registry).map(|_| ())
    }

    /// One line per quantity.
    pub fn dump(&self) -> String { trace::dump(&self.registry) }

    /// Graphviz source, edges pointing from parent to child.
    pub fn to_dot(&self) -> String { dot::to_dot(&self.registry) }

    /// Audit trace of one quantity and everything it depends on.
    pub fn trace(&mut self, name: &str) -> Result<String> {
        let id = self.lookup(name)?;
        self.registry.update(id)?;
        Ok(trace::Tracer::new(&self.registry).trace(id))
    }

    pub fn stats(&self) -> GraphStats { GraphStats::analyze(&self.registry) }
}
