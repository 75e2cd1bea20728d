//! registry.rs
//! Arena of quantities addressed by `QuantityId`, plus the lazy update protocol.
//!
//! Reads pull: a stale quantity first brings its parents up to date, then runs
//! its own updater. Writes push: an external assignment immediately marks every
//! descendant stale. Between two writes each quantity is computed at most once.

use super::quantity::{Quantity, Storage};
use super::types::{Kind, QuantityId, QuantityMetadata};
use crate::compute::array::Array;
use crate::compute::updater::{UpdateContext, Updater};
use crate::error::{InputError, InvariantViolation, Result};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub struct Registry {
    quantities: Vec<Quantity>,
    by_name: HashMap<String, QuantityId>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.quantities.len() }

    pub fn edge_count(&self) -> usize {
        self.quantities.iter().map(|q| q.parents.len()).sum()
    }

    pub fn ids(&self) -> impl Iterator<Item = QuantityId> {
        (0..self.quantities.len()).map(QuantityId::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuantityId, &Quantity)> {
        self.quantities.iter().enumerate().map(|(i, q)| (QuantityId::new(i), q))
    }

    /// Every `(parent, child)` edge.
    pub fn edges(&self) -> impl Iterator<Item = (QuantityId, QuantityId)> + '_ {
        self.iter().flat_map(|(id, q)| q.parents.iter().map(move |&p| (p, id)))
    }

    /// Ids are only handed out by this registry, so an unknown id is a bug.
    #[inline(always)]
    pub fn get(&self, id: QuantityId) -> &Quantity { &self.quantities[id.index()] }

    pub fn contains(&self, name: &str) -> bool { self.by_name.contains_key(name) }

    pub fn lookup(&self, name: &str) -> Result<QuantityId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| InputError::UnknownQuantity { name: name.to_string() }.into())
    }

    pub fn quantity(&self, name: &str) -> Result<&Quantity> {
        Ok(self.get(self.lookup(name)?))
    }

    // --- Construction ---

    /// Adds a quantity. Space-dependent kinds need the grid size.
    pub fn add(&mut self, meta: QuantityMetadata, ncomp: usize, kind: Kind, size3d: Option<[usize; 3]>) -> Result<QuantityId> {
        if self.by_name.contains_key(&meta.name) {
            return Err(InvariantViolation::DuplicateQuantity { name: meta.name }.into());
        }
        if kind.is_space_dependent() && size3d.is_none() {
            return Err(InputError::GeometryNotSet { what: "grid size" }.into());
        }
        let id = QuantityId::new(self.quantities.len());
        debug!(quantity = %meta.name, ncomp, %kind, unit = %meta.unit, "add quantity");
        self.by_name.insert(meta.name.clone(), id);
        self.quantities.push(Quantity::new(meta, ncomp, kind, size3d));
        Ok(id)
    }

    /// Declares that `child` depends on `parent`. No cycle check is made here;
    /// a cycle is reported when it is first traversed by `update`.
    pub fn depends(&mut self, child: QuantityId, parent: QuantityId) -> Result<()> {
        if self.has_dependency(child, parent) {
            return Err(InvariantViolation::DuplicateDependency {
                child: self.get(child).name().to_string(),
                parent: self.get(parent).name().to_string(),
            }
            .into());
        }
        debug!(child = self.get(child).name(), parent = self.get(parent).name(), "add dependency");
        self.quantities[child.index()].parents.push(parent);
        self.quantities[parent.index()].children.push(child);
        self.mark_stale(child);
        Ok(())
    }

    pub fn has_dependency(&self, child: QuantityId, parent: QuantityId) -> bool {
        self.get(child).parents.contains(&parent)
    }

    /// Installs the computing function of `id`, replacing any previous one.
    pub fn set_updater(&mut self, id: QuantityId, updater: Updater) {
        debug!(quantity = self.get(id).name(), updater = updater.name(), "set updater");
        self.quantities[id.index()].updater = Some(updater);
        self.mark_stale(id);
    }

    pub(crate) fn updater_mut(&mut self, id: QuantityId) -> Option<&mut Updater> {
        self.quantities[id.index()].updater.as_mut()
    }

    // --- Validity protocol ---

    /// Marks `id` and all of its descendants stale. A no-op on a quantity that
    /// is already stale, whose descendants are then stale as well.
    pub fn invalidate(&mut self, id: QuantityId) {
        let q = &mut self.quantities[id.index()];
        if !q.valid {
            return;
        }
        q.valid = false;
        self.invalidate_descendants(id);
    }

    /// Unconditionally marks `id` stale and walks its descendants.
    pub(crate) fn mark_stale(&mut self, id: QuantityId) {
        self.quantities[id.index()].valid = false;
        self.invalidate_descendants(id);
    }

    fn invalidate_descendants(&mut self, id: QuantityId) {
        let mut stack: Vec<QuantityId> = self.quantities[id.index()].children.to_vec();
        while let Some(child) = stack.pop() {
            let q = &mut self.quantities[child.index()];
            if q.valid {
                q.valid = false;
                stack.extend_from_slice(&q.children);
            }
        }
    }

    /// Records that the storage of `id` was written from outside its updater.
    ///
    /// An input becomes valid with the new value. A computed quantity is marked
    /// stale so that its updater sees the new data on the next read.
    pub(crate) fn mark_modified(&mut self, id: QuantityId) {
        let q = &mut self.quantities[id.index()];
        q.assigned = true;
        q.valid = q.updater.is_none();
        self.invalidate_descendants(id);
    }

    /// Brings `id` up to date, recomputing stale ancestors first.
    pub fn update(&mut self, id: QuantityId) -> Result<()> {
        if self.quantities[id.index()].valid {
            return Ok(());
        }
        let mut visiting = HashSet::new();
        self.update_inner(id, &mut visiting)
    }

    fn update_inner(&mut self, id: QuantityId, visiting: &mut HashSet<QuantityId>) -> Result<()> {
        if self.quantities[id.index()].valid {
            return Ok(());
        }
        if !visiting.insert(id) {
            return Err(InvariantViolation::CycleDetected { name: self.get(id).name().to_string() }.into());
        }
        let parents = self.quantities[id.index()].parents.clone();
        for parent in parents {
            self.update_inner(parent, visiting)?;
        }
        self.run_updater(id)?;
        visiting.remove(&id);
        Ok(())
    }

    fn run_updater(&mut self, id: QuantityId) -> Result<()> {
        let idx = id.index();
        let Some(mut updater) = self.quantities[idx].updater.take() else {
            let q = &mut self.quantities[idx];
            if !q.assigned {
                return Err(InputError::Unassigned { name: q.meta.name.clone() }.into());
            }
            q.valid = true;
            return Ok(());
        };

        // The target's storage is lent to the updater; everything else is read
        // through the context.
        let mut storage = std::mem::take(&mut self.quantities[idx].storage);
        let result = {
            let ctx = UpdateContext::new(self, id);
            updater.compute(&ctx, &mut storage)
        };

        let q = &mut self.quantities[idx];
        q.storage = storage;
        q.updater = Some(updater);
        result?;
        q.valid = true;
        q.update_count += 1;
        trace!(quantity = %q.meta.name, count = q.update_count, "updated");
        Ok(())
    }

    // --- Reads (always up to date) ---

    pub fn value(&mut self, id: QuantityId) -> Result<&[f64]> {
        self.update(id)?;
        Ok(self.get(id).multiplier())
    }

    /// Fails without updating anything unless `id` has exactly one component.
    pub fn scalar(&mut self, id: QuantityId) -> Result<f64> {
        let q = self.get(id);
        if q.ncomp() != 1 {
            return Err(InputError::NotScalar { name: q.name().to_string(), ncomp: q.ncomp() }.into());
        }
        self.update(id)?;
        Ok(self.get(id).multiplier()[0])
    }

    /// The raw array (field data or explicit mask), if any.
    pub fn array(&mut self, id: QuantityId) -> Result<Option<&Array>> {
        self.get(id).check_kind(&[Kind::Mask, Kind::Field])?;
        self.update(id)?;
        Ok(self.get(id).storage.array.as_ref())
    }

    /// Multiplier times array, as a new array.
    pub fn buffer(&mut self, id: QuantityId) -> Result<Array> {
        self.get(id).check_kind(&[Kind::Mask, Kind::Field])?;
        self.update(id)?;
        Ok(self.get(id).effective_buffer()?)
    }

    /// A copy of the up-to-date storage.
    pub fn snapshot(&mut self, id: QuantityId) -> Result<Storage> {
        self.update(id)?;
        Ok(self.get(id).storage.clone())
    }

    /// Value of each component at one cell (internal axis order).
    pub fn cell(&mut self, id: QuantityId, cell: [usize; 3]) -> Result<Vec<f64>> {
        self.update(id)?;
        let q = self.get(id);
        let mul = q.multiplier();
        let Some(array) = q.storage.array.as_ref() else {
            if let Some(grid) = q.size3d {
                check_cell(q.name(), cell, grid)?;
            }
            return Ok(mul.to_vec());
        };
        check_cell(q.name(), cell, array.size3d())?;
        Ok(mul.iter().enumerate().map(|(c, m)| m * array.get(c, cell).unwrap_or(0.0)).collect())
    }

    // --- Writes (propagate immediately) ---

    /// Sets the multiplier of a VALUE or MASK quantity.
    pub fn set_value(&mut self, id: QuantityId, values: &[f64]) -> Result<()> {
        let q = self.get(id);
        q.check_kind(&[Kind::Value, Kind::Mask])?;
        check_len(q, values.len())?;
        self.quantities[id.index()].storage.multiplier.copy_from_slice(values);
        self.mark_modified(id);
        Ok(())
    }

    pub fn set_scalar(&mut self, id: QuantityId, value: f64) -> Result<()> {
        self.set_value(id, &[value])
    }

    /// Sets the space-dependent mask of a MASK quantity.
    pub fn set_mask(&mut self, id: QuantityId, mask: Array) -> Result<()> {
        let q = self.get(id);
        q.check_kind(&[Kind::Mask])?;
        check_array(q, &mask)?;
        self.quantities[id.index()].storage.array = Some(mask);
        self.mark_modified(id);
        Ok(())
    }

    /// Sets the array of a FIELD quantity. Refused when the multiplier is not
    /// all ones, since the caller probably meant the mask or the multiplier.
    pub fn set_field(&mut self, id: QuantityId, field: Array) -> Result<()> {
        let q = self.get(id);
        q.check_kind(&[Kind::Field])?;
        check_array(q, &field)?;
        if q.multiplier().iter().any(|&m| m != 1.0) {
            return Err(InputError::ScaledField { name: q.name().to_string(), multiplier: q.multiplier().to_vec() }.into());
        }
        self.quantities[id.index()].storage.array = Some(field);
        self.mark_modified(id);
        Ok(())
    }

    /// Overwrites one cell of a space-dependent quantity's array (or mask).
    pub fn set_cell(&mut self, id: QuantityId, cell: [usize; 3], values: &[f64]) -> Result<()> {
        let q = self.get(id);
        q.check_kind(&[Kind::Mask, Kind::Field])?;
        check_len(q, values.len())?;
        let grid = q.size3d.ok_or(InputError::GeometryNotSet { what: "grid size" })?;
        check_cell(q.name(), cell, grid)?;

        let ncomp = q.ncomp();
        let storage = &mut self.quantities[id.index()].storage;
        let array = storage.array.get_or_insert_with(|| Array::uniform(grid, &vec![1.0; ncomp]));
        for (c, &v) in values.iter().enumerate() {
            array.set(c, cell, v);
        }
        self.mark_modified(id);
        Ok(())
    }

    /// Storage for in-place writes by the solver. The caller must follow up
    /// with `mark_modified`.
    pub(crate) fn storage_mut(&mut self, id: QuantityId) -> &mut Storage {
        &mut self.quantities[id.index()].storage
    }
}

fn check_len(q: &Quantity, len: usize) -> Result<()> {
    if q.ncomp() != len {
        return Err(InputError::ComponentMismatch { name: q.name().to_string(), expected: q.ncomp(), actual: len }.into());
    }
    Ok(())
}

fn check_array(q: &Quantity, array: &Array) -> Result<()> {
    check_len(q, array.ncomp())?;
    let expected = q.size3d.ok_or(InputError::GeometryNotSet { what: "grid size" })?;
    if array.size3d() != expected {
        return Err(InputError::ShapeMismatch { name: q.name().to_string(), expected, actual: array.size3d() }.into());
    }
    Ok(())
}

fn check_cell(name: &str, cell: [usize; 3], grid: [usize; 3]) -> Result<()> {
    if cell.iter().zip(&grid).any(|(c, n)| c >= n) {
        return Err(InputError::CellOutOfRange { name: name.to_string(), cell, grid }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::topology;
    use crate::compute::updater::Compute;
    use crate::compute::sum::SumUpdater;
    use crate::error::EngineError;
    use crate::store::types::{Unit, SCALAR, VECTOR};
    use rstest::{fixture, rstest};

    /// `out = 2 * input`.
    #[derive(Debug)]
    struct Doubler {
        input: QuantityId,
    }

    impl Compute for Doubler {
        fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut crate::store::quantity::Storage) -> Result<()> {
            for (o, v) in out.multiplier.iter_mut().zip(ctx.value(self.input)) {
                *o = 2.0 * v;
            }
            Ok(())
        }
        fn name(&self) -> &str { "doubler" }
    }

    #[derive(Debug)]
    struct Failing;

    impl Compute for Failing {
        fn compute(&mut self, ctx: &UpdateContext<'_>, _out: &mut crate::store::quantity::Storage) -> Result<()> {
            Err(InputError::Unassigned { name: ctx.target_name().to_string() }.into())
        }
        fn name(&self) -> &str { "failing" }
    }

    fn value(reg: &mut Registry, name: &str, ncomp: usize) -> QuantityId {
        reg.add(QuantityMetadata::new(name, Unit::default()), ncomp, Kind::Value, None).unwrap()
    }

    fn doubled(reg: &mut Registry, name: &str, input: QuantityId) -> QuantityId {
        let ncomp = reg.get(input).ncomp();
        let id = value(reg, name, ncomp);
        reg.depends(id, input).unwrap();
        reg.set_updater(id, Updater::custom(Doubler { input }));
        id
    }

    /// Diamond: a -> b, a -> c, (b, c) -> d, plus an unrelated e -> f.
    struct Diamond {
        reg: Registry,
        a: QuantityId,
        b: QuantityId,
        c: QuantityId,
        d: QuantityId,
        e: QuantityId,
        f: QuantityId,
    }

    #[fixture]
    fn diamond() -> Diamond {
        let mut reg = Registry::new();
        let a = value(&mut reg, "a", SCALAR);
        let b = doubled(&mut reg, "b", a);
        let c = doubled(&mut reg, "c", a);
        let d = value(&mut reg, "d", SCALAR);
        let mut sum = SumUpdater::new();
        sum.add_term(b);
        sum.add_term(c);
        reg.depends(d, b).unwrap();
        reg.depends(d, c).unwrap();
        reg.set_updater(d, Updater::Sum(sum));
        let e = value(&mut reg, "e", SCALAR);
        let f = doubled(&mut reg, "f", e);
        reg.set_scalar(a, 1.0).unwrap();
        reg.set_scalar(e, 1.0).unwrap();
        Diamond { reg, a, b, c, d, e, f }
    }

    #[rstest]
    fn test_memoization(mut diamond: Diamond) {
        let d = diamond.d;
        assert_eq!(diamond.reg.scalar(d).unwrap(), 4.0);
        let counts: Vec<u64> = diamond.reg.iter().map(|(_, q)| q.update_count()).collect();
        assert_eq!(diamond.reg.scalar(d).unwrap(), 4.0);
        let again: Vec<u64> = diamond.reg.iter().map(|(_, q)| q.update_count()).collect();
        assert_eq!(counts, again);
    }

    #[rstest]
    fn test_shared_ancestor_computed_once_per_pass(mut diamond: Diamond) {
        diamond.reg.scalar(diamond.d).unwrap();
        diamond.reg.set_scalar(diamond.a, 3.0).unwrap();
        assert_eq!(diamond.reg.scalar(diamond.d).unwrap(), 12.0);
        assert_eq!(diamond.reg.get(diamond.b).update_count(), 2);
        assert_eq!(diamond.reg.get(diamond.c).update_count(), 2);
        assert_eq!(diamond.reg.get(diamond.d).update_count(), 2);
    }

    #[rstest]
    fn test_invalidation_reaches_exactly_the_descendants(mut diamond: Diamond) {
        let reg = &mut diamond.reg;
        reg.update(diamond.d).unwrap();
        reg.update(diamond.f).unwrap();
        assert!(reg.iter().all(|(_, q)| q.is_valid()));

        reg.invalidate(diamond.b);
        let reachable = topology::downstream_from(reg, &[diamond.b]);
        for (id, q) in reg.iter() {
            assert_eq!(!q.is_valid(), reachable.contains(&id), "{}", q.name());
        }
        assert!(reg.get(diamond.a).is_valid());
        assert!(reg.get(diamond.c).is_valid());
        assert!(reg.get(diamond.e).is_valid());
    }

    #[rstest]
    fn test_update_validates_all_ancestors(mut diamond: Diamond) {
        let reg = &mut diamond.reg;
        reg.update(diamond.d).unwrap();
        for id in topology::upstream_from(reg, &[diamond.d]) {
            assert!(reg.get(id).is_valid());
        }
        assert!(!reg.get(diamond.f).is_valid());
    }

    #[rstest]
    fn test_invalidate_is_idempotent(mut diamond: Diamond) {
        let reg = &mut diamond.reg;
        reg.update(diamond.d).unwrap();
        reg.invalidate(diamond.a);
        reg.invalidate(diamond.a);
        assert!(!reg.get(diamond.d).is_valid());
        // An input with a value simply revalidates.
        assert_eq!(reg.scalar(diamond.a).unwrap(), 1.0);
    }

    #[test]
    fn test_summation_of_values() {
        let mut reg = Registry::new();
        let a = value(&mut reg, "a", VECTOR);
        let b = value(&mut reg, "b", VECTOR);
        let c = value(&mut reg, "c", VECTOR);
        let s = value(&mut reg, "s", VECTOR);
        reg.set_value(a, &[1.0, 2.0, 3.0]).unwrap();
        reg.set_value(b, &[0.0, 1.0, 0.0]).unwrap();
        reg.set_value(c, &[1.0, 0.0, 0.0]).unwrap();
        let mut sum = SumUpdater::new();
        for t in [a, b, c] {
            sum.add_term(t);
            reg.depends(s, t).unwrap();
        }
        reg.set_updater(s, Updater::Sum(sum));
        assert_eq!(reg.value(s).unwrap(), &[2.0, 3.0, 3.0]);
    }

    #[test]
    fn test_summation_of_fields_and_masks() {
        let size = [1, 2, 2];
        let mut reg = Registry::new();
        let field = reg.add(QuantityMetadata::new("f", Unit::default()), SCALAR, Kind::Field, Some(size)).unwrap();
        let mask = reg.add(QuantityMetadata::new("m", Unit::default()), SCALAR, Kind::Mask, Some(size)).unwrap();
        let uniform = value(&mut reg, "u", SCALAR);
        let s = reg.add(QuantityMetadata::new("s", Unit::default()), SCALAR, Kind::Field, Some(size)).unwrap();

        reg.set_field(field, Array::from_components(size, vec![vec![1.0, 2.0, 3.0, 4.0]]).unwrap()).unwrap();
        reg.set_mask(mask, Array::from_components(size, vec![vec![1.0, 0.0, 1.0, 0.0]]).unwrap()).unwrap();
        reg.set_value(mask, &[10.0]).unwrap();
        reg.set_scalar(uniform, 0.5).unwrap();

        let mut sum = SumUpdater::new();
        for t in [field, mask, uniform] {
            sum.add_term(t);
            reg.depends(s, t).unwrap();
        }
        reg.set_updater(s, Updater::Sum(sum));
        let out = reg.buffer(s).unwrap();
        assert_eq!(out.component(0), &[11.5, 2.5, 13.5, 4.5]);
    }

    #[test]
    fn test_scalar_on_vector_fails_without_update() {
        let mut reg = Registry::new();
        let a = value(&mut reg, "a", VECTOR);
        let b = doubled(&mut reg, "b", a);
        reg.set_value(a, &[1.0, 2.0, 3.0]).unwrap();
        let err = reg.scalar(b).unwrap_err();
        assert!(matches!(err, EngineError::Input(InputError::NotScalar { ncomp: 3, .. })));
        assert!(!reg.get(b).is_valid());
        assert_eq!(reg.get(b).update_count(), 0);
    }

    #[test]
    fn test_duplicates_are_invariant_violations() {
        let mut reg = Registry::new();
        let a = value(&mut reg, "a", SCALAR);
        let b = value(&mut reg, "b", SCALAR);
        let err = reg.add(QuantityMetadata::new("a", Unit::default()), 1, Kind::Value, None).unwrap_err();
        assert!(err.is_fatal());
        reg.depends(b, a).unwrap();
        let err = reg.depends(b, a).unwrap_err();
        assert!(matches!(err, EngineError::Invariant(InvariantViolation::DuplicateDependency { .. })));
        assert_eq!(reg.edge_count(), 1);
    }

    #[test]
    fn test_unknown_name() {
        let reg = Registry::new();
        assert!(matches!(reg.lookup("nope"), Err(EngineError::Input(InputError::UnknownQuantity { .. }))));
    }

    #[test]
    fn test_reading_unassigned_input_fails() {
        let mut reg = Registry::new();
        let a = value(&mut reg, "a", SCALAR);
        let b = doubled(&mut reg, "b", a);
        assert!(matches!(reg.scalar(b), Err(EngineError::Input(InputError::Unassigned { .. }))));
        reg.set_scalar(a, 2.0).unwrap();
        assert_eq!(reg.scalar(b).unwrap(), 4.0);
    }

    #[test]
    fn test_cycle_is_reported_not_recursed() {
        let mut reg = Registry::new();
        let a = value(&mut reg, "a", SCALAR);
        let b = doubled(&mut reg, "b", a);
        let c = doubled(&mut reg, "c", b);
        reg.set_updater(a, Updater::custom(Doubler { input: c }));
        reg.depends(a, c).unwrap();
        let err = reg.update(c).unwrap_err();
        assert!(matches!(err, EngineError::Invariant(InvariantViolation::CycleDetected { .. })));
        assert!(!reg.get(c).is_valid());
    }

    #[test]
    fn test_failed_update_leaves_quantity_invalid() {
        let mut reg = Registry::new();
        let a = value(&mut reg, "a", SCALAR);
        reg.set_updater(a, Updater::custom(Failing));
        assert!(reg.update(a).is_err());
        assert!(!reg.get(a).is_valid());
        assert_eq!(reg.get(a).updater().map(|u| u.name()), Some("failing"));
        assert!(reg.update(a).is_err());
    }

    #[test]
    fn test_set_field_checks() {
        let size = [1, 1, 2];
        let mut reg = Registry::new();
        let f = reg.add(QuantityMetadata::new("f", Unit::default()), VECTOR, Kind::Field, Some(size)).unwrap();
        let wrong_size = Array::new(3, [1, 1, 3]);
        assert!(matches!(reg.set_field(f, wrong_size), Err(EngineError::Input(InputError::ShapeMismatch { .. }))));
        let wrong_comp = Array::new(1, size);
        assert!(matches!(reg.set_field(f, wrong_comp), Err(EngineError::Input(InputError::ComponentMismatch { .. }))));
        reg.storage_mut(f).multiplier[1] = 2.0;
        assert!(matches!(reg.set_field(f, Array::new(3, size)), Err(EngineError::Input(InputError::ScaledField { .. }))));
        assert!(matches!(reg.set_value(f, &[1.0, 1.0, 1.0]), Err(EngineError::Input(InputError::KindMismatch { .. }))));
    }

    #[test]
    fn test_cells() {
        let size = [1, 2, 2];
        let mut reg = Registry::new();
        let m = reg.add(QuantityMetadata::new("alpha", Unit::default()), SCALAR, Kind::Mask, Some(size)).unwrap();
        reg.set_scalar(m, 0.5).unwrap();
        reg.set_cell(m, [0, 1, 1], &[0.0]).unwrap();
        assert_eq!(reg.cell(m, [0, 0, 0]).unwrap(), vec![0.5]);
        assert_eq!(reg.cell(m, [0, 1, 1]).unwrap(), vec![0.0]);
        assert!(matches!(reg.cell(m, [1, 0, 0]), Err(EngineError::Input(InputError::CellOutOfRange { .. }))));
    }

    #[test]
    fn test_writes_to_computed_quantity_reinvalidate_it() {
        let mut reg = Registry::new();
        let a = value(&mut reg, "a", SCALAR);
        let b = doubled(&mut reg, "b", a);
        reg.set_scalar(a, 1.0).unwrap();
        assert_eq!(reg.scalar(b).unwrap(), 2.0);
        reg.set_scalar(b, 100.0).unwrap();
        assert!(!reg.get(b).is_valid());
        assert_eq!(reg.scalar(b).unwrap(), 2.0);
    }

    #[test]
    fn test_space_dependent_needs_grid() {
        let mut reg = Registry::new();
        let err = reg.add(QuantityMetadata::new("m", Unit::default()), VECTOR, Kind::Field, None).unwrap_err();
        assert!(matches!(err, EngineError::Input(InputError::GeometryNotSet { .. })));
        assert_eq!(reg.count(), 0);
    }
}
