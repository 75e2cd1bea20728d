//! The updater polymorphism surface.
//!
//! Built-in updaters form a closed set and are dispatched through the
//! [`Updater`] enum. Physics terms from outside this crate plug in through the
//! open [`Compute`] trait and are boxed into [`Updater::Custom`].
use super::pointwise::PointwiseUpdater;
use super::reduce::{MaxAbsUpdater, MaxNormUpdater, PeakUpdater};
use super::sum::SumUpdater;
use crate::compute::array::Array;
use crate::error::{InputError, Result};
use crate::store::quantity::{Quantity, Storage};
use crate::store::registry::Registry;
use crate::store::types::{names, QuantityId};
use std::fmt;

/// Computes a quantity from its (already valid) parents.
///
/// Implementations read parent data through the [`UpdateContext`] and write
/// the result into `out`, which is the target quantity's own storage. If the
/// work is offloaded to a device, `compute` must synchronize before returning.
pub trait Compute: fmt::Debug + Send {
    fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut Storage) -> Result<()>;

    /// Short tag shown in dumps, traces and error messages.
    fn name(&self) -> &str;
}

#[derive(Debug)]
pub enum Updater {
    Pointwise(PointwiseUpdater),
    Sum(SumUpdater),
    MaxAbs(MaxAbsUpdater),
    MaxNorm(MaxNormUpdater),
    Peak(PeakUpdater),
    Custom(Box<dyn Compute>),
}

impl Updater {
    pub fn custom(c: impl Compute + 'static) -> Self {
        Updater::Custom(Box::new(c))
    }

    pub fn name(&self) -> &str {
        match self {
            Updater::Pointwise(_) => "pointwise",
            Updater::Sum(_) => "sum",
            Updater::MaxAbs(_) => "maxabs",
            Updater::MaxNorm(_) => "maxnorm",
            Updater::Peak(_) => "peak",
            Updater::Custom(c) => c.name(),
        }
    }

    pub(crate) fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut Storage) -> Result<()> {
        match self {
            Updater::Pointwise(u) => u.compute(ctx, out),
            Updater::Sum(u) => u.compute(ctx, out),
            Updater::MaxAbs(u) => u.compute(ctx, out),
            Updater::MaxNorm(u) => u.compute(ctx, out),
            Updater::Peak(u) => u.compute(ctx, out),
            Updater::Custom(u) => u.compute(ctx, out),
        }
    }

    pub fn as_sum(&self) -> Option<&SumUpdater> {
        match self { Updater::Sum(s) => Some(s), _ => None }
    }

    pub fn as_sum_mut(&mut self) -> Option<&mut SumUpdater> {
        match self { Updater::Sum(s) => Some(s), _ => None }
    }

    pub fn as_pointwise_mut(&mut self) -> Option<&mut PointwiseUpdater> {
        match self { Updater::Pointwise(p) => Some(p), _ => None }
    }
}

/// Read-only view of the graph handed to an updater.
///
/// The target's own storage is lent out separately as `out`, so it is not
/// visible here; every other quantity is.
pub struct UpdateContext<'a> {
    registry: &'a Registry,
    target: QuantityId,
}

impl<'a> UpdateContext<'a> {
    pub(crate) fn new(registry: &'a Registry, target: QuantityId) -> Self {
        Self { registry, target }
    }

    pub fn target(&self) -> QuantityId { self.target }
    pub fn target_quantity(&self) -> &'a Quantity { self.registry.get(self.target) }
    pub fn target_name(&self) -> &'a str { self.registry.get(self.target).name() }

    pub fn quantity(&self, id: QuantityId) -> &'a Quantity { self.registry.get(id) }

    pub fn lookup(&self, name: &str) -> Result<QuantityId> {
        self.registry.lookup(name)
    }

    /// Multiplier of a parent.
    pub fn value(&self, id: QuantityId) -> &'a [f64] {
        self.registry.get(id).multiplier()
    }

    pub fn scalar(&self, id: QuantityId) -> Result<f64> {
        let q = self.registry.get(id);
        if q.ncomp() != 1 {
            return Err(InputError::NotScalar { name: q.name().to_string(), ncomp: q.ncomp() }.into());
        }
        Ok(q.multiplier()[0])
    }

    /// Raw array (field data or mask) of a parent, if it has one.
    pub fn array(&self, id: QuantityId) -> Option<&'a Array> {
        self.registry.get(id).storage().array.as_ref()
    }

    /// Current simulated time.
    pub fn time(&self) -> Result<f64> {
        self.scalar(self.lookup(names::TIME)?)
    }
}
