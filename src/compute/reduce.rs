//! Reductions of a quantity to a single scalar.
use super::updater::UpdateContext;
use crate::error::Result;
use crate::store::quantity::{Quantity, Storage};
use crate::store::types::{Kind, QuantityId, SCALAR, VECTOR};

/// Maximum absolute value over all components (and cells).
#[derive(Debug, Clone, PartialEq)]
pub struct MaxAbsUpdater {
    input: QuantityId,
}

impl MaxAbsUpdater {
    pub fn new(input: QuantityId) -> Self { Self { input } }

    pub fn input(&self) -> QuantityId { self.input }

    pub(crate) fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut Storage) -> Result<()> {
        let mul = ctx.value(self.input);
        let max = match ctx.array(self.input) {
            Some(a) => {
                a.sync();
                a.max_abs(mul)
            }
            None => mul.iter().fold(0.0, |acc: f64, v| acc.max(v.abs())),
        };
        out.multiplier[0] = max;
        Ok(())
    }
}

/// Maximum Euclidean norm of a three-component quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxNormUpdater {
    input: QuantityId,
}

impl MaxNormUpdater {
    /// Fails unless `input` has three components.
    pub fn new(id: QuantityId, input: &Quantity) -> Result<Self> {
        input.check_comp(VECTOR)?;
        Ok(Self { input: id })
    }

    pub fn input(&self) -> QuantityId { self.input }

    pub(crate) fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut Storage) -> Result<()> {
        let mul = ctx.value(self.input);
        let max = match ctx.array(self.input) {
            Some(a) => {
                a.sync();
                a.max_norm(mul)
            }
            None => mul.iter().map(|v| v * v).sum::<f64>().sqrt(),
        };
        out.multiplier[0] = max;
        Ok(())
    }
}

/// Holds the largest value a scalar has reached so far.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakUpdater {
    input: QuantityId,
    peak: Option<f64>,
}

impl PeakUpdater {
    /// Fails unless `input` is a space-independent scalar.
    pub fn new(id: QuantityId, input: &Quantity) -> Result<Self> {
        input.check_kind(&[Kind::Value])?;
        input.check_comp(SCALAR)?;
        Ok(Self { input: id, peak: None })
    }

    pub fn input(&self) -> QuantityId { self.input }

    pub(crate) fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut Storage) -> Result<()> {
        let v = ctx.scalar(self.input)?;
        let peak = self.peak.map_or(v, |p| p.max(v));
        self.peak = Some(peak);
        out.multiplier[0] = peak;
        Ok(())
    }
}
