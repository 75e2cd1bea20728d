//! Component-wise summation of a list of terms.
use super::updater::UpdateContext;
use crate::error::{InputError, Result};
use crate::store::quantity::Storage;
use crate::store::types::{Kind, QuantityId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SumUpdater {
    terms: Vec<QuantityId>,
}

impl SumUpdater {
    pub fn new() -> Self { Self::default() }

    pub fn terms(&self) -> &[QuantityId] { &self.terms }

    /// Appends a term. The caller also declares the dependency edge.
    pub(crate) fn add_term(&mut self, term: QuantityId) {
        self.terms.push(term);
    }

    pub(crate) fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut Storage) -> Result<()> {
        let ncomp = out.ncomp();
        for &id in &self.terms {
            let term = ctx.quantity(id);
            if term.ncomp() != ncomp {
                return Err(InputError::ComponentMismatch { name: term.name().to_string(), expected: ncomp, actual: term.ncomp() }.into());
            }
        }

        match out.array.as_mut() {
            // Space-dependent sum: accumulate into the array.
            Some(acc) => {
                acc.zero();
                for &id in &self.terms {
                    let term = ctx.quantity(id);
                    match ctx.array(id) {
                        Some(src) => {
                            if !src.same_shape(acc) {
                                return Err(InputError::ShapeMismatch {
                                    name: term.name().to_string(),
                                    expected: acc.size3d(),
                                    actual: src.size3d(),
                                }
                                .into());
                            }
                            acc.madd_per_component(src, term.multiplier());
                        }
                        None => {
                            for (c, &m) in term.multiplier().iter().enumerate() {
                                acc.add_uniform(c, m);
                            }
                        }
                    }
                }
                acc.sync();
            }
            // Space-independent sum: add the multipliers.
            None => {
                out.multiplier.iter_mut().for_each(|v| *v = 0.0);
                for &id in &self.terms {
                    let term = ctx.quantity(id);
                    term.check_kind(&[Kind::Value])?;
                    for (acc, v) in out.multiplier.iter_mut().zip(term.multiplier()) {
                        *acc += v;
                    }
                }
            }
        }
        Ok(())
    }
}
