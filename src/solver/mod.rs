//! Time integration of a designated state quantity.
//!
//! A solver only combines state and derivative; advancing `t`, counting steps
//! and polling periodic actions is left to the [`Engine`](crate::engine::Engine).
mod euler;

pub use euler::EulerSolver;

use crate::error::Result;
use crate::store::registry::Registry;
use crate::store::types::QuantityId;
use std::fmt;

pub trait Solver: fmt::Debug + Send {
    fn name(&self) -> &str;

    /// The quantity being integrated.
    fn state(&self) -> QuantityId;

    /// Its time derivative.
    fn derivative(&self) -> QuantityId;

    /// Brings the derivative up to date, combines it into the state over `dt`
    /// and leaves the state valid with every descendant stale.
    fn advance(&mut self, registry: &mut Registry, dt: f64) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::updater::{Compute, UpdateContext, Updater};
    use crate::store::quantity::Storage;
    use crate::store::types::{Kind, QuantityMetadata, Unit, SCALAR, VECTOR};

    #[derive(Debug)]
    struct Negate {
        input: QuantityId,
    }

    impl Compute for Negate {
        fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut Storage) -> Result<()> {
            for (o, v) in out.multiplier.iter_mut().zip(ctx.value(self.input)) {
                *o = -v;
            }
            Ok(())
        }
        fn name(&self) -> &str { "negate" }
    }

    fn value(reg: &mut Registry, name: &str, ncomp: usize) -> QuantityId {
        reg.add(QuantityMetadata::new(name, Unit::default()), ncomp, Kind::Value, None).unwrap()
    }

    #[test]
    fn test_constant_derivative() {
        let mut reg = Registry::new();
        let y = value(&mut reg, "y", VECTOR);
        let dy = value(&mut reg, "dy", VECTOR);
        reg.set_value(y, &[1.0, 1.0, 1.0]).unwrap();
        reg.set_value(dy, &[2.0, 2.0, 2.0]).unwrap();

        let mut solver = EulerSolver::new(y, dy);
        solver.advance(&mut reg, 0.5).unwrap();
        assert_eq!(reg.value(y).unwrap(), &[2.0, 2.0, 2.0]);
        assert!(reg.get(y).is_valid());
    }

    #[test]
    fn test_state_write_invalidates_derivative() {
        let mut reg = Registry::new();
        let y = value(&mut reg, "y", SCALAR);
        let dy = value(&mut reg, "dy", SCALAR);
        reg.depends(dy, y).unwrap();
        reg.set_updater(dy, Updater::custom(Negate { input: y }));
        reg.set_scalar(y, 1.0).unwrap();

        let mut solver = EulerSolver::new(y, dy);
        solver.advance(&mut reg, 0.5).unwrap();
        assert_eq!(reg.scalar(y).unwrap(), 0.5);
        assert!(!reg.get(dy).is_valid());
        solver.advance(&mut reg, 0.5).unwrap();
        assert_eq!(reg.scalar(y).unwrap(), 0.25);
        assert_eq!(reg.get(dy).update_count(), 2);
    }

    #[test]
    fn test_mismatched_pair_leaves_state_untouched() {
        let mut reg = Registry::new();
        let y = value(&mut reg, "y", SCALAR);
        let dy = value(&mut reg, "dy", VECTOR);
        reg.set_scalar(y, 1.0).unwrap();
        reg.set_value(dy, &[1.0, 1.0, 1.0]).unwrap();
        let mut solver = EulerSolver::new(y, dy);
        assert!(solver.advance(&mut reg, 1.0).is_err());
        assert_eq!(reg.scalar(y).unwrap(), 1.0);
    }
}
