//! Forward Euler: one derivative evaluation per step.
use super::Solver;
use crate::compute::ode::euler_step;
use crate::error::Result;
use crate::store::registry::Registry;
use crate::store::types::QuantityId;
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub struct EulerSolver {
    y: QuantityId,
    dy: QuantityId,
}

impl EulerSolver {
    pub fn new(y: QuantityId, dy: QuantityId) -> Self { Self { y, dy } }
}

impl Solver for EulerSolver {
    fn name(&self) -> &str { "euler" }
    fn state(&self) -> QuantityId { self.y }
    fn derivative(&self) -> QuantityId { self.dy }

    fn advance(&mut self, registry: &mut Registry, dt: f64) -> Result<()> {
        registry.update(self.dy)?;
        registry.update(self.y)?;

        // The state is taken out of the arena while the derivative is read in place.
        let mut y = std::mem::take(registry.storage_mut(self.y));
        let result = euler_step(
            registry.get(self.y).name(),
            &mut y,
            registry.get(self.y).size3d(),
            registry.get(self.dy).name(),
            registry.get(self.dy).storage(),
            dt,
        );
        *registry.storage_mut(self.y) = y;
        result?;

        registry.mark_modified(self.y);
        trace!(state = registry.get(self.y).name(), dt, "euler step");
        Ok(())
    }
}
