//! Modules shipped with the crate.
use super::ModuleRegistry;
use crate::compute::updater::{Compute, UpdateContext, Updater};
use crate::engine::Engine;
use crate::error::Result;
use crate::store::quantity::Storage;
use crate::store::types::{Kind, QuantityId, Unit, SCALAR, VECTOR};

pub(super) fn register_all(reg: &mut ModuleRegistry) -> Result<()> {
    reg.register("aexchange", "Exchange constant [J/m]", load_aexchange)?;
    reg.register("regions", "regionDefinition: regions", load_regions)?;
    reg.register("hfield", "Effective field H, the sum of all field terms [A/m]", load_hfield)?;
    reg.register("zeeman", "Externally applied field H_ext [A/m]", load_zeeman)?;
    reg.register("relax", "First-order relaxation dx/dt = -rate * (x - x_eq)", load_relax)?;
    Ok(())
}

fn load_aexchange(e: &mut Engine) -> Result<()> {
    e.ensure_quantity("Aex", SCALAR, Kind::Mask, Unit::new("J/m"), "exchange coefficient")?;
    Ok(())
}

fn load_regions(e: &mut Engine) -> Result<()> {
    e.ensure_quantity("regionDefinition", SCALAR, Kind::Mask, Unit::dimensionless(), "regions")?;
    Ok(())
}

fn load_hfield(e: &mut Engine) -> Result<()> {
    if !e.contains("H") {
        e.add_sum("H", VECTOR, Kind::Field, Unit::new("A/m"), "effective field")?;
    }
    Ok(())
}

fn load_zeeman(e: &mut Engine) -> Result<()> {
    e.load_module("hfield")?;
    if !e.contains("H_ext") {
        e.add_to("H", "H_ext")?;
    }
    Ok(())
}

fn load_relax(e: &mut Engine) -> Result<()> {
    let x = e.ensure_quantity("x", SCALAR, Kind::Value, Unit::dimensionless(), "relaxing variable")?;
    let x_eq = e.ensure_quantity("x_eq", SCALAR, Kind::Value, Unit::dimensionless(), "equilibrium value of x")?;
    let rate = e.ensure_quantity("rate", SCALAR, Kind::Value, Unit::new("1/s"), "relaxation rate")?;
    if !e.contains("dx_dt") {
        let dx = e.add_quantity("dx_dt", SCALAR, Kind::Value, Unit::new("1/s"), "time derivative of x")?;
        for parent in [x, x_eq, rate] {
            e.registry_mut().depends(dx, parent)?;
        }
        e.registry_mut().set_updater(dx, Updater::custom(Relaxation::new(x, x_eq, rate)));
    }
    e.use_euler("x", "dx_dt")
}

/// `dx/dt = -rate * (x - x_eq)`, component by component.
#[derive(Debug, Clone, PartialEq)]
pub struct Relaxation {
    x: QuantityId,
    x_eq: QuantityId,
    rate: QuantityId,
}

impl Relaxation {
    pub fn new(x: QuantityId, x_eq: QuantityId, rate: QuantityId) -> Self { Self { x, x_eq, rate } }
}

impl Compute for Relaxation {
    fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut Storage) -> Result<()> {
        let rate = ctx.scalar(self.rate)?;
        let x = ctx.value(self.x);
        let x_eq = ctx.value(self.x_eq);
        for ((o, v), eq) in out.multiplier.iter_mut().zip(x).zip(x_eq) {
            *o = -rate * (v - eq);
        }
        Ok(())
    }

    fn name(&self) -> &str { "relaxation" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingSink;
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(Arc::new(ModuleRegistry::with_builtins().unwrap()), RecordingSink::new()).unwrap()
    }

    #[test]
    fn test_aexchange_is_a_scalar_mask() {
        let mut e = engine();
        e.set_grid_size([1, 2, 2]).unwrap();
        e.load_module("aexchange").unwrap();
        let q = e.quantity("Aex").unwrap();
        assert_eq!(q.kind(), Kind::Mask);
        assert_eq!(q.unit().0, "J/m");
        e.set_scalar("Aex", 1.3e-11).unwrap();
        assert_eq!(e.scalar("Aex").unwrap(), 1.3e-11);
    }

    #[test]
    fn test_zeeman_sums_into_h() {
        let mut e = engine();
        e.set_grid_size([1, 1, 2]).unwrap();
        e.load_module("zeeman").unwrap();
        assert!(e.loaded_modules().contains(&"hfield".to_string()));
        e.set_value("H_ext", &[0.0, 0.0, 1e5]).unwrap();
        let h = e.buffer("H").unwrap();
        assert_eq!(h.component(2), &[1e5, 1e5]);
        assert!(h.component(0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_quantities_are_grouped_by_module() {
        let mut e = engine();
        e.set_grid_size([1, 1, 1]).unwrap();
        e.load_module("zeeman").unwrap();
        let group = |e: &Engine, name: &str| e.quantity(name).unwrap().meta().group.clone();
        assert_eq!(group(&e, "H").as_deref(), Some("hfield"));
        assert_eq!(group(&e, "H_ext").as_deref(), Some("zeeman"));
        assert_eq!(group(&e, "t"), None);
        assert_eq!(e.quantity("H").unwrap().meta().full_name(), "hfield.H");
        assert!(e.dump().contains("\thfield.H(H_ext) FIELD"));
        // Quantities added after loading are ungrouped again.
        e.add_scalar("E", Unit::new("J"), "energy").unwrap();
        assert_eq!(group(&e, "E"), None);
    }

    #[test]
    fn test_zeeman_follows_time() {
        let mut e = engine();
        e.set_grid_size([1, 1, 1]).unwrap();
        e.load_module("zeeman").unwrap();
        e.set_pointwise("H_ext", 0.0, &[0.0, 0.0, 0.0]).unwrap();
        e.set_pointwise("H_ext", 2.0, &[0.0, 0.0, 2.0]).unwrap();
        assert_eq!(e.buffer("H").unwrap().component(2), &[0.0]);

        e.load_module("relax").unwrap();
        e.set_scalar("x", 0.0).unwrap();
        e.set_scalar("x_eq", 0.0).unwrap();
        e.set_scalar("rate", 0.0).unwrap();
        e.set_scalar("dt", 0.5).unwrap();
        e.steps(2).unwrap();
        assert_eq!(e.buffer("H").unwrap().component(2), &[1.0]);
    }

    #[test]
    fn test_relaxation_decays_towards_equilibrium() {
        let mut e = engine();
        e.load_module("relax").unwrap();
        e.set_scalar("x", 1.0).unwrap();
        e.set_scalar("x_eq", 0.0).unwrap();
        e.set_scalar("rate", 1.0).unwrap();
        e.set_scalar("dt", 0.5).unwrap();
        e.steps(3).unwrap();
        assert_eq!(e.scalar("x").unwrap(), 0.125);
        assert_eq!(e.time(), 1.5);
        assert_eq!(e.quantity("dx_dt").unwrap().update_count(), 3);
    }

    #[test]
    fn test_loading_twice_is_a_no_op() {
        let mut e = engine();
        e.load_module("relax").unwrap();
        let count = e.registry().count();
        e.load_module("relax").unwrap();
        assert_eq!(e.registry().count(), count);
    }
}
