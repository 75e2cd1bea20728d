//! Explicit (forward) Euler combination: `y <- y + dt * dy`.
use crate::compute::array::Array;
use crate::error::{InputError, Result};
use crate::store::quantity::Storage;

/// Advances `y` by `dt * dy`. `grid` is the state's grid when it is
/// space-dependent; a MASK without an explicit mask is expanded over it when
/// the derivative varies in space.
pub fn euler_step(y_name: &str, y: &mut Storage, grid: Option<[usize; 3]>, dy_name: &str, dy: &Storage, dt: f64) -> Result<()> {
    if y.ncomp() != dy.ncomp() {
        return Err(InputError::ComponentMismatch { name: dy_name.to_string(), expected: y.ncomp(), actual: dy.ncomp() }.into());
    }
    // One scalar step size only applies if the derivative is scaled uniformly.
    if dy.array.is_some() && !dy.is_uniform() {
        return Err(InputError::NonUniformMultiplier { name: dy_name.to_string(), values: dy.multiplier.to_vec() }.into());
    }
    match (&y.array, &dy.array) {
        (None, Some(da)) => {
            let Some(grid) = grid else {
                return Err(InputError::KindMismatch {
                    name: y_name.to_string(),
                    expected: "MASK, FIELD".into(),
                    actual: "VALUE".into(),
                }
                .into());
            };
            if grid != da.size3d() {
                return Err(InputError::ShapeMismatch { name: dy_name.to_string(), expected: grid, actual: da.size3d() }.into());
            }
        }
        (Some(ya), Some(da)) if !ya.same_shape(da) => {
            return Err(InputError::ShapeMismatch { name: dy_name.to_string(), expected: ya.size3d(), actual: da.size3d() }.into());
        }
        _ => {}
    }
    if y.array.is_none() && dy.array.is_some() {
        if let Some(grid) = grid {
            y.array = Some(Array::uniform(grid, &vec![1.0; y.ncomp()]));
        }
    }

    let Some(ya) = y.array.as_mut() else {
        for (v, d) in y.multiplier.iter_mut().zip(&dy.multiplier) {
            *v += dt * d;
        }
        return Ok(());
    };

    // The increment applies to the effective value, so the state's own
    // multiplier is folded into its array first.
    for (c, m) in y.multiplier.iter_mut().enumerate() {
        if *m != 1.0 {
            ya.scale_component(c, *m);
            *m = 1.0;
        }
    }
    match dy.array.as_ref() {
        Some(da) => ya.madd(da, dt * dy.multiplier[0]),
        None => {
            for (c, &d) in dy.multiplier.iter().enumerate() {
                ya.add_uniform(c, dt * d);
            }
        }
    }
    ya.sync();
    Ok(())
}
