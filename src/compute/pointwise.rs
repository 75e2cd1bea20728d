//! Piecewise-linear interpolation of a quantity's value in time.
use super::updater::UpdateContext;
use crate::error::{InputError, Result};
use crate::store::quantity::Storage;
use smallvec::SmallVec;
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
struct Sample {
    time: f64,
    value: SmallVec<[f64; 9]>,
}

#[derive(Debug, Clone, Default)]
pub struct PointwiseUpdater {
    samples: Vec<Sample>,
    /// Index of the upper bracket found by the previous lookup.
    last_idx: usize,
}

impl PointwiseUpdater {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.samples.len() }
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    /// Appends a `(time, value)` sample. Samples must come in non-decreasing
    /// time order and carry `ncomp` values.
    pub fn append(&mut self, name: &str, ncomp: usize, time: f64, value: &[f64]) -> Result<()> {
        if value.len() != ncomp {
            return Err(InputError::ComponentMismatch { name: name.to_string(), expected: ncomp, actual: value.len() }.into());
        }
        if let Some(last) = self.samples.last() {
            if last.time > time {
                return Err(InputError::OutOfOrderSample { name: name.to_string(), previous: last.time, time }.into());
            }
        }
        self.samples.push(Sample { time, value: SmallVec::from_slice(value) });
        Ok(())
    }

    pub(crate) fn compute(&mut self, ctx: &UpdateContext<'_>, out: &mut Storage) -> Result<()> {
        if self.samples.len() < 2 {
            return Err(InputError::TooFewSamples { name: ctx.target_name().to_string(), count: self.samples.len() }.into());
        }
        let time = ctx.time()?;
        self.interpolate_into(time, &mut out.multiplier);
        trace!(quantity = ctx.target_name(), time, value = ?out.multiplier, "pointwise update");
        Ok(())
    }

    fn interpolate_into(&mut self, time: f64, dst: &mut [f64]) {
        let pts = &self.samples;
        let n = pts.len();

        // Outside the sampled range the value is held, not extrapolated.
        if time <= pts[0].time {
            dst.copy_from_slice(&pts[0].value);
            return;
        }
        if time >= pts[n - 1].time {
            dst.copy_from_slice(&pts[n - 1].value);
            return;
        }

        // Multi-stage solvers may step back in time: search backward first.
        let mut i = self.last_idx.clamp(1, n - 1);
        while i > 1 && pts[i - 1].time >= time {
            i -= 1;
        }
        while i < n - 1 && pts[i].time < time {
            i += 1;
        }
        // Now pts[i-1].time < time <= pts[i].time.
        self.last_idx = i;

        let (lo, hi) = (&pts[i - 1], &pts[i]);
        let frac = (time - lo.time) / (hi.time - lo.time);
        for ((d, v1), v2) in dst.iter_mut().zip(&lo.value).zip(&hi.value) {
            *d = v1 + frac * (v2 - v1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ramp() -> PointwiseUpdater {
        let mut p = PointwiseUpdater::new();
        p.append("B", 1, 0.0, &[0.0]).unwrap();
        p.append("B", 1, 10.0, &[10.0]).unwrap();
        p
    }

    #[rstest]
    #[case(5.0, 5.0)]
    #[case(-1.0, 0.0)]
    #[case(20.0, 10.0)]
    #[case(0.0, 0.0)]
    #[case(10.0, 10.0)]
    fn test_interpolation_and_clamping(#[case] time: f64, #[case] expected: f64) {
        let mut p = ramp();
        let mut out = [f64::NAN];
        p.interpolate_into(time, &mut out);
        assert!((out[0] - expected).abs() < 1e-12, "t={} got {}", time, out[0]);
    }

    #[test]
    fn test_backward_then_forward_scan() {
        let mut p = PointwiseUpdater::new();
        for (t, v) in [(0.0, 0.0), (1.0, 10.0), (2.0, 0.0), (3.0, 30.0)] {
            p.append("x", 1, t, &[v]).unwrap();
        }
        let mut out = [0.0];
        p.interpolate_into(2.5, &mut out);
        assert_eq!(out[0], 15.0);
        assert_eq!(p.last_idx, 3);
        // A solver stage revisiting an earlier time.
        p.interpolate_into(0.5, &mut out);
        assert_eq!(out[0], 5.0);
        assert_eq!(p.last_idx, 1);
        p.interpolate_into(1.5, &mut out);
        assert_eq!(out[0], 5.0);
    }

    #[test]
    fn test_step_function_with_repeated_time() {
        let mut p = PointwiseUpdater::new();
        p.append("j", 1, 0.0, &[0.0]).unwrap();
        p.append("j", 1, 1.0, &[0.0]).unwrap();
        p.append("j", 1, 1.0, &[5.0]).unwrap();
        p.append("j", 1, 2.0, &[5.0]).unwrap();
        let mut out = [0.0];
        p.interpolate_into(1.5, &mut out);
        assert_eq!(out[0], 5.0);
        p.interpolate_into(0.5, &mut out);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_append_rejects_out_of_order() {
        let mut p = ramp();
        let err = p.append("B", 1, 5.0, &[1.0]).unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Input(InputError::OutOfOrderSample { .. })));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_append_rejects_wrong_component_count() {
        let mut p = PointwiseUpdater::new();
        assert!(p.append("H", 3, 0.0, &[1.0]).is_err());
        assert!(p.is_empty());
    }
}
