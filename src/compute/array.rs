//! Host implementation of the storage backend.
//!
//! The engine core never looks at raw buffer contents; it only asks the backend
//! to zero, combine (`madd`), reduce and synchronize arrays and to report their
//! shape. Data is stored component-major: one contiguous slice per component.
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Buffers at least this long are processed on the rayon pool.
const PAR_THRESHOLD: usize = 1 << 14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    size3d: [usize; 3],
    data: Vec<Vec<f64>>,
}

impl Array {
    /// A zero-filled array with `ncomp` components over `size3d` cells.
    pub fn new(ncomp: usize, size3d: [usize; 3]) -> Self {
        let cells = size3d.iter().product();
        Self { size3d, data: vec![vec![0.0; cells]; ncomp] }
    }

    /// An array holding `values[c]` in every cell of component `c`.
    pub fn uniform(size3d: [usize; 3], values: &[f64]) -> Self {
        let cells = size3d.iter().product();
        Self { size3d, data: values.iter().map(|&v| vec![v; cells]).collect() }
    }

    /// Builds an array from per-component data. Returns `None` when a component
    /// does not hold exactly one value per cell.
    pub fn from_components(size3d: [usize; 3], data: Vec<Vec<f64>>) -> Option<Self> {
        let cells: usize = size3d.iter().product();
        if data.is_empty() || data.iter().any(|c| c.len() != cells) {
            return None;
        }
        Some(Self { size3d, data })
    }

    pub fn ncomp(&self) -> usize { self.data.len() }
    pub fn size3d(&self) -> [usize; 3] { self.size3d }
    /// Number of cells per component.
    pub fn cells(&self) -> usize { self.size3d.iter().product() }

    pub fn same_shape(&self, other: &Array) -> bool {
        self.size3d == other.size3d && self.ncomp() == other.ncomp()
    }

    pub fn component(&self, c: usize) -> &[f64] { &self.data[c] }
    pub fn component_mut(&mut self, c: usize) -> &mut [f64] { &mut self.data[c] }

    #[inline]
    fn cell_index(&self, cell: [usize; 3]) -> Option<usize> {
        let [n0, n1, n2] = self.size3d;
        if cell[0] >= n0 || cell[1] >= n1 || cell[2] >= n2 {
            return None;
        }
        Some((cell[0] * n1 + cell[1]) * n2 + cell[2])
    }

    /// Value of component `c` at `cell` (internal axis order).
    pub fn get(&self, c: usize, cell: [usize; 3]) -> Option<f64> {
        let i = self.cell_index(cell)?;
        self.data.get(c).map(|comp| comp[i])
    }

    pub fn set(&mut self, c: usize, cell: [usize; 3], value: f64) -> bool {
        match (self.cell_index(cell), self.data.get_mut(c)) {
            (Some(i), Some(comp)) => {
                comp[i] = value;
                true
            }
            _ => false,
        }
    }

    pub fn zero(&mut self) {
        for comp in &mut self.data {
            fill(comp, 0.0);
        }
    }

    /// `self += other * scale`, component by component.
    pub fn madd(&mut self, other: &Array, scale: f64) {
        debug_assert!(self.same_shape(other));
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            madd_slice(dst, src, scale);
        }
    }

    /// `self[c] += other[c] * scale[c]`, with a separate scale per component.
    pub fn madd_per_component(&mut self, other: &Array, scale: &[f64]) {
        debug_assert!(self.same_shape(other));
        for ((dst, src), &s) in self.data.iter_mut().zip(&other.data).zip(scale) {
            madd_slice(dst, src, s);
        }
    }

    /// Adds a uniform value to every cell of component `c`.
    pub fn add_uniform(&mut self, c: usize, value: f64) {
        let comp = &mut self.data[c];
        if comp.len() >= PAR_THRESHOLD {
            comp.par_iter_mut().for_each(|v| *v += value);
        } else {
            comp.iter_mut().for_each(|v| *v += value);
        }
    }

    pub fn scale_component(&mut self, c: usize, factor: f64) {
        let comp = &mut self.data[c];
        if comp.len() >= PAR_THRESHOLD {
            comp.par_iter_mut().for_each(|v| *v *= factor);
        } else {
            comp.iter_mut().for_each(|v| *v *= factor);
        }
    }

    /// Largest `|multiplier[c] * self[c][i]|` over all components and cells.
    pub fn max_abs(&self, multiplier: &[f64]) -> f64 {
        self.data
            .iter()
            .zip(multiplier)
            .map(|(comp, &m)| {
                let peak = if comp.len() >= PAR_THRESHOLD {
                    comp.par_iter().map(|v| v.abs()).reduce(|| 0.0, f64::max)
                } else {
                    comp.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
                };
                peak * m.abs()
            })
            .fold(0.0, f64::max)
    }

    /// Largest Euclidean norm of the scaled 3-vector over all cells.
    /// Only meaningful for three-component arrays.
    pub fn max_norm(&self, multiplier: &[f64]) -> f64 {
        if self.ncomp() != 3 || multiplier.len() != 3 {
            return 0.0;
        }
        let (x, y, z) = (&self.data[0], &self.data[1], &self.data[2]);
        let (mx, my, mz) = (multiplier[0], multiplier[1], multiplier[2]);
        let norm2 = |i: usize| {
            let (a, b, c) = (mx * x[i], my * y[i], mz * z[i]);
            a * a + b * b + c * c
        };
        let n = self.cells();
        let peak = if n >= PAR_THRESHOLD {
            (0..n).into_par_iter().map(norm2).reduce(|| 0.0, f64::max)
        } else {
            (0..n).map(norm2).fold(0.0, f64::max)
        };
        peak.sqrt()
    }

    /// Blocks until outstanding device work on this array is complete.
    /// Host arrays have no asynchronous work, so this returns immediately.
    pub fn sync(&self) {}
}

fn fill(dst: &mut [f64], value: f64) {
    if dst.len() >= PAR_THRESHOLD {
        dst.par_iter_mut().for_each(|v| *v = value);
    } else {
        dst.fill(value);
    }
}

fn madd_slice(dst: &mut [f64], src: &[f64], scale: f64) {
    if dst.len() >= PAR_THRESHOLD {
        dst.par_iter_mut().zip(src.par_iter()).for_each(|(d, s)| *d += s * scale);
    } else {
        dst.iter_mut().zip(src).for_each(|(d, s)| *d += s * scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_madd_scales_source() {
        let mut y = Array::uniform([1, 2, 2], &[1.0, 1.0, 1.0]);
        let dy = Array::uniform([1, 2, 2], &[2.0, 4.0, -2.0]);
        y.madd(&dy, 0.5);
        assert!(y.component(0).iter().all(|&v| v == 2.0));
        assert!(y.component(1).iter().all(|&v| v == 3.0));
        assert!(y.component(2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_parallel_path_matches_serial() {
        let cells = PAR_THRESHOLD + 7;
        let mut a = Array::uniform([1, 1, cells], &[1.0]);
        let b = Array::uniform([1, 1, cells], &[3.0]);
        a.madd(&b, 2.0);
        a.add_uniform(0, 1.0);
        assert!(a.component(0).iter().all(|&v| v == 8.0));
        assert_eq!(a.max_abs(&[0.5]), 4.0);
    }

    #[test]
    fn test_cell_indexing_is_row_major() {
        let mut a = Array::new(1, [2, 3, 4]);
        assert!(a.set(0, [1, 2, 3], 9.0));
        assert_eq!(a.component(0)[23], 9.0);
        assert_eq!(a.get(0, [1, 2, 3]), Some(9.0));
        assert_eq!(a.get(0, [2, 0, 0]), None);
        assert!(!a.set(1, [0, 0, 0], 1.0));
    }

    #[rstest]
    #[case([3.0, 4.0, 0.0], [1.0, 1.0, 1.0], 5.0)]
    #[case([1.0, 0.0, 0.0], [2.0, 1.0, 1.0], 2.0)]
    #[case([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0.0)]
    fn test_max_norm(#[case] v: [f64; 3], #[case] mul: [f64; 3], #[case] expected: f64) {
        let a = Array::uniform([1, 1, 3], &v);
        assert!((a.max_norm(&mul) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_from_components_rejects_ragged_data() {
        assert!(Array::from_components([1, 1, 2], vec![vec![1.0, 2.0], vec![1.0]]).is_none());
        assert!(Array::from_components([1, 1, 2], vec![]).is_none());
        let a = Array::from_components([1, 1, 2], vec![vec![1.0, -7.0]]).unwrap();
        assert_eq!(a.max_abs(&[1.0]), 7.0);
    }
}
