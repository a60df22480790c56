//! Elastic QP subproblem handed to OSQP.
//!
//! Variables are `w = [d, p, q]`: the step and two non-negative slacks per row. The rows read
//! `row_lower - g <= J d + p - q <= row_upper - g`, so the subproblem is feasible for any
//! linearization and `Σ (p + q)` measures how much linearized violation is left.

use std::borrow::Cow;

use log::debug;
use nalgebra::DMatrix;
use osqp::{CscMatrix, Problem, Settings};

use crate::scaled::{Derivatives, HessianBlock, ScaledProblem};

/// OSQP treats magnitudes above this as infinite.
const OSQP_INFINITY: f64 = 1e30;
/// Smallest eigenvalue kept in a convexified Hessian block.
const CURVATURE_FLOOR: f64 = 1e-8;
/// Proximal term on every step component so the subproblem has a unique minimizer.
const PROXIMAL: f64 = 1e-6;
const QP_TOLERANCE: f64 = 1e-7;
const QP_MAX_ITERATIONS: u32 = 20_000;

/// Solution of one subproblem.
#[derive(Debug, Clone)]
pub(crate) struct QpStep {
    pub d: Vec<f64>,
    /// Scaled row multipliers.
    pub lambda: Vec<f64>,
    /// Multipliers of the step bounds.
    pub z: Vec<f64>,
    /// Linearized ℓ1 violation `Σ (p + q)`.
    pub linear_violation: f64,
}

/// Column-compressed matrix from `(row, col, value)` triplets. Duplicates are summed.
fn csc(nrows: usize, ncols: usize, mut triplets: Vec<(usize, usize, f64)>) -> CscMatrix<'static> {
    triplets.sort_by_key(|&(row, col, _)| (col, row));
    let mut indptr = vec![0; ncols + 1];
    let mut indices = Vec::with_capacity(triplets.len());
    let mut data: Vec<f64> = Vec::with_capacity(triplets.len());
    let mut last = None;
    for (row, col, value) in triplets {
        if last == Some((row, col)) {
            if let Some(sum) = data.last_mut() {
                *sum += value;
            }
            continue;
        }
        last = Some((row, col));
        indices.push(row);
        data.push(value);
        indptr[col + 1] += 1;
    }
    for col in 0..ncols {
        indptr[col + 1] += indptr[col];
    }
    CscMatrix {
        nrows,
        ncols,
        indptr: Cow::Owned(indptr),
        indices: Cow::Owned(indices),
        data: Cow::Owned(data),
    }
}

/// Symmetric positive semidefinite part of a Hessian block, eigenvalues floored.
pub(crate) fn convexify(block: &DMatrix<f64>) -> DMatrix<f64> {
    let sym = (block + block.transpose()) * 0.5;
    let mut eigen = sym.clone().symmetric_eigen();
    if eigen.eigenvalues.iter().all(|&l| l >= CURVATURE_FLOOR) {
        return sym;
    }
    for l in eigen.eigenvalues.iter_mut() {
        *l = l.max(CURVATURE_FLOOR);
    }
    let psd = eigen.recompose();
    (&psd + psd.transpose()) * 0.5
}

fn clip_infinite(v: f64) -> f64 {
    v.clamp(-OSQP_INFINITY, OSQP_INFINITY)
}

/// Quadratic model around one iterate: convexified curvature, gradient and row Jacobian.
pub(crate) struct ElasticQp<'a> {
    n: usize,
    m: usize,
    grad: &'a [f64],
    jac: &'a [f64],
    structure: &'a [(usize, usize)],
    curvature: Vec<HessianBlock>,
    hessian: CscMatrix<'static>,
    rows: CscMatrix<'static>,
    settings: Settings,
}

impl<'a> ElasticQp<'a> {
    pub fn new(sp: &'a ScaledProblem<'_>, blocks: &[HessianBlock], derivs: &'a Derivatives) -> Self {
        let (n, m) = (sp.n, sp.m);
        let nw = n + 2 * m;

        let curvature: Vec<HessianBlock> = blocks
            .iter()
            .map(|b| HessianBlock {
                vars: b.vars.clone(),
                matrix: convexify(&b.matrix),
            })
            .collect();
        let mut upper = Vec::new();
        for block in &curvature {
            for (a, &va) in block.vars.iter().enumerate() {
                for (b, &vb) in block.vars.iter().enumerate() {
                    if va <= vb {
                        upper.push((va, vb, block.matrix[(a, b)]));
                    }
                }
            }
        }
        upper.extend((0..n).map(|i| (i, i, PROXIMAL)));

        let mut entries: Vec<(usize, usize, f64)> = sp
            .jac_structure
            .iter()
            .zip(&derivs.jac)
            .map(|(&(row, col), &value)| (row, col, value))
            .collect();
        for j in 0..m {
            entries.push((j, n + j, 1.0));
            entries.push((j, n + m + j, -1.0));
        }
        entries.extend((0..nw).map(|k| (m + k, k, 1.0)));

        let settings = Settings::default()
            .verbose(false)
            .eps_abs(QP_TOLERANCE)
            .eps_rel(QP_TOLERANCE)
            .max_iter(QP_MAX_ITERATIONS)
            .polish(true);

        Self {
            n,
            m,
            grad: &derivs.grad,
            jac: &derivs.jac,
            structure: &sp.jac_structure,
            curvature,
            hessian: csc(nw, nw, upper),
            rows: csc(m + nw, nw, entries),
            settings,
        }
    }

    /// Solves the subproblem. `row_window` is `(row_lower - g, row_upper - g)`, `step_bounds`
    /// limits `d`, and `gradient_weight` scales the objective gradient (zero asks for the most
    /// feasible step only). `None` when OSQP returns no usable point.
    pub fn solve(
        &self,
        row_window: (&[f64], &[f64]),
        step_bounds: (&[f64], &[f64]),
        penalty: f64,
        gradient_weight: f64,
    ) -> Option<QpStep> {
        let (n, m) = (self.n, self.m);
        let nw = n + 2 * m;

        let mut q = vec![penalty; nw];
        for (qi, g) in q.iter_mut().zip(self.grad) {
            *qi = gradient_weight * g;
        }
        let mut lower = Vec::with_capacity(m + nw);
        let mut upper = Vec::with_capacity(m + nw);
        lower.extend(row_window.0.iter().map(|&v| clip_infinite(v)));
        upper.extend(row_window.1.iter().map(|&v| clip_infinite(v)));
        lower.extend(step_bounds.0.iter().map(|&v| clip_infinite(v)));
        upper.extend(step_bounds.1.iter().map(|&v| clip_infinite(v)));
        lower.extend(std::iter::repeat_n(0.0, 2 * m));
        upper.extend(std::iter::repeat_n(OSQP_INFINITY, 2 * m));

        let mut problem = match Problem::new(
            &self.hessian,
            &q,
            &self.rows,
            &lower,
            &upper,
            &self.settings,
        ) {
            Ok(problem) => problem,
            Err(err) => {
                debug!("QP setup failed: {err:?}");
                return None;
            }
        };
        let status = problem.solve();
        let (Some(w), Some(y)) = (status.x(), status.solution().map(|s| s.y())) else {
            debug!("QP returned no solution");
            return None;
        };
        if w.iter().chain(y).any(|v| !v.is_finite()) {
            return None;
        }

        let linear_violation = w[n..].iter().map(|s| s.max(0.0)).sum();
        Some(QpStep {
            d: w[..n].to_vec(),
            lambda: y[..m].to_vec(),
            z: y[m..m + n].to_vec(),
            linear_violation,
        })
    }

    /// `J d` in scaled units.
    pub fn jac_times(&self, d: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.m];
        for (&(row, col), value) in self.structure.iter().zip(self.jac) {
            out[row] += value * d[col];
        }
        out
    }

    /// Model objective change `gᵀd + ½ dᵀHd`.
    pub fn model(&self, d: &[f64]) -> f64 {
        let linear: f64 = self.grad.iter().zip(d).map(|(g, d)| g * d).sum();
        let mut quadratic = PROXIMAL * d.iter().map(|d| d * d).sum::<f64>();
        for block in &self.curvature {
            for (a, &va) in block.vars.iter().enumerate() {
                for (b, &vb) in block.vars.iter().enumerate() {
                    quadratic += d[va] * block.matrix[(a, b)] * d[vb];
                }
            }
        }
        linear + 0.5 * quadratic
    }

    /// `‖∇f + Jᵀλ + z‖∞` for the multipliers of a subproblem solution.
    pub fn stationarity(&self, step: &QpStep) -> f64 {
        let mut r: Vec<f64> = self.grad.iter().zip(&step.z).map(|(g, z)| g + z).collect();
        for (&(row, col), value) in self.structure.iter().zip(self.jac) {
            r[col] += value * step.lambda[row];
        }
        r.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplets_are_compressed_by_column() {
        let m = csc(3, 2, vec![(2, 1, 4.0), (0, 0, 1.0), (1, 1, 2.0), (2, 1, 1.0)]);
        assert_eq!(&*m.indptr, &[0, 1, 3]);
        assert_eq!(&*m.indices, &[0, 1, 2]);
        assert_eq!(&*m.data, &[1.0, 2.0, 5.0]);
    }

    #[test]
    fn empty_columns_keep_their_pointer() {
        let m = csc(2, 3, vec![(1, 2, 3.0)]);
        assert_eq!(&*m.indptr, &[0, 0, 0, 1]);
    }

    #[test]
    fn indefinite_block_is_floored() {
        let block = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -3.0]);
        let psd = convexify(&block);
        assert!((psd[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((psd[(1, 1)] - CURVATURE_FLOOR).abs() < 1e-12);
        assert!(psd[(0, 1)].abs() < 1e-12);
    }

    #[test]
    fn convex_block_is_untouched() {
        let block = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        assert_eq!(convexify(&block), block);
    }
}
