//! Scaled view of an [`NlpProblem`] as seen by the SQP iterations.
//!
//! The solver works with `v = x * dx`, rows `g * dc` and objective `f * obj_scale`. Bounds are
//! kept as given: fixed variables are simply bounds with zero width and unbounded ones carry
//! infinite limits.

use nalgebra::DMatrix;

use crate::outcome::NlpError;
use crate::problem::NlpProblem;

/// Largest scaled objective gradient component at the starting point.
const OBJECTIVE_GRADIENT_MAX: f64 = 1.0;

/// Function values at a scaled point.
#[derive(Debug, Clone)]
pub(crate) struct Point {
    pub v: Vec<f64>,
    pub x: Vec<f64>,
    /// Scaled objective.
    pub f: f64,
    /// Scaled row values.
    pub g: Vec<f64>,
    /// Raw row values `g(x)`.
    pub raw_g: Vec<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct Derivatives {
    pub grad: Vec<f64>,
    /// Scaled Jacobian values in the order of [`ScaledProblem::jac_structure`].
    pub jac: Vec<f64>,
}

/// Dense scaled Lagrangian curvature over a group of variables.
#[derive(Debug, Clone)]
pub(crate) struct HessianBlock {
    pub vars: Vec<usize>,
    pub matrix: DMatrix<f64>,
}

pub(crate) struct ScaledProblem<'a> {
    problem: &'a dyn NlpProblem,
    pub n: usize,
    pub m: usize,
    dx: Vec<f64>,
    dc: Vec<f64>,
    obj_scale: f64,
    x_lower: Vec<f64>,
    x_upper: Vec<f64>,
    g_lower: Vec<f64>,
    g_upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub row_lower: Vec<f64>,
    pub row_upper: Vec<f64>,
    pub jac_structure: Vec<(usize, usize)>,
    blocks: Vec<Vec<usize>>,
    hess_len: usize,
    x_start: Vec<f64>,
}

fn check_bounds(
    lower: &[f64],
    upper: &[f64],
    error: impl Fn(usize, f64, f64) -> NlpError,
) -> Result<(), NlpError> {
    for (i, (l, u)) in lower.iter().zip(upper).enumerate() {
        if l > u || l.is_nan() || u.is_nan() {
            return Err(error(i, *l, *u));
        }
    }
    Ok(())
}

fn check_scaling(scale: &[f64], what: &'static str) -> Result<(), NlpError> {
    match scale.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
        Some(index) => Err(NlpError::InvalidScaling { what, index }),
        None => Ok(()),
    }
}

impl<'a> ScaledProblem<'a> {
    pub fn new(problem: &'a dyn NlpProblem) -> Result<Self, NlpError> {
        let n = problem.num_variables();
        let m = problem.num_constraints();

        let mut x_lower = vec![0.0; n];
        let mut x_upper = vec![0.0; n];
        problem.variable_bounds(&mut x_lower, &mut x_upper);
        check_bounds(&x_lower, &x_upper, |index, lower, upper| {
            NlpError::InvalidVariableBounds {
                index,
                lower,
                upper,
            }
        })?;
        let mut g_lower = vec![0.0; m];
        let mut g_upper = vec![0.0; m];
        problem.constraint_bounds(&mut g_lower, &mut g_upper);
        check_bounds(&g_lower, &g_upper, |index, lower, upper| {
            NlpError::InvalidConstraintBounds {
                index,
                lower,
                upper,
            }
        })?;

        let mut dx = vec![1.0; n];
        problem.variable_scaling(&mut dx);
        check_scaling(&dx, "variable")?;
        let mut dc = vec![1.0; m];
        problem.constraint_scaling(&mut dc);
        check_scaling(&dc, "constraint")?;

        let jac_structure = problem.jacobian_structure();
        for &(row, col) in &jac_structure {
            if row >= m {
                return Err(NlpError::IndexOutOfRange {
                    what: "jacobian row",
                    index: row,
                });
            }
            if col >= n {
                return Err(NlpError::IndexOutOfRange {
                    what: "jacobian column",
                    index: col,
                });
            }
        }

        let blocks = problem.hessian_blocks();
        let mut owned = vec![false; n];
        let mut hess_len = 0;
        for group in &blocks {
            for &i in group {
                if i >= n {
                    return Err(NlpError::IndexOutOfRange {
                        what: "hessian block",
                        index: i,
                    });
                }
                if owned[i] {
                    return Err(NlpError::OverlappingHessianBlocks(i));
                }
                owned[i] = true;
            }
            hess_len += group.len() * group.len();
        }

        let scale_bounds = |bounds: &[f64], scale: &[f64]| -> Vec<f64> {
            bounds.iter().zip(scale).map(|(b, s)| b * s).collect()
        };
        let mut x_start = vec![0.0; n];
        problem.initial_point(&mut x_start);

        let mut scaled = Self {
            problem,
            n,
            m,
            lower: scale_bounds(&x_lower, &dx),
            upper: scale_bounds(&x_upper, &dx),
            row_lower: scale_bounds(&g_lower, &dc),
            row_upper: scale_bounds(&g_upper, &dc),
            dx,
            dc,
            obj_scale: 1.0,
            x_lower,
            x_upper,
            g_lower,
            g_upper,
            jac_structure,
            blocks,
            hess_len,
            x_start,
        };

        let x0 = scaled.full_x(&scaled.start());
        let mut grad = vec![0.0; n];
        problem.objective_gradient(&x0, &mut grad);
        let max_grad = grad
            .iter()
            .zip(&scaled.dx)
            .map(|(g, d)| (g / d).abs())
            .fold(0.0, f64::max);
        if max_grad.is_finite() && max_grad > OBJECTIVE_GRADIENT_MAX {
            scaled.obj_scale = OBJECTIVE_GRADIENT_MAX / max_grad;
        }
        Ok(scaled)
    }

    /// Scaled starting point, projected onto the variable bounds.
    pub fn start(&self) -> Vec<f64> {
        self.x_start
            .iter()
            .zip(&self.dx)
            .enumerate()
            .map(|(i, (x, d))| self.clip(i, x * d))
            .collect()
    }

    /// Projection onto `[lower_i, upper_i]`. Infinite limits leave the value untouched.
    pub fn clip(&self, i: usize, v: f64) -> f64 {
        if v < self.lower[i] {
            self.lower[i]
        } else if v > self.upper[i] {
            self.upper[i]
        } else {
            v
        }
    }

    pub fn full_x(&self, v: &[f64]) -> Vec<f64> {
        v.iter().zip(&self.dx).map(|(v, d)| v / d).collect()
    }

    /// Objective and rows. `None` if anything is non-finite.
    pub fn evaluate(&self, v: &[f64]) -> Option<Point> {
        let x = self.full_x(v);
        let f = self.problem.objective(&x) * self.obj_scale;
        if !f.is_finite() {
            return None;
        }
        let mut raw_g = vec![0.0; self.m];
        self.problem.constraints(&x, &mut raw_g);
        if raw_g.iter().any(|g| !g.is_finite()) {
            return None;
        }
        let g = raw_g.iter().zip(&self.dc).map(|(g, d)| g * d).collect();
        Some(Point {
            v: v.to_vec(),
            x,
            f,
            g,
            raw_g,
        })
    }

    /// A point that could not be evaluated, kept so it can still be reported.
    pub fn unevaluated(&self, v: Vec<f64>) -> Point {
        Point {
            x: self.full_x(&v),
            v,
            f: f64::NAN,
            g: vec![f64::NAN; self.m],
            raw_g: vec![f64::NAN; self.m],
        }
    }

    pub fn differentiate(&self, point: &Point) -> Option<Derivatives> {
        let mut grad = vec![0.0; self.n];
        self.problem.objective_gradient(&point.x, &mut grad);
        for (g, d) in grad.iter_mut().zip(&self.dx) {
            *g *= self.obj_scale / d;
        }

        let mut jac = vec![0.0; self.jac_structure.len()];
        self.problem.jacobian_values(&point.x, &mut jac);
        for (value, &(row, col)) in jac.iter_mut().zip(&self.jac_structure) {
            *value *= self.dc[row] / self.dx[col];
        }

        if grad.iter().chain(&jac).any(|v| !v.is_finite()) {
            return None;
        }
        Some(Derivatives { grad, jac })
    }

    /// Scaled Lagrangian Hessian blocks for scaled multipliers `lambda_hat`.
    pub fn hessian(&self, x: &[f64], lambda_hat: &[f64]) -> Option<Vec<HessianBlock>> {
        let lambda: Vec<f64> = lambda_hat
            .iter()
            .zip(&self.dc)
            .map(|(l, d)| l * d)
            .collect();
        let mut values = vec![0.0; self.hess_len];
        self.problem
            .hessian_values(x, self.obj_scale, &lambda, &mut values);
        if values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mut offset = 0;
        let blocks = self
            .blocks
            .iter()
            .map(|vars| {
                let size = vars.len();
                let matrix = DMatrix::from_fn(size, size, |a, b| {
                    values[offset + a * size + b] / (self.dx[vars[a]] * self.dx[vars[b]])
                });
                offset += size * size;
                HessianBlock {
                    vars: vars.clone(),
                    matrix,
                }
            })
            .collect();
        Some(blocks)
    }

    /// Scaled ℓ1 and ℓ∞ row violation.
    pub fn violation(&self, g: &[f64]) -> (f64, f64) {
        g.iter()
            .zip(self.row_lower.iter().zip(&self.row_upper))
            .map(|(g, (l, u))| (l - g).max(g - u).max(0.0))
            .fold((0.0, 0.0), |(sum, max), r| (sum + r, f64::max(max, r)))
    }

    /// Multipliers in problem units.
    pub fn unscale_multipliers(&self, lambda_hat: &[f64]) -> Vec<f64> {
        lambda_hat
            .iter()
            .zip(&self.dc)
            .map(|(l, d)| l * d / self.obj_scale)
            .collect()
    }

    pub fn unscaled_objective(&self, point: &Point) -> f64 {
        point.f / self.obj_scale
    }

    /// Largest violation of variable bounds or row bounds in problem units.
    pub fn max_violation(&self, point: &Point) -> f64 {
        let bounds = point
            .x
            .iter()
            .zip(self.x_lower.iter().zip(&self.x_upper))
            .map(|(x, (l, u))| (l - x).max(x - u).max(0.0));
        let rows = point
            .raw_g
            .iter()
            .zip(self.g_lower.iter().zip(&self.g_upper))
            .map(|(g, (l, u))| (l - g).max(g - u).max(0.0));
        bounds.chain(rows).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One free, one fixed and one half-bounded variable; `x0 + x1 + x2 = 4`.
    struct Mixed;

    impl NlpProblem for Mixed {
        fn num_variables(&self) -> usize {
            3
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            lower.copy_from_slice(&[f64::NEG_INFINITY, 2.0, 0.0]);
            upper.copy_from_slice(&[f64::INFINITY, 2.0, f64::INFINITY]);
        }
        fn constraint_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            lower[0] = 4.0;
            upper[0] = 4.0;
        }
        fn initial_point(&self, x: &mut [f64]) {
            x.copy_from_slice(&[-7.5, 0.0, -1.0]);
        }
        fn variable_scaling(&self, scale: &mut [f64]) {
            scale.copy_from_slice(&[0.5, 1.0, 10.0]);
        }
        fn objective(&self, x: &[f64]) -> f64 {
            x[0] * x[0]
        }
        fn objective_gradient(&self, x: &[f64], grad: &mut [f64]) {
            grad.copy_from_slice(&[2.0 * x[0], 0.0, 0.0]);
        }
        fn constraints(&self, x: &[f64], g: &mut [f64]) {
            g[0] = x[0] + x[1] + x[2];
        }
        fn jacobian_structure(&self) -> Vec<(usize, usize)> {
            vec![(0, 0), (0, 1), (0, 2)]
        }
        fn jacobian_values(&self, _x: &[f64], values: &mut [f64]) {
            values.fill(1.0);
        }
        fn hessian_blocks(&self) -> Vec<Vec<usize>> {
            vec![vec![0]]
        }
        fn hessian_values(&self, _x: &[f64], obj_factor: f64, _l: &[f64], values: &mut [f64]) {
            values[0] = 2.0 * obj_factor;
        }
    }

    #[test]
    fn unbounded_variable_keeps_its_start() {
        let sp = ScaledProblem::new(&Mixed).unwrap();
        let v = sp.start();
        assert_eq!(v[0], -3.75);
        assert!(v.iter().all(|v| v.is_finite()));
        let point = sp.evaluate(&v).expect("finite start");
        assert_eq!(point.x[0], -7.5);
    }

    #[test]
    fn start_is_projected_onto_bounds() {
        let sp = ScaledProblem::new(&Mixed).unwrap();
        let x = sp.full_x(&sp.start());
        assert_eq!(x[1], 2.0);
        assert_eq!(x[2], 0.0);
        let point = sp.evaluate(&sp.start()).unwrap();
        assert_eq!(point.raw_g[0], -5.5);
        assert_eq!(sp.max_violation(&point), 9.5);
    }

    #[test]
    fn objective_gradient_is_normalized() {
        let sp = ScaledProblem::new(&Mixed).unwrap();
        let point = sp.evaluate(&sp.start()).unwrap();
        let derivs = sp.differentiate(&point).unwrap();
        // d/dv0 of x0² at x0 = -7.5 with dx0 = 0.5 is -30 before normalization.
        assert!((derivs.grad[0] + 1.0).abs() < 1e-12);
        assert!((sp.unscaled_objective(&point) - 56.25).abs() < 1e-9);
        assert_eq!(derivs.jac, vec![2.0, 1.0, 0.1]);
    }

    #[test]
    fn hessian_is_expressed_in_scaled_variables() {
        let sp = ScaledProblem::new(&Mixed).unwrap();
        let x = sp.full_x(&sp.start());
        let blocks = sp.hessian(&x, &[0.0]).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].vars, vec![0]);
        // 2 * (1/30) / 0.5².
        assert!((blocks[0].matrix[(0, 0)] - 8.0 / 30.0).abs() < 1e-12);
    }
}
