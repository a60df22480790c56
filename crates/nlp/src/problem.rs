use crate::options::SolveOptions;
use crate::outcome::{NlpError, NlpOutcome};

/// Smooth nonlinear program `min f(x)` subject to `g_l <= g(x) <= g_u`, `x_l <= x <= x_u`.
///
/// Equality rows and fixed variables are expressed through coincident bounds. Infinite bounds
/// mean "unbounded". Callbacks are infallible; non-finite values are treated by the solver as a
/// rejected trial point.
pub trait NlpProblem {
    fn num_variables(&self) -> usize;

    fn num_constraints(&self) -> usize;

    fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]);

    fn constraint_bounds(&self, lower: &mut [f64], upper: &mut [f64]);

    /// Starting point. Solvers may move it inside the bounds.
    fn initial_point(&self, x: &mut [f64]);

    /// Multiplicative variable scaling: the solver works with `x_i * scale_i`.
    fn variable_scaling(&self, scale: &mut [f64]) {
        scale.fill(1.0);
    }

    /// Multiplicative constraint scaling: the solver works with `g_j * scale_j`.
    fn constraint_scaling(&self, scale: &mut [f64]) {
        scale.fill(1.0);
    }

    fn objective(&self, x: &[f64]) -> f64;

    fn objective_gradient(&self, x: &[f64], grad: &mut [f64]);

    fn constraints(&self, x: &[f64], g: &mut [f64]);

    /// Sparsity pattern of the constraint Jacobian as `(row, column)` pairs. Duplicates are summed.
    fn jacobian_structure(&self) -> Vec<(usize, usize)>;

    /// Jacobian values in the order given by [`NlpProblem::jacobian_structure`].
    fn jacobian_values(&self, x: &[f64], values: &mut [f64]);

    /// Disjoint groups of variables whose Lagrangian Hessian is dense within the group and zero
    /// across groups. Variables not listed have no curvature.
    fn hessian_blocks(&self) -> Vec<Vec<usize>>;

    /// Hessian of `obj_factor * f(x) + Σ lambda_j g_j(x)`, one dense row-major block per entry
    /// of [`NlpProblem::hessian_blocks`], concatenated.
    fn hessian_values(&self, x: &[f64], obj_factor: f64, lambda: &[f64], values: &mut [f64]);
}

/// Anything that can solve an [`NlpProblem`].
pub trait NlpSolver: Send + Sync {
    fn solve(
        &self,
        problem: &dyn NlpProblem,
        options: &SolveOptions,
    ) -> Result<NlpOutcome, NlpError>;
}
