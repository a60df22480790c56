//! Trust-region SQP on the ℓ1 exact penalty.
//!
//! Every iteration convexifies the Lagrangian Hessian block by block, linearizes the rows and
//! hands an elastic QP to OSQP (see [`crate::osqp_adapter`]). The penalty is raised only as far
//! as needed for the step to recover a tenth of the linearized feasibility the trust region
//! allows. Steps are accepted on the ratio of actual to predicted merit reduction, with one
//! second-order correction before the radius shrinks.

use std::time::Instant;

use log::{debug, info, warn};

use crate::options::SolveOptions;
use crate::osqp_adapter::{ElasticQp, QpStep};
use crate::outcome::{NlpError, NlpOutcome, TerminationReason};
use crate::problem::{NlpProblem, NlpSolver};
use crate::scaled::{Derivatives, Point, ScaledProblem};

const INITIAL_RADIUS: f64 = 1.0;
const MAX_RADIUS: f64 = 1e3;
const MIN_RADIUS: f64 = 1e-10;
const ACCEPT_RATIO: f64 = 1e-4;
const SHRINK_RATIO: f64 = 0.25;
const EXPAND_RATIO: f64 = 0.75;
const INITIAL_PENALTY: f64 = 10.0;
const MAX_PENALTY: f64 = 1e8;
const PENALTY_GROWTH: f64 = 10.0;
/// Slack weight of the feasibility-only subproblem.
const FEASIBILITY_PENALTY: f64 = 1e6;
/// Fraction of the best achievable linearized reduction a step must deliver.
const STEERING_FRACTION: f64 = 0.1;
/// Consecutive iterations at which no step can reduce the violation before giving up.
const STATIONARY_LIMIT: usize = 3;
/// Predicted reductions below this fraction of the merit are within QP accuracy.
const MODEL_NOISE: f64 = 1e-10;

/// Bundled [`NlpSolver`]. Stateless: every call builds its own workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqpSolver;

impl SqpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl NlpSolver for SqpSolver {
    fn solve(
        &self,
        problem: &dyn NlpProblem,
        options: &SolveOptions,
    ) -> Result<NlpOutcome, NlpError> {
        options.validate()?;
        let scaled = ScaledProblem::new(problem)?;
        debug!(
            "sqp: {} variables, {} rows, {} jacobian entries",
            scaled.n,
            scaled.m,
            scaled.jac_structure.len()
        );
        Ok(Run::start(&scaled, options).execute())
    }
}

fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

/// Row and step windows of one subproblem.
struct Windows {
    row_lower: Vec<f64>,
    row_upper: Vec<f64>,
    step_lower: Vec<f64>,
    step_upper: Vec<f64>,
}

impl Windows {
    fn solve(&self, qp: &ElasticQp<'_>, penalty: f64, gradient_weight: f64) -> Option<QpStep> {
        qp.solve(
            (&self.row_lower, &self.row_upper),
            (&self.step_lower, &self.step_upper),
            penalty,
            gradient_weight,
        )
    }
}

struct Run<'a> {
    sp: &'a ScaledProblem<'a>,
    opts: &'a SolveOptions,
    started: Instant,
    point: Point,
    lambda: Vec<f64>,
    penalty: f64,
    radius: f64,
    iterations: usize,
    dual: f64,
    best_violation: f64,
    stall: usize,
    stationary: usize,
    acceptable: usize,
}

impl<'a> Run<'a> {
    fn start(sp: &'a ScaledProblem<'a>, opts: &'a SolveOptions) -> Self {
        let v0 = sp.start();
        // An unusable start is reported by `execute` as a breakdown with the raw point.
        let point = sp.evaluate(&v0).unwrap_or_else(|| sp.unevaluated(v0));
        Self {
            sp,
            opts,
            started: Instant::now(),
            point,
            lambda: vec![0.0; sp.m],
            penalty: INITIAL_PENALTY,
            radius: INITIAL_RADIUS,
            iterations: 0,
            dual: f64::NAN,
            best_violation: f64::INFINITY,
            stall: 0,
            stationary: 0,
            acceptable: 0,
        }
    }

    fn execute(mut self) -> NlpOutcome {
        let Some(mut derivs) = self
            .point
            .f
            .is_finite()
            .then(|| self.sp.differentiate(&self.point))
            .flatten()
        else {
            warn!("objective or constraints are not finite at the starting point");
            return self.finish(TerminationReason::NumericalBreakdown);
        };

        loop {
            let (violation, primal) = self.sp.violation(&self.point.g);

            if self.iterations >= self.opts.max_iterations {
                return self.finish(TerminationReason::MaxIterations);
            }
            if self
                .opts
                .time_limit
                .is_some_and(|limit| self.started.elapsed() >= limit)
            {
                return self.finish(TerminationReason::TimeLimit);
            }
            if self.opts.is_cancelled() {
                return self.finish(TerminationReason::Cancelled);
            }
            if self.stalled(violation) {
                return self.finish(TerminationReason::LocallyInfeasible);
            }

            let Some(hessian) = self.sp.hessian(&self.point.x, &self.lambda) else {
                warn!("Lagrangian Hessian is not finite");
                return self.finish(TerminationReason::NumericalBreakdown);
            };
            let qp = ElasticQp::new(self.sp, &hessian, &derivs);
            let windows = self.windows(&self.point.g);

            let Some((step, ideal)) = self.steered_step(&qp, &windows, violation) else {
                self.radius *= SHRINK_RATIO;
                warn!("QP subproblem failed, trust radius {:.1e}", self.radius);
                if self.radius < MIN_RADIUS {
                    return self.finish(TerminationReason::NumericalBreakdown);
                }
                self.iterations += 1;
                continue;
            };

            self.dual = qp.stationarity(&step);
            let model = qp.model(&step.d);
            let step_norm = norm_inf(&step.d);
            let inside = step_norm < 0.5 * self.radius;
            let change_scale = self.point.f.abs().max(1.0);
            debug!(
                "iter {:4}: f = {:+.6e}  inf_pr = {:.2e}  inf_du = {:.2e}  |d| = {:.2e}  radius = {:.1e}  penalty = {:.1e}",
                self.iterations, self.point.f, primal, self.dual, step_norm, self.radius, self.penalty
            );

            if primal <= self.opts.tolerance
                && inside
                && model.abs() <= self.opts.tolerance * change_scale
            {
                self.lambda = step.lambda;
                return self.finish(TerminationReason::Converged);
            }
            if primal <= self.opts.acceptable_constraint_tolerance
                && inside
                && model.abs() <= self.opts.acceptable_tolerance * change_scale
            {
                self.acceptable += 1;
                if self.acceptable >= self.opts.acceptable_iterations {
                    self.lambda = step.lambda;
                    return self.finish(TerminationReason::ConvergedAcceptable);
                }
            } else {
                self.acceptable = 0;
            }

            if violation > self.opts.infeasibility_threshold && ideal >= (1.0 - 1e-3) * violation {
                self.stationary += 1;
                if self.stationary >= STATIONARY_LIMIT {
                    return self.finish(TerminationReason::LocallyInfeasible);
                }
            } else {
                self.stationary = 0;
            }

            let predicted = -model + self.penalty * (violation - step.linear_violation);
            if predicted <= MODEL_NOISE * (change_scale + self.penalty * violation) {
                let reason = self.stuck_reason(violation, primal);
                debug!("model predicts no further progress ({reason})");
                return self.finish(reason);
            }

            match self.try_step(&qp, &windows, &step, predicted) {
                Some((trial, trial_derivs, ratio)) => {
                    if ratio >= EXPAND_RATIO && step_norm >= 0.9 * self.radius {
                        self.radius = (2.0 * self.radius).min(MAX_RADIUS);
                    } else if ratio < SHRINK_RATIO {
                        self.radius *= 0.5;
                    }
                    self.point = trial;
                    derivs = trial_derivs;
                    self.lambda = step.lambda;
                }
                None => {
                    self.radius = SHRINK_RATIO * self.radius.min(step_norm);
                    debug!("step rejected, trust radius {:.1e}", self.radius);
                    if self.radius < MIN_RADIUS {
                        let reason = self.stuck_reason(violation, primal);
                        warn!("trust region collapsed; stopping ({reason})");
                        return self.finish(reason);
                    }
                }
            }
            self.iterations += 1;
        }
    }

    /// Termination when no step makes progress: acceptable if feasible enough, infeasible if
    /// the violation is still large.
    fn stuck_reason(&self, violation: f64, primal: f64) -> TerminationReason {
        if primal <= self.opts.acceptable_constraint_tolerance {
            TerminationReason::ConvergedAcceptable
        } else if violation > self.opts.infeasibility_threshold {
            TerminationReason::LocallyInfeasible
        } else {
            TerminationReason::NumericalBreakdown
        }
    }

    fn stalled(&mut self, violation: f64) -> bool {
        if violation < 0.99 * self.best_violation {
            self.best_violation = violation;
            self.stall = 0;
        } else {
            self.stall += 1;
        }
        violation > self.opts.infeasibility_threshold && self.stall >= self.opts.stall_iterations
    }

    fn windows(&self, g: &[f64]) -> Windows {
        let sp = self.sp;
        let v = &self.point.v;
        Windows {
            row_lower: sp.row_lower.iter().zip(g).map(|(l, g)| l - g).collect(),
            row_upper: sp.row_upper.iter().zip(g).map(|(u, g)| u - g).collect(),
            step_lower: sp
                .lower
                .iter()
                .zip(v)
                .map(|(l, v)| (l - v).max(-self.radius))
                .collect(),
            step_upper: sp
                .upper
                .iter()
                .zip(v)
                .map(|(u, v)| (u - v).min(self.radius))
                .collect(),
        }
    }

    /// Subproblem step plus the smallest linearized violation reachable inside the trust
    /// region. Raises the penalty until the step recovers enough of that reduction.
    fn steered_step(
        &mut self,
        qp: &ElasticQp<'_>,
        windows: &Windows,
        violation: f64,
    ) -> Option<(QpStep, f64)> {
        let mut step = windows.solve(qp, self.penalty, 1.0)?;
        let feasible = 0.01 * self.opts.tolerance;
        if step.linear_violation <= feasible {
            return Some((step, 0.0));
        }
        let ideal = windows
            .solve(qp, FEASIBILITY_PENALTY, 0.0)
            .map_or(step.linear_violation, |s| {
                s.linear_violation.min(step.linear_violation)
            });
        while self.penalty < MAX_PENALTY
            && step.linear_violation > feasible
            && violation - step.linear_violation < STEERING_FRACTION * (violation - ideal)
        {
            self.penalty = (self.penalty * PENALTY_GROWTH).min(MAX_PENALTY);
            debug!("penalty raised to {:.1e}", self.penalty);
            step = windows.solve(qp, self.penalty, 1.0)?;
        }
        Some((step, ideal))
    }

    fn merit(&self, point: &Point) -> f64 {
        point.f + self.penalty * self.sp.violation(&point.g).0
    }

    fn trial(&self, d: &[f64]) -> Option<(Point, Derivatives)> {
        let v: Vec<f64> = self
            .point
            .v
            .iter()
            .zip(d)
            .enumerate()
            .map(|(i, (v, d))| self.sp.clip(i, v + d))
            .collect();
        let point = self.sp.evaluate(&v)?;
        let derivs = self.sp.differentiate(&point)?;
        Some((point, derivs))
    }

    /// Full step, then one second-order correction that re-linearizes the rows at the trial
    /// point. Returns the accepted point and its reduction ratio.
    fn try_step(
        &self,
        qp: &ElasticQp<'_>,
        windows: &Windows,
        step: &QpStep,
        predicted: f64,
    ) -> Option<(Point, Derivatives, f64)> {
        let merit0 = self.merit(&self.point);
        let ratio = |p: &Point| (merit0 - self.merit(p)) / predicted;

        let (trial, derivs) = self.trial(&step.d)?;
        let r = ratio(&trial);
        if r >= ACCEPT_RATIO {
            return Some((trial, derivs, r));
        }
        if self.sp.m == 0 {
            return None;
        }

        // Shift the row windows by the curvature the linearization missed.
        let jd = qp.jac_times(&step.d);
        let shift: Vec<f64> = trial
            .g
            .iter()
            .zip(&self.point.g)
            .zip(&jd)
            .map(|((gt, g0), jd)| gt - g0 - jd)
            .collect();
        let corrected = Windows {
            row_lower: windows.row_lower.iter().zip(&shift).map(|(l, s)| l - s).collect(),
            row_upper: windows.row_upper.iter().zip(&shift).map(|(u, s)| u - s).collect(),
            step_lower: windows.step_lower.clone(),
            step_upper: windows.step_upper.clone(),
        };
        let soc = corrected.solve(qp, self.penalty, 1.0)?;
        let (trial, derivs) = self.trial(&soc.d)?;
        let r = ratio(&trial);
        (r >= ACCEPT_RATIO).then_some((trial, derivs, r))
    }

    fn finish(self, reason: TerminationReason) -> NlpOutcome {
        let outcome = NlpOutcome {
            reason,
            objective: self.sp.unscaled_objective(&self.point),
            max_violation: self.sp.max_violation(&self.point),
            lambda: self.sp.unscale_multipliers(&self.lambda),
            constraints: self.point.raw_g,
            x: self.point.x,
            dual_infeasibility: self.dual,
            iterations: self.iterations,
            elapsed: self.started.elapsed(),
        };
        info!(
            "sqp {} after {} iterations: objective {:.6e}, max violation {:.3e}",
            reason, outcome.iterations, outcome.objective, outcome.max_violation
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// min (x0 - 1)² + (x1 - 3)²  s.t.  x0 + x1 = 1, x0 >= 0. The bound is active at (0, 1).
    struct Projection;

    impl NlpProblem for Projection {
        fn num_variables(&self) -> usize {
            2
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            lower.copy_from_slice(&[0.0, f64::NEG_INFINITY]);
            upper.copy_from_slice(&[f64::INFINITY, f64::INFINITY]);
        }
        fn constraint_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            lower[0] = 1.0;
            upper[0] = 1.0;
        }
        fn initial_point(&self, x: &mut [f64]) {
            x.copy_from_slice(&[3.0, 3.0]);
        }
        fn objective(&self, x: &[f64]) -> f64 {
            (x[0] - 1.0).powi(2) + (x[1] - 3.0).powi(2)
        }
        fn objective_gradient(&self, x: &[f64], grad: &mut [f64]) {
            grad[0] = 2.0 * (x[0] - 1.0);
            grad[1] = 2.0 * (x[1] - 3.0);
        }
        fn constraints(&self, x: &[f64], g: &mut [f64]) {
            g[0] = x[0] + x[1];
        }
        fn jacobian_structure(&self) -> Vec<(usize, usize)> {
            vec![(0, 0), (0, 1)]
        }
        fn jacobian_values(&self, _x: &[f64], values: &mut [f64]) {
            values.copy_from_slice(&[1.0, 1.0]);
        }
        fn hessian_blocks(&self) -> Vec<Vec<usize>> {
            vec![vec![0, 1]]
        }
        fn hessian_values(&self, _x: &[f64], obj_factor: f64, _lambda: &[f64], values: &mut [f64]) {
            values.copy_from_slice(&[2.0 * obj_factor, 0.0, 0.0, 2.0 * obj_factor]);
        }
    }

    /// Rosenbrock-like problem with a nonlinear inequality: min (1-x)² + 10 (y - x²)²,
    /// x² + y² <= 0.5.
    struct Disk;

    impl NlpProblem for Disk {
        fn num_variables(&self) -> usize {
            2
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            lower.fill(f64::NEG_INFINITY);
            upper.fill(f64::INFINITY);
        }
        fn constraint_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            lower[0] = f64::NEG_INFINITY;
            upper[0] = 0.5;
        }
        fn initial_point(&self, x: &mut [f64]) {
            x.fill(0.0);
        }
        fn objective(&self, x: &[f64]) -> f64 {
            (1.0 - x[0]).powi(2) + 10.0 * (x[1] - x[0] * x[0]).powi(2)
        }
        fn objective_gradient(&self, x: &[f64], grad: &mut [f64]) {
            let r = x[1] - x[0] * x[0];
            grad[0] = -2.0 * (1.0 - x[0]) - 40.0 * x[0] * r;
            grad[1] = 20.0 * r;
        }
        fn constraints(&self, x: &[f64], g: &mut [f64]) {
            g[0] = x[0] * x[0] + x[1] * x[1];
        }
        fn jacobian_structure(&self) -> Vec<(usize, usize)> {
            vec![(0, 0), (0, 1)]
        }
        fn jacobian_values(&self, x: &[f64], values: &mut [f64]) {
            values[0] = 2.0 * x[0];
            values[1] = 2.0 * x[1];
        }
        fn hessian_blocks(&self) -> Vec<Vec<usize>> {
            vec![vec![0, 1]]
        }
        fn hessian_values(&self, x: &[f64], obj_factor: f64, lambda: &[f64], values: &mut [f64]) {
            let r = x[1] - x[0] * x[0];
            values[0] = obj_factor * (2.0 - 40.0 * r + 80.0 * x[0] * x[0]) + 2.0 * lambda[0];
            values[1] = obj_factor * (-40.0 * x[0]);
            values[2] = values[1];
            values[3] = obj_factor * 20.0 + 2.0 * lambda[0];
        }
    }

    /// Burning `t` of a fixed load: min m0 - m1 with m1 = m0 - t, m0 = 10, 0 <= t <= 5, and a
    /// free tracer y = 3 t. The optimum sits on the lower bound of `t`.
    struct Burn {
        start_t: f64,
    }

    impl NlpProblem for Burn {
        fn num_variables(&self) -> usize {
            4
        }
        fn num_constraints(&self) -> usize {
            2
        }
        fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            // m0, m1, t, y
            lower.copy_from_slice(&[10.0, 0.0, 0.0, f64::NEG_INFINITY]);
            upper.copy_from_slice(&[10.0, 10.0, 5.0, f64::INFINITY]);
        }
        fn constraint_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            lower.fill(0.0);
            upper.fill(0.0);
        }
        fn initial_point(&self, x: &mut [f64]) {
            x.copy_from_slice(&[10.0, 10.0 - self.start_t, self.start_t, 0.0]);
        }
        fn objective(&self, x: &[f64]) -> f64 {
            x[0] - x[1]
        }
        fn objective_gradient(&self, _x: &[f64], grad: &mut [f64]) {
            grad.copy_from_slice(&[1.0, -1.0, 0.0, 0.0]);
        }
        fn constraints(&self, x: &[f64], g: &mut [f64]) {
            g[0] = x[1] - x[0] + x[2];
            g[1] = x[3] - 3.0 * x[2];
        }
        fn jacobian_structure(&self) -> Vec<(usize, usize)> {
            vec![(0, 0), (0, 1), (0, 2), (1, 2), (1, 3)]
        }
        fn jacobian_values(&self, _x: &[f64], values: &mut [f64]) {
            values.copy_from_slice(&[-1.0, 1.0, 1.0, -3.0, 1.0]);
        }
        fn hessian_blocks(&self) -> Vec<Vec<usize>> {
            Vec::new()
        }
        fn hessian_values(&self, _x: &[f64], _f: f64, _l: &[f64], _values: &mut [f64]) {}
    }

    /// x0 = 2 and x0 = -2 at the same time is impossible.
    struct Contradiction;

    impl NlpProblem for Contradiction {
        fn num_variables(&self) -> usize {
            1
        }
        fn num_constraints(&self) -> usize {
            2
        }
        fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            lower[0] = -10.0;
            upper[0] = 10.0;
        }
        fn constraint_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
            lower.copy_from_slice(&[2.0, -2.0]);
            upper.copy_from_slice(&[2.0, -2.0]);
        }
        fn initial_point(&self, x: &mut [f64]) {
            x[0] = 0.5;
        }
        fn objective(&self, _x: &[f64]) -> f64 {
            0.0
        }
        fn objective_gradient(&self, _x: &[f64], grad: &mut [f64]) {
            grad[0] = 0.0;
        }
        fn constraints(&self, x: &[f64], g: &mut [f64]) {
            g[0] = x[0];
            g[1] = x[0];
        }
        fn jacobian_structure(&self) -> Vec<(usize, usize)> {
            vec![(0, 0), (1, 0)]
        }
        fn jacobian_values(&self, _x: &[f64], values: &mut [f64]) {
            values.fill(1.0);
        }
        fn hessian_blocks(&self) -> Vec<Vec<usize>> {
            vec![vec![0]]
        }
        fn hessian_values(&self, _x: &[f64], _f: f64, _l: &[f64], values: &mut [f64]) {
            values[0] = 0.0;
        }
    }

    #[test]
    fn solves_equality_constrained_projection() {
        let outcome = SqpSolver
            .solve(&Projection, &SolveOptions::default())
            .unwrap();
        assert!(outcome.reason.is_success(), "{:?}", outcome.reason);
        assert_abs_diff_eq!(outcome.x[0], 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(outcome.x[1], 1.0, epsilon = 1e-4);
        assert!(outcome.max_violation < 1e-6);
    }

    #[test]
    fn respects_nonlinear_inequality() {
        let outcome = SqpSolver.solve(&Disk, &SolveOptions::default()).unwrap();
        assert!(outcome.reason.is_success(), "{:?}", outcome.reason);
        let r2 = outcome.x[0].powi(2) + outcome.x[1].powi(2);
        assert!(r2 <= 0.5 + 1e-6);
        assert_abs_diff_eq!(r2, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn optimum_on_a_lower_bound_converges() {
        for start_t in [0.0, 2.0, 5.0] {
            let outcome = SqpSolver
                .solve(&Burn { start_t }, &SolveOptions::default())
                .unwrap();
            assert_eq!(
                outcome.reason,
                TerminationReason::Converged,
                "start t = {start_t}"
            );
            assert_abs_diff_eq!(outcome.x[2], 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(outcome.x[1], 10.0, epsilon = 1e-6);
            assert_abs_diff_eq!(outcome.x[3], 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(outcome.objective, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn reports_contradictory_rows_as_infeasible() {
        let outcome = SqpSolver
            .solve(&Contradiction, &SolveOptions::default())
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::LocallyInfeasible);
        assert!(outcome.max_violation > 1.0);
    }

    #[test]
    fn iteration_cap_returns_last_iterate() {
        let options = SolveOptions {
            max_iterations: 1,
            ..SolveOptions::default()
        };
        let outcome = SqpSolver.solve(&Disk, &options).unwrap();
        assert_eq!(outcome.reason, TerminationReason::MaxIterations);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.x.len(), 2);
    }

    #[test]
    fn cancelled_token_stops_before_iterating() {
        let token = crate::CancelToken::new();
        token.cancel();
        let options = SolveOptions {
            cancel: Some(token),
            ..SolveOptions::default()
        };
        let outcome = SqpSolver.solve(&Projection, &options).unwrap();
        assert_eq!(outcome.reason, TerminationReason::Cancelled);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        struct Inverted;
        impl NlpProblem for Inverted {
            fn num_variables(&self) -> usize {
                1
            }
            fn num_constraints(&self) -> usize {
                0
            }
            fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
                lower[0] = 1.0;
                upper[0] = 0.0;
            }
            fn constraint_bounds(&self, _lower: &mut [f64], _upper: &mut [f64]) {}
            fn initial_point(&self, x: &mut [f64]) {
                x[0] = 0.5;
            }
            fn objective(&self, x: &[f64]) -> f64 {
                x[0]
            }
            fn objective_gradient(&self, _x: &[f64], grad: &mut [f64]) {
                grad[0] = 1.0;
            }
            fn constraints(&self, _x: &[f64], _g: &mut [f64]) {}
            fn jacobian_structure(&self) -> Vec<(usize, usize)> {
                Vec::new()
            }
            fn jacobian_values(&self, _x: &[f64], _values: &mut [f64]) {}
            fn hessian_blocks(&self) -> Vec<Vec<usize>> {
                Vec::new()
            }
            fn hessian_values(&self, _x: &[f64], _f: f64, _l: &[f64], _values: &mut [f64]) {}
        }
        let err = SqpSolver
            .solve(&Inverted, &SolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, NlpError::InvalidVariableBounds { index: 0, .. }));
    }
}
