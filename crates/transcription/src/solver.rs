//! Adapter between a [`ProblemSpec`] and any [`NlpSolver`] backend.

use std::fmt;
use std::time::Duration;

use descent_nlp::{
    CancelToken, NlpError, NlpProblem, NlpSolver, SolveOptions, SqpSolver, TerminationReason,
};
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::problem::ProblemSpec;

/// Normalized outcome of one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Solved,
    InfeasibleProblem,
    IterationLimitReached,
    NumericalFailure,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverStatus::Solved => "solved",
            SolverStatus::InfeasibleProblem => "infeasible",
            SolverStatus::IterationLimitReached => "iteration limit reached",
            SolverStatus::NumericalFailure => "numerical failure",
        })
    }
}

/// Which limit stopped an [`SolverStatus::IterationLimitReached`] solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Iterations,
    WallClock,
    Cancelled,
}

/// Caller-facing solver settings.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub acceptable_tolerance: f64,
    pub time_limit: Option<Duration>,
    /// Iterations without progress on feasibility before the problem is declared infeasible.
    pub stall_iterations: usize,
    pub cancel: Option<CancelToken>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        let nlp = SolveOptions::default();
        Self {
            max_iterations: nlp.max_iterations,
            tolerance: nlp.tolerance,
            acceptable_tolerance: nlp.acceptable_tolerance,
            time_limit: None,
            stall_iterations: nlp.stall_iterations,
            cancel: None,
        }
    }
}

impl SolverOptions {
    pub fn to_nlp(&self) -> SolveOptions {
        SolveOptions {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            acceptable_tolerance: self.acceptable_tolerance,
            time_limit: self.time_limit,
            stall_iterations: self.stall_iterations,
            cancel: self.cancel.clone(),
            ..SolveOptions::default()
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error(transparent)]
    Backend(#[from] NlpError),
    #[error("backend returned {actual} {what}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Raw result of a solve: the returned point plus its diagnostics, for every status.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub status: SolverStatus,
    pub limit: Option<LimitKind>,
    pub reason: TerminationReason,
    pub x: Vec<f64>,
    pub objective: f64,
    /// Row values at `x`.
    pub rows: Vec<f64>,
    pub max_violation: f64,
    pub iterations: usize,
    pub elapsed: Duration,
}

/// Maps a backend termination reason onto the four caller-visible outcomes.
pub fn classify(reason: TerminationReason) -> (SolverStatus, Option<LimitKind>) {
    match reason {
        TerminationReason::Converged | TerminationReason::ConvergedAcceptable => {
            (SolverStatus::Solved, None)
        }
        TerminationReason::LocallyInfeasible => (SolverStatus::InfeasibleProblem, None),
        TerminationReason::MaxIterations => (
            SolverStatus::IterationLimitReached,
            Some(LimitKind::Iterations),
        ),
        TerminationReason::TimeLimit => (
            SolverStatus::IterationLimitReached,
            Some(LimitKind::WallClock),
        ),
        TerminationReason::Cancelled => (
            SolverStatus::IterationLimitReached,
            Some(LimitKind::Cancelled),
        ),
        TerminationReason::NumericalBreakdown => (SolverStatus::NumericalFailure, None),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolverAdapter<S = SqpSolver> {
    backend: S,
}

impl SolverAdapter<SqpSolver> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: NlpSolver> SolverAdapter<S> {
    pub fn with_backend(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn solve(
        &self,
        spec: &ProblemSpec,
        options: &SolverOptions,
    ) -> Result<SolverResult, SolverError> {
        let outcome = self.backend.solve(spec, &options.to_nlp())?;
        let n = spec.num_variables();
        if outcome.x.len() != n {
            return Err(SolverError::DimensionMismatch {
                what: "variables",
                expected: n,
                actual: outcome.x.len(),
            });
        }
        let rows = spec.evaluate_rows(&outcome.x);
        let max_violation = spec
            .constraint_set()
            .violations(&outcome.x, &rows)
            .first()
            .map_or(0.0, |v| v.magnitude);
        let (status, limit) = classify(outcome.reason);
        match status {
            SolverStatus::Solved => info!(
                "solved in {} iterations ({:.3}s), objective {:.4}",
                outcome.iterations,
                outcome.elapsed.as_secs_f64(),
                outcome.objective
            ),
            _ => warn!(
                "solve stopped: {} after {} iterations, max violation {:.3e}",
                outcome.reason, outcome.iterations, max_violation
            ),
        }
        Ok(SolverResult {
            status,
            limit,
            reason: outcome.reason,
            objective: spec.objective(&outcome.x),
            x: outcome.x,
            rows,
            max_violation,
            iterations: outcome.iterations,
            elapsed: outcome.elapsed,
        })
    }
}
