use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    Converged,
    /// Stopped at the looser acceptable tolerances.
    ConvergedAcceptable,
    MaxIterations,
    TimeLimit,
    Cancelled,
    /// Converged to a stationary point of the constraint violation that is not feasible.
    LocallyInfeasible,
    /// Non-finite values or unrecoverable factorization failure.
    NumericalBreakdown,
}

impl TerminationReason {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            TerminationReason::Converged | TerminationReason::ConvergedAcceptable
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TerminationReason::Converged => "converged",
            TerminationReason::ConvergedAcceptable => "converged to acceptable level",
            TerminationReason::MaxIterations => "maximum iterations reached",
            TerminationReason::TimeLimit => "time limit reached",
            TerminationReason::Cancelled => "cancelled",
            TerminationReason::LocallyInfeasible => "locally infeasible",
            TerminationReason::NumericalBreakdown => "numerical breakdown",
        };
        f.write_str(label)
    }
}

/// Final iterate and diagnostics, returned for every termination reason.
#[derive(Debug, Clone)]
pub struct NlpOutcome {
    pub reason: TerminationReason,
    /// Last accepted primal point in problem units.
    pub x: Vec<f64>,
    /// Constraint multipliers in problem units.
    pub lambda: Vec<f64>,
    pub objective: f64,
    /// Constraint values at `x`.
    pub constraints: Vec<f64>,
    /// Largest bound or row violation at `x`, unscaled.
    pub max_violation: f64,
    /// Scaled dual infeasibility at `x`.
    pub dual_infeasibility: f64,
    pub iterations: usize,
    pub elapsed: Duration,
}

/// Problems rejected before iterating.
#[derive(Debug, Error, PartialEq)]
pub enum NlpError {
    #[error("invalid solver option: {0}")]
    InvalidOption(&'static str),
    #[error("variable {index} has lower bound {lower} above upper bound {upper}")]
    InvalidVariableBounds { index: usize, lower: f64, upper: f64 },
    #[error("constraint {index} has lower bound {lower} above upper bound {upper}")]
    InvalidConstraintBounds { index: usize, lower: f64, upper: f64 },
    #[error("variable {0} appears in more than one Hessian block")]
    OverlappingHessianBlocks(usize),
    #[error("index {index} out of range for {what}")]
    IndexOutOfRange { what: &'static str, index: usize },
    #[error("scaling factor for {what} {index} must be positive and finite")]
    InvalidScaling { what: &'static str, index: usize },
}
