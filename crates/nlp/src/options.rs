use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::outcome::NlpError;

/// Shared flag a caller can raise to stop an in-flight solve at the next iteration boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-call solver settings. Nothing is read from global state.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub max_iterations: usize,
    /// Scaled optimality tolerance for full convergence.
    pub tolerance: f64,
    /// Looser model-decrease tolerance for acceptable termination.
    pub acceptable_tolerance: f64,
    /// Scaled constraint tolerance for acceptable termination.
    pub acceptable_constraint_tolerance: f64,
    /// Consecutive acceptable iterates required before stopping early.
    pub acceptable_iterations: usize,
    pub time_limit: Option<Duration>,
    /// Iterations without a 1% reduction of constraint violation before declaring infeasibility.
    pub stall_iterations: usize,
    /// Scaled ℓ1 constraint violation above which a stall counts as infeasibility.
    pub infeasibility_threshold: f64,
    pub cancel: Option<CancelToken>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-6,
            acceptable_tolerance: 1e-4,
            acceptable_constraint_tolerance: 1e-5,
            acceptable_iterations: 5,
            time_limit: None,
            stall_iterations: 40,
            infeasibility_threshold: 1e-3,
            cancel: None,
        }
    }
}

impl SolveOptions {
    pub fn validate(&self) -> Result<(), NlpError> {
        if self.max_iterations == 0 {
            return Err(NlpError::InvalidOption("max_iterations must be positive"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(NlpError::InvalidOption("tolerance must be positive and finite"));
        }
        if !(self.acceptable_tolerance.is_finite() && self.acceptable_tolerance > 0.0)
            || !(self.acceptable_constraint_tolerance.is_finite()
                && self.acceptable_constraint_tolerance > 0.0)
        {
            return Err(NlpError::InvalidOption(
                "acceptable tolerances must be positive and finite",
            ));
        }
        if !(self.infeasibility_threshold.is_finite() && self.infeasibility_threshold >= 0.0) {
            return Err(NlpError::InvalidOption(
                "infeasibility_threshold must be non-negative and finite",
            ));
        }
        if self.stall_iterations == 0 {
            return Err(NlpError::InvalidOption("stall_iterations must be positive"));
        }
        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}
