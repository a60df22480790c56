//! Nonlinear programming interface consumed by the trajectory transcription, plus one backend.
//!
//! Problems are described through [`NlpProblem`]: smooth objective and constraint callbacks, a
//! sparse constraint Jacobian and a block-diagonal Lagrangian Hessian. Any type implementing
//! [`NlpSolver`] can be plugged in; [`SqpSolver`] is the bundled trust-region SQP method whose
//! quadratic subproblems are solved by OSQP.

mod options;
mod osqp_adapter;
mod outcome;
mod problem;
mod scaled;
mod sqp;

pub use options::{CancelToken, SolveOptions};
pub use outcome::{NlpError, NlpOutcome, TerminationReason};
pub use problem::{NlpProblem, NlpSolver};
pub use sqp::SqpSolver;
