//! Planar powered-descent trajectory planning.
//!
//! The member crates do the work: vehicle parameters and rigid-body dynamics, a direct
//! multiple-shooting transcription, an SQP backend on OSQP and CSV/JSON export. This
//! crate re-exports them so front-ends (the `descent` CLI, tests) share one entry point.

pub mod scenario;

pub use descent_config as config;
pub use descent_core as primitives;
pub use descent_dynamics as dynamics;
pub use descent_export as export;
pub use descent_nlp as nlp;
pub use descent_transcription as transcription;
pub use descent_vehicle as vehicle;

pub use descent_transcription::{
    DescentError, DescentRequest, InitialConditions, Solution, SolverOptions, SolverStatus,
    TrajectoryProblem, plan_descent, solve_problem,
};

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
