//! Powered-descent trajectory transcription.
//!
//! A [`TrajectoryProblem`] is validated and turned into a [`ProblemSpec`] by [`ProblemBuilder`]
//! (direct multiple shooting with RK4 defects), solved through a [`SolverAdapter`] and unpacked by
//! [`SolutionExtractor`]. [`plan_descent`] wires the whole pipeline for request-style callers.

pub mod constraints;
pub mod discretize;
pub mod guess;
pub mod layout;
pub mod objective;
pub mod problem;
pub mod request;
pub mod solution;
pub mod solver;
pub mod worker;

pub use facade::*;
pub use descent_dynamics as dynamics;
pub use descent_nlp as nlp;
pub use descent_vehicle as vehicle_model;

mod facade;
