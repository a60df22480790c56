//! Request-level entry point: envelope checks, problem assembly and outcome mapping.

use std::time::Duration;

use descent_dynamics::State;
use descent_nlp::{NlpSolver, SqpSolver};
use descent_vehicle::{RocketOverrides, RocketParameters};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constraints::{TerminalConditions, TerminalMode};
use crate::problem::{ProblemBuilder, TranscriptionError, TrajectoryProblem};
use crate::solution::{Solution, SolutionExtractor};
use crate::solver::{SolverAdapter, SolverError, SolverOptions, SolverStatus};

pub const DEFAULT_INTERVALS: usize = 50;
pub const DEFAULT_TIME_STEP_S: f64 = 0.5;
/// Landing box half-width used by requests.
pub const REQUEST_POSITION_TOLERANCE_M: f64 = 5.0;
/// Per-axis velocity band and touchdown speed limit used by requests.
pub const REQUEST_TOUCHDOWN_SPEED_M_S: f64 = 1.0;

/// Starting point of the descent, relative to the landing pad.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialConditions {
    pub x_m: f64,
    pub y_m: f64,
    pub vx_m_s: f64,
    pub vy_m_s: f64,
    #[serde(default)]
    pub theta_rad: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescentRequest {
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub rocket: RocketOverrides,
    #[serde(default)]
    pub intervals: Option<usize>,
    #[serde(default)]
    pub dt_s: Option<f64>,
}

impl DescentRequest {
    pub fn new(initial_conditions: InitialConditions) -> Self {
        Self {
            initial_conditions,
            rocket: RocketOverrides::default(),
            intervals: None,
            dt_s: None,
        }
    }
}

/// Admissible initial conditions for a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub max_altitude_m: f64,
    pub max_downrange_m: f64,
    pub max_speed_component_m_s: f64,
}

impl Default for RequestEnvelope {
    fn default() -> Self {
        Self {
            max_altitude_m: 2_000.0,
            max_downrange_m: 1_500.0,
            max_speed_component_m_s: 50.0,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("initial condition '{0}' must be finite")]
    NonFinite(&'static str),
    #[error("altitude must be between 0 and {max} m (got {value})")]
    Altitude { value: f64, max: f64 },
    #[error("horizontal position must be between -{max} and {max} m (got {value})")]
    Downrange { value: f64, max: f64 },
    #[error("velocity components must be between -{max} and {max} m/s (got {axis} = {value})")]
    Velocity {
        axis: &'static str,
        value: f64,
        max: f64,
    },
}

impl RequestEnvelope {
    pub fn check(&self, ic: &InitialConditions) -> Result<(), RequestError> {
        let fields = [
            ("x_m", ic.x_m),
            ("y_m", ic.y_m),
            ("vx_m_s", ic.vx_m_s),
            ("vy_m_s", ic.vy_m_s),
            ("theta_rad", ic.theta_rad.unwrap_or(0.0)),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RequestError::NonFinite(*name));
        }
        if !(0.0..=self.max_altitude_m).contains(&ic.y_m) {
            return Err(RequestError::Altitude {
                value: ic.y_m,
                max: self.max_altitude_m,
            });
        }
        if ic.x_m.abs() > self.max_downrange_m {
            return Err(RequestError::Downrange {
                value: ic.x_m,
                max: self.max_downrange_m,
            });
        }
        for (axis, value) in [("vx", ic.vx_m_s), ("vy", ic.vy_m_s)] {
            if value.abs() > self.max_speed_component_m_s {
                return Err(RequestError::Velocity {
                    axis,
                    value,
                    max: self.max_speed_component_m_s,
                });
            }
        }
        Ok(())
    }
}

/// Every way a descent plan can fail. Solver outcomes carry the returned trajectory.
#[derive(Debug, Error)]
pub enum DescentError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] TranscriptionError),
    #[error("problem is infeasible (max violation {:.3e})", .0.metrics.max_violation)]
    Infeasible(Box<Solution>),
    #[error("iteration limit reached after {} iterations", .0.iterations)]
    IterationLimit(Box<Solution>),
    #[error("numerical failure (max violation {:.3e})", .0.metrics.max_violation)]
    NumericalFailure(Box<Solution>),
    #[error("solver did not report back within {0:?}")]
    TimedOut(Duration),
    #[error("solver backend error: {0}")]
    Backend(#[from] SolverError),
}

impl DescentError {
    /// Trajectory returned by the solver, when there is one.
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            DescentError::Infeasible(s)
            | DescentError::IterationLimit(s)
            | DescentError::NumericalFailure(s) => Some(s),
            _ => None,
        }
    }
}

/// `Ok` only for [`SolverStatus::Solved`].
pub fn into_outcome(solution: Solution) -> Result<Solution, DescentError> {
    match solution.status {
        SolverStatus::Solved => Ok(solution),
        SolverStatus::InfeasibleProblem => Err(DescentError::Infeasible(Box::new(solution))),
        SolverStatus::IterationLimitReached => {
            Err(DescentError::IterationLimit(Box::new(solution)))
        }
        SolverStatus::NumericalFailure => Err(DescentError::NumericalFailure(Box::new(solution))),
    }
}

/// Build, solve and extract. Returns the [`Solution`] for every solver status.
pub fn solve_problem_with<S: NlpSolver>(
    adapter: &SolverAdapter<S>,
    problem: &TrajectoryProblem,
    options: &SolverOptions,
) -> Result<Solution, DescentError> {
    let spec = ProblemBuilder::build(problem)?;
    let result = adapter.solve(&spec, options)?;
    Ok(SolutionExtractor::extract(&spec, &result))
}

/// [`solve_problem_with`] using the bundled SQP backend.
pub fn solve_problem(
    problem: &TrajectoryProblem,
    options: &SolverOptions,
) -> Result<Solution, DescentError> {
    solve_problem_with(&SolverAdapter::new(), problem, options)
}

/// Turns requests into trajectory problems and solves them.
#[derive(Debug, Clone, Default)]
pub struct DescentPlanner<S = SqpSolver> {
    adapter: SolverAdapter<S>,
    pub envelope: RequestEnvelope,
    pub base_vehicle: RocketParameters,
}

impl DescentPlanner<SqpSolver> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: NlpSolver> DescentPlanner<S> {
    pub fn with_backend(backend: S) -> Self {
        Self {
            adapter: SolverAdapter::with_backend(backend),
            envelope: RequestEnvelope::default(),
            base_vehicle: RocketParameters::default(),
        }
    }

    /// Problem for a request: full tanks, upright start unless told otherwise, landing in a
    /// small box around the pad with a touchdown speed cap.
    pub fn problem_for(&self, request: &DescentRequest) -> Result<TrajectoryProblem, DescentError> {
        self.envelope.check(&request.initial_conditions)?;
        let params = self.base_vehicle.with_overrides(&request.rocket);
        let ic = &request.initial_conditions;
        let initial = State {
            x: ic.x_m,
            y: ic.y_m,
            vx: ic.vx_m_s,
            vy: ic.vy_m_s,
            theta: ic.theta_rad.unwrap_or(0.0),
            omega: 0.0,
            mass: params.wet_mass_kg(),
        };
        let mut problem = TrajectoryProblem::new(
            params,
            initial,
            request.intervals.unwrap_or(DEFAULT_INTERVALS),
            request.dt_s.unwrap_or(DEFAULT_TIME_STEP_S),
        );
        problem.terminal = TerminalConditions {
            mode: TerminalMode::Band {
                position_tolerance_m: REQUEST_POSITION_TOLERANCE_M,
                velocity_tolerance_m_s: REQUEST_TOUCHDOWN_SPEED_M_S,
            },
            touchdown_speed_m_s: Some(REQUEST_TOUCHDOWN_SPEED_M_S),
            ..TerminalConditions::default()
        };
        problem.validate()?;
        Ok(problem)
    }

    pub fn plan(
        &self,
        request: &DescentRequest,
        options: &SolverOptions,
    ) -> Result<Solution, DescentError> {
        let problem = self.problem_for(request)?;
        info!(
            "planning descent from ({:.1}, {:.1}) m over {} intervals",
            problem.initial_state.x, problem.initial_state.y, problem.intervals
        );
        into_outcome(solve_problem_with(&self.adapter, &problem, options)?)
    }
}

/// Plans a request with the default vehicle, envelope and backend.
pub fn plan_descent(
    request: &DescentRequest,
    options: &SolverOptions,
) -> Result<Solution, DescentError> {
    DescentPlanner::new().plan(request, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(x: f64, y: f64, vx: f64, vy: f64) -> DescentRequest {
        DescentRequest::new(InitialConditions {
            x_m: x,
            y_m: y,
            vx_m_s: vx,
            vy_m_s: vy,
            theta_rad: None,
        })
    }

    #[test]
    fn envelope_matches_request_limits() {
        let env = RequestEnvelope::default();
        assert!(env.check(&request(0.0, 1000.0, 0.0, 0.0).initial_conditions).is_ok());
        assert!(matches!(
            env.check(&request(0.0, 2000.5, 0.0, 0.0).initial_conditions),
            Err(RequestError::Altitude { .. })
        ));
        assert!(matches!(
            env.check(&request(-1600.0, 100.0, 0.0, 0.0).initial_conditions),
            Err(RequestError::Downrange { .. })
        ));
        assert!(matches!(
            env.check(&request(0.0, 100.0, 0.0, -51.0).initial_conditions),
            Err(RequestError::Velocity { axis: "vy", .. })
        ));
        assert_eq!(
            env.check(&request(f64::NAN, 100.0, 0.0, 0.0).initial_conditions),
            Err(RequestError::NonFinite("x_m"))
        );
    }

    #[test]
    fn request_defaults_fill_problem() {
        let planner = DescentPlanner::new();
        let problem = planner.problem_for(&request(10.0, 800.0, 0.0, -5.0)).unwrap();
        assert_eq!(problem.intervals, DEFAULT_INTERVALS);
        assert_eq!(problem.dt, DEFAULT_TIME_STEP_S);
        assert_eq!(problem.initial_state.mass, 28_000.0);
        assert!(problem.terminal.has_speed_row());
    }

    #[test]
    fn invalid_overrides_surface_as_invalid_parameters() {
        let mut req = request(0.0, 500.0, 0.0, 0.0);
        req.rocket.isp_s = Some(-1.0);
        let err = DescentPlanner::new().problem_for(&req).unwrap_err();
        assert!(matches!(err, DescentError::InvalidParameters(_)));

        let mut req = request(0.0, 500.0, 0.0, 0.0);
        req.intervals = Some(0);
        let err = plan_descent(&req, &SolverOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            DescentError::InvalidParameters(TranscriptionError::NoIntervals)
        ));
    }
}
