//! Reshaping solver output into trajectories and landing metrics.

use descent_core::NodeBuffer;
use descent_core::planar::{distance, norm};
use descent_dynamics::{CONTROL_DIM, Control, ControlComponent, STATE_DIM, State, StateComponent};
use log::warn;
use serde::Serialize;

use crate::constraints::ConstraintViolation;
use crate::problem::ProblemSpec;
use crate::solver::{LimitKind, SolverResult, SolverStatus};

/// Number of labelled violations kept on a [`Solution`].
pub const REPORTED_VIOLATIONS: usize = 5;

/// Derived landing figures, computed for every status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolutionMetrics {
    pub propellant_used_kg: f64,
    pub terminal_position_error_m: f64,
    pub terminal_velocity_error_m_s: f64,
    pub max_violation: f64,
    pub final_mass_kg: f64,
    pub flight_time_s: f64,
    pub max_speed_m_s: f64,
    pub peak_thrust_n: f64,
}

/// State and control trajectories plus diagnostics. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    /// `N + 1` nodes of `[x, y, vx, vy, theta, omega, mass]`.
    pub states: NodeBuffer,
    /// `N` nodes of `[thrust, gimbal, rcs_left, rcs_right]`.
    pub controls: NodeBuffer,
    pub dt: f64,
    pub status: SolverStatus,
    pub limit: Option<LimitKind>,
    pub objective: f64,
    pub metrics: SolutionMetrics,
    /// Largest violations first.
    pub violations: Vec<ConstraintViolation>,
    pub iterations: usize,
    pub solve_time_s: f64,
}

impl Solution {
    pub fn intervals(&self) -> usize {
        self.controls.nodes()
    }

    pub fn is_solved(&self) -> bool {
        self.status == SolverStatus::Solved
    }

    pub fn state(&self, k: usize) -> State {
        State::from_slice(self.states.node(k))
    }

    pub fn control(&self, k: usize) -> Control {
        Control::from_slice(self.controls.node(k))
    }

    /// Time of node `k` from the start of the descent.
    pub fn time(&self, k: usize) -> f64 {
        k as f64 * self.dt
    }

    pub fn final_state(&self) -> State {
        self.state(self.states.nodes() - 1)
    }
}

pub struct SolutionExtractor;

impl SolutionExtractor {
    pub fn extract(spec: &ProblemSpec, result: &SolverResult) -> Solution {
        let layout = spec.layout();
        let problem = spec.problem();
        let n = layout.intervals();

        let mut states = NodeBuffer::zeros(n + 1, STATE_DIM);
        for k in 0..=n {
            states
                .node_mut(k)
                .copy_from_slice(layout.state_slice(&result.x, k));
        }
        let mut controls = NodeBuffer::zeros(n, CONTROL_DIM);
        for k in 0..n {
            controls
                .node_mut(k)
                .copy_from_slice(layout.control_slice(&result.x, k));
        }

        let initial = problem.initial_state.to_array();
        let drift = states
            .node(0)
            .iter()
            .zip(&initial)
            .map(|(a, b)| (a - b).abs() / b.abs().max(1.0))
            .fold(0.0, f64::max);
        if drift > 1e-6 {
            warn!("solver moved the initial node by {drift:.3e} (relative); pinning it");
        }
        states.node_mut(0).copy_from_slice(&initial);

        let violations: Vec<ConstraintViolation> = spec
            .constraint_set()
            .violations(&result.x, &result.rows)
            .into_iter()
            .take(REPORTED_VIOLATIONS)
            .collect();
        let metrics = Self::metrics(spec, &states, &controls, result.max_violation);

        Solution {
            states,
            controls,
            dt: problem.dt,
            status: result.status,
            limit: result.limit,
            objective: result.objective,
            metrics,
            violations,
            iterations: result.iterations,
            solve_time_s: result.elapsed.as_secs_f64(),
        }
    }

    fn metrics(
        spec: &ProblemSpec,
        states: &NodeBuffer,
        controls: &NodeBuffer,
        max_violation: f64,
    ) -> SolutionMetrics {
        let problem = spec.problem();
        let target = &problem.terminal.target;
        let last = State::from_slice(states.node(states.nodes() - 1));
        let mass = StateComponent::Mass.index();
        let max_speed = states
            .rows()
            .map(|s| norm(s[StateComponent::Vx.index()], s[StateComponent::Vy.index()]))
            .fold(0.0, f64::max);
        let peak_thrust = controls
            .column(ControlComponent::Thrust.index())
            .fold(0.0, f64::max);
        SolutionMetrics {
            propellant_used_kg: states.get(0, mass) - last.mass,
            terminal_position_error_m: distance([last.x, last.y], [target.x_m, target.y_m]),
            terminal_velocity_error_m_s: distance(
                [last.vx, last.vy],
                [target.vx_m_s, target.vy_m_s],
            ),
            max_violation,
            final_mass_kg: last.mass,
            flight_time_s: problem.horizon(),
            max_speed_m_s: max_speed,
            peak_thrust_n: peak_thrust,
        }
    }
}
