//! Initial guesses for the decision vector.

use descent_core::NodeBuffer;
use descent_dynamics::{CONTROL_DIM, ControlComponent, STATE_DIM, StateComponent};

use crate::constraints::control_bounds;
use crate::problem::{TranscriptionError, TrajectoryProblem};

/// State and control trajectories used to start the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialGuess {
    pub states: NodeBuffer,
    pub controls: NodeBuffer,
}

impl InitialGuess {
    /// Check the guess fits a problem with `intervals` intervals.
    pub fn validate(&self, intervals: usize) -> Result<(), TranscriptionError> {
        let expected_states = (intervals + 1, STATE_DIM);
        if self.states.shape() != expected_states {
            return Err(TranscriptionError::GuessShape {
                what: "states",
                expected: expected_states,
                actual: self.states.shape(),
            });
        }
        let expected_controls = (intervals, CONTROL_DIM);
        if self.controls.shape() != expected_controls {
            return Err(TranscriptionError::GuessShape {
                what: "controls",
                expected: expected_controls,
                actual: self.controls.shape(),
            });
        }
        if !self.states.is_finite() || !self.controls.is_finite() {
            return Err(TranscriptionError::GuessNotFinite);
        }
        Ok(())
    }

    /// Flatten into the decision-vector order: states then controls.
    pub fn to_decision_vector(&self) -> Vec<f64> {
        let mut x = Vec::with_capacity(self.states.as_slice().len() + self.controls.as_slice().len());
        x.extend_from_slice(self.states.as_slice());
        x.extend_from_slice(self.controls.as_slice());
        x
    }
}

/// Straight-line states from the initial state to the target with hover thrust.
///
/// Attitude and rate interpolate to zero. Mass interpolates toward the mass left after hovering
/// for the whole horizon, never below the dry mass.
pub fn default_guess(problem: &TrajectoryProblem) -> InitialGuess {
    let n = problem.intervals;
    let params = &problem.params;
    let s0 = problem.initial_state.to_array();
    let target = &problem.terminal.target;

    let horizon = n as f64 * problem.dt;
    let hover_burn = s0[StateComponent::Mass.index()] * params.gravity_m_s2 * horizon
        / params.exhaust_velocity();
    let final_mass = (s0[StateComponent::Mass.index()] - hover_burn).max(params.dry_mass_kg);
    let end = [
        target.x_m,
        target.y_m,
        target.vx_m_s,
        target.vy_m_s,
        0.0,
        0.0,
        final_mass,
    ];

    let mut states = NodeBuffer::zeros(n + 1, STATE_DIM);
    for k in 0..=n {
        let t = k as f64 / n.max(1) as f64;
        for i in 0..STATE_DIM {
            states.set(k, i, s0[i] + t * (end[i] - s0[i]));
        }
    }

    let (t_min, t_max) = control_bounds(problem)[ControlComponent::Thrust.index()];
    let mut controls = NodeBuffer::zeros(n, CONTROL_DIM);
    for k in 0..n {
        let mass = states.get(k, StateComponent::Mass.index());
        let thrust = params.hover_thrust(mass).clamp(t_min, t_max);
        controls.set(k, ControlComponent::Thrust.index(), thrust);
    }

    InitialGuess { states, controls }
}
