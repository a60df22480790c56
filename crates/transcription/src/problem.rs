//! Trajectory problem definition and its transcription into an [`NlpProblem`].

use descent_dynamics::{CONTROL_DIM, STATE_DIM, State, StateComponent};
use descent_nlp::NlpProblem;
use descent_vehicle::{ParameterError, RocketParameters};
use log::debug;
use thiserror::Error;

use crate::constraints::{ConstraintSet, PathLimits, TerminalConditions, TerminalMode};
use crate::discretize::Discretizer;
use crate::guess::{InitialGuess, default_guess};
use crate::layout::{INTERVAL_BLOCK, VariableLayout};
use crate::objective::{Objective, ObjectiveBuilder, ObjectiveWeights};

/// Rejected problem definitions. Raised before anything reaches the solver.
#[derive(Debug, Error, PartialEq)]
pub enum TranscriptionError {
    #[error("number of intervals must be positive")]
    NoIntervals,
    #[error("time step must be positive and finite (got {0})")]
    InvalidTimeStep(f64),
    #[error("invalid rocket parameters: {0}")]
    Parameters(#[from] ParameterError),
    #[error("{what} must be finite")]
    NonFinite { what: &'static str },
    #[error("{what} must not be negative (got {value})")]
    Negative { what: &'static str, value: f64 },
    #[error("bounds on {component} at node {node} are empty: [{lower}, {upper}]")]
    InconsistentBounds {
        node: usize,
        component: &'static str,
        lower: f64,
        upper: f64,
    },
    #[error("initial guess {what} has shape {actual:?}, expected {expected:?}")]
    GuessShape {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("initial guess contains non-finite values")]
    GuessNotFinite,
}

/// Everything needed to plan one descent.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryProblem {
    pub intervals: usize,
    pub dt: f64,
    pub params: RocketParameters,
    pub initial_state: State,
    pub terminal: TerminalConditions,
    pub path: PathLimits,
    pub weights: ObjectiveWeights,
    pub guess: Option<InitialGuess>,
}

impl TrajectoryProblem {
    /// Problem with default terminal conditions (exact landing at the origin), default path
    /// limits and the pure propellant objective.
    pub fn new(
        params: RocketParameters,
        initial_state: State,
        intervals: usize,
        dt: f64,
    ) -> Self {
        Self {
            intervals,
            dt,
            params,
            initial_state,
            terminal: TerminalConditions::default(),
            path: PathLimits::default(),
            weights: ObjectiveWeights::default(),
            guess: None,
        }
    }

    /// Total time covered by the horizon.
    pub fn horizon(&self) -> f64 {
        self.intervals as f64 * self.dt
    }

    pub fn validate(&self) -> Result<(), TranscriptionError> {
        if self.intervals == 0 {
            return Err(TranscriptionError::NoIntervals);
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(TranscriptionError::InvalidTimeStep(self.dt));
        }
        self.params.validate()?;
        if !self.initial_state.is_finite() {
            return Err(TranscriptionError::NonFinite {
                what: "initial state",
            });
        }
        let target = &self.terminal.target;
        if ![target.x_m, target.y_m, target.vx_m_s, target.vy_m_s]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(TranscriptionError::NonFinite {
                what: "terminal target",
            });
        }

        let mut settings = vec![
            ("attitude tolerance", self.terminal.attitude_tolerance_rad),
            ("rate tolerance", self.terminal.rate_tolerance_rad_s),
            ("terminal error weight", self.weights.terminal_error),
            ("control effort weight", self.weights.control_effort),
            ("attitude weight", self.weights.attitude),
        ];
        if let TerminalMode::Band {
            position_tolerance_m,
            velocity_tolerance_m_s,
        } = self.terminal.mode
        {
            settings.push(("position tolerance", position_tolerance_m));
            settings.push(("velocity tolerance", velocity_tolerance_m_s));
        }
        if let Some(v) = self.terminal.touchdown_speed_m_s {
            settings.push(("touchdown speed", v));
        }
        if let Some(t) = self.path.max_tilt_rad {
            settings.push(("tilt limit", t));
        }
        if let Some(w) = self.path.max_angular_rate_rad_s {
            settings.push(("angular rate limit", w));
        }
        for (what, value) in settings {
            if !value.is_finite() {
                return Err(TranscriptionError::NonFinite { what });
            }
            if value < 0.0 {
                return Err(TranscriptionError::Negative { what, value });
            }
        }

        if let Some(guess) = &self.guess {
            guess.validate(self.intervals)?;
        }
        Ok(())
    }
}

/// Characteristic magnitudes used to scale variables and defect rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableScales {
    pub state: [f64; STATE_DIM],
    pub control: [f64; CONTROL_DIM],
}

impl VariableScales {
    pub fn for_problem(problem: &TrajectoryProblem) -> Self {
        let s0 = &problem.initial_state;
        let target = &problem.terminal.target;
        let position = 10f64
            .max((s0.x - target.x_m).abs())
            .max((s0.y - target.y_m).abs());
        let velocity = 1f64
            .max(s0.vx.abs())
            .max(s0.vy.abs())
            .max(position / problem.horizon());
        let p = &problem.params;
        let positive = |v: f64| if v > 0.0 { v } else { 1.0 };
        Self {
            state: [
                position,
                position,
                velocity,
                velocity,
                1.0,
                1.0,
                positive(p.propellant_mass_kg),
            ],
            control: [
                positive(p.max_thrust_n),
                positive(p.max_gimbal_rad),
                positive(p.max_rcs_force_n),
                positive(p.max_rcs_force_n),
            ],
        }
    }

    /// Scales of one `(s_k, u_k)` block.
    pub fn block(&self) -> [f64; INTERVAL_BLOCK] {
        let mut out = [0.0; INTERVAL_BLOCK];
        out[..STATE_DIM].copy_from_slice(&self.state);
        out[STATE_DIM..].copy_from_slice(&self.control);
        out
    }
}

/// Validates a [`TrajectoryProblem`] and assembles the opaque [`ProblemSpec`].
pub struct ProblemBuilder;

impl ProblemBuilder {
    pub fn build(problem: &TrajectoryProblem) -> Result<ProblemSpec, TranscriptionError> {
        problem.validate()?;
        let constraints = ConstraintSet::build(problem)?;
        let objective = ObjectiveBuilder::build(problem);
        let guess = problem
            .guess
            .clone()
            .unwrap_or_else(|| default_guess(problem));
        let scales = VariableScales::for_problem(problem);
        let layout = *constraints.layout();
        debug!(
            "transcribed {} intervals: {} variables, {} rows",
            problem.intervals,
            layout.num_variables(),
            constraints.num_rows()
        );
        Ok(ProblemSpec {
            problem: problem.clone(),
            layout,
            constraints,
            objective,
            initial_point: guess.to_decision_vector(),
            scales,
        })
    }
}

/// Immutable, solver-ready transcription of one [`TrajectoryProblem`].
#[derive(Debug, Clone)]
pub struct ProblemSpec {
    problem: TrajectoryProblem,
    layout: VariableLayout,
    constraints: ConstraintSet,
    objective: Objective,
    initial_point: Vec<f64>,
    scales: VariableScales,
}

impl ProblemSpec {
    pub fn problem(&self) -> &TrajectoryProblem {
        &self.problem
    }

    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    pub fn constraint_set(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn objective_fn(&self) -> &Objective {
        &self.objective
    }

    pub fn scales(&self) -> &VariableScales {
        &self.scales
    }

    /// Decision vector the solver starts from.
    pub fn initial_guess(&self) -> &[f64] {
        &self.initial_point
    }

    pub fn discretizer(&self) -> Discretizer<'_> {
        Discretizer::new(&self.problem.params, self.problem.dt)
    }

    /// Row values `g(x)` (defects, then the touchdown speed row).
    pub fn evaluate_rows(&self, x: &[f64]) -> Vec<f64> {
        let mut g = vec![0.0; self.constraints.num_rows()];
        NlpProblem::constraints(self, x, &mut g);
        g
    }
}

impl NlpProblem for ProblemSpec {
    fn num_variables(&self) -> usize {
        self.layout.num_variables()
    }

    fn num_constraints(&self) -> usize {
        self.constraints.num_rows()
    }

    fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
        lower.copy_from_slice(&self.constraints.lower);
        upper.copy_from_slice(&self.constraints.upper);
    }

    fn constraint_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
        self.constraints.row_bounds(lower, upper);
    }

    fn initial_point(&self, x: &mut [f64]) {
        x.copy_from_slice(&self.initial_point);
    }

    fn variable_scaling(&self, scale: &mut [f64]) {
        for k in 0..self.layout.state_nodes() {
            for i in 0..STATE_DIM {
                scale[self.layout.state(k, i)] = 1.0 / self.scales.state[i];
            }
        }
        for k in 0..self.layout.intervals() {
            for j in 0..CONTROL_DIM {
                scale[self.layout.control(k, j)] = 1.0 / self.scales.control[j];
            }
        }
    }

    fn constraint_scaling(&self, scale: &mut [f64]) {
        for k in 0..self.layout.intervals() {
            for i in 0..STATE_DIM {
                scale[self.layout.defect_row(k, i)] = 1.0 / self.scales.state[i];
            }
        }
        if let (Some(row), Some(limit)) = (self.constraints.speed_row(), self.constraints.speed_limit())
        {
            scale[row] = if limit > 0.0 { 1.0 / (limit * limit) } else { 1.0 };
        }
    }

    fn objective(&self, x: &[f64]) -> f64 {
        self.objective.value(x)
    }

    fn objective_gradient(&self, x: &[f64], grad: &mut [f64]) {
        self.objective.gradient(x, grad);
    }

    fn constraints(&self, x: &[f64], g: &mut [f64]) {
        let disc = self.discretizer();
        for k in 0..self.layout.intervals() {
            let s = self.layout.state_array(x, k);
            let u = self.layout.control_array(x, k);
            let next = self.layout.state_array(x, k + 1);
            let defect = disc.defect(&s, &u, &next);
            let row = self.layout.defect_row(k, 0);
            g[row..row + STATE_DIM].copy_from_slice(&defect);
        }
        if let Some(row) = self.constraints.speed_row() {
            let s = self.layout.state_slice(x, self.layout.intervals());
            g[row] = s[StateComponent::Vx.index()].powi(2) + s[StateComponent::Vy.index()].powi(2);
        }
    }

    /// Per defect row: `s_{k+1,i}`, then the 7 `s_k` columns, then the 4 `u_k` columns.
    fn jacobian_structure(&self) -> Vec<(usize, usize)> {
        let mut entries = Vec::with_capacity(self.layout.num_defect_rows() * (1 + INTERVAL_BLOCK) + 2);
        for k in 0..self.layout.intervals() {
            for i in 0..STATE_DIM {
                let row = self.layout.defect_row(k, i);
                entries.push((row, self.layout.state(k + 1, i)));
                entries.extend((0..STATE_DIM).map(|j| (row, self.layout.state(k, j))));
                entries.extend((0..CONTROL_DIM).map(|j| (row, self.layout.control(k, j))));
            }
        }
        if let Some(row) = self.constraints.speed_row() {
            let n = self.layout.intervals();
            entries.push((row, self.layout.state(n, StateComponent::Vx.index())));
            entries.push((row, self.layout.state(n, StateComponent::Vy.index())));
        }
        entries
    }

    fn jacobian_values(&self, x: &[f64], values: &mut [f64]) {
        let disc = self.discretizer();
        let mut cursor = 0;
        for k in 0..self.layout.intervals() {
            let s = self.layout.state_array(x, k);
            let u = self.layout.control_array(x, k);
            let jac = disc.step_jacobian(&s, &u);
            for row in &jac {
                values[cursor] = 1.0;
                for (c, d) in row.iter().enumerate() {
                    values[cursor + 1 + c] = -d;
                }
                cursor += 1 + INTERVAL_BLOCK;
            }
        }
        if self.constraints.speed_row().is_some() {
            let s = self.layout.state_slice(x, self.layout.intervals());
            values[cursor] = 2.0 * s[StateComponent::Vx.index()];
            values[cursor + 1] = 2.0 * s[StateComponent::Vy.index()];
        }
    }

    fn hessian_blocks(&self) -> Vec<Vec<usize>> {
        self.layout.hessian_blocks()
    }

    fn hessian_values(&self, x: &[f64], obj_factor: f64, lambda: &[f64], values: &mut [f64]) {
        values.fill(0.0);
        let disc = self.discretizer();
        let block_scales = self.scales.block();
        for k in 0..self.layout.intervals() {
            let row = self.layout.defect_row(k, 0);
            let mut weights = [0.0; STATE_DIM];
            weights.copy_from_slice(&lambda[row..row + STATE_DIM]);
            let s = self.layout.state_array(x, k);
            let u = self.layout.control_array(x, k);
            let hess = disc.defect_curvature(&s, &u, &weights, &block_scales);
            let offset = self.layout.hessian_offset(k);
            for (r, hr) in hess.iter().enumerate() {
                values[offset + r * INTERVAL_BLOCK..offset + (r + 1) * INTERVAL_BLOCK]
                    .copy_from_slice(hr);
            }
        }
        if let Some(row) = self.constraints.speed_row() {
            let offset = self.layout.hessian_offset(self.layout.intervals());
            for i in [StateComponent::Vx.index(), StateComponent::Vy.index()] {
                values[offset + i * STATE_DIM + i] += 2.0 * lambda[row];
            }
        }
        self.objective.add_hessian(obj_factor, values);
    }
}
