//! Re-exported APIs for consumers of the transcription crate.

pub use crate::constraints::{
    ConstraintSet, ConstraintViolation, PathLimits, TerminalConditions, TerminalMode,
    TerminalTarget,
};
pub use crate::guess::{InitialGuess, default_guess};
pub use crate::objective::ObjectiveWeights;
pub use crate::problem::{ProblemBuilder, ProblemSpec, TranscriptionError, TrajectoryProblem};
pub use crate::request::{
    DescentError, DescentPlanner, DescentRequest, InitialConditions, RequestEnvelope,
    RequestError, into_outcome, plan_descent, solve_problem, solve_problem_with,
};
pub use crate::solution::{Solution, SolutionExtractor, SolutionMetrics};
pub use crate::solver::{LimitKind, SolverAdapter, SolverError, SolverOptions, SolverStatus};
pub use crate::worker::{solve_batch, solve_with_timeout};
pub use descent_dynamics::{Control, State};
pub use descent_vehicle::{ParameterError, RocketOverrides, RocketParameters};

pub mod vehicle {
    use descent_config::VehicleConfig;
    use descent_core::units::deg_to_rad;
    use descent_vehicle::{ParameterError, RocketOverrides, RocketParameters};
    use thiserror::Error;

    /// Errors surfaced when selecting or converting vehicles.
    #[derive(Debug, Error, PartialEq)]
    pub enum VehicleError {
        #[error("vehicle '{0}' not found in catalog")]
        NotFound(String),
        #[error("vehicle catalog is empty")]
        EmptyCatalog,
        #[error("vehicle '{name}' is invalid: {source}")]
        Invalid {
            name: String,
            source: ParameterError,
        },
    }

    /// Convert a `VehicleConfig` into validated `RocketParameters`. Unset fields keep the
    /// default vehicle's values.
    pub fn from_config(config: &VehicleConfig) -> Result<RocketParameters, VehicleError> {
        let overrides = RocketOverrides {
            dry_mass_kg: config.dry_mass_kg,
            propellant_mass_kg: config.propellant_mass_kg,
            max_thrust_n: config.max_thrust_n,
            min_thrust_n: config.min_thrust_n,
            max_gimbal_rad: config.max_gimbal_deg.map(deg_to_rad),
            max_rcs_force_n: config.max_rcs_force_n,
            engine_arm_m: config.engine_arm_m,
            rcs_arm_m: config.rcs_arm_m,
            moment_of_inertia_kg_m2: config.moment_of_inertia_kg_m2,
            isp_s: config.isp_s,
            rcs_isp_s: config.rcs_isp_s,
            g0_m_s2: None,
            gravity_m_s2: config.gravity_m_s2,
        };
        let params = RocketParameters::default().with_overrides(&overrides);
        params.validate().map_err(|source| VehicleError::Invalid {
            name: config.name.clone(),
            source,
        })?;
        Ok(params)
    }

    /// Select a vehicle from the catalog by optional name (case-insensitive), defaulting to the
    /// first entry.
    pub fn select(
        configs: &[VehicleConfig],
        requested: Option<&str>,
    ) -> Result<RocketParameters, VehicleError> {
        let Some(first) = configs.first() else {
            return Err(VehicleError::EmptyCatalog);
        };

        let chosen = if let Some(name) = requested {
            let upper = name.to_uppercase();
            configs
                .iter()
                .find(|cfg| cfg.name.to_uppercase() == upper)
                .ok_or_else(|| VehicleError::NotFound(name.to_string()))?
        } else {
            first
        };

        from_config(chosen)
    }
}

pub mod scenario {
    use descent_config::{ScenarioConfig, TerminalConfig};
    use descent_core::units::deg_to_rad;
    use descent_dynamics::State;
    use descent_vehicle::RocketParameters;

    use crate::constraints::{PathLimits, TerminalConditions, TerminalMode, TerminalTarget};
    use crate::objective::ObjectiveWeights;
    use crate::problem::{TranscriptionError, TrajectoryProblem};

    /// Build a validated `TrajectoryProblem` for a scenario flown by `vehicle`.
    pub fn from_config(
        config: &ScenarioConfig,
        vehicle: &RocketParameters,
    ) -> Result<TrajectoryProblem, TranscriptionError> {
        let mut params = vehicle.clone();
        if let Some(g) = config.gravity_m_s2 {
            params.gravity_m_s2 = g;
        }
        let init = &config.initial;
        let initial = State {
            x: init.x_m,
            y: init.y_m,
            vx: init.vx_m_s,
            vy: init.vy_m_s,
            theta: deg_to_rad(init.theta_deg),
            omega: deg_to_rad(init.omega_deg_s),
            mass: init.mass_kg.unwrap_or_else(|| params.wet_mass_kg()),
        };

        let mut problem = TrajectoryProblem::new(params, initial, config.intervals, config.dt_s);
        let (mode, touchdown_speed_m_s) = match config.terminal {
            TerminalConfig::Exact => (TerminalMode::Exact, None),
            TerminalConfig::Band {
                position_tolerance_m,
                velocity_tolerance_m_s,
                touchdown_speed_m_s,
            } => (
                TerminalMode::Band {
                    position_tolerance_m,
                    velocity_tolerance_m_s,
                },
                touchdown_speed_m_s,
            ),
        };
        let defaults = TerminalConditions::default();
        problem.terminal = TerminalConditions {
            target: TerminalTarget {
                x_m: config.target.x_m,
                y_m: config.target.y_m,
                vx_m_s: config.target.vx_m_s,
                vy_m_s: config.target.vy_m_s,
            },
            mode,
            attitude_tolerance_rad: config
                .attitude_tolerance_deg
                .map_or(defaults.attitude_tolerance_rad, deg_to_rad),
            rate_tolerance_rad_s: config
                .rate_tolerance_deg_s
                .map_or(defaults.rate_tolerance_rad_s, deg_to_rad),
            touchdown_speed_m_s,
        };
        problem.path = PathLimits {
            altitude_floor: config.path.altitude_floor,
            max_tilt_rad: config.path.max_tilt_deg.map(deg_to_rad),
            max_angular_rate_rad_s: config.path.max_angular_rate_deg_s.map(deg_to_rad),
        };
        problem.weights = ObjectiveWeights {
            terminal_error: config.weights.terminal_error,
            control_effort: config.weights.control_effort,
            attitude: config.weights.attitude,
        };
        problem.validate()?;
        Ok(problem)
    }
}
