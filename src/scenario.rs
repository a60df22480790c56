//! Scenario catalogs: configuration files resolved into ready-to-solve problems.

use std::path::Path;

use descent_config::{
    ConfigError, ScenarioConfig, VehicleConfig, load_scenarios, load_vehicle_configs,
};
use descent_transcription::vehicle::{self, VehicleError};
use descent_transcription::{RocketParameters, TranscriptionError, TrajectoryProblem, scenario};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Vehicle(#[from] VehicleError),
    #[error("scenario '{0}' not found")]
    NotFound(String),
    #[error("scenario catalog is empty")]
    Empty,
    #[error("scenario '{name}' is invalid: {source}")]
    Invalid {
        name: String,
        source: TranscriptionError,
    },
}

/// A scenario resolved against its vehicle.
#[derive(Debug, Clone)]
pub struct NamedProblem {
    pub name: String,
    pub vehicle: String,
    pub problem: TrajectoryProblem,
}

/// Resolve one scenario. Vehicles are looked up by name in `vehicles`; scenarios that name no
/// vehicle fly the default one.
pub fn resolve(
    config: &ScenarioConfig,
    vehicles: &[VehicleConfig],
) -> Result<NamedProblem, ScenarioError> {
    let (vehicle_name, params) = match config.vehicle.as_deref() {
        Some(name) => (name.to_string(), vehicle::select(vehicles, Some(name))?),
        None => ("default".to_string(), RocketParameters::default()),
    };
    let problem = scenario::from_config(config, &params).map_err(|source| {
        ScenarioError::Invalid {
            name: config.name.clone(),
            source,
        }
    })?;
    Ok(NamedProblem {
        name: config.name.clone(),
        vehicle: vehicle_name,
        problem,
    })
}

/// Load every scenario in `scenarios` and resolve it against the optional vehicle catalog.
pub fn load_problems<P: AsRef<Path>>(
    scenarios: P,
    vehicles: Option<&Path>,
) -> Result<Vec<NamedProblem>, ScenarioError> {
    let configs = load_scenarios(scenarios)?;
    let catalog = match vehicles {
        Some(path) => load_vehicle_configs(path)?,
        None => Vec::new(),
    };
    configs.iter().map(|cfg| resolve(cfg, &catalog)).collect()
}

/// Pick one scenario by name (case-insensitive), or the first one.
pub fn pick<'a>(
    problems: &'a [NamedProblem],
    requested: Option<&str>,
) -> Result<&'a NamedProblem, ScenarioError> {
    match requested {
        Some(name) => problems
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ScenarioError::NotFound(name.to_string())),
        None => problems.first().ok_or(ScenarioError::Empty),
    }
}
