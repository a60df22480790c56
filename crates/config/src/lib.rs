//! Configuration models and loaders for the powered-descent planner.
//!
//! Angles are given in degrees here; conversion to runtime types happens in the transcription
//! façade.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Vehicle entry from a catalog. Missing fields keep the default vehicle's values.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct VehicleConfig {
    pub name: String,
    #[serde(default)]
    pub dry_mass_kg: Option<f64>,
    #[serde(default)]
    pub propellant_mass_kg: Option<f64>,
    #[serde(default)]
    pub max_thrust_n: Option<f64>,
    #[serde(default)]
    pub min_thrust_n: Option<f64>,
    #[serde(default)]
    pub max_gimbal_deg: Option<f64>,
    #[serde(default)]
    pub max_rcs_force_n: Option<f64>,
    #[serde(default)]
    pub engine_arm_m: Option<f64>,
    #[serde(default)]
    pub rcs_arm_m: Option<f64>,
    #[serde(default)]
    pub moment_of_inertia_kg_m2: Option<f64>,
    #[serde(default)]
    pub isp_s: Option<f64>,
    #[serde(default)]
    pub rcs_isp_s: Option<f64>,
    #[serde(default)]
    pub gravity_m_s2: Option<f64>,
}

/// Initial state of a scenario.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InitialStateConfig {
    pub x_m: f64,
    pub y_m: f64,
    #[serde(default)]
    pub vx_m_s: f64,
    #[serde(default)]
    pub vy_m_s: f64,
    #[serde(default)]
    pub theta_deg: f64,
    #[serde(default)]
    pub omega_deg_s: f64,
    /// Defaults to the vehicle's wet mass.
    #[serde(default)]
    pub mass_kg: Option<f64>,
}

/// Landing point; the pad at the origin unless given.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct TargetConfig {
    pub x_m: f64,
    pub y_m: f64,
    pub vx_m_s: f64,
    pub vy_m_s: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TerminalConfig {
    #[default]
    Exact,
    Band {
        position_tolerance_m: f64,
        velocity_tolerance_m_s: f64,
        #[serde(default)]
        touchdown_speed_m_s: Option<f64>,
    },
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PathConfig {
    pub altitude_floor: bool,
    pub max_tilt_deg: Option<f64>,
    pub max_angular_rate_deg_s: Option<f64>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            altitude_floor: true,
            max_tilt_deg: None,
            max_angular_rate_deg_s: None,
        }
    }
}

/// Optional objective terms; all zero is pure minimum-propellant.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct WeightsConfig {
    pub terminal_error: f64,
    pub control_effort: f64,
    pub attitude: f64,
}

/// One descent scenario.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub name: String,
    /// Name of a vehicle in the catalog; the default vehicle when absent.
    #[serde(default)]
    pub vehicle: Option<String>,
    pub initial: InitialStateConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub attitude_tolerance_deg: Option<f64>,
    #[serde(default)]
    pub rate_tolerance_deg_s: Option<f64>,
    #[serde(default = "default_intervals")]
    pub intervals: usize,
    #[serde(default = "default_dt")]
    pub dt_s: f64,
    #[serde(default)]
    pub path: PathConfig,
    #[serde(default)]
    pub weights: WeightsConfig,
    /// Overrides the vehicle's gravity for this scenario only.
    #[serde(default)]
    pub gravity_m_s2: Option<f64>,
}

fn default_intervals() -> usize {
    50
}

fn default_dt() -> f64 {
    0.5
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Load vehicle configurations from a YAML list, a TOML file or a directory of TOML files.
pub fn load_vehicle_configs<P: AsRef<Path>>(path: P) -> Result<Vec<VehicleConfig>, ConfigError> {
    load_records(path)
}

/// Load scenarios from a YAML list, a TOML file or a directory of TOML files.
pub fn load_scenarios<P: AsRef<Path>>(path: P) -> Result<Vec<ScenarioConfig>, ConfigError> {
    load_records(path)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|ext| ext == "toml").unwrap_or(false))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn yaml_scenario_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.yaml");
        fs::write(
            &path,
            "- name: hop\n  initial: { x_m: 10.0, y_m: 300.0 }\n\
             - name: band\n  initial: { x_m: 0.0, y_m: 800.0, vy_m_s: -20.0 }\n  \
             terminal: { mode: band, position_tolerance_m: 1.0, velocity_tolerance_m_s: 0.5 }\n",
        )
        .unwrap();
        let scenarios = load_scenarios(&path).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].terminal, TerminalConfig::Exact);
        assert_eq!(scenarios[0].intervals, 50);
        assert_eq!(scenarios[0].dt_s, 0.5);
        assert!(scenarios[0].path.altitude_floor);
        assert_eq!(
            scenarios[1].terminal,
            TerminalConfig::Band {
                position_tolerance_m: 1.0,
                velocity_tolerance_m_s: 0.5,
                touchdown_speed_m_s: None,
            }
        );
    }

    #[test]
    fn toml_directory_is_read_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("b.toml"),
            "name = \"heavy\"\ndry_mass_kg = 30000.0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("a.toml"),
            "name = \"light\"\nmax_gimbal_deg = 10.0\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let vehicles = load_vehicle_configs(dir.path()).unwrap();
        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].name, "light");
        assert_eq!(vehicles[0].max_gimbal_deg, Some(10.0));
        assert_eq!(vehicles[1].dry_mass_kg, Some(30_000.0));
    }

    #[test]
    fn malformed_files_report_their_format() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("bad.yaml");
        fs::write(&yaml, "- name: [unclosed\n").unwrap();
        assert!(matches!(load_scenarios(&yaml), Err(ConfigError::Parse(_))));
        let toml_path = dir.path().join("bad.toml");
        fs::write(&toml_path, "name = \n").unwrap();
        assert!(matches!(
            load_vehicle_configs(&toml_path),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            load_scenarios(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
