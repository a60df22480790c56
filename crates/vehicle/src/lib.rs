//! Rocket mass properties, propulsion and actuator limits.

use descent_core::constants::{G0, SURFACE_GRAVITY};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Physical and actuator parameters of the landing vehicle.
///
/// All quantities are SI; angles are radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocketParameters {
    pub dry_mass_kg: f64,
    pub propellant_mass_kg: f64,
    pub max_thrust_n: f64,
    /// Throttle floor of the main engine. Zero allows engine-off coasting.
    pub min_thrust_n: f64,
    pub max_gimbal_rad: f64,
    /// Upper bound on each RCS thruster's force.
    pub max_rcs_force_n: f64,
    /// Distance from centre of mass to main-engine gimbal point.
    pub engine_arm_m: f64,
    /// Distance from centre of mass to the RCS thruster pair.
    pub rcs_arm_m: f64,
    pub moment_of_inertia_kg_m2: f64,
    pub isp_s: f64,
    pub rcs_isp_s: f64,
    pub g0_m_s2: f64,
    pub gravity_m_s2: f64,
}

impl Default for RocketParameters {
    fn default() -> Self {
        let dry_mass_kg = 22_000.0;
        let height_m: f64 = 15.0;
        Self {
            dry_mass_kg,
            propellant_mass_kg: 6_000.0,
            max_thrust_n: 845_000.0,
            min_thrust_n: 0.0,
            max_gimbal_rad: 15f64.to_radians(),
            max_rcs_force_n: 5_000.0,
            engine_arm_m: 10.0,
            rcs_arm_m: 5.0,
            moment_of_inertia_kg_m2: (dry_mass_kg + 6_000.0) * height_m * height_m,
            isp_s: 282.0,
            rcs_isp_s: 200.0,
            g0_m_s2: G0,
            gravity_m_s2: SURFACE_GRAVITY,
        }
    }
}

/// Validation failures for vehicle parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("parameter '{name}' must be finite (got {value})")]
    NonFinite { name: &'static str, value: f64 },
    #[error("parameter '{name}' must be positive (got {value})")]
    NotPositive { name: &'static str, value: f64 },
    #[error("parameter '{name}' must not be negative (got {value})")]
    Negative { name: &'static str, value: f64 },
    #[error("minimum thrust {min} exceeds maximum thrust {max}")]
    ThrottleRange { min: f64, max: f64 },
}

impl RocketParameters {
    /// Total mass at ignition.
    pub fn wet_mass_kg(&self) -> f64 {
        self.dry_mass_kg + self.propellant_mass_kg
    }

    /// Main-engine effective exhaust velocity.
    pub fn exhaust_velocity(&self) -> f64 {
        self.isp_s * self.g0_m_s2
    }

    pub fn rcs_exhaust_velocity(&self) -> f64 {
        self.rcs_isp_s * self.g0_m_s2
    }

    /// Thrust needed to hold a vehicle of mass `mass_kg` stationary.
    pub fn hover_thrust(&self, mass_kg: f64) -> f64 {
        mass_kg * self.gravity_m_s2
    }

    /// Thrust-to-weight ratio at the given mass.
    pub fn thrust_to_weight(&self, mass_kg: f64) -> f64 {
        if self.gravity_m_s2 <= 0.0 {
            return f64::INFINITY;
        }
        self.max_thrust_n / (mass_kg * self.gravity_m_s2)
    }

    /// Check every field for the preconditions the transcription relies on.
    pub fn validate(&self) -> Result<(), ParameterError> {
        let fields: [(&'static str, f64); 13] = [
            ("dry_mass_kg", self.dry_mass_kg),
            ("propellant_mass_kg", self.propellant_mass_kg),
            ("max_thrust_n", self.max_thrust_n),
            ("min_thrust_n", self.min_thrust_n),
            ("max_gimbal_rad", self.max_gimbal_rad),
            ("max_rcs_force_n", self.max_rcs_force_n),
            ("engine_arm_m", self.engine_arm_m),
            ("rcs_arm_m", self.rcs_arm_m),
            ("moment_of_inertia_kg_m2", self.moment_of_inertia_kg_m2),
            ("isp_s", self.isp_s),
            ("rcs_isp_s", self.rcs_isp_s),
            ("g0_m_s2", self.g0_m_s2),
            ("gravity_m_s2", self.gravity_m_s2),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ParameterError::NonFinite { name, value });
            }
        }

        for (name, value) in [
            ("dry_mass_kg", self.dry_mass_kg),
            ("max_thrust_n", self.max_thrust_n),
            ("moment_of_inertia_kg_m2", self.moment_of_inertia_kg_m2),
            ("isp_s", self.isp_s),
            ("rcs_isp_s", self.rcs_isp_s),
            ("g0_m_s2", self.g0_m_s2),
        ] {
            if value <= 0.0 {
                return Err(ParameterError::NotPositive { name, value });
            }
        }

        for (name, value) in [
            ("propellant_mass_kg", self.propellant_mass_kg),
            ("min_thrust_n", self.min_thrust_n),
            ("max_gimbal_rad", self.max_gimbal_rad),
            ("max_rcs_force_n", self.max_rcs_force_n),
            ("engine_arm_m", self.engine_arm_m),
            ("rcs_arm_m", self.rcs_arm_m),
            ("gravity_m_s2", self.gravity_m_s2),
        ] {
            if value < 0.0 {
                return Err(ParameterError::Negative { name, value });
            }
        }

        if self.min_thrust_n > self.max_thrust_n {
            return Err(ParameterError::ThrottleRange {
                min: self.min_thrust_n,
                max: self.max_thrust_n,
            });
        }
        Ok(())
    }

    /// Apply partial overrides on top of these parameters.
    pub fn with_overrides(&self, overrides: &RocketOverrides) -> Self {
        let mut out = self.clone();
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = overrides.$field { out.$field = v; })*
            };
        }
        apply!(
            dry_mass_kg,
            propellant_mass_kg,
            max_thrust_n,
            min_thrust_n,
            max_gimbal_rad,
            max_rcs_force_n,
            engine_arm_m,
            rcs_arm_m,
            moment_of_inertia_kg_m2,
            isp_s,
            rcs_isp_s,
            g0_m_s2,
            gravity_m_s2,
        );
        out
    }
}

/// Optional per-field replacements, used by requests and vehicle catalogs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RocketOverrides {
    pub dry_mass_kg: Option<f64>,
    pub propellant_mass_kg: Option<f64>,
    pub max_thrust_n: Option<f64>,
    pub min_thrust_n: Option<f64>,
    pub max_gimbal_rad: Option<f64>,
    pub max_rcs_force_n: Option<f64>,
    pub engine_arm_m: Option<f64>,
    pub rcs_arm_m: Option<f64>,
    pub moment_of_inertia_kg_m2: Option<f64>,
    pub isp_s: Option<f64>,
    pub rcs_isp_s: Option<f64>,
    pub g0_m_s2: Option<f64>,
    pub gravity_m_s2: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vehicle_can_hover_at_ignition() {
        let params = RocketParameters::default();
        params.validate().unwrap();
        assert!(params.thrust_to_weight(params.wet_mass_kg()) > 1.0);
        assert_eq!(params.wet_mass_kg(), 28_000.0);
    }

    #[test]
    fn validate_rejects_zero_isp_and_nan() {
        let mut params = RocketParameters::default();
        params.isp_s = 0.0;
        assert!(matches!(
            params.validate(),
            Err(ParameterError::NotPositive { name: "isp_s", .. })
        ));

        let mut params = RocketParameters::default();
        params.max_thrust_n = f64::NAN;
        assert!(matches!(
            params.validate(),
            Err(ParameterError::NonFinite { name: "max_thrust_n", .. })
        ));
    }

    #[test]
    fn overrides_replace_only_named_fields() {
        let base = RocketParameters::default();
        let out = base.with_overrides(&RocketOverrides {
            max_thrust_n: Some(1.0e6),
            ..Default::default()
        });
        assert_eq!(out.max_thrust_n, 1.0e6);
        assert_eq!(out.dry_mass_kg, base.dry_mass_kg);
    }
}
