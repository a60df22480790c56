//! Variable bounds and nonlinear rows of the transcribed problem.
//!
//! Boundary conditions and path limits are both expressed as bounds and always intersected, so
//! a boundary node never loses a path constraint.

use descent_dynamics::{CONTROL_DIM, ControlComponent, STATE_DIM, StateComponent};
use serde::{Deserialize, Serialize};

use crate::layout::VariableLayout;
use crate::problem::{TranscriptionError, TrajectoryProblem};

/// Default touchdown attitude tolerance (0.1°).
pub const DEFAULT_ATTITUDE_TOLERANCE_RAD: f64 = 0.1 * std::f64::consts::PI / 180.0;
/// Default touchdown angular-rate tolerance.
pub const DEFAULT_RATE_TOLERANCE_RAD_S: f64 = 0.01;

/// Landing point and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TerminalTarget {
    pub x_m: f64,
    pub y_m: f64,
    #[serde(default)]
    pub vx_m_s: f64,
    #[serde(default)]
    pub vy_m_s: f64,
}

/// How the terminal position and velocity are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TerminalMode {
    /// Position and velocity equal the target.
    #[default]
    Exact,
    /// Position and velocity within per-axis tolerances of the target.
    Band {
        position_tolerance_m: f64,
        velocity_tolerance_m_s: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalConditions {
    pub target: TerminalTarget,
    pub mode: TerminalMode,
    pub attitude_tolerance_rad: f64,
    pub rate_tolerance_rad_s: f64,
    /// Upper bound on touchdown speed, only meaningful with [`TerminalMode::Band`].
    pub touchdown_speed_m_s: Option<f64>,
}

impl Default for TerminalConditions {
    fn default() -> Self {
        Self {
            target: TerminalTarget::default(),
            mode: TerminalMode::Exact,
            attitude_tolerance_rad: DEFAULT_ATTITUDE_TOLERANCE_RAD,
            rate_tolerance_rad_s: DEFAULT_RATE_TOLERANCE_RAD_S,
            touchdown_speed_m_s: None,
        }
    }
}

impl TerminalConditions {
    /// Whether the touchdown speed row is part of the problem.
    pub fn has_speed_row(&self) -> bool {
        matches!(self.mode, TerminalMode::Band { .. }) && self.touchdown_speed_m_s.is_some()
    }
}

/// Constraints applied at every node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathLimits {
    /// Keep `y >= 0` at every node.
    pub altitude_floor: bool,
    pub max_tilt_rad: Option<f64>,
    pub max_angular_rate_rad_s: Option<f64>,
}

impl Default for PathLimits {
    fn default() -> Self {
        Self {
            altitude_floor: true,
            max_tilt_rad: None,
            max_angular_rate_rad_s: None,
        }
    }
}

/// One violated bound or row, in problem units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintViolation {
    pub label: String,
    pub magnitude: f64,
}

/// Resolved bounds for every decision variable plus the nonlinear row bounds.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    layout: VariableLayout,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    speed_limit: Option<f64>,
}

fn intersect(
    node: usize,
    component: &'static str,
    (lo_a, hi_a): (f64, f64),
    (lo_b, hi_b): (f64, f64),
) -> Result<(f64, f64), TranscriptionError> {
    let lower = lo_a.max(lo_b);
    let upper = hi_a.min(hi_b);
    if lower > upper {
        return Err(TranscriptionError::InconsistentBounds {
            node,
            component,
            lower,
            upper,
        });
    }
    Ok((lower, upper))
}

const FREE: (f64, f64) = (f64::NEG_INFINITY, f64::INFINITY);

impl ConstraintSet {
    pub fn build(problem: &TrajectoryProblem) -> Result<Self, TranscriptionError> {
        let n = problem.intervals;
        let layout = VariableLayout::new(n);
        let params = &problem.params;
        let mut lower = vec![f64::NEG_INFINITY; layout.num_variables()];
        let mut upper = vec![f64::INFINITY; layout.num_variables()];

        let path = |component: StateComponent| -> (f64, f64) {
            match component {
                StateComponent::Y if problem.path.altitude_floor => (0.0, f64::INFINITY),
                StateComponent::Theta => problem.path.max_tilt_rad.map_or(FREE, |t| (-t, t)),
                StateComponent::Omega => problem
                    .path
                    .max_angular_rate_rad_s
                    .map_or(FREE, |w| (-w, w)),
                StateComponent::Mass => (params.dry_mass_kg, params.wet_mass_kg()),
                _ => FREE,
            }
        };

        let initial = problem.initial_state.to_array();
        let terminal = &problem.terminal;
        let target = [
            terminal.target.x_m,
            terminal.target.y_m,
            terminal.target.vx_m_s,
            terminal.target.vy_m_s,
        ];

        for k in 0..=n {
            for component in StateComponent::ALL {
                let i = component.index();
                let mut range = path(component);
                if k == 0 {
                    range = intersect(k, component.label(), range, (initial[i], initial[i]))?;
                }
                if k == n {
                    let boundary = match (component, terminal.mode) {
                        (
                            StateComponent::X
                            | StateComponent::Y
                            | StateComponent::Vx
                            | StateComponent::Vy,
                            TerminalMode::Exact,
                        ) => (target[i], target[i]),
                        (
                            StateComponent::X | StateComponent::Y,
                            TerminalMode::Band {
                                position_tolerance_m,
                                ..
                            },
                        ) => (target[i] - position_tolerance_m, target[i] + position_tolerance_m),
                        (
                            StateComponent::Vx | StateComponent::Vy,
                            TerminalMode::Band {
                                velocity_tolerance_m_s,
                                ..
                            },
                        ) => (
                            target[i] - velocity_tolerance_m_s,
                            target[i] + velocity_tolerance_m_s,
                        ),
                        (StateComponent::Theta, _) => (
                            -terminal.attitude_tolerance_rad,
                            terminal.attitude_tolerance_rad,
                        ),
                        (StateComponent::Omega, _) => {
                            (-terminal.rate_tolerance_rad_s, terminal.rate_tolerance_rad_s)
                        }
                        _ => FREE,
                    };
                    range = intersect(k, component.label(), range, boundary)?;
                }
                let idx = layout.state(k, i);
                lower[idx] = range.0;
                upper[idx] = range.1;
            }
        }

        let control_bounds = control_bounds(problem);
        for k in 0..n {
            for j in 0..CONTROL_DIM {
                let idx = layout.control(k, j);
                lower[idx] = control_bounds[j].0;
                upper[idx] = control_bounds[j].1;
            }
        }

        let speed_limit = if terminal.has_speed_row() {
            terminal.touchdown_speed_m_s
        } else {
            None
        };

        Ok(Self {
            layout,
            lower,
            upper,
            speed_limit,
        })
    }

    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    /// Defect rows plus the optional touchdown speed row.
    pub fn num_rows(&self) -> usize {
        self.layout.num_defect_rows() + usize::from(self.speed_limit.is_some())
    }

    pub fn speed_limit(&self) -> Option<f64> {
        self.speed_limit
    }

    /// Row index of the touchdown speed row, if present.
    pub fn speed_row(&self) -> Option<usize> {
        self.speed_limit.map(|_| self.layout.num_defect_rows())
    }

    pub fn row_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
        let defects = self.layout.num_defect_rows();
        lower[..defects].fill(0.0);
        upper[..defects].fill(0.0);
        if let (Some(row), Some(limit)) = (self.speed_row(), self.speed_limit) {
            lower[row] = f64::NEG_INFINITY;
            upper[row] = limit * limit;
        }
    }

    /// Human-readable name of a decision variable.
    pub fn variable_label(&self, index: usize) -> String {
        let states = self.layout.num_state_vars();
        if index < states {
            let node = index / STATE_DIM;
            format!("state[{node}].{}", StateComponent::ALL[index % STATE_DIM].label())
        } else {
            let rel = index - states;
            let node = rel / CONTROL_DIM;
            format!("control[{node}].{}", ControlComponent::ALL[rel % CONTROL_DIM].label())
        }
    }

    pub fn row_label(&self, row: usize) -> String {
        if Some(row) == self.speed_row() {
            return "touchdown_speed".to_string();
        }
        let interval = row / STATE_DIM;
        format!(
            "dynamics[{interval}].{}",
            StateComponent::ALL[row % STATE_DIM].label()
        )
    }

    /// Every violated bound and row at `x` given row values `g`, largest first.
    pub fn violations(&self, x: &[f64], g: &[f64]) -> Vec<ConstraintViolation> {
        let mut out = Vec::new();
        for (i, value) in x.iter().enumerate() {
            let excess = (self.lower[i] - value).max(value - self.upper[i]);
            if excess > 0.0 || !value.is_finite() {
                out.push(ConstraintViolation {
                    label: self.variable_label(i),
                    magnitude: if value.is_finite() { excess } else { f64::INFINITY },
                });
            }
        }
        let mut row_lower = vec![0.0; self.num_rows()];
        let mut row_upper = vec![0.0; self.num_rows()];
        self.row_bounds(&mut row_lower, &mut row_upper);
        for (row, value) in g.iter().enumerate() {
            let excess = (row_lower[row] - value).max(value - row_upper[row]);
            if excess > 0.0 || !value.is_finite() {
                out.push(ConstraintViolation {
                    label: self.row_label(row),
                    magnitude: if value.is_finite() { excess } else { f64::INFINITY },
                });
            }
        }
        out.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
        out
    }
}

/// Actuator bounds `[T, δ, F_L, F_R]`.
pub fn control_bounds(problem: &TrajectoryProblem) -> [(f64, f64); CONTROL_DIM] {
    let p = &problem.params;
    [
        (p.min_thrust_n, p.max_thrust_n),
        (-p.max_gimbal_rad, p.max_gimbal_rad),
        (0.0, p.max_rcs_force_n),
        (0.0, p.max_rcs_force_n),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use descent_dynamics::State;
    use descent_vehicle::RocketParameters;

    fn problem() -> TrajectoryProblem {
        TrajectoryProblem::new(
            RocketParameters::default(),
            State {
                y: 800.0,
                vy: -10.0,
                mass: 28_000.0,
                ..State::default()
            },
            4,
            0.5,
        )
    }

    #[test]
    fn initial_and_exact_terminal_nodes_are_fixed() {
        let set = ConstraintSet::build(&problem()).unwrap();
        let layout = set.layout();
        let y0 = layout.state(0, StateComponent::Y.index());
        assert_eq!((set.lower[y0], set.upper[y0]), (800.0, 800.0));
        let vy_n = layout.state(4, StateComponent::Vy.index());
        assert_eq!((set.lower[vy_n], set.upper[vy_n]), (0.0, 0.0));
        let m_n = layout.state(4, StateComponent::Mass.index());
        assert_eq!((set.lower[m_n], set.upper[m_n]), (22_000.0, 28_000.0));
    }

    #[test]
    fn band_mode_keeps_altitude_floor_at_touchdown() {
        let mut p = problem();
        p.terminal.mode = TerminalMode::Band {
            position_tolerance_m: 2.0,
            velocity_tolerance_m_s: 1.0,
        };
        let set = ConstraintSet::build(&p).unwrap();
        let y_n = set.layout().state(4, StateComponent::Y.index());
        assert_eq!((set.lower[y_n], set.upper[y_n]), (0.0, 2.0));
    }

    #[test]
    fn initial_state_outside_path_limits_is_rejected() {
        let mut p = problem();
        p.initial_state.mass = 30_000.0;
        let err = ConstraintSet::build(&p).unwrap_err();
        assert!(matches!(
            err,
            TranscriptionError::InconsistentBounds {
                node: 0,
                component: "mass",
                ..
            }
        ));
    }

    #[test]
    fn speed_row_only_exists_in_band_mode() {
        let mut p = problem();
        p.terminal.touchdown_speed_m_s = Some(2.0);
        assert_eq!(ConstraintSet::build(&p).unwrap().num_rows(), 28);
        p.terminal.mode = TerminalMode::Band {
            position_tolerance_m: 1.0,
            velocity_tolerance_m_s: 2.0,
        };
        let set = ConstraintSet::build(&p).unwrap();
        assert_eq!(set.num_rows(), 29);
        assert_eq!(set.row_label(28), "touchdown_speed");
        assert_eq!(set.row_label(9), "dynamics[1].vx");
    }
}
