//! Propellant objective with optional quadratic terms.

use descent_dynamics::{CONTROL_DIM, STATE_DIM, StateComponent};
use serde::{Deserialize, Serialize};

use crate::constraints::{TerminalTarget, control_bounds};
use crate::layout::{INTERVAL_BLOCK, VariableLayout};
use crate::problem::TrajectoryProblem;

/// Weights of the optional objective terms. All zero means pure minimum-propellant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// Quadratic penalty on terminal position and velocity residuals.
    pub terminal_error: f64,
    /// Quadratic regularization on normalized controls, integrated over time.
    pub control_effort: f64,
    /// Quadratic penalty on pitch angle, integrated over time.
    pub attitude: f64,
}

/// `m_0 - m_N` plus the weighted terms, with analytic gradient and diagonal Hessian.
#[derive(Debug, Clone)]
pub struct Objective {
    layout: VariableLayout,
    weights: ObjectiveWeights,
    target: TerminalTarget,
    dt: f64,
    /// Normalizing range per control component; zero disables the term for that component.
    control_range: [f64; CONTROL_DIM],
}

const MASS: usize = StateComponent::Mass as usize;
const THETA: usize = StateComponent::Theta as usize;

/// Builds the [`Objective`] for a validated problem.
pub struct ObjectiveBuilder;

impl ObjectiveBuilder {
    pub fn build(problem: &TrajectoryProblem) -> Objective {
        let bounds = control_bounds(problem);
        let mut control_range = [0.0; CONTROL_DIM];
        for (range, (lo, hi)) in control_range.iter_mut().zip(bounds) {
            *range = lo.abs().max(hi.abs());
        }
        Objective {
            layout: VariableLayout::new(problem.intervals),
            weights: problem.weights,
            target: problem.terminal.target,
            dt: problem.dt,
            control_range,
        }
    }
}

impl Objective {
    fn terminal_residual(&self, x: &[f64]) -> [f64; 4] {
        let n = self.layout.intervals();
        let s = self.layout.state_slice(x, n);
        [
            s[0] - self.target.x_m,
            s[1] - self.target.y_m,
            s[2] - self.target.vx_m_s,
            s[3] - self.target.vy_m_s,
        ]
    }

    fn control_weight(&self, j: usize) -> f64 {
        if self.control_range[j] > 0.0 {
            self.weights.control_effort * self.dt / (self.control_range[j] * self.control_range[j])
        } else {
            0.0
        }
    }

    pub fn value(&self, x: &[f64]) -> f64 {
        let n = self.layout.intervals();
        let mut f = x[self.layout.state(0, MASS)] - x[self.layout.state(n, MASS)];

        if self.weights.terminal_error != 0.0 {
            let r = self.terminal_residual(x);
            f += self.weights.terminal_error * r.iter().map(|v| v * v).sum::<f64>();
        }
        if self.weights.control_effort != 0.0 {
            for k in 0..n {
                for (j, u) in self.layout.control_slice(x, k).iter().enumerate() {
                    f += self.control_weight(j) * u * u;
                }
            }
        }
        if self.weights.attitude != 0.0 {
            for k in 0..=n {
                let theta = x[self.layout.state(k, THETA)];
                f += self.weights.attitude * self.dt * theta * theta;
            }
        }
        f
    }

    pub fn gradient(&self, x: &[f64], grad: &mut [f64]) {
        grad.fill(0.0);
        let n = self.layout.intervals();
        grad[self.layout.state(0, MASS)] += 1.0;
        grad[self.layout.state(n, MASS)] -= 1.0;

        if self.weights.terminal_error != 0.0 {
            let r = self.terminal_residual(x);
            for (i, ri) in r.iter().enumerate() {
                grad[self.layout.state(n, i)] += 2.0 * self.weights.terminal_error * ri;
            }
        }
        if self.weights.control_effort != 0.0 {
            for k in 0..n {
                for j in 0..CONTROL_DIM {
                    let idx = self.layout.control(k, j);
                    grad[idx] += 2.0 * self.control_weight(j) * x[idx];
                }
            }
        }
        if self.weights.attitude != 0.0 {
            for k in 0..=n {
                let idx = self.layout.state(k, THETA);
                grad[idx] += 2.0 * self.weights.attitude * self.dt * x[idx];
            }
        }
    }

    /// Add `factor ×` the (diagonal) objective Hessian into the dense block values.
    pub fn add_hessian(&self, factor: f64, values: &mut [f64]) {
        if factor == 0.0 {
            return;
        }
        let n = self.layout.intervals();
        let mut add_diag = |block: usize, width: usize, local: usize, v: f64| {
            let offset = self.layout.hessian_offset(block);
            values[offset + local * width + local] += factor * v;
        };

        if self.weights.terminal_error != 0.0 {
            for i in 0..4 {
                add_diag(n, STATE_DIM, i, 2.0 * self.weights.terminal_error);
            }
        }
        if self.weights.control_effort != 0.0 {
            for k in 0..n {
                for j in 0..CONTROL_DIM {
                    add_diag(k, INTERVAL_BLOCK, STATE_DIM + j, 2.0 * self.control_weight(j));
                }
            }
        }
        if self.weights.attitude != 0.0 {
            let curvature = 2.0 * self.weights.attitude * self.dt;
            for k in 0..n {
                add_diag(k, INTERVAL_BLOCK, THETA, curvature);
            }
            add_diag(n, STATE_DIM, THETA, curvature);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use descent_dynamics::State;
    use descent_vehicle::RocketParameters;

    fn weighted_problem() -> TrajectoryProblem {
        let mut p = TrajectoryProblem::new(
            RocketParameters::default(),
            State {
                y: 100.0,
                mass: 27_000.0,
                ..State::default()
            },
            3,
            0.5,
        );
        p.weights = ObjectiveWeights {
            terminal_error: 0.5,
            control_effort: 2.0,
            attitude: 3.0,
        };
        p
    }

    #[test]
    fn default_objective_is_propellant_used() {
        let mut p = weighted_problem();
        p.weights = ObjectiveWeights::default();
        let obj = ObjectiveBuilder::build(&p);
        let layout = VariableLayout::new(3);
        let mut x = vec![0.3; layout.num_variables()];
        x[layout.state(0, MASS)] = 27_000.0;
        x[layout.state(3, MASS)] = 26_400.0;
        assert_abs_diff_eq!(obj.value(&x), 600.0, epsilon = 1e-9);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let p = weighted_problem();
        let obj = ObjectiveBuilder::build(&p);
        let layout = VariableLayout::new(3);
        let x: Vec<f64> = (0..layout.num_variables())
            .map(|i| 1.0 + (i as f64 * 0.37).sin() * 50.0)
            .collect();
        let mut grad = vec![0.0; x.len()];
        obj.gradient(&x, &mut grad);
        for i in 0..x.len() {
            let h = 1e-4;
            let (mut xp, mut xm) = (x.clone(), x.clone());
            xp[i] += h;
            xm[i] -= h;
            let fd = (obj.value(&xp) - obj.value(&xm)) / (2.0 * h);
            assert_abs_diff_eq!(grad[i], fd, epsilon = 1e-5 * fd.abs().max(1.0));
        }
    }

    #[test]
    fn hessian_lands_on_block_diagonals() {
        let p = weighted_problem();
        let obj = ObjectiveBuilder::build(&p);
        let layout = VariableLayout::new(3);
        let mut values = vec![0.0; layout.hessian_len()];
        obj.add_hessian(1.0, &mut values);
        let theta_block0 = THETA * INTERVAL_BLOCK + THETA;
        assert_abs_diff_eq!(values[theta_block0], 2.0 * 3.0 * 0.5, epsilon = 1e-12);
        let terminal_x = layout.hessian_offset(3);
        assert_abs_diff_eq!(values[terminal_x], 1.0, epsilon = 1e-12);
        let thrust0 = STATE_DIM * INTERVAL_BLOCK + STATE_DIM;
        let t_max = p.params.max_thrust_n;
        assert_abs_diff_eq!(values[thrust0], 2.0 * 2.0 * 0.5 / (t_max * t_max), epsilon = 1e-18);
    }
}
