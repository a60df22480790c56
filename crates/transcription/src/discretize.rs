//! Fixed-step RK4 defects and their derivatives.

use descent_dynamics::{CONTROL_DIM, STATE_DIM, derivative_raw, partials, rk4_step};
use descent_vehicle::RocketParameters;

use crate::layout::INTERVAL_BLOCK;

/// Jacobian of the one-step prediction with respect to `(s_k, u_k)`.
pub type StepJacobian = [[f64; INTERVAL_BLOCK]; STATE_DIM];
/// Dense curvature over `(s_k, u_k)`.
pub type StepHessian = [[f64; INTERVAL_BLOCK]; INTERVAL_BLOCK];

// Positions and velocities never feed back into forces, so the prediction is linear in them.
const NONLINEAR_INPUTS: [usize; 7] = [4, 5, 6, 7, 8, 9, 10];
const CURVATURE_STEP: f64 = 1e-5;

/// Classical RK4 with piecewise-constant control.
#[derive(Debug, Clone, Copy)]
pub struct Discretizer<'a> {
    params: &'a RocketParameters,
    dt: f64,
}

impl<'a> Discretizer<'a> {
    pub fn new(params: &'a RocketParameters, dt: f64) -> Self {
        Self { params, dt }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Integrated state after one interval.
    pub fn predict(&self, s: &[f64; STATE_DIM], u: &[f64; CONTROL_DIM]) -> [f64; STATE_DIM] {
        rk4_step(s, u, self.dt, self.params)
    }

    /// `s_next - predict(s, u)`; zero when the node pair is dynamically consistent.
    pub fn defect(
        &self,
        s: &[f64; STATE_DIM],
        u: &[f64; CONTROL_DIM],
        s_next: &[f64; STATE_DIM],
    ) -> [f64; STATE_DIM] {
        let pred = self.predict(s, u);
        let mut out = [0.0; STATE_DIM];
        for i in 0..STATE_DIM {
            out[i] = s_next[i] - pred[i];
        }
        out
    }

    fn stage(
        &self,
        s: &[f64; STATE_DIM],
        u: &[f64; CONTROL_DIM],
        ds: &StepJacobian,
    ) -> ([f64; STATE_DIM], StepJacobian) {
        let k = derivative_raw(s, u, self.params);
        let (fs, fu) = partials(s, u, self.params);
        let mut dk = [[0.0; INTERVAL_BLOCK]; STATE_DIM];
        for i in 0..STATE_DIM {
            for c in 0..INTERVAL_BLOCK {
                let mut acc = 0.0;
                for j in 0..STATE_DIM {
                    acc += fs[i][j] * ds[j][c];
                }
                if c >= STATE_DIM {
                    acc += fu[i][c - STATE_DIM];
                }
                dk[i][c] = acc;
            }
        }
        (k, dk)
    }

    fn advance(
        s: &[f64; STATE_DIM],
        ds: &StepJacobian,
        k: &[f64; STATE_DIM],
        dk: &StepJacobian,
        h: f64,
    ) -> ([f64; STATE_DIM], StepJacobian) {
        let mut out = *s;
        let mut dout = *ds;
        for i in 0..STATE_DIM {
            out[i] += h * k[i];
            for c in 0..INTERVAL_BLOCK {
                dout[i][c] += h * dk[i][c];
            }
        }
        (out, dout)
    }

    /// Exact derivative of [`Discretizer::predict`] obtained by differentiating every RK4 stage.
    pub fn step_jacobian(&self, s: &[f64; STATE_DIM], u: &[f64; CONTROL_DIM]) -> StepJacobian {
        let mut seed = [[0.0; INTERVAL_BLOCK]; STATE_DIM];
        for (i, row) in seed.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        let h = self.dt;
        let (k1, dk1) = self.stage(s, u, &seed);
        let (s2, ds2) = Self::advance(s, &seed, &k1, &dk1, 0.5 * h);
        let (k2, dk2) = self.stage(&s2, u, &ds2);
        let (s3, ds3) = Self::advance(s, &seed, &k2, &dk2, 0.5 * h);
        let (k3, dk3) = self.stage(&s3, u, &ds3);
        let (s4, ds4) = Self::advance(s, &seed, &k3, &dk3, h);
        let (_, dk4) = self.stage(&s4, u, &ds4);

        let mut jac = seed;
        for i in 0..STATE_DIM {
            for c in 0..INTERVAL_BLOCK {
                jac[i][c] += h / 6.0 * (dk1[i][c] + 2.0 * dk2[i][c] + 2.0 * dk3[i][c] + dk4[i][c]);
            }
        }
        jac
    }

    fn weighted_gradient(
        &self,
        z: &[f64; INTERVAL_BLOCK],
        weights: &[f64; STATE_DIM],
    ) -> [f64; INTERVAL_BLOCK] {
        let (s, u) = split(z);
        let jac = self.step_jacobian(&s, &u);
        let mut grad = [0.0; INTERVAL_BLOCK];
        for (i, row) in jac.iter().enumerate() {
            for c in 0..INTERVAL_BLOCK {
                grad[c] -= weights[i] * row[c];
            }
        }
        grad
    }

    /// Hessian over `(s_k, u_k)` of `Σ_i weights_i · defect_i`, i.e. of `-weightsᵀ predict(s, u)`.
    ///
    /// Central differences of the exact gradient; `scales` sets the perturbation size per input.
    pub fn defect_curvature(
        &self,
        s: &[f64; STATE_DIM],
        u: &[f64; CONTROL_DIM],
        weights: &[f64; STATE_DIM],
        scales: &[f64; INTERVAL_BLOCK],
    ) -> StepHessian {
        let mut hess = [[0.0; INTERVAL_BLOCK]; INTERVAL_BLOCK];
        if weights.iter().all(|w| *w == 0.0) {
            return hess;
        }
        let z = join(s, u);
        for &c in &NONLINEAR_INPUTS {
            let h = CURVATURE_STEP * scales[c];
            let (mut zp, mut zm) = (z, z);
            zp[c] += h;
            zm[c] -= h;
            let gp = self.weighted_gradient(&zp, weights);
            let gm = self.weighted_gradient(&zm, weights);
            for r in 0..INTERVAL_BLOCK {
                hess[r][c] = (gp[r] - gm[r]) / (2.0 * h);
            }
        }
        for r in 0..INTERVAL_BLOCK {
            for c in (r + 1)..INTERVAL_BLOCK {
                let avg = 0.5 * (hess[r][c] + hess[c][r]);
                hess[r][c] = avg;
                hess[c][r] = avg;
            }
        }
        hess
    }
}

fn split(z: &[f64; INTERVAL_BLOCK]) -> ([f64; STATE_DIM], [f64; CONTROL_DIM]) {
    let mut s = [0.0; STATE_DIM];
    let mut u = [0.0; CONTROL_DIM];
    s.copy_from_slice(&z[..STATE_DIM]);
    u.copy_from_slice(&z[STATE_DIM..]);
    (s, u)
}

fn join(s: &[f64; STATE_DIM], u: &[f64; CONTROL_DIM]) -> [f64; INTERVAL_BLOCK] {
    let mut z = [0.0; INTERVAL_BLOCK];
    z[..STATE_DIM].copy_from_slice(s);
    z[STATE_DIM..].copy_from_slice(u);
    z
}
