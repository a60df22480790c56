use descent_vehicle::RocketParameters;

use crate::model::derivative_raw;
use crate::{CONTROL_DIM, STATE_DIM};

fn axpy(base: &[f64; STATE_DIM], k: &[f64; STATE_DIM], h: f64) -> [f64; STATE_DIM] {
    let mut out = *base;
    for (o, ki) in out.iter_mut().zip(k) {
        *o += h * ki;
    }
    out
}

/// One classical fourth-order Runge-Kutta step with the control held constant.
pub fn rk4_step(
    s: &[f64; STATE_DIM],
    u: &[f64; CONTROL_DIM],
    dt: f64,
    params: &RocketParameters,
) -> [f64; STATE_DIM] {
    let k1 = derivative_raw(s, u, params);
    let k2 = derivative_raw(&axpy(s, &k1, 0.5 * dt), u, params);
    let k3 = derivative_raw(&axpy(s, &k2, 0.5 * dt), u, params);
    let k4 = derivative_raw(&axpy(s, &k3, dt), u, params);

    let mut next = *s;
    for i in 0..STATE_DIM {
        next[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
    next
}

/// Roll a control sequence forward from `initial`, returning every node (`controls.len() + 1`).
pub fn propagate(
    initial: &[f64; STATE_DIM],
    controls: &[[f64; CONTROL_DIM]],
    dt: f64,
    params: &RocketParameters,
) -> Vec<[f64; STATE_DIM]> {
    let mut nodes = Vec::with_capacity(controls.len() + 1);
    nodes.push(*initial);
    let mut current = *initial;
    for u in controls {
        current = rk4_step(&current, u, dt, params);
        nodes.push(current);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn free_fall_matches_closed_form() {
        let params = RocketParameters::default();
        let s0 = [0.0, 1_000.0, 3.0, 0.0, 0.0, 0.0, 25_000.0];
        let nodes = propagate(&s0, &[[0.0; CONTROL_DIM]; 10], 0.5, &params);
        let last = nodes[10];
        let t = 5.0;
        assert_relative_eq!(last[0], 3.0 * t, epsilon = 1e-9);
        assert_relative_eq!(last[1], 1_000.0 - 0.5 * params.gravity_m_s2 * t * t, epsilon = 1e-9);
        assert_relative_eq!(last[3], -params.gravity_m_s2 * t, epsilon = 1e-9);
        assert_eq!(last[6], 25_000.0);
    }

    #[test]
    fn constant_burn_depletes_mass_linearly() {
        let params = RocketParameters::default();
        let s0 = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 25_000.0];
        let u = [400_000.0, 0.0, 0.0, 0.0];
        let next = rk4_step(&s0, &u, 1.0, &params);
        assert_relative_eq!(
            next[6],
            25_000.0 - 400_000.0 / params.exhaust_velocity(),
            epsilon = 1e-9
        );
    }
}
