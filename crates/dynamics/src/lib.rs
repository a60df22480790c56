//! Continuous-time planar rocket dynamics and the fixed-step RK4 propagator.
//!
//! The body frame is measured from vertical: `θ = 0` means the thrust axis points straight up.
//! Positive gimbal `δ` rotates the thrust vector in the same sense as `θ`.

mod integrate;
mod model;

pub use integrate::{propagate, rk4_step};
pub use model::{
    Control, ControlComponent, State, StateComponent, derivative, derivative_raw, partials,
};

/// Number of state components `[x, y, vx, vy, θ, ω, m]`.
pub const STATE_DIM: usize = 7;
/// Number of control components `[T, δ, F_L, F_R]`.
pub const CONTROL_DIM: usize = 4;
