use descent_vehicle::RocketParameters;
use serde::Serialize;

use crate::{CONTROL_DIM, STATE_DIM};

/// Index of each state component inside flat state vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StateComponent {
    X = 0,
    Y = 1,
    Vx = 2,
    Vy = 3,
    Theta = 4,
    Omega = 5,
    Mass = 6,
}

impl StateComponent {
    pub const ALL: [StateComponent; STATE_DIM] = [
        StateComponent::X,
        StateComponent::Y,
        StateComponent::Vx,
        StateComponent::Vy,
        StateComponent::Theta,
        StateComponent::Omega,
        StateComponent::Mass,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short label used in diagnostics and CSV headers.
    pub fn label(self) -> &'static str {
        match self {
            StateComponent::X => "x",
            StateComponent::Y => "y",
            StateComponent::Vx => "vx",
            StateComponent::Vy => "vy",
            StateComponent::Theta => "theta",
            StateComponent::Omega => "omega",
            StateComponent::Mass => "mass",
        }
    }
}

/// Index of each control component inside flat control vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ControlComponent {
    Thrust = 0,
    Gimbal = 1,
    RcsLeft = 2,
    RcsRight = 3,
}

impl ControlComponent {
    pub const ALL: [ControlComponent; CONTROL_DIM] = [
        ControlComponent::Thrust,
        ControlComponent::Gimbal,
        ControlComponent::RcsLeft,
        ControlComponent::RcsRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            ControlComponent::Thrust => "thrust",
            ControlComponent::Gimbal => "gimbal",
            ControlComponent::RcsLeft => "rcs_left",
            ControlComponent::RcsRight => "rcs_right",
        }
    }
}

/// Vehicle state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct State {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub theta: f64,
    pub omega: f64,
    pub mass: f64,
}

impl State {
    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [
            self.x, self.y, self.vx, self.vy, self.theta, self.omega, self.mass,
        ]
    }

    pub fn from_slice(v: &[f64]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            vx: v[2],
            vy: v[3],
            theta: v[4],
            omega: v[5],
            mass: v[6],
        }
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Actuator command held constant over one interval.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Control {
    pub thrust: f64,
    pub gimbal: f64,
    pub rcs_left: f64,
    pub rcs_right: f64,
}

impl Control {
    /// Hover command for a vehicle of the given mass.
    pub fn hover(params: &RocketParameters, mass: f64) -> Self {
        Self {
            thrust: params.hover_thrust(mass),
            ..Self::default()
        }
    }

    pub fn to_array(&self) -> [f64; CONTROL_DIM] {
        [self.thrust, self.gimbal, self.rcs_left, self.rcs_right]
    }

    pub fn from_slice(v: &[f64]) -> Self {
        Self {
            thrust: v[0],
            gimbal: v[1],
            rcs_left: v[2],
            rcs_right: v[3],
        }
    }
}

/// Time derivative of the state under a constant control.
pub fn derivative(state: &State, control: &Control, params: &RocketParameters) -> State {
    let d = derivative_raw(&state.to_array(), &control.to_array(), params);
    State::from_slice(&d)
}

/// Array form of [`derivative`], used by the integrator and finite differences.
pub fn derivative_raw(
    s: &[f64; STATE_DIM],
    u: &[f64; CONTROL_DIM],
    params: &RocketParameters,
) -> [f64; STATE_DIM] {
    let [_, _, vx, vy, theta, omega, mass] = *s;
    let [thrust, gimbal, rcs_left, rcs_right] = *u;

    let rcs_net = rcs_right - rcs_left;
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_td, cos_td) = (theta + gimbal).sin_cos();

    let ax = (thrust * sin_td + rcs_net * cos_t) / mass;
    let ay = (thrust * cos_td - rcs_net * sin_t) / mass - params.gravity_m_s2;
    let alpha = (-thrust * gimbal.sin() * params.engine_arm_m + rcs_net * params.rcs_arm_m)
        / params.moment_of_inertia_kg_m2;
    let mdot =
        -thrust / params.exhaust_velocity() - (rcs_left + rcs_right) / params.rcs_exhaust_velocity();

    [vx, vy, ax, ay, omega, alpha, mdot]
}

/// Partial derivatives of [`derivative_raw`] with respect to the state and the control.
pub fn partials(
    s: &[f64; STATE_DIM],
    u: &[f64; CONTROL_DIM],
    params: &RocketParameters,
) -> ([[f64; STATE_DIM]; STATE_DIM], [[f64; CONTROL_DIM]; STATE_DIM]) {
    let [_, _, _, _, theta, _, mass] = *s;
    let [thrust, gimbal, _, _] = *u;
    let rcs_net = u[3] - u[2];
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_td, cos_td) = (theta + gimbal).sin_cos();
    let (sin_d, cos_d) = gimbal.sin_cos();
    let inertia = params.moment_of_inertia_kg_m2;

    let fx = thrust * sin_td + rcs_net * cos_t;
    let fy = thrust * cos_td - rcs_net * sin_t;

    let mut ds = [[0.0; STATE_DIM]; STATE_DIM];
    ds[0][2] = 1.0;
    ds[1][3] = 1.0;
    ds[2][4] = (thrust * cos_td - rcs_net * sin_t) / mass;
    ds[2][6] = -fx / (mass * mass);
    ds[3][4] = (-thrust * sin_td - rcs_net * cos_t) / mass;
    ds[3][6] = -fy / (mass * mass);
    ds[4][5] = 1.0;

    let mut du = [[0.0; CONTROL_DIM]; STATE_DIM];
    du[2] = [
        sin_td / mass,
        thrust * cos_td / mass,
        -cos_t / mass,
        cos_t / mass,
    ];
    du[3] = [
        cos_td / mass,
        -thrust * sin_td / mass,
        sin_t / mass,
        -sin_t / mass,
    ];
    du[5] = [
        -sin_d * params.engine_arm_m / inertia,
        -thrust * cos_d * params.engine_arm_m / inertia,
        -params.rcs_arm_m / inertia,
        params.rcs_arm_m / inertia,
    ];
    let rcs_flow = -1.0 / params.rcs_exhaust_velocity();
    du[6] = [-1.0 / params.exhaust_velocity(), 0.0, rcs_flow, rcs_flow];

    (ds, du)
}
