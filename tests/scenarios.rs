use approx::assert_abs_diff_eq;
use powered_descent::dynamics::{Control, State, derivative};
use powered_descent::transcription::{
    DescentRequest, InitialConditions, SolverOptions, SolverStatus, TerminalMode, TrajectoryProblem,
    plan_descent, solve_problem,
};
use powered_descent::vehicle::RocketParameters;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scenario_a() -> TrajectoryProblem {
    let params = RocketParameters::default();
    let initial = State {
        y: 1000.0,
        mass: params.wet_mass_kg(),
        ..State::default()
    };
    let mut problem = TrajectoryProblem::new(params, initial, 50, 0.5);
    problem.terminal.mode = TerminalMode::Band {
        position_tolerance_m: 1.0,
        velocity_tolerance_m_s: 1.0,
    };
    problem
}

fn assert_mass_non_increasing(states: &[f64], width: usize) {
    let masses: Vec<f64> = states.chunks(width).map(|s| s[6]).collect();
    for pair in masses.windows(2) {
        assert!(
            pair[1] <= pair[0] + 1e-2,
            "mass increased from {} to {}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn hover_thrust_balances_gravity() {
    let params = RocketParameters::default();
    for mass in [params.dry_mass_kg, 25_000.0, params.wet_mass_kg()] {
        let state = State {
            y: 500.0,
            mass,
            ..State::default()
        };
        let rate = derivative(&state, &Control::hover(&params, mass), &params);
        assert_abs_diff_eq!(rate.vx, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rate.vy, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rate.omega, 0.0, epsilon = 1e-12);
        assert!(rate.mass < 0.0);
    }
}

#[test]
fn resting_vehicle_without_gravity_needs_no_propellant() {
    init_logger();
    let params = RocketParameters {
        gravity_m_s2: 0.0,
        ..RocketParameters::default()
    };
    let initial = State {
        mass: params.wet_mass_kg(),
        ..State::default()
    };
    let problem = TrajectoryProblem::new(params, initial, 10, 0.5);
    let solution = solve_problem(&problem, &SolverOptions::default()).expect("trivial solve");

    assert_eq!(solution.status, SolverStatus::Solved);
    assert!(solution.metrics.propellant_used_kg.abs() < 1e-3);
    assert!(solution.metrics.terminal_position_error_m < 1e-6);
    for k in 0..solution.intervals() {
        let u = solution.control(k);
        assert!(u.thrust < 1.0, "thrust {} at node {k}", u.thrust);
        assert!(u.rcs_left < 1.0 && u.rcs_right < 1.0);
    }
}

#[test]
fn scenario_a_lands_inside_the_band() {
    init_logger();
    let problem = scenario_a();
    let solution = solve_problem(&problem, &SolverOptions::default()).expect("scenario A solve");

    assert_eq!(solution.status, SolverStatus::Solved);
    assert_eq!(solution.states.shape(), (51, 7));
    assert_eq!(solution.controls.shape(), (50, 4));
    assert!(solution.metrics.final_mass_kg > problem.params.dry_mass_kg);
    assert!(solution.metrics.propellant_used_kg > 0.0);
    assert!(solution.metrics.terminal_position_error_m <= 2f64.sqrt() + 1e-4);
    assert!(solution.metrics.terminal_velocity_error_m_s <= 2f64.sqrt() + 1e-4);
    // Violations are unscaled (kg, m).
    assert!(solution.metrics.max_violation < 0.1);
    assert_mass_non_increasing(solution.states.as_slice(), 7);

    let params = &problem.params;
    for k in 0..solution.intervals() {
        let u = solution.control(k);
        assert!(u.thrust >= -1e-6 && u.thrust <= params.max_thrust_n + 1e-3);
        assert!(u.gimbal.abs() <= params.max_gimbal_rad + 1e-9);
    }
    for k in 0..=solution.intervals() {
        assert!(solution.state(k).y >= -1e-6);
    }
}

#[test]
fn scenario_b_cannot_arrest_the_descent() {
    init_logger();
    let mut problem = scenario_a();
    problem.params.max_thrust_n =
        0.8 * problem.params.wet_mass_kg() * problem.params.gravity_m_s2;
    let solution = solve_problem(&problem, &SolverOptions::default()).expect("scenario B solve");

    assert_eq!(solution.status, SolverStatus::InfeasibleProblem);
    assert!(solution.metrics.max_violation > 1e-3);
    assert!(!solution.violations.is_empty());
    assert_eq!(solution.states.shape(), (51, 7));
}

#[test]
fn identical_problems_solve_identically() {
    init_logger();
    let mut problem = scenario_a();
    problem.initial_state.y = 200.0;
    problem.intervals = 30;
    let options = SolverOptions::default();

    let first = solve_problem(&problem, &options).expect("first solve");
    let second = solve_problem(&problem, &options).expect("second solve");

    assert_eq!(first.status, SolverStatus::Solved);
    assert_eq!(second.status, SolverStatus::Solved);
    assert_eq!(first.iterations, second.iterations);
    assert_abs_diff_eq!(
        first.objective,
        second.objective,
        epsilon = options.tolerance * first.objective.abs().max(1.0)
    );
    assert_abs_diff_eq!(
        first.metrics.terminal_position_error_m,
        second.metrics.terminal_position_error_m,
        epsilon = 1e-6
    );
}

#[test]
fn request_with_lateral_offset_is_planned() {
    init_logger();
    let request = DescentRequest::new(InitialConditions {
        x_m: 50.0,
        y_m: 500.0,
        vx_m_s: 0.0,
        vy_m_s: -10.0,
        theta_rad: None,
    });
    let solution = plan_descent(&request, &SolverOptions::default()).expect("request solve");

    assert!(solution.is_solved());
    let last = solution.final_state();
    assert!(last.x.abs() <= 5.0 + 1e-4);
    assert!(last.speed() <= 1.0 + 1e-4);
    assert_mass_non_increasing(solution.states.as_slice(), 7);
}
