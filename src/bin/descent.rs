use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use powered_descent::export::{summary, trajectory, writer_for_path};
use powered_descent::scenario::{load_problems, pick};
use powered_descent::transcription::worker::solve_with_timeout;
use powered_descent::transcription::{DescentPlanner, RocketOverrides};
use powered_descent::{
    DescentRequest, InitialConditions, Solution, SolverOptions, TrajectoryProblem, solve_problem,
};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Plan a fuel-optimal planar powered descent"
)]
struct Cli {
    /// Scenario file (YAML list, TOML file, or directory of TOML files)
    #[arg(long)]
    scenarios: Option<PathBuf>,

    /// Scenario name (case-insensitive, defaults to the first one)
    #[arg(long)]
    scenario: Option<String>,

    /// Vehicle catalog referenced by scenarios
    #[arg(long)]
    vehicles: Option<PathBuf>,

    /// Initial horizontal position in m (inline request, no scenario file)
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
    x: f64,

    /// Initial altitude in m (inline request)
    #[arg(long, default_value_t = 1000.0)]
    y: f64,

    /// Initial horizontal velocity in m/s (inline request)
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
    vx: f64,

    /// Initial vertical velocity in m/s (inline request)
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
    vy: f64,

    /// Override the maximum thrust in N (inline request)
    #[arg(long)]
    max_thrust: Option<f64>,

    /// Number of intervals (overrides the scenario)
    #[arg(long)]
    intervals: Option<usize>,

    /// Interval length in s (overrides the scenario)
    #[arg(long)]
    dt: Option<f64>,

    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(long)]
    tolerance: Option<f64>,

    /// Wall-clock limit in seconds; the solve runs on a worker thread
    #[arg(long)]
    timeout: Option<f64>,

    /// Trajectory CSV output (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Summary JSON output (`-` for stdout)
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log solver progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::builder()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .try_init()?;

    let (name, vehicle, problem) = build_problem(&cli)?;

    let mut options = SolverOptions::default();
    if let Some(n) = cli.max_iterations {
        options.max_iterations = n;
    }
    if let Some(tol) = cli.tolerance {
        options.tolerance = tol;
    }

    let solution = match cli.timeout {
        Some(secs) => {
            let timeout = Duration::try_from_secs_f64(secs)
                .map_err(|e| anyhow::anyhow!("invalid timeout {secs}: {e}"))?;
            solve_with_timeout(problem, options, timeout)?
        }
        None => solve_problem(&problem, &options)?,
    };

    report(&name, &solution);

    if let Some(path) = &cli.csv {
        let mut writer = writer_for_path(path)?;
        trajectory::write_trajectory(
            &mut writer,
            solution.dt,
            solution.states.rows(),
            solution.controls.rows(),
        )?;
    }
    if let Some(path) = &cli.json {
        let generated = chrono::Utc::now().to_rfc3339();
        let meta = summary::Metadata {
            scenario: &name,
            vehicle: &vehicle,
            generated_utc: &generated,
        };
        summary::write_summary(path, &meta, &solution)?;
    }

    if !solution.is_solved() {
        anyhow::bail!("descent '{}' not solved: {}", name, solution.status);
    }
    Ok(())
}

fn build_problem(cli: &Cli) -> anyhow::Result<(String, String, TrajectoryProblem)> {
    if let Some(path) = &cli.scenarios {
        let problems = load_problems(path, cli.vehicles.as_deref())?;
        let chosen = pick(&problems, cli.scenario.as_deref())?;
        let mut problem = chosen.problem.clone();
        if let Some(n) = cli.intervals {
            problem.intervals = n;
        }
        if let Some(dt) = cli.dt {
            problem.dt = dt;
        }
        return Ok((chosen.name.clone(), chosen.vehicle.clone(), problem));
    }

    let request = DescentRequest {
        initial_conditions: InitialConditions {
            x_m: cli.x,
            y_m: cli.y,
            vx_m_s: cli.vx,
            vy_m_s: cli.vy,
            theta_rad: None,
        },
        rocket: RocketOverrides {
            max_thrust_n: cli.max_thrust,
            ..RocketOverrides::default()
        },
        intervals: cli.intervals,
        dt_s: cli.dt,
    };
    let problem = DescentPlanner::new().problem_for(&request)?;
    Ok(("inline".to_string(), "default".to_string(), problem))
}

fn report(name: &str, solution: &Solution) {
    let m = &solution.metrics;
    println!("=== Descent '{}' ===", name);
    println!(
        "Status: {} after {} iterations ({:.2} s)",
        solution.status, solution.iterations, solution.solve_time_s
    );
    println!(
        "Propellant used: {:.1} kg (final mass {:.1} kg), flight time {:.1} s",
        m.propellant_used_kg, m.final_mass_kg, m.flight_time_s
    );
    println!(
        "Terminal error: position {:.3} m, velocity {:.3} m/s",
        m.terminal_position_error_m, m.terminal_velocity_error_m_s
    );
    println!(
        "Peak thrust {:.0} N, max speed {:.1} m/s, max violation {:.3e}",
        m.peak_thrust_n, m.max_speed_m_s, m.max_violation
    );
    for v in &solution.violations {
        println!("  violated: {} by {:.3e}", v.label, v.magnitude);
    }
}
